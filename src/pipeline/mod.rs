//! Pipeline stages for flashcard generation.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! dispatch ──▶ loaders ──▶ normalize ──▶ prompt ──▶ llm ──▶ parse
//! (kind)       (text)      (cleanup)     (template) (model) (flashcards)
//! ```
//!
//! 1. [`dispatch`] : map each upload to one [`dispatch::SourceKind`] by URL
//!    shape or extension
//! 2. [`loaders`]  : turn bytes (or a video link) into text; file loaders run
//!    in `spawn_blocking`
//! 3. [`normalize`]: deterministic whitespace and invisible-character cleanup
//! 4. [`prompt`]   : compose the prompt in a fixed section order
//! 5. [`llm`]      : one model round trip; the only stage besides the video
//!    loader with network I/O
//! 6. [`parse`]    : split the reply into question/answer records

pub mod dispatch;
pub mod llm;
pub mod loaders;
pub mod normalize;
pub mod parse;
pub mod prompt;
