//! # dynamo-flashcards
//!
//! Turn study material into question/answer flashcards with an LLM.
//!
//! Uploaded documents (PDF, Word, PowerPoint, spreadsheets, CSV/TSV) and an
//! optional YouTube link are reduced to plain text, composed into one prompt
//! and sent to a generative model; the reply is parsed into [`Flashcard`]s.
//!
//! ## Pipeline Overview
//!
//! ```text
//! UploadBundle
//!  │
//!  ├─ 1. Dispatch   extension / URL shape → SourceKind (fixed table)
//!  ├─ 2. Load       per-format text extraction (spawn_blocking) + transcript fetch
//!  ├─ 3. Normalise  line endings, invisible characters, blank-line runs
//!  ├─ 4. Summarise  optional one-call condensation of a video transcript
//!  ├─ 5. Prompt     instructions + reply format + examples + sources
//!  ├─ 6. Model      one call through edgequake-llm, bounded by a timeout
//!  └─ 7. Parse      JSON reply → flashcards, truncated to the requested count
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dynamo_flashcards::{generate, DynamoConfig, UploadBundle};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / ANTHROPIC_API_KEY
//!     let config = DynamoConfig::default();
//!     let bundle = UploadBundle::from_paths(&["biology.pdf", "terms.csv"])
//!         .await?
//!         .with_video_url("https://youtu.be/dQw4w9WgXcQ");
//!     let output = generate(bundle, Some(8), &config).await?;
//!     for card in &output.flashcards {
//!         println!("Q: {}\nA: {}\n", card.question(), card.answer());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum HTTP service ([`server`]) |
//! | `cli`    | on      | `dynamo` binary (clap + anyhow + tracing-subscriber + dotenvy) |
//!
//! Disable both when using only the library:
//! ```toml
//! dynamo-flashcards = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bundle;
pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use bundle::{UploadBundle, UploadItem};
pub use config::{DynamoConfig, DynamoConfigBuilder, DEFAULT_COUNT};
pub use error::{DynamoError, Stage};
pub use generate::{extract, generate, generate_sync, FlashcardService};
pub use output::{ExtractedSource, ExtractedText, Flashcard, GenerationOutput, GenerationStats};
pub use pipeline::dispatch::{SourceKind, VideoLink};
pub use pipeline::llm::{Completion, GenerationOptions, TextGenerator};
pub use pipeline::loaders::video::{Transcript, TranscriptSource};
