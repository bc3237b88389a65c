//! Error types for the dynamo-flashcards library.
//!
//! Every failure is terminal for the request that hit it: nothing is retried
//! locally and no partial flashcard list is ever returned. [`DynamoError`]
//! carries enough detail for a caller to tell *which stage* failed:
//!
//! * [`Stage::Input`]   : the caller sent something we cannot use
//!   (unsupported format, unreadable document, missing transcript, nothing
//!   at all).
//! * [`Stage::Upstream`]: the model provider or transcript service failed.
//! * [`Stage::Output`]  : the model answered, but not in the agreed format.
//! * [`Stage::Internal`]: misconfiguration or a bug on our side.

use serde::Serialize;
use thiserror::Error;

/// All errors returned by the dynamo-flashcards library.
#[derive(Debug, Error)]
pub enum DynamoError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No loader is registered for the item's extension or URL shape.
    #[error("Unsupported format for '{source_id}'\nSupported: .pdf .docx .pptx .xlsx .xls .ods .csv .tsv and YouTube links.")]
    UnsupportedFormat { source_id: String },

    /// The document was recognised but could not be parsed, or held no text.
    #[error("Could not read '{source_id}': {detail}")]
    UnreadableDocument { source_id: String, detail: String },

    /// The video exists but has no transcript or captions we can fetch.
    #[error("No transcript available for '{url}': {reason}")]
    TranscriptUnavailable { url: String, reason: String },

    /// The video is longer than the configured maximum.
    #[error("Video '{url}' is {secs} seconds long; please provide a video shorter than {max_secs} seconds")]
    VideoTooLong { url: String, secs: u64, max_secs: u64 },

    /// Neither files nor a video link were supplied.
    #[error("Nothing to generate flashcards from: supply at least one file or a video link")]
    EmptyInput,

    /// Requested flashcard count is below 1.
    #[error("Flashcard count must be at least 1, got {count}")]
    InvalidCount { count: i64 },

    /// The assembled prompt is larger than the configured budget.
    #[error("Extracted material is too large: the prompt would be {bytes} bytes, the limit is {max_bytes}. Upload fewer or shorter documents.")]
    PromptTooLarge { bytes: usize, max_bytes: usize },

    /// The request itself was malformed (bad multipart body, unparsable field …).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ── Upstream errors ───────────────────────────────────────────────────
    /// Transcript retrieval exceeded the configured timeout.
    #[error("Transcript fetch timed out after {secs}s for '{url}'")]
    TranscriptFetchTimeout { url: String, secs: u64 },

    /// The model provider failed (network, 5xx, unexpected API error).
    #[error("Model provider unavailable: {message}")]
    UpstreamUnavailable { message: String },

    /// The model provider returned HTTP 429.
    #[error("Model provider rate limit exceeded: {message}")]
    UpstreamRateLimited { message: String },

    /// The model provider rejected the request (e.g. prompt too large).
    #[error("Model provider rejected the request: {message}")]
    UpstreamInvalidRequest { message: String },

    /// The model call did not complete within the configured timeout.
    #[error("Model call timed out after {secs}s")]
    UpstreamTimeout { secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The model reply did not contain a single well-formed flashcard.
    #[error("Model reply is not a flashcard list: {detail}")]
    MalformedResponse { detail: String },

    // ── Internal errors ───────────────────────────────────────────────────
    /// The configured provider could not be initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// pdfium could not be loaded, so PDFs cannot be read at all.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH to the directory containing libpdfium, or install it system-wide."
    )]
    PdfEngineUnavailable(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Input,
    Upstream,
    Output,
    Internal,
}

impl DynamoError {
    /// Which pipeline stage produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            DynamoError::UnsupportedFormat { .. }
            | DynamoError::UnreadableDocument { .. }
            | DynamoError::TranscriptUnavailable { .. }
            | DynamoError::VideoTooLong { .. }
            | DynamoError::EmptyInput
            | DynamoError::InvalidCount { .. }
            | DynamoError::PromptTooLarge { .. }
            | DynamoError::InvalidRequest(_) => Stage::Input,
            DynamoError::TranscriptFetchTimeout { .. }
            | DynamoError::UpstreamUnavailable { .. }
            | DynamoError::UpstreamRateLimited { .. }
            | DynamoError::UpstreamInvalidRequest { .. }
            | DynamoError::UpstreamTimeout { .. } => Stage::Upstream,
            DynamoError::MalformedResponse { .. } => Stage::Output,
            DynamoError::ProviderNotConfigured { .. }
            | DynamoError::PdfEngineUnavailable(_)
            | DynamoError::InvalidConfig(_)
            | DynamoError::Internal(_) => Stage::Internal,
        }
    }

    /// Stable snake_case identifier, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DynamoError::UnsupportedFormat { .. } => "unsupported_format",
            DynamoError::UnreadableDocument { .. } => "unreadable_document",
            DynamoError::TranscriptUnavailable { .. } => "transcript_unavailable",
            DynamoError::VideoTooLong { .. } => "video_too_long",
            DynamoError::EmptyInput => "empty_input",
            DynamoError::InvalidCount { .. } => "invalid_count",
            DynamoError::PromptTooLarge { .. } => "prompt_too_large",
            DynamoError::InvalidRequest(_) => "invalid_request",
            DynamoError::TranscriptFetchTimeout { .. } => "transcript_fetch_timeout",
            DynamoError::UpstreamUnavailable { .. } => "upstream_unavailable",
            DynamoError::UpstreamRateLimited { .. } => "upstream_rate_limited",
            DynamoError::UpstreamInvalidRequest { .. } => "upstream_invalid_request",
            DynamoError::UpstreamTimeout { .. } => "upstream_timeout",
            DynamoError::MalformedResponse { .. } => "malformed_response",
            DynamoError::ProviderNotConfigured { .. } => "provider_not_configured",
            DynamoError::PdfEngineUnavailable(_) => "pdf_engine_unavailable",
            DynamoError::InvalidConfig(_) => "invalid_config",
            DynamoError::Internal(_) => "internal",
        }
    }
}
