//! Format loaders: bytes of one uploaded item → plain text.
//!
//! Every file loader is synchronous and CPU-bound, so [`load_file`] runs it
//! on tokio's blocking pool and normalises the result. The video loader is
//! async and lives behind [`video::TranscriptSource`].

mod ooxml;

pub mod delimited;
pub mod docx;
pub mod pdf;
pub mod pptx;
pub mod spreadsheet;
pub mod video;

use crate::error::DynamoError;
use crate::pipeline::dispatch::SourceKind;
use crate::pipeline::normalize::normalize_text;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Run the loader for `kind` over one file's bytes.
///
/// Returns normalised, non-empty text or [`DynamoError::UnreadableDocument`].
pub async fn load_file(
    name: String,
    bytes: Vec<u8>,
    kind: SourceKind,
    pdfium_lib_path: Option<PathBuf>,
) -> Result<String, DynamoError> {
    if bytes.is_empty() {
        return Err(ooxml::unreadable(&name, "file is empty"));
    }

    let size = bytes.len();
    let (name, raw) = tokio::task::spawn_blocking(move || {
        let raw = extract_blocking(&name, &bytes, kind, pdfium_lib_path.as_deref());
        (name, raw)
    })
    .await
    .map_err(|e| DynamoError::Internal(format!("loader task panicked: {e}")))?;

    let text = normalize_text(&raw?);
    if text.is_empty() {
        return Err(ooxml::unreadable(&name, "no extractable text"));
    }
    debug!("Loaded {} ({}, {} bytes → {} chars)", name, kind, size, text.len());
    Ok(text)
}

/// Synchronous extraction for one file kind.
pub fn extract_blocking(
    name: &str,
    bytes: &[u8],
    kind: SourceKind,
    pdfium_lib_path: Option<&Path>,
) -> Result<String, DynamoError> {
    match kind {
        SourceKind::Pdf => pdf::extract(name, bytes, pdfium_lib_path),
        SourceKind::WordDocument => docx::extract(name, bytes),
        SourceKind::SlideDeck => pptx::extract(name, bytes),
        SourceKind::Spreadsheet => spreadsheet::extract(name, bytes),
        SourceKind::DelimitedText => delimited::extract(name, bytes, delimited::delimiter_for(name)),
        SourceKind::VideoLink => Err(DynamoError::Internal(format!(
            "'{name}' is a video link and has no file loader"
        ))),
    }
}
