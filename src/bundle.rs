//! Per-request input: uploaded items and an optional video link.

use crate::error::DynamoError;
use crate::pipeline::dispatch::SourceKind;
use std::path::Path;

/// One uploaded content item.
#[derive(Debug, Clone)]
pub struct UploadItem {
    /// Original filename (or URL) as supplied by the caller. Used as the
    /// source identifier and as the dispatch key.
    pub name: String,
    /// Raw bytes of the upload.
    pub bytes: Vec<u8>,
    /// Kind declared by the caller. `None` means "infer from `name`".
    pub declared_kind: Option<SourceKind>,
}

impl UploadItem {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            declared_kind: None,
        }
    }

    /// Attach an explicit kind, bypassing extension inference.
    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.declared_kind = Some(kind);
        self
    }
}

/// All content supplied with a single request.
///
/// Items keep upload order; that order is reflected in the prompt.
#[derive(Debug, Clone, Default)]
pub struct UploadBundle {
    pub items: Vec<UploadItem>,
    pub video_url: Option<String>,
}

impl UploadBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, item: UploadItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_file(self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.with_item(UploadItem::new(name, bytes))
    }

    /// Set the video link. Blank strings are treated as "no link".
    pub fn with_video_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        let trimmed = url.trim();
        self.video_url = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// True when there is nothing to generate flashcards from.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.video_url.is_none()
    }

    /// Build a bundle from local files, keeping the given order.
    ///
    /// The file name (not the full path) becomes the source identifier.
    pub async fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self, DynamoError> {
        let mut bundle = Self::new();
        for path in paths {
            let path = path.as_ref();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| DynamoError::UnreadableDocument {
                    source_id: path.display().to_string(),
                    detail: e.to_string(),
                })?;
            bundle.items.push(UploadItem::new(name, bytes));
        }
        Ok(bundle)
    }
}
