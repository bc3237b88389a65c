//! Loader dispatch: map an uploaded item to exactly one [`SourceKind`].
//!
//! Two signals are consulted, in this order, and nothing else:
//!
//! 1. the name matches a known video-hosting URL shape → [`SourceKind::VideoLink`]
//! 2. the lowercase file extension is in [`EXTENSION_TABLE`]
//!
//! Anything else is [`DynamoError::UnsupportedFormat`].

use crate::bundle::UploadItem;
use crate::error::DynamoError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Every input format the pipeline can turn into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Pdf,
    WordDocument,
    SlideDeck,
    Spreadsheet,
    DelimitedText,
    VideoLink,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::Pdf => "PDF",
            SourceKind::WordDocument => "Word document",
            SourceKind::SlideDeck => "slide deck",
            SourceKind::Spreadsheet => "spreadsheet",
            SourceKind::DelimitedText => "delimited text",
            SourceKind::VideoLink => "video transcript",
        };
        f.write_str(s)
    }
}

/// Extension → kind. Lookups are case-insensitive; keys are stored lowercase.
pub const EXTENSION_TABLE: &[(&str, SourceKind)] = &[
    ("pdf", SourceKind::Pdf),
    ("docx", SourceKind::WordDocument),
    ("pptx", SourceKind::SlideDeck),
    ("xlsx", SourceKind::Spreadsheet),
    ("xls", SourceKind::Spreadsheet),
    ("ods", SourceKind::Spreadsheet),
    ("csv", SourceKind::DelimitedText),
    ("tsv", SourceKind::DelimitedText),
];

static RE_YOUTUBE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:(?:www\.|m\.)?youtube\.com/(?:watch\?(?:[^#\s]*&)?v=|shorts/|embed/|live/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#/][^\s]*)?$",
    )
    .unwrap()
});

/// A video link that passed URL-shape validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoLink {
    /// The URL exactly as supplied (trimmed).
    pub url: String,
    /// 11-character YouTube video id.
    pub video_id: String,
}

/// Parse `url` as a supported video link.
pub fn parse_video_link(url: &str) -> Option<VideoLink> {
    let url = url.trim();
    RE_YOUTUBE.captures(url).map(|caps| VideoLink {
        url: url.to_string(),
        video_id: caps[1].to_string(),
    })
}

/// Look up the kind registered for a file extension (without the dot).
pub fn kind_for_extension(ext: &str) -> Option<SourceKind> {
    let ext = ext.to_ascii_lowercase();
    EXTENSION_TABLE
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, kind)| *kind)
}

/// Resolve the kind for a name: video URL shape first, then extension.
pub fn kind_for_name(name: &str) -> Result<SourceKind, DynamoError> {
    if parse_video_link(name).is_some() {
        return Ok(SourceKind::VideoLink);
    }

    name.rsplit_once('.')
        .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty() && !ext.contains('/'))
        .and_then(|(_, ext)| kind_for_extension(ext))
        .ok_or_else(|| DynamoError::UnsupportedFormat {
            source_id: name.to_string(),
        })
}

/// Resolve the kind for an uploaded item, honouring a declared kind.
pub fn dispatch(item: &UploadItem) -> Result<SourceKind, DynamoError> {
    match item.declared_kind {
        Some(kind) => Ok(kind),
        None => kind_for_name(&item.name),
    }
}

/// Validate the bundle's video link.
pub fn dispatch_video(url: &str) -> Result<VideoLink, DynamoError> {
    parse_video_link(url).ok_or_else(|| DynamoError::UnsupportedFormat {
        source_id: url.to_string(),
    })
}
