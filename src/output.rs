//! Output types: flashcards, extracted text and run statistics.

use crate::pipeline::dispatch::SourceKind;
use serde::{Deserialize, Serialize};

/// A single question/answer flashcard.
///
/// Produced only by [`crate::pipeline::parse::parse_reply`]; fields are
/// private so a card cannot be altered after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    question: String,
    answer: String,
}

impl Flashcard {
    pub(crate) fn new(question: String, answer: String) -> Self {
        Self { question, answer }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }
}

/// Text extracted from one source.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedSource {
    /// Filename or video URL the text came from.
    pub id: String,
    pub kind: SourceKind,
    /// Never empty.
    pub text: String,
}

/// Insertion-ordered mapping from source identifier to extracted text.
///
/// Every entry holds non-empty text: loaders that produce nothing fail
/// instead of contributing an empty entry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractedText {
    sources: Vec<ExtractedSource>,
}

impl ExtractedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source. Returns `false` (and stores nothing) when `text` is blank.
    pub fn insert(&mut self, id: impl Into<String>, kind: SourceKind, text: impl Into<String>) -> bool {
        let text = text.into();
        if text.trim().is_empty() {
            return false;
        }
        self.sources.push(ExtractedSource {
            id: id.into(),
            kind,
            text,
        });
        true
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.sources
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.text.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractedSource> {
        self.sources.iter()
    }

    /// The video transcript entry, if any.
    pub fn video(&self) -> Option<&ExtractedSource> {
        self.sources.iter().find(|s| s.kind == SourceKind::VideoLink)
    }

    /// File entries in upload order.
    pub fn documents(&self) -> impl Iterator<Item = &ExtractedSource> {
        self.sources.iter().filter(|s| s.kind != SourceKind::VideoLink)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn total_chars(&self) -> usize {
        self.sources.iter().map(|s| s.text.chars().count()).sum()
    }
}

/// Statistics for one generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Number of sources (files + video) that produced text.
    pub sources: usize,
    /// Characters of extracted text fed into the prompt.
    pub extracted_chars: usize,
    /// Size of the final prompt in bytes.
    pub prompt_bytes: usize,
    /// Flashcards requested by the caller.
    pub requested: u32,
    /// Flashcards returned.
    pub returned: usize,
    /// Input tokens reported by the provider, summed over all model calls.
    pub input_tokens: u64,
    /// Output tokens reported by the provider, summed over all model calls.
    pub output_tokens: u64,
    pub load_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of a successful generation: flashcards in model order plus stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub flashcards: Vec<Flashcard>,
    pub stats: GenerationStats,
}
