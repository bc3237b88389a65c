//! Prompt assembly: extracted text + templates → one prompt string.
//!
//! Composition is a pure function of its inputs. Section order is fixed:
//!
//! 1. instructions (count substituted)
//! 2. reply-format rules (count substituted, so it is stated even when an
//!    instruction override has no placeholder)
//! 3. worked examples, when enabled
//! 4. `## Video transcript`, when a video was supplied
//! 5. one `## Document: <name>` section per file, in upload order

use crate::error::DynamoError;
use crate::output::ExtractedText;
use crate::prompts::{render_instructions, DEFAULT_INSTRUCTIONS, EXAMPLES, REPLY_FORMAT};

/// A fully assembled prompt and the flashcard count it asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    text: String,
    count: u32,
}

impl Prompt {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Compose the prompt for `count` flashcards over `extracted`.
///
/// `template` overrides [`DEFAULT_INSTRUCTIONS`].
pub fn assemble(
    extracted: &ExtractedText,
    count: u32,
    template: Option<&str>,
    include_examples: bool,
) -> Result<Prompt, DynamoError> {
    if count == 0 {
        return Err(DynamoError::InvalidCount { count: 0 });
    }
    if extracted.is_empty() {
        return Err(DynamoError::EmptyInput);
    }

    let mut sections: Vec<String> = vec![
        render_instructions(template.unwrap_or(DEFAULT_INSTRUCTIONS), count)
            .trim()
            .to_string(),
        render_instructions(REPLY_FORMAT, count),
    ];
    if include_examples {
        sections.push(EXAMPLES.to_string());
    }

    if let Some(video) = extracted.video() {
        sections.push(format!("## Video transcript\n\n{}", video.text));
    }
    for doc in extracted.documents() {
        sections.push(format!("## Document: {}\n\n{}", doc.id, doc.text));
    }

    let mut text = sections.join("\n\n");
    text.push('\n');
    Ok(Prompt { text, count })
}
