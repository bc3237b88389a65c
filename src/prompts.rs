//! Prompt templates for flashcard generation.
//!
//! Every piece of prompt text lives here so a wording change touches one
//! file and tests can inspect the templates without a model.
//!
//! Callers can replace the instructions via
//! [`crate::config::DynamoConfig::system_prompt`]; the reply-format block is
//! always appended because the parser depends on it, and it repeats the
//! count so an override without [`COUNT_PLACEHOLDER`] still states it.

/// Placeholder replaced with the requested number of flashcards.
pub const COUNT_PLACEHOLDER: &str = "{count}";

/// Default instruction template. Contains [`COUNT_PLACEHOLDER`].
pub const DEFAULT_INSTRUCTIONS: &str = r#"You are a study assistant that writes flashcards for students.

Read the material below and write at most {count} flashcards about it.

Guidelines:
- Each flashcard tests exactly one concept, term, fact or relationship from the material
- The question must be answerable without seeing the material
- The answer is short: one or two sentences, no lists
- Prefer the most important ideas; skip trivia, page furniture and boilerplate
- Do not repeat a concept across flashcards
- Use the language the material is written in"#;

/// Reply-format rules, also carrying [`COUNT_PLACEHOLDER`]. The parser in
/// [`crate::pipeline::parse`] expects this shape.
pub const REPLY_FORMAT: &str = r#"Reply format:
- Reply with a JSON array of at most {count} objects and nothing else: no commentary, no Markdown fences
- Each element is an object with exactly two string fields, "question" and "answer"
- Example: [{"question": "...", "answer": "..."}]"#;

/// Worked examples shown to the model when `include_examples` is enabled.
pub const EXAMPLES: &str = r#"Examples of good flashcards:
[
  {"question": "What is the function of mitochondria?", "answer": "They produce most of the cell's ATP through cellular respiration."},
  {"question": "What does a hash function map its input to?", "answer": "A fixed-size value, so equal inputs always give equal outputs."},
  {"question": "In which year did the Berlin Wall fall?", "answer": "1989."}
]"#;

/// Instruction for condensing a video transcript before flashcard generation.
pub const SUMMARIZE_INSTRUCTIONS: &str = r#"Summarise the following video transcript for a student.

Keep every definition, key term, date, figure and explanation that could be turned into a study question. Drop greetings, sponsor messages, filler and repetition. Write plain prose paragraphs without headings or bullet points.

Transcript:"#;

/// Fill the count placeholder in an instruction template.
pub fn render_instructions(template: &str, count: u32) -> String {
    template.replace(COUNT_PLACEHOLDER, &count.to_string())
}

/// Build the one-shot summarisation prompt for a transcript.
pub fn summarize_prompt(transcript: &str) -> String {
    format!("{SUMMARIZE_INSTRUCTIONS}\n\"\"\"\n{transcript}\n\"\"\"")
}
