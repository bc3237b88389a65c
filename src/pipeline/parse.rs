//! Reply parsing: raw model text → flashcards.
//!
//! The reply is expected to be a JSON array of `{"question", "answer"}`
//! objects (see [`crate::prompts::REPLY_FORMAT`]). Models wrap it in prose or
//! a Markdown fence often enough that the parser tolerates both:
//!
//! 1. strip one outer ```` ``` ```` fence, if present
//! 2. try each `[` in turn and parse the first complete JSON array that
//!    holds at least one question/answer pair; brackets in the prose around
//!    it (`[1]`, `[as requested]`) are skipped over
//! 3. keep every element with non-blank question and answer strings
//!
//! `concept`/`definition` and `front`/`back` are accepted as field aliases.
//! Elements that do not fit are skipped with a warning; the reply is
//! rejected only when nothing usable remains.

use crate::error::DynamoError;
use crate::output::Flashcard;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\n(.*?)\n?```\s*$").unwrap());

const QUESTION_KEYS: &[&str] = &["question", "concept", "front"];
const ANSWER_KEYS: &[&str] = &["answer", "definition", "back"];

/// Parse a model reply into flashcards, preserving reply order.
pub fn parse_reply(reply: &str) -> Result<Vec<Flashcard>, DynamoError> {
    let body = strip_outer_fence(reply);

    let mut first_array: Option<Vec<Value>> = None;
    let mut first_error: Option<serde_json::Error> = None;

    for (start, _) in body.match_indices('[') {
        // Parse only the first JSON value; prose may continue after it.
        match serde_json::Deserializer::from_str(&body[start..])
            .into_iter::<Vec<Value>>()
            .next()
        {
            Some(Ok(items)) => {
                let cards = to_flashcards(&items);
                if !cards.is_empty() {
                    return Ok(cards);
                }
                first_array.get_or_insert(items);
            }
            Some(Err(e)) => {
                first_error.get_or_insert(e);
            }
            None => {}
        }
    }

    match (first_array, first_error) {
        (Some(items), _) => Err(DynamoError::MalformedResponse {
            detail: format!(
                "none of the {} reply entries is a question/answer pair",
                items.len()
            ),
        }),
        (None, Some(e)) => Err(DynamoError::MalformedResponse {
            detail: format!("reply array is not valid JSON ({e}): {}", preview(reply)),
        }),
        (None, None) => Err(DynamoError::MalformedResponse {
            detail: format!("no JSON array in reply: {}", preview(reply)),
        }),
    }
}

/// Every usable flashcard in `items`, in order; the rest are logged.
fn to_flashcards(items: &[Value]) -> Vec<Flashcard> {
    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let card = to_flashcard(item);
            if card.is_none() {
                warn!("Malformed flashcard #{} skipped: {}", idx + 1, preview(&item.to_string()));
            }
            card
        })
        .collect()
}

fn strip_outer_fence(reply: &str) -> &str {
    match RE_OUTER_FENCE.captures(reply).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => reply,
    }
}

fn field<'a>(obj: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn to_flashcard(item: &Value) -> Option<Flashcard> {
    let obj = item.as_object()?;
    let question = field(obj, QUESTION_KEYS)?;
    let answer = field(obj, ANSWER_KEYS)?;
    Some(Flashcard::new(question.to_string(), answer.to_string()))
}

fn preview(s: &str) -> String {
    const MAX: usize = 120;
    let trimmed = s.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
