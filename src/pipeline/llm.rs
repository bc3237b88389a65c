//! Model interaction: send one prompt, return the raw reply.
//!
//! This module is intentionally thin. Prompt wording lives in
//! [`crate::prompts`], reply parsing in [`super::parse`]. There is no retry:
//! one call is one round trip, and provider failures are classified and
//! passed straight back to the caller.
//!
//! ## Error classification
//!
//! edgequake-llm reports typed errors, and the variant decides the kind:
//!
//! | `LlmError`                                   | Error                    |
//! |----------------------------------------------|--------------------------|
//! | `RateLimited`                                | `UpstreamRateLimited`    |
//! | `Timeout`                                    | `UpstreamTimeout`        |
//! | `InvalidRequest`, `TokenLimitExceeded`       | `UpstreamInvalidRequest` |
//! | `ApiError`, `ProviderError`, `Unknown`       | classified by text       |
//! | anything else                                | `UpstreamUnavailable`    |
//!
//! The text fallback only trusts status codes standing alone as words, so a
//! port (`:8400`) or request id (`4290af`) never decides the kind.

use crate::error::DynamoError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LlmError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Sampling options for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Raw model reply plus token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Anything that turns a prompt into a reply.
///
/// [`LlmGenerator`] is the production implementation; tests substitute
/// scripted generators.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<Completion, DynamoError>;
}

/// [`TextGenerator`] backed by an edgequake-llm provider.
pub struct LlmGenerator {
    provider: Arc<dyn LLMProvider>,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> Result<Completion, DynamoError> {
        let messages = vec![ChatMessage::user(prompt)];
        let options = build_options(options);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| {
                warn!("Model call failed: {}", e);
                classify_llm_error(&e)
            })?;

        Ok(Completion {
            text: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

/// Token budget hint for `count` flashcards, capped at `max_tokens`.
pub fn count_hint(count: u32, max_tokens: usize) -> usize {
    let wanted = 256usize.saturating_add((count as usize).saturating_mul(160));
    wanted.min(max_tokens).max(1)
}

static RE_RATE_LIMITED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b429\b|rate[ _-]?limit|too many requests|quota|resource[ _]exhausted").unwrap()
});
static RE_TIMED_OUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\btime[ _-]?out\b|\btimed out\b|deadline exceeded").unwrap());
static RE_INVALID_REQUEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:400|413)\b|invalid[ _]?request|context[ _]length|token limit|too long|payload too large",
    )
    .unwrap()
});

/// Map an edgequake-llm failure onto the upstream error kinds.
pub fn classify_llm_error(err: &LlmError) -> DynamoError {
    let message = err.to_string();
    match err {
        LlmError::RateLimited(_) => DynamoError::UpstreamRateLimited { message },
        LlmError::Timeout => DynamoError::UpstreamTimeout { secs: 0 },
        LlmError::InvalidRequest(_) | LlmError::TokenLimitExceeded { .. } => {
            DynamoError::UpstreamInvalidRequest { message }
        }
        LlmError::ApiError(_) | LlmError::ProviderError(_) | LlmError::Unknown(_) => {
            classify_upstream_error(&message)
        }
        _ => DynamoError::UpstreamUnavailable { message },
    }
}

/// Classify a free-form provider message by its text.
pub fn classify_upstream_error(message: &str) -> DynamoError {
    let message = message.to_string();
    if RE_RATE_LIMITED.is_match(&message) {
        DynamoError::UpstreamRateLimited { message }
    } else if RE_TIMED_OUT.is_match(&message) {
        DynamoError::UpstreamTimeout { secs: 0 }
    } else if RE_INVALID_REQUEST.is_match(&message) {
        DynamoError::UpstreamInvalidRequest { message }
    } else {
        DynamoError::UpstreamUnavailable { message }
    }
}

/// One model round trip bounded by `timeout_secs`.
pub async fn call_model(
    generator: &dyn TextGenerator,
    prompt: &str,
    options: GenerationOptions,
    timeout_secs: u64,
) -> Result<Completion, DynamoError> {
    let start = Instant::now();
    let result = tokio::time::timeout(Duration::from_secs(timeout_secs), generator.generate(prompt, options))
        .await
        .map_err(|_| DynamoError::UpstreamTimeout { secs: timeout_secs })?;

    let completion = result.map_err(|e| match e {
        DynamoError::UpstreamTimeout { .. } => DynamoError::UpstreamTimeout { secs: timeout_secs },
        other => other,
    })?;

    debug!(
        "Model call: {} input tokens, {} output tokens, {:?}",
        completion.input_tokens,
        completion.output_tokens,
        start.elapsed()
    );
    Ok(completion)
}

fn build_options(options: GenerationOptions) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(options.temperature),
        max_tokens: Some(options.max_tokens),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_copies_values() {
        let opts = build_options(GenerationOptions {
            temperature: 0.3,
            max_tokens: 1056,
        });
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, Some(1056));
    }

    #[test]
    fn count_hint_scales_and_caps() {
        assert_eq!(count_hint(1, 4096), 416);
        assert_eq!(count_hint(5, 4096), 1056);
        assert_eq!(count_hint(100, 4096), 4096);
        assert_eq!(count_hint(u32::MAX, 8192), 8192);
    }

    fn kind(e: DynamoError) -> &'static str {
        e.kind()
    }

    #[test]
    fn typed_errors_classified_by_variant() {
        let cases = [
            (LlmError::RateLimited("slow down".into()), "upstream_rate_limited"),
            (LlmError::Timeout, "upstream_timeout"),
            (LlmError::InvalidRequest("bad field".into()), "upstream_invalid_request"),
            (LlmError::TokenLimitExceeded { max: 8192, got: 9000 }, "upstream_invalid_request"),
            (LlmError::NetworkError("Connection failed: refused".into()), "upstream_unavailable"),
            (LlmError::AuthError("invalid key".into()), "upstream_unavailable"),
            (LlmError::ModelNotFound("gpt-x".into()), "upstream_unavailable"),
        ];
        for (err, expected) in cases {
            let shown = err.to_string();
            assert_eq!(kind(classify_llm_error(&err)), expected, "{shown}");
        }
    }

    #[test]
    fn network_error_mentioning_port_is_unavailable() {
        let err = LlmError::NetworkError("error sending request for url (http://10.0.0.4:8400/v1): connection refused".into());
        assert_eq!(kind(classify_llm_error(&err)), "upstream_unavailable");
    }

    #[test]
    fn api_error_text_fallback() {
        let cases = [
            ("HTTP 429 Too Many Requests", "upstream_rate_limited"),
            ("Resource has been exhausted (e.g. check quota)", "upstream_rate_limited"),
            ("upstream request timed out", "upstream_timeout"),
            ("400 Bad Request: prompt exceeds context length", "upstream_invalid_request"),
            ("status 413: payload too large", "upstream_invalid_request"),
            ("upstream 503 Service Unavailable (request id 4290af)", "upstream_unavailable"),
            ("Model returned 4000 tokens then the connection reset", "upstream_unavailable"),
            ("listener on :8400 went away", "upstream_unavailable"),
        ];
        for (text, expected) in cases {
            assert_eq!(kind(classify_llm_error(&LlmError::ApiError(text.into()))), expected, "{text}");
        }
    }

    #[test]
    fn unavailable_keeps_message() {
        match classify_upstream_error("connection refused") {
            DynamoError::UpstreamUnavailable { message } => assert_eq!(message, "connection refused"),
            other => panic!("unexpected {other:?}"),
        }
    }

    struct Slow;

    #[async_trait]
    impl TextGenerator for Slow {
        async fn generate(&self, _prompt: &str, _o: GenerationOptions) -> Result<Completion, DynamoError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Completion::default())
        }
    }

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        async fn generate(&self, prompt: &str, o: GenerationOptions) -> Result<Completion, DynamoError> {
            Ok(Completion {
                text: format!("{prompt}|{}", o.max_tokens),
                input_tokens: 3,
                output_tokens: 4,
            })
        }
    }

    const OPTS: GenerationOptions = GenerationOptions {
        temperature: 0.0,
        max_tokens: 10,
    };

    #[tokio::test(start_paused = true)]
    async fn timeout_becomes_upstream_timeout() {
        let err = call_model(&Slow, "p", OPTS, 5).await.unwrap_err();
        assert!(matches!(err, DynamoError::UpstreamTimeout { secs: 5 }));
    }

    #[tokio::test]
    async fn reply_passed_through() {
        let c = call_model(&Echo, "hello", OPTS, 5).await.unwrap();
        assert_eq!(c.text, "hello|10");
        assert_eq!((c.input_tokens, c.output_tokens), (3, 4));
    }
}
