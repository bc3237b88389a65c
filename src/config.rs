//! Configuration types for flashcard generation.
//!
//! All pipeline behaviour is controlled through [`DynamoConfig`], built via its
//! [`DynamoConfigBuilder`]. The config is built and validated once at
//! start-up, wrapped in an `Arc`, and shared read-only by every request;
//! nothing re-reads environment variables or files per request.

use crate::error::DynamoError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default number of flashcards when the caller does not ask for a count.
pub const DEFAULT_COUNT: u32 = 10;

/// Configuration for the flashcard pipeline.
///
/// Built via [`DynamoConfig::builder()`] or using [`DynamoConfig::default()`].
///
/// # Example
/// ```rust
/// use dynamo_flashcards::DynamoConfig;
///
/// let config = DynamoConfig::builder()
///     .default_count(5)
///     .model("gemini-2.0-flash")
///     .summarize_transcripts(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.default_count, 5);
/// ```
#[derive(Clone)]
pub struct DynamoConfig {
    /// Flashcards requested when the caller omits `count`. Default: 10.
    pub default_count: u32,

    /// LLM model identifier, e.g. "gemini-2.0-flash", "gpt-4.1-mini".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the model. Default: 0.3.
    pub temperature: f32,

    /// Upper bound on generated tokens per model call. Default: 4096.
    ///
    /// The per-request hint derived from the flashcard count never exceeds
    /// this value.
    pub max_tokens: usize,

    /// Per-model-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Timeout for fetching a video transcript, in seconds. Default: 30.
    pub transcript_timeout_secs: u64,

    /// Longest video accepted, in seconds. Default: 2000.
    pub max_video_seconds: u64,

    /// Preferred caption language code. Default: "en".
    pub transcript_language: String,

    /// Condense a video transcript with one model call before prompting. Default: true.
    pub summarize_transcripts: bool,

    /// Include the worked examples block in the prompt. Default: true.
    pub include_examples: bool,

    /// Custom instruction template. If None, uses the built-in default.
    ///
    /// May contain the `{count}` placeholder.
    pub system_prompt: Option<String>,

    /// Largest prompt sent to the model, in bytes. Default: 1,000,000.
    ///
    /// Requests whose assembled prompt exceeds it fail before the model call.
    pub max_prompt_bytes: usize,

    /// Number of uploaded items loaded concurrently within one request. Default: 4.
    pub load_concurrency: usize,

    /// Largest accepted request body for the HTTP service, in bytes. Default: 25 MiB.
    pub max_upload_bytes: usize,

    /// Shared secret expected in the `x-api-key` header. None disables the check.
    pub api_key: Option<String>,

    /// Directory containing the pdfium shared library. None binds the system library.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for DynamoConfig {
    fn default() -> Self {
        Self {
            default_count: DEFAULT_COUNT,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 4096,
            api_timeout_secs: 60,
            transcript_timeout_secs: 30,
            max_video_seconds: 2000,
            transcript_language: "en".to_string(),
            summarize_transcripts: true,
            include_examples: true,
            system_prompt: None,
            max_prompt_bytes: 1_000_000,
            load_concurrency: 4,
            max_upload_bytes: 25 * 1024 * 1024,
            api_key: None,
            pdfium_lib_path: None,
        }
    }
}

impl fmt::Debug for DynamoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamoConfig")
            .field("default_count", &self.default_count)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("transcript_timeout_secs", &self.transcript_timeout_secs)
            .field("max_video_seconds", &self.max_video_seconds)
            .field("transcript_language", &self.transcript_language)
            .field("summarize_transcripts", &self.summarize_transcripts)
            .field("include_examples", &self.include_examples)
            .field("max_prompt_bytes", &self.max_prompt_bytes)
            .field("load_concurrency", &self.load_concurrency)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl DynamoConfig {
    /// Create a new builder for `DynamoConfig`.
    pub fn builder() -> DynamoConfigBuilder {
        DynamoConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`DynamoConfig`].
#[derive(Debug)]
pub struct DynamoConfigBuilder {
    config: DynamoConfig,
}

impl DynamoConfigBuilder {
    pub fn default_count(mut self, n: u32) -> Self {
        self.config.default_count = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn transcript_timeout_secs(mut self, secs: u64) -> Self {
        self.config.transcript_timeout_secs = secs;
        self
    }

    pub fn max_video_seconds(mut self, secs: u64) -> Self {
        self.config.max_video_seconds = secs;
        self
    }

    pub fn transcript_language(mut self, lang: impl Into<String>) -> Self {
        self.config.transcript_language = lang.into();
        self
    }

    pub fn summarize_transcripts(mut self, v: bool) -> Self {
        self.config.summarize_transcripts = v;
        self
    }

    pub fn include_examples(mut self, v: bool) -> Self {
        self.config.include_examples = v;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_prompt_bytes(mut self, n: usize) -> Self {
        self.config.max_prompt_bytes = n;
        self
    }

    pub fn load_concurrency(mut self, n: usize) -> Self {
        self.config.load_concurrency = n.max(1);
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DynamoConfig, DynamoError> {
        let c = &self.config;
        if c.default_count == 0 {
            return Err(DynamoError::InvalidConfig(
                "Default flashcard count must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(DynamoError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 || c.transcript_timeout_secs == 0 {
            return Err(DynamoError::InvalidConfig(
                "Timeouts must be at least 1 second".into(),
            ));
        }
        if c.transcript_language.trim().is_empty() {
            return Err(DynamoError::InvalidConfig(
                "Transcript language must not be empty".into(),
            ));
        }
        if c.max_prompt_bytes == 0 {
            return Err(DynamoError::InvalidConfig(
                "max_prompt_bytes must be ≥ 1".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(DynamoError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if matches!(c.api_key.as_deref(), Some(k) if k.is_empty()) {
            return Err(DynamoError::InvalidConfig(
                "API key must not be empty when set".into(),
            ));
        }
        Ok(self.config)
    }
}
