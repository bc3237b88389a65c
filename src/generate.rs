//! Top-level entry points: run the whole pipeline for one request.
//!
//! [`FlashcardService`] owns everything shared between requests (config,
//! model client, transcript client) behind `Arc`s and is itself cheap to
//! share. The free functions [`generate`], [`generate_sync`] and [`extract`]
//! build a one-off service for library callers that do not keep one around.

use crate::bundle::{UploadBundle, UploadItem};
use crate::config::DynamoConfig;
use crate::error::DynamoError;
use crate::output::{ExtractedText, GenerationOutput, GenerationStats};
use crate::pipeline::dispatch::{self, SourceKind, VideoLink};
use crate::pipeline::llm::{self, GenerationOptions, LlmGenerator, TextGenerator};
use crate::pipeline::loaders::{self, video::{self, TranscriptSource, YoutubeTranscripts}};
use crate::pipeline::{parse, prompt};
use crate::prompts;
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// The flashcard pipeline with its long-lived dependencies.
#[derive(Clone)]
pub struct FlashcardService {
    config: Arc<DynamoConfig>,
    generator: Arc<dyn TextGenerator>,
    transcripts: Arc<dyn TranscriptSource>,
}

impl FlashcardService {
    /// Resolve the model provider and build the transcript client.
    ///
    /// Fails with [`DynamoError::ProviderNotConfigured`] when no provider can
    /// be found, so a misconfigured service fails at start-up rather than on
    /// the first request.
    pub fn new(config: DynamoConfig) -> Result<Self, DynamoError> {
        let provider = resolve_provider(&config)?;
        info!(
            "Model provider resolved (provider: {}, model: {})",
            config.provider_name.as_deref().unwrap_or("auto"),
            config.model.as_deref().unwrap_or("default")
        );
        let transcripts = YoutubeTranscripts::new(&config)?;
        Ok(Self::with_parts(
            config,
            Arc::new(LlmGenerator::new(provider)),
            Arc::new(transcripts),
        ))
    }

    /// Assemble a service from explicit parts.
    pub fn with_parts(
        config: DynamoConfig,
        generator: Arc<dyn TextGenerator>,
        transcripts: Arc<dyn TranscriptSource>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            generator,
            transcripts,
        }
    }

    pub fn config(&self) -> &DynamoConfig {
        &self.config
    }

    /// Dispatch and load every source without calling the model.
    pub async fn extract(&self, bundle: UploadBundle) -> Result<ExtractedText, DynamoError> {
        if bundle.is_empty() {
            return Err(DynamoError::EmptyInput);
        }
        let (video, files) = dispatch_bundle(bundle)?;
        self.load(video, files).await
    }

    /// Generate flashcards for one request.
    ///
    /// `count` defaults to [`DynamoConfig::default_count`]. Input is validated
    /// and dispatched before any network call; the result never holds more
    /// than `count` flashcards.
    pub async fn generate(
        &self,
        bundle: UploadBundle,
        count: Option<u32>,
    ) -> Result<GenerationOutput, DynamoError> {
        let total_start = Instant::now();
        let config = &*self.config;

        // ── Step 1: Validate ─────────────────────────────────────────────────
        let count = count.unwrap_or(config.default_count);
        if count == 0 {
            return Err(DynamoError::InvalidCount { count: 0 });
        }
        if bundle.is_empty() {
            return Err(DynamoError::EmptyInput);
        }
        info!(
            "Generating up to {} flashcards from {} file(s){}",
            count,
            bundle.items.len(),
            if bundle.video_url.is_some() { " and a video" } else { "" }
        );

        // ── Step 2: Dispatch ─────────────────────────────────────────────────
        let (video, files) = dispatch_bundle(bundle)?;

        // ── Step 3: Load ─────────────────────────────────────────────────────
        let load_start = Instant::now();
        let mut extracted = self.load(video, files).await?;
        let load_duration_ms = load_start.elapsed().as_millis() as u64;
        info!(
            "Extracted {} chars from {} source(s) in {}ms",
            extracted.total_chars(),
            extracted.len(),
            load_duration_ms
        );

        // ── Step 4: Summarise transcript ─────────────────────────────────────
        let llm_start = Instant::now();
        let mut usage = TokenUsage::default();
        if config.summarize_transcripts {
            if let Some(summary) = self.summarize_video(&extracted, &mut usage).await? {
                extracted = summary;
            }
        }

        // ── Step 5: Assemble prompt ──────────────────────────────────────────
        let prompt = prompt::assemble(
            &extracted,
            count,
            config.system_prompt.as_deref(),
            config.include_examples,
        )?;
        debug!("Prompt assembled: {} bytes", prompt.len());
        if prompt.len() > config.max_prompt_bytes {
            return Err(DynamoError::PromptTooLarge {
                bytes: prompt.len(),
                max_bytes: config.max_prompt_bytes,
            });
        }

        // ── Step 6: Call model ───────────────────────────────────────────────
        let options = GenerationOptions {
            temperature: config.temperature,
            max_tokens: llm::count_hint(count, config.max_tokens),
        };
        let completion =
            llm::call_model(self.generator.as_ref(), prompt.as_str(), options, config.api_timeout_secs).await?;
        usage.add(completion.input_tokens, completion.output_tokens);
        let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

        // ── Step 7: Parse reply ──────────────────────────────────────────────
        let mut flashcards = parse::parse_reply(&completion.text)?;
        if flashcards.len() > count as usize {
            debug!("Model returned {} flashcards, keeping {}", flashcards.len(), count);
            flashcards.truncate(count as usize);
        }

        // ── Step 8: Stats ────────────────────────────────────────────────────
        let stats = GenerationStats {
            sources: extracted.len(),
            extracted_chars: extracted.total_chars(),
            prompt_bytes: prompt.len(),
            requested: count,
            returned: flashcards.len(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            load_duration_ms,
            llm_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Generation complete: {}/{} flashcards, {}ms total",
            stats.returned, count, stats.total_duration_ms
        );

        Ok(GenerationOutput { flashcards, stats })
    }

    /// Load the video (first) and every file (upload order, bounded concurrency).
    async fn load(
        &self,
        video: Option<VideoLink>,
        files: Vec<(UploadItem, SourceKind)>,
    ) -> Result<ExtractedText, DynamoError> {
        let config = &*self.config;
        let mut extracted = ExtractedText::new();

        if let Some(link) = video {
            let transcript = video::load_video(self.transcripts.as_ref(), &link, config).await?;
            extracted.insert(link.url, SourceKind::VideoLink, transcript.text);
        }

        let pdfium = config.pdfium_lib_path.clone();
        let texts: Vec<(String, SourceKind, String)> = stream::iter(files)
            .map(|(item, kind)| {
                let pdfium = pdfium.clone();
                async move {
                    let name = item.name;
                    let text = loaders::load_file(name.clone(), item.bytes, kind, pdfium).await?;
                    Ok::<_, DynamoError>((name, kind, text))
                }
            })
            .buffered(config.load_concurrency.max(1))
            .try_collect()
            .await?;

        for (name, kind, text) in texts {
            extracted.insert(name, kind, text);
        }
        Ok(extracted)
    }

    /// Condense the video transcript with one model call.
    ///
    /// Returns `None` when there is no video; otherwise a copy of `extracted`
    /// with the transcript replaced by its summary.
    async fn summarize_video(
        &self,
        extracted: &ExtractedText,
        usage: &mut TokenUsage,
    ) -> Result<Option<ExtractedText>, DynamoError> {
        let Some(video) = extracted.video() else {
            return Ok(None);
        };
        let config = &*self.config;
        info!("Summarising transcript of {} ({} chars)", video.id, video.text.len());

        let options = GenerationOptions {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };
        let completion = llm::call_model(
            self.generator.as_ref(),
            &prompts::summarize_prompt(&video.text),
            options,
            config.api_timeout_secs,
        )
        .await?;
        usage.add(completion.input_tokens, completion.output_tokens);

        let summary = completion.text.trim();
        if summary.is_empty() {
            debug!("Empty summary; keeping the full transcript");
            return Ok(None);
        }

        let mut out = ExtractedText::new();
        for source in extracted.iter() {
            let text = if source.kind == SourceKind::VideoLink { summary } else { source.text.as_str() };
            out.insert(source.id.clone(), source.kind, text);
        }
        Ok(Some(out))
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct TokenUsage {
    input_tokens: u64,
    output_tokens: u64,
}

impl TokenUsage {
    fn add(&mut self, input: u64, output: u64) {
        self.input_tokens += input;
        self.output_tokens += output;
    }
}

/// Validate the video link and map every file to its kind.
///
/// Runs before any loader so an unsupported item fails the request without
/// network I/O. An uploaded item whose name is a video URL becomes the
/// request's video link; a request carries at most one.
fn dispatch_bundle(
    bundle: UploadBundle,
) -> Result<(Option<VideoLink>, Vec<(UploadItem, SourceKind)>), DynamoError> {
    let mut video = bundle.video_url.as_deref().map(dispatch::dispatch_video).transpose()?;

    let mut files = Vec::with_capacity(bundle.items.len());
    for item in bundle.items {
        let kind = dispatch::dispatch(&item)?;
        if kind != SourceKind::VideoLink {
            files.push((item, kind));
            continue;
        }
        if video.is_some() {
            return Err(DynamoError::InvalidRequest(format!(
                "'{}': only one video link per request is supported",
                item.name
            )));
        }
        video = Some(dispatch::dispatch_video(&item.name)?);
    }
    Ok((video, files))
}

// ── Free functions ───────────────────────────────────────────────────────────

/// Generate flashcards with a one-off service built from `config`.
///
/// # Example
/// ```rust,no_run
/// use dynamo_flashcards::{generate, DynamoConfig, UploadBundle};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let bundle = UploadBundle::from_paths(&["lecture.pdf"]).await?;
///     let output = generate(bundle, Some(5), &DynamoConfig::default()).await?;
///     for card in &output.flashcards {
///         println!("Q: {}\nA: {}\n", card.question(), card.answer());
///     }
///     Ok(())
/// }
/// ```
pub async fn generate(
    bundle: UploadBundle,
    count: Option<u32>,
    config: &DynamoConfig,
) -> Result<GenerationOutput, DynamoError> {
    if bundle.is_empty() {
        return Err(DynamoError::EmptyInput);
    }
    FlashcardService::new(config.clone())?.generate(bundle, count).await
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    bundle: UploadBundle,
    count: Option<u32>,
    config: &DynamoConfig,
) -> Result<GenerationOutput, DynamoError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DynamoError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(bundle, count, config))
}

/// Extract text from every source without calling the model.
///
/// Does not require an LLM provider or API key.
pub async fn extract(bundle: UploadBundle, config: &DynamoConfig) -> Result<ExtractedText, DynamoError> {
    let service = FlashcardService::with_parts(
        config.clone(),
        Arc::new(NoModel),
        Arc::new(YoutubeTranscripts::new(config)?),
    );
    service.extract(bundle).await
}

struct NoModel;

#[async_trait::async_trait]
impl TextGenerator for NoModel {
    async fn generate(&self, _prompt: &str, _options: GenerationOptions) -> Result<llm::Completion, DynamoError> {
        Err(DynamoError::Internal("text extraction does not call the model".into()))
    }
}

// ── Provider resolution ──────────────────────────────────────────────────────

/// Default model for a named provider when none is configured.
pub fn default_model_for(provider: &str) -> &'static str {
    match provider.to_ascii_lowercase().as_str() {
        "gemini" | "google" | "vertexai" => "gemini-2.0-flash",
        "anthropic" | "claude" => "claude-3-5-haiku-latest",
        "ollama" => "llama3.2",
        _ => "gpt-4.1-mini",
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, DynamoError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DynamoError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the model provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the provider's API key from the environment.
/// 3. **Environment pair** (`DYNAMO_LLM_PROVIDER` + `DYNAMO_MODEL`), when
///    both are set.
/// 4. **Gemini** when `GEMINI_API_KEY` or `GOOGLE_API_KEY` is present.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &DynamoConfig) -> Result<Arc<dyn LLMProvider>, DynamoError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or_else(|| default_model_for(name));
        return create_provider(name, model);
    }

    if let (Some(prov), Some(model)) = (env_non_empty("DYNAMO_LLM_PROVIDER"), env_non_empty("DYNAMO_MODEL")) {
        return create_provider(&prov, &model);
    }

    if env_non_empty("GEMINI_API_KEY").is_some() || env_non_empty("GOOGLE_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or_else(|| default_model_for("gemini"));
        return create_provider("gemini", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DynamoError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_models() {
        assert_eq!(default_model_for("Gemini"), "gemini-2.0-flash");
        assert_eq!(default_model_for("openai"), "gpt-4.1-mini");
        assert_eq!(default_model_for("ollama"), "llama3.2");
    }

    #[test]
    fn dispatch_rejects_before_loading() {
        let bundle = UploadBundle::new()
            .with_file("a.csv", b"x\n1".to_vec())
            .with_file("b.txt", b"hello".to_vec());
        let err = dispatch_bundle(bundle).unwrap_err();
        assert!(matches!(err, DynamoError::UnsupportedFormat { source_id } if source_id == "b.txt"));
    }

    #[test]
    fn dispatch_validates_video() {
        let bundle = UploadBundle::new().with_video_url("https://vimeo.com/1");
        assert!(matches!(
            dispatch_bundle(bundle),
            Err(DynamoError::UnsupportedFormat { .. })
        ));

        let bundle = UploadBundle::new()
            .with_video_url("https://youtu.be/dQw4w9WgXcQ")
            .with_item(UploadItem::new("deck.pptx", b"x".to_vec()));
        let (video, files) = dispatch_bundle(bundle).unwrap();
        assert_eq!(video.unwrap().video_id, "dQw4w9WgXcQ");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1, SourceKind::SlideDeck);
    }

    #[test]
    fn video_url_as_file_name_becomes_the_video() {
        let bundle = UploadBundle::new()
            .with_file("https://youtu.be/dQw4w9WgXcQ", Vec::new())
            .with_file("a.csv", b"x\n1".to_vec());
        let (video, files) = dispatch_bundle(bundle).unwrap();
        assert_eq!(video.unwrap().url, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn second_video_rejected() {
        let bundle = UploadBundle::new()
            .with_video_url("https://youtu.be/dQw4w9WgXcQ")
            .with_file("https://www.youtube.com/watch?v=aaaaaaaaaaa", Vec::new());
        assert!(matches!(
            dispatch_bundle(bundle),
            Err(DynamoError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn extract_without_model() {
        let bundle = UploadBundle::new().with_file("t.csv", b"term,meaning\nATP,energy\n".to_vec());
        let text = extract(bundle, &DynamoConfig::default()).await.unwrap();
        assert_eq!(text.get("t.csv"), Some("term: ATP\nmeaning: energy"));
    }

    #[tokio::test]
    async fn extract_empty_bundle() {
        let err = extract(UploadBundle::new(), &DynamoConfig::default()).await.unwrap_err();
        assert!(matches!(err, DynamoError::EmptyInput));
    }
}
