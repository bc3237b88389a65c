//! CLI binary for dynamo-flashcards.
//!
//! A thin shim over the library crate that maps CLI flags to `DynamoConfig`
//! and either runs the HTTP service or a one-shot generation.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dynamo_flashcards::{extract, server, DynamoConfig, DynamoConfigBuilder, FlashcardService, UploadBundle};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service
  dynamo serve --bind 0.0.0.0:8080

  # Ten flashcards from a PDF
  dynamo generate lecture.pdf

  # Five flashcards from slides plus a video, as JSON
  dynamo generate slides.pptx --video-url https://youtu.be/dQw4w9WgXcQ --count 5 --json

  # Show the text that would be sent to the model (no API key needed)
  dynamo extract notes.docx grades.xlsx

SUPPORTED INPUTS:
  .pdf  .docx  .pptx  .xlsx  .xls  .ods  .csv  .tsv  and YouTube links

HTTP API:
  GET  /health       liveness probe
  POST /flashcards   multipart form: count, files (repeatable), video_url
                     header x-api-key when DYNAMO_API_KEY is set

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY        Google Gemini API key (preferred when present)
  OPENAI_API_KEY        OpenAI API key
  ANTHROPIC_API_KEY     Anthropic API key
  DYNAMO_LLM_PROVIDER   Override provider (gemini, openai, anthropic, ollama)
  DYNAMO_MODEL          Override model ID
  PDFIUM_LIB_PATH       Directory containing libpdfium
  RUST_LOG              Log filter, overrides --verbose / --quiet

  Variables may also be placed in a .env file in the working directory.
"#;

/// Generate study flashcards from documents and videos using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "dynamo",
    version,
    about = "Generate study flashcards from documents and videos using LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DYNAMO_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DYNAMO_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "DYNAMO_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,

        /// Shared secret required in the x-api-key header.
        #[arg(long, env = "DYNAMO_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Largest accepted request body in bytes.
        #[arg(long, env = "DYNAMO_MAX_UPLOAD_BYTES", default_value_t = 25 * 1024 * 1024)]
        max_upload_bytes: usize,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Generate flashcards from local files and/or a video link.
    Generate {
        /// Input files (.pdf .docx .pptx .xlsx .xls .ods .csv .tsv).
        files: Vec<PathBuf>,

        /// YouTube video link.
        #[arg(long, alias = "youtube-url")]
        video_url: Option<String>,

        /// Number of flashcards to request.
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
        count: Option<u32>,

        /// Output structured JSON (flashcards + stats).
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Print the text extracted from each input; no model call.
    Extract {
        /// Input files.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory containing the pdfium shared library.
        #[arg(long, env = "PDFIUM_LIB_PATH")]
        pdfium_lib_path: Option<PathBuf>,
    },
}

/// Flags shared by the commands that call the model.
#[derive(Args, Debug)]
struct ModelArgs {
    /// LLM model ID (e.g. gemini-2.0-flash, gpt-4.1-mini).
    #[arg(long, env = "DYNAMO_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama.
    #[arg(long, env = "DYNAMO_PROVIDER")]
    provider: Option<String>,

    /// Flashcards requested when the caller gives no count.
    #[arg(long, env = "DYNAMO_DEFAULT_COUNT", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..))]
    default_count: u32,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DYNAMO_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Max LLM output tokens per call.
    #[arg(long, env = "DYNAMO_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Model call timeout in seconds.
    #[arg(long, env = "DYNAMO_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Transcript fetch timeout in seconds.
    #[arg(long, env = "DYNAMO_TRANSCRIPT_TIMEOUT", default_value_t = 30)]
    transcript_timeout: u64,

    /// Longest accepted video in seconds.
    #[arg(long, env = "DYNAMO_MAX_VIDEO_SECONDS", default_value_t = 2000)]
    max_video_seconds: u64,

    /// Preferred caption language.
    #[arg(long, env = "DYNAMO_TRANSCRIPT_LANGUAGE", default_value = "en")]
    transcript_language: String,

    /// Send the raw transcript instead of a model-written summary.
    #[arg(long, env = "DYNAMO_NO_SUMMARY")]
    no_summary: bool,

    /// Leave the worked examples out of the prompt.
    #[arg(long, env = "DYNAMO_NO_EXAMPLES")]
    no_examples: bool,

    /// Path to a text file with custom instructions ({count} is substituted).
    #[arg(long, env = "DYNAMO_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Largest prompt sent to the model, in bytes.
    #[arg(long, env = "DYNAMO_MAX_PROMPT_BYTES", default_value_t = 1_000_000)]
    max_prompt_bytes: usize,

    /// Files loaded concurrently per request.
    #[arg(long, env = "DYNAMO_LOAD_CONCURRENCY", default_value_t = 4)]
    load_concurrency: usize,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is not an error.
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    match cli.command {
        Command::Serve {
            bind,
            api_key,
            max_upload_bytes,
            model,
        } => {
            let mut builder = config_builder(&model).await?.max_upload_bytes(max_upload_bytes);
            if let Some(key) = api_key.filter(|k| !k.is_empty()) {
                builder = builder.api_key(key);
            }
            let config = builder.build().context("Invalid configuration")?;
            let service = FlashcardService::new(config).context("Failed to initialise the service")?;
            server::serve(Arc::new(service), bind)
                .await
                .context("HTTP service failed")?;
        }

        Command::Generate {
            files,
            video_url,
            count,
            json,
            model,
        } => {
            let config = config_builder(&model)
                .await?
                .build()
                .context("Invalid configuration")?;
            let mut bundle = UploadBundle::from_paths(&files)
                .await
                .context("Failed to read input files")?;
            if let Some(url) = video_url {
                bundle = bundle.with_video_url(url);
            }

            let service = FlashcardService::new(config).context("Failed to initialise the service")?;
            let output = service
                .generate(bundle, count)
                .await
                .context("Flashcard generation failed")?;

            if json {
                let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
                println!("{json}");
            } else {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                for (i, card) in output.flashcards.iter().enumerate() {
                    writeln!(handle, "{}. {}", i + 1, bold(card.question()))
                        .and_then(|_| writeln!(handle, "   {}\n", card.answer()))
                        .context("Failed to write to stdout")?;
                }
                if !cli.quiet {
                    eprintln!(
                        "{} {} flashcards  {}ms  {}",
                        green("✔"),
                        output.stats.returned,
                        output.stats.total_duration_ms,
                        dim(&format!(
                            "{} tokens in / {} tokens out",
                            output.stats.input_tokens, output.stats.output_tokens
                        )),
                    );
                }
            }
        }

        Command::Extract {
            files,
            pdfium_lib_path,
        } => {
            let mut builder = DynamoConfig::builder();
            if let Some(path) = pdfium_lib_path {
                builder = builder.pdfium_lib_path(path);
            }
            let config = builder.build().context("Invalid configuration")?;
            let bundle = UploadBundle::from_paths(&files)
                .await
                .context("Failed to read input files")?;
            let extracted = extract(bundle, &config).await.context("Text extraction failed")?;

            let stdout = io::stdout();
            let mut handle = stdout.lock();
            for source in extracted.iter() {
                writeln!(handle, "{}\n\n{}\n", bold(&format!("── {} ({})", source.id, source.kind)), source.text)
                    .context("Failed to write to stdout")?;
            }
        }
    }

    Ok(())
}

/// Map CLI args to a `DynamoConfig` builder.
async fn config_builder(args: &ModelArgs) -> Result<DynamoConfigBuilder> {
    let mut builder = DynamoConfig::builder()
        .default_count(args.default_count)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .api_timeout_secs(args.api_timeout)
        .transcript_timeout_secs(args.transcript_timeout)
        .max_video_seconds(args.max_video_seconds)
        .transcript_language(args.transcript_language.clone())
        .summarize_transcripts(!args.no_summary)
        .include_examples(!args.no_examples)
        .max_prompt_bytes(args.max_prompt_bytes)
        .load_concurrency(args.load_concurrency);

    if let Some(ref path) = args.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref path) = args.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path.clone());
    }

    Ok(builder)
}
