//! Video-link loader: fetch a YouTube transcript.
//!
//! ## Retrieval
//!
//! ```text
//! watch page ──▶ ytInitialPlayerResponse ──▶ caption track ──▶ timed-text XML ──▶ text
//! (HTML)         (embedded JSON)              (language pick)   (<text>/<p> runs)
//! ```
//!
//! The player response also carries the video title and length, which the
//! pipeline uses to enforce the maximum video length. Track preference:
//! manual captions in the configured language, then auto-generated ones in
//! that language, then any track whose language shares the prefix, then the
//! first track listed.
//!
//! [`TranscriptSource`] is the seam: the service holds an
//! `Arc<dyn TranscriptSource>` so tests can substitute a fake.

use crate::config::DynamoConfig;
use crate::error::DynamoError;
use crate::pipeline::dispatch::VideoLink;
use crate::pipeline::normalize::normalize_text;
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";
const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";

/// A fetched transcript and the metadata found next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub title: Option<String>,
    pub length_secs: Option<u64>,
    pub text: String,
}

/// Anything that can turn a [`VideoLink`] into a transcript.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch(&self, link: &VideoLink) -> Result<Transcript, DynamoError>;
}

/// Transcript retrieval from youtube.com over HTTPS.
pub struct YoutubeTranscripts {
    client: reqwest::Client,
    base_url: String,
    language: String,
}

impl YoutubeTranscripts {
    /// Build a client with the configured transcript timeout.
    pub fn new(config: &DynamoConfig) -> Result<Self, DynamoError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.transcript_timeout_secs))
            .user_agent(concat!("dynamo-flashcards/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DynamoError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: YOUTUBE_BASE_URL.to_string(),
            language: config.transcript_language.clone(),
        })
    }

    /// Point the client at a different host (mirrors, local fakes).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_text(&self, url: &str, link: &VideoLink) -> Result<String, DynamoError> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                DynamoError::TranscriptFetchTimeout {
                    url: link.url.clone(),
                    secs: 0,
                }
            } else {
                DynamoError::UpstreamUnavailable {
                    message: format!("transcript service: {e}"),
                }
            }
        };

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.8")
            .send()
            .await
            .map_err(map_err)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DynamoError::TranscriptUnavailable {
                url: link.url.clone(),
                reason: "video not found".into(),
            });
        }
        if !status.is_success() {
            return Err(DynamoError::UpstreamUnavailable {
                message: format!("transcript service returned HTTP {status}"),
            });
        }
        response.text().await.map_err(map_err)
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscripts {
    async fn fetch(&self, link: &VideoLink) -> Result<Transcript, DynamoError> {
        info!("Fetching transcript for video {}", link.video_id);

        let watch_url = format!("{}/watch?v={}&hl=en", self.base_url, link.video_id);
        let html = self.get_text(&watch_url, link).await?;

        let player = parse_player_response(&html).ok_or_else(|| DynamoError::TranscriptUnavailable {
            url: link.url.clone(),
            reason: "video page carries no player data".into(),
        })?;

        if let Some(status) = &player.playability_status {
            if status.status.as_deref().is_some_and(|s| s != "OK") {
                return Err(DynamoError::TranscriptUnavailable {
                    url: link.url.clone(),
                    reason: status
                        .reason
                        .clone()
                        .unwrap_or_else(|| "video is not playable".into()),
                });
            }
        }

        let tracks = player.caption_tracks();
        let track = select_track(tracks, &self.language).ok_or_else(|| {
            DynamoError::TranscriptUnavailable {
                url: link.url.clone(),
                reason: "no captions or auto-generated transcript".into(),
            }
        })?;
        debug!(
            "Video {}: using caption track '{}' ({})",
            link.video_id,
            track.language_code,
            track.kind.as_deref().unwrap_or("manual")
        );

        let xml = self.get_text(&track.base_url, link).await?;
        let text = timed_text_to_plain(&xml).map_err(|reason| DynamoError::TranscriptUnavailable {
            url: link.url.clone(),
            reason,
        })?;

        let details = player.video_details.unwrap_or_default();
        Ok(Transcript {
            title: details.title,
            length_secs: details.length_seconds.and_then(|s| s.parse().ok()),
            text,
        })
    }
}

/// Fetch a transcript with the configured timeout and length limit.
///
/// The returned text is normalised and never empty.
pub async fn load_video(
    source: &dyn TranscriptSource,
    link: &VideoLink,
    config: &DynamoConfig,
) -> Result<Transcript, DynamoError> {
    let secs = config.transcript_timeout_secs;
    let mut transcript = tokio::time::timeout(Duration::from_secs(secs), source.fetch(link))
        .await
        .map_err(|_| DynamoError::TranscriptFetchTimeout {
            url: link.url.clone(),
            secs,
        })?
        .map_err(|e| match e {
            DynamoError::TranscriptFetchTimeout { url, .. } => {
                DynamoError::TranscriptFetchTimeout { url, secs }
            }
            other => other,
        })?;

    if let Some(length) = transcript.length_secs {
        if length > config.max_video_seconds {
            return Err(DynamoError::VideoTooLong {
                url: link.url.clone(),
                secs: length,
                max_secs: config.max_video_seconds,
            });
        }
    }

    transcript.text = normalize_text(&transcript.text);
    if transcript.text.is_empty() {
        return Err(DynamoError::TranscriptUnavailable {
            url: link.url.clone(),
            reason: "transcript is empty".into(),
        });
    }

    info!(
        "Loaded transcript for '{}' ({} chars, {}s)",
        transcript.title.as_deref().unwrap_or(&link.video_id),
        transcript.text.len(),
        transcript.length_secs.unwrap_or(0)
    );
    Ok(transcript)
}

// ── Player response ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    video_details: Option<VideoDetails>,
    captions: Option<Captions>,
}

impl PlayerResponse {
    fn caption_tracks(&self) -> &[CaptionTrack] {
        self.captions
            .as_ref()
            .and_then(|c| c.tracklist.as_ref())
            .map(|t| t.caption_tracks.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    title: Option<String>,
    length_seconds: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    tracklist: Option<Tracklist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Tracklist {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    /// `"asr"` for auto-generated tracks.
    kind: Option<String>,
}

/// Locate and decode the player response JSON embedded in a watch page.
fn parse_player_response(html: &str) -> Option<PlayerResponse> {
    let marker = html.find(PLAYER_RESPONSE_MARKER)?;
    let rest = &html[marker..];
    let start = rest.find('{')?;
    // Parse only the first JSON value; the page continues after it.
    serde_json::Deserializer::from_str(&rest[start..])
        .into_iter::<PlayerResponse>()
        .next()?
        .ok()
}

fn select_track<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
    let lang = language.to_ascii_lowercase();
    let is_asr = |t: &CaptionTrack| t.kind.as_deref() == Some("asr");
    let exact = |t: &CaptionTrack| t.language_code.eq_ignore_ascii_case(&lang);
    let prefix = |t: &CaptionTrack| {
        let code = t.language_code.to_ascii_lowercase();
        code.split('-').next() == lang.split('-').next()
    };

    tracks
        .iter()
        .find(|t| exact(t) && !is_asr(t))
        .or_else(|| tracks.iter().find(|t| exact(t)))
        .or_else(|| tracks.iter().find(|t| prefix(t)))
        .or_else(|| tracks.first())
}

// ── Timed text ───────────────────────────────────────────────────────────────

/// Convert timed-text XML (`<text>` or srv3 `<p>` cues) into one line of text.
///
/// Cue bodies are HTML-escaped a second time inside the XML (`&amp;#39;`),
/// so entities are decoded again after XML unescaping.
fn timed_text_to_plain(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut segments: Vec<String> = Vec::new();
    let mut depth_in_cue = 0usize;

    loop {
        match reader.read_event().map_err(|e| format!("invalid timed-text XML: {e}"))? {
            Event::Start(e) if matches!(e.name().as_ref(), b"text" | b"p") => depth_in_cue += 1,
            Event::End(e) if matches!(e.name().as_ref(), b"text" | b"p") => {
                depth_in_cue = depth_in_cue.saturating_sub(1)
            }
            Event::Text(t) if depth_in_cue > 0 => {
                let raw = t.unescape().map_err(|e| format!("invalid timed-text XML: {e}"))?;
                let decoded = html_escape::decode_html_entities(&raw);
                let cleaned = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
                if !cleaned.is_empty() {
                    segments.push(cleaned);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(segments.join(" "))
}
