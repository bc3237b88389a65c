//! HTTP surface: axum router over a shared [`FlashcardService`].
//!
//! ```text
//! GET  /health      → {"status":"ok","version":"…"}
//! POST /flashcards  → multipart: count, files/file (repeatable), video_url/youtube_url
//! ```
//!
//! The handlers hold no pipeline logic. They parse the multipart body into an
//! [`UploadBundle`], check the shared secret, and map [`DynamoError`] onto an
//! HTTP status with a JSON error body.

use crate::bundle::{UploadBundle, UploadItem};
use crate::error::{DynamoError, Stage};
use crate::generate::FlashcardService;
use crate::output::GenerationOutput;
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FlashcardService>,
}

/// Build the router. The request body limit comes from the service config.
pub fn router(service: Arc<FlashcardService>) -> Router {
    let body_limit = service.config().max_upload_bytes;
    Router::new()
        .route("/health", get(health))
        .route("/flashcards", post(create_flashcards))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(service: Arc<FlashcardService>, addr: SocketAddr) -> Result<(), DynamoError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| DynamoError::Internal(format!("failed to bind {addr}: {e}")))?;
    let local = listener
        .local_addr()
        .map_err(|e| DynamoError::Internal(format!("failed to read local address: {e}")))?;
    info!("Flashcard service listening on http://{}", local);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Flashcard service shutting down");
        })
        .await
        .map_err(|e| DynamoError::Internal(format!("server error: {e}")))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn create_flashcards(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<GenerationOutput>, ApiError> {
    authorize(state.service.config().api_key.as_deref(), &headers)?;

    let multipart = multipart.map_err(|e| {
        ApiError::from(DynamoError::InvalidRequest(format!(
            "expected a multipart/form-data body: {}",
            e.body_text()
        )))
    })?;
    let (bundle, count) = read_form(multipart).await?;

    let output = state.service.generate(bundle, count).await.map_err(|e| {
        warn!("Request failed at {:?} stage: {}", e.stage(), e);
        ApiError::from(e)
    })?;
    Ok(Json(output))
}

/// Check the shared secret when one is configured.
fn authorize(expected: Option<&str>, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let supplied = headers
        .get(API_KEY_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if bool::from(supplied.ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Parse the multipart form into a bundle and an optional count.
async fn read_form(mut multipart: Multipart) -> Result<(UploadBundle, Option<u32>), ApiError> {
    let mut bundle = UploadBundle::new();
    let mut count = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "count" => {
                let text = field.text().await.map_err(multipart_error)?;
                count = parse_count(&text)?;
            }
            "video_url" | "youtube_url" => {
                let text = field.text().await.map_err(multipart_error)?;
                bundle = bundle.with_video_url(text);
            }
            "files" | "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // Browsers send an empty part when no file was picked.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                if file_name.is_empty() {
                    return Err(DynamoError::InvalidRequest("file part without a filename".into()).into());
                }
                debug!("Received '{}' ({} bytes)", file_name, bytes.len());
                bundle.items.push(UploadItem::new(file_name, bytes.to_vec()));
            }
            other => debug!("Ignoring unknown form field '{}'", other),
        }
    }

    Ok((bundle, count))
}

/// Blank means "use the default"; anything else must be an integer ≥ 1.
fn parse_count(text: &str) -> Result<Option<u32>, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let n: i64 = text
        .parse()
        .map_err(|_| DynamoError::InvalidRequest(format!("count must be an integer, got '{text}'")))?;
    if n < 1 {
        return Err(DynamoError::InvalidCount { count: n }.into());
    }
    let n = u32::try_from(n)
        .map_err(|_| DynamoError::InvalidRequest(format!("count {n} is too large")))?;
    Ok(Some(n))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        DynamoError::InvalidRequest(e.body_text()).into()
    }
}

// ── Error responses ──────────────────────────────────────────────────────────

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    Pipeline(DynamoError),
    Unauthorized,
    PayloadTooLarge(String),
}

impl From<DynamoError> for ApiError {
    fn from(e: DynamoError) -> Self {
        ApiError::Pipeline(e)
    }
}

/// HTTP status for a pipeline error.
pub fn status_for(e: &DynamoError) -> StatusCode {
    match e {
        DynamoError::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        DynamoError::PromptTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        DynamoError::UnreadableDocument { .. }
        | DynamoError::TranscriptUnavailable { .. }
        | DynamoError::VideoTooLong { .. }
        | DynamoError::UpstreamInvalidRequest { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        DynamoError::EmptyInput | DynamoError::InvalidCount { .. } | DynamoError::InvalidRequest(_) => {
            StatusCode::BAD_REQUEST
        }
        DynamoError::TranscriptFetchTimeout { .. } | DynamoError::UpstreamTimeout { .. } => {
            StatusCode::GATEWAY_TIMEOUT
        }
        DynamoError::UpstreamUnavailable { .. } | DynamoError::MalformedResponse { .. } => {
            StatusCode::BAD_GATEWAY
        }
        DynamoError::UpstreamRateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        DynamoError::ProviderNotConfigured { .. }
        | DynamoError::PdfEngineUnavailable(_)
        | DynamoError::InvalidConfig(_)
        | DynamoError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_body(kind: &str, stage: Stage, message: String) -> Json<serde_json::Value> {
    Json(json!({
        "error": { "kind": kind, "stage": stage, "message": message }
    }))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Pipeline(e) => {
                // Internal details stay in the log.
                let message = if e.stage() == Stage::Internal {
                    "internal server error".to_string()
                } else {
                    e.to_string()
                };
                (status_for(&e), error_body(e.kind(), e.stage(), message)).into_response()
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                error_body("unauthorized", Stage::Input, "missing or invalid API key".into()),
            )
                .into_response(),
            ApiError::PayloadTooLarge(message) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                error_body("payload_too_large", Stage::Input, message),
            )
                .into_response(),
        }
    }
}
