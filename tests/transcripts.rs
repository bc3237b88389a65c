//! YouTube transcript client against canned pages served by an in-process
//! axum listener.

#![cfg(feature = "server")]

use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use dynamo_flashcards::pipeline::dispatch::{parse_video_link, VideoLink};
use dynamo_flashcards::pipeline::loaders::video::{load_video, YoutubeTranscripts};
use dynamo_flashcards::{DynamoConfig, DynamoError, TranscriptSource};
use serde_json::json;
use std::time::Duration;
use tokio::net::TcpListener;

const TIMED_TEXT: &str = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="2">Enzymes are catalysts</text><text start="2" dur="2">they lower activation energy</text></transcript>"#;

fn link() -> VideoLink {
    parse_video_link("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap()
}

/// Bind an ephemeral port; the router is attached later so pages can embed
/// the base URL.
async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

fn spawn(listener: TcpListener, app: Router) {
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}

fn watch_page(player: serde_json::Value) -> String {
    format!("<html><script>var ytInitialPlayerResponse = {player};var other = {{}};</script></html>")
}

fn client(base: &str, timeout_secs: u64) -> YoutubeTranscripts {
    let config = DynamoConfig::builder()
        .transcript_timeout_secs(timeout_secs)
        .build()
        .unwrap();
    YoutubeTranscripts::new(&config).unwrap().with_base_url(base)
}

#[tokio::test]
async fn captions_fetched_and_decoded() {
    let (listener, base) = bind().await;
    let page = watch_page(json!({
        "playabilityStatus": {"status": "OK"},
        "videoDetails": {"title": "Enzymes in 5 minutes", "lengthSeconds": "300"},
        "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
            {"baseUrl": format!("{base}/api/timedtext?lang=de"), "languageCode": "de"},
            {"baseUrl": format!("{base}/api/timedtext?lang=en"), "languageCode": "en", "kind": "asr"}
        ]}}
    }));
    let app = Router::new()
        .route("/watch", get(move || async move { Html(page) }))
        .route("/api/timedtext", get(|| async { TIMED_TEXT }));
    spawn(listener, app);

    let transcript = client(&base, 5).fetch(&link()).await.unwrap();
    assert_eq!(transcript.title.as_deref(), Some("Enzymes in 5 minutes"));
    assert_eq!(transcript.length_secs, Some(300));
    assert_eq!(transcript.text, "Enzymes are catalysts they lower activation energy");
}

#[tokio::test]
async fn missing_video_is_unavailable() {
    let (listener, base) = bind().await;
    spawn(listener, Router::new());

    let err = client(&base, 5).fetch(&link()).await.unwrap_err();
    match err {
        DynamoError::TranscriptUnavailable { reason, .. } => assert_eq!(reason, "video not found"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn unplayable_video_reports_reason() {
    let (listener, base) = bind().await;
    let page = watch_page(json!({
        "playabilityStatus": {"status": "LOGIN_REQUIRED", "reason": "Sign in to confirm your age"}
    }));
    spawn(listener, Router::new().route("/watch", get(move || async move { Html(page) })));

    let err = client(&base, 5).fetch(&link()).await.unwrap_err();
    match err {
        DynamoError::TranscriptUnavailable { reason, .. } => {
            assert_eq!(reason, "Sign in to confirm your age")
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn video_without_captions_has_no_transcript() {
    let (listener, base) = bind().await;
    let page = watch_page(json!({
        "playabilityStatus": {"status": "OK"},
        "videoDetails": {"title": "Silent film", "lengthSeconds": "60"}
    }));
    spawn(listener, Router::new().route("/watch", get(move || async move { Html(page) })));

    let source = client(&base, 5);
    let err = load_video(&source, &link(), &DynamoConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DynamoError::TranscriptUnavailable { .. }), "{err:?}");
    assert_eq!(err.kind(), "transcript_unavailable");
}

#[tokio::test]
async fn server_error_is_upstream_unavailable() {
    let (listener, base) = bind().await;
    let app = Router::new().route("/watch", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    spawn(listener, app);

    let err = client(&base, 5).fetch(&link()).await.unwrap_err();
    match err {
        DynamoError::UpstreamUnavailable { message } => assert!(message.contains("503"), "{message}"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn stalled_caption_download_times_out() {
    let (listener, base) = bind().await;
    let page = watch_page(json!({
        "playabilityStatus": {"status": "OK"},
        "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
            {"baseUrl": format!("{base}/api/timedtext?lang=en"), "languageCode": "en"}
        ]}}
    }));
    let app = Router::new()
        .route("/watch", get(move || async move { Html(page) }))
        .route(
            "/api/timedtext",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                TIMED_TEXT
            }),
        );
    spawn(listener, app);

    let err = client(&base, 1).fetch(&link()).await.unwrap_err();
    assert!(matches!(err, DynamoError::TranscriptFetchTimeout { .. }), "{err:?}");
}
