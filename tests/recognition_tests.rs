// Integration tests for the HTTP speech recognizer
//
// Each test runs a small axum server standing in for an OpenAI-compatible
// transcription endpoint.

use anyhow::Result;
use axum::{body::Bytes, http::HeaderMap, http::StatusCode, routing::post, Router};
use jarvis_voice::config::RecognizerConfig;
use jarvis_voice::{Error, PcmAudio, Recognition, RecognitionError, Recognizer, WhisperRecognizer};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const PATH: &str = "/v1/audio/transcriptions";

#[derive(Default)]
struct Captured {
    authorization: Option<String>,
    body: Vec<u8>,
}

/// Serve `reply` on the transcription path and return its URL
async fn spawn_stub(
    status: StatusCode,
    reply: &'static str,
    captured: Arc<Mutex<Captured>>,
) -> Result<String> {
    let app = Router::new().route(
        PATH,
        post(move |headers: HeaderMap, body: Bytes| async move {
            {
                let mut captured = captured.lock().unwrap();
                captured.authorization = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                captured.body = body.to_vec();
            }
            (status, reply)
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(format!("http://{}{}", addr, PATH))
}

fn recognizer(endpoint: String, api_key: Option<&str>) -> Result<WhisperRecognizer> {
    let config = RecognizerConfig {
        endpoint,
        api_key: api_key.map(str::to_string),
        timeout_secs: 5,
        ..RecognizerConfig::default()
    };
    Ok(WhisperRecognizer::new(&config)?)
}

fn audio() -> PcmAudio {
    PcmAudio::new(vec![0, 100, -100, 200], 16_000)
}

#[tokio::test]
async fn test_recognized_text_is_trimmed() -> Result<()> {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let url = spawn_stub(StatusCode::OK, r#"{"text": "  hello there \n"}"#, captured.clone()).await?;

    let result = recognizer(url, Some("sk-test"))?.recognize(&audio()).await?;

    assert_eq!(result, Recognition::Final("hello there".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_upload_carries_wav_model_and_key() -> Result<()> {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let url = spawn_stub(StatusCode::OK, r#"{"text": "ok"}"#, captured.clone()).await?;

    recognizer(url, Some("sk-test"))?.recognize(&audio()).await?;

    let captured = captured.lock().unwrap();
    assert_eq!(captured.authorization.as_deref(), Some("Bearer sk-test"));
    let body = String::from_utf8_lossy(&captured.body);
    assert!(body.contains("whisper-1"));
    assert!(body.contains("audio.wav"));
    assert!(body.contains("RIFF"));
    Ok(())
}

#[tokio::test]
async fn test_no_key_sends_no_authorization() -> Result<()> {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let url = spawn_stub(StatusCode::OK, r#"{"text": "ok"}"#, captured.clone()).await?;

    recognizer(url, None)?.recognize(&audio()).await?;

    assert!(captured.lock().unwrap().authorization.is_none());
    Ok(())
}

#[tokio::test]
async fn test_blank_text_is_no_speech() -> Result<()> {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let url = spawn_stub(StatusCode::OK, r#"{"text": "   "}"#, captured).await?;

    let result = recognizer(url, None)?.recognize(&audio()).await?;

    assert_eq!(result, Recognition::NoSpeech);
    Ok(())
}

#[tokio::test]
async fn test_error_status_is_rejected() -> Result<()> {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let url = spawn_stub(StatusCode::SERVICE_UNAVAILABLE, "overloaded", captured).await?;

    let result = recognizer(url, None)?.recognize(&audio()).await;

    match result {
        Err(RecognitionError::Rejected { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_unparseable_body_is_invalid_response() -> Result<()> {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let url = spawn_stub(StatusCode::OK, "not json", captured).await?;

    let result = recognizer(url, None)?.recognize(&audio()).await;

    assert!(matches!(result, Err(RecognitionError::InvalidResponse(_))));
    Ok(())
}

#[tokio::test]
async fn test_unreachable_service_is_unavailable() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let url = format!("http://{}{}", addr, PATH);
    let result = recognizer(url, None)?.recognize(&audio()).await;

    assert!(matches!(result, Err(RecognitionError::Unavailable(_))));
    Ok(())
}

#[test]
fn test_empty_endpoint_is_rejected() {
    let config = RecognizerConfig {
        endpoint: "  ".to_string(),
        ..RecognizerConfig::default()
    };

    assert!(matches!(WhisperRecognizer::new(&config), Err(Error::Config(_))));
}
