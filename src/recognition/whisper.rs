use super::{Recognition, Recognizer};
use crate::audio::PcmAudio;
use crate::config::RecognizerConfig;
use crate::error::{Error, RecognitionError, Result};
use std::time::Duration;
use tracing::{debug, error, info};

/// Response from an OpenAI-compatible transcription endpoint
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Recognizer backed by an OpenAI-compatible `/v1/audio/transcriptions` API
pub struct WhisperRecognizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    language: Option<String>,
}

impl WhisperRecognizer {
    /// Build a recognizer from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is empty or the HTTP client cannot be built
    pub fn new(config: &RecognizerConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(Error::Config(
                "recognizer endpoint must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
            language: config.language.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Recognizer for WhisperRecognizer {
    async fn recognize(&self, audio: &PcmAudio) -> std::result::Result<Recognition, RecognitionError> {
        let wav = audio
            .to_wav_bytes()
            .map_err(|e| RecognitionError::Encoding(e.to_string()))?;

        debug!(
            "Submitting {:.2}s of audio ({} bytes) to {}",
            audio.duration_seconds(),
            wav.len(),
            self.endpoint
        );

        let file = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| RecognitionError::Encoding(e.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("response_format", "json");
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!("Transcription request failed: {}", e);
            RecognitionError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Transcription API error {}: {}", status, body);
            return Err(RecognitionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let result: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::InvalidResponse(e.to_string()))?;

        let text = result.text.trim();
        if text.is_empty() {
            debug!("No speech detected in audio");
            return Ok(Recognition::NoSpeech);
        }

        info!("Transcription complete: {}", text);
        Ok(Recognition::Final(text.to_string()))
    }

    fn name(&self) -> &str {
        "whisper"
    }
}
