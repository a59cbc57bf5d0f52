//! Speech recognition adapter
//!
//! Submits normalized audio to an external speech-to-text capability. A
//! recognizer call blocks on remote work, so sessions only ever invoke it
//! from their flush worker, never from the task that ingests audio.

mod whisper;

pub use whisper::WhisperRecognizer;

use crate::audio::PcmAudio;
use crate::error::RecognitionError;

/// Outcome of a successful recognition call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// Final text for the submitted audio
    Final(String),
    /// Interim hypothesis (streaming recognizers only)
    Partial(String),
    /// The audio contained no recognizable speech
    NoSpeech,
}

/// Speech-to-text capability
#[async_trait::async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognize speech in 16kHz mono PCM
    async fn recognize(&self, audio: &PcmAudio) -> Result<Recognition, RecognitionError>;

    /// Recognizer name for logging
    fn name(&self) -> &str;
}
