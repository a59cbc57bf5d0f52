use super::state::Mode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one client connection (and its session)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id for a newly accepted connection
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Event emitted by a session to its client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Listening started
    SpeechStarted { mode: Mode },
    /// Listening stopped (after the final flush)
    SpeechStopped,
    /// Final text. Dictation carries the running transcript; commands do not.
    SpeechFinal {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        full_transcript: Option<String>,
    },
    /// Interim hypothesis appended to the running transcript
    SpeechInterim {
        text: String,
        full_transcript: String,
    },
    /// Recognition service failure; the session keeps listening
    SpeechError { error: String },
    /// Command mode woke up
    WakeWordDetected,
    /// Command mode went back to sleep
    TaskModeSleep,
    /// Command mode went quiet after an utterance
    SilenceTimeout,
}

impl SessionEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::SpeechStarted { .. } => "speech_started",
            SessionEvent::SpeechStopped => "speech_stopped",
            SessionEvent::SpeechFinal { .. } => "speech_final",
            SessionEvent::SpeechInterim { .. } => "speech_interim",
            SessionEvent::SpeechError { .. } => "speech_error",
            SessionEvent::WakeWordDetected => "wake_word_detected",
            SessionEvent::TaskModeSleep => "task_mode_sleep",
            SessionEvent::SilenceTimeout => "silence_timeout",
        }
    }
}

/// Outbound channel to connected clients
pub trait Transport: Send + Sync {
    /// Deliver `event` to `connection`. Must not block.
    fn emit(&self, connection: &ConnectionId, event: SessionEvent);
}
