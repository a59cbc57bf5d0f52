use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and filtering policy shared by every voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long audio accumulates before a flush
    /// Default: 3000ms
    pub accumulation_window_ms: u64,

    /// Command mode: quiet time after the last command before going back to sleep
    /// Default: 3000ms
    pub silence_timeout_ms: u64,

    /// Command mode: time awake without any recognized utterance
    /// Default: 5000ms
    pub no_input_timeout_ms: u64,

    /// Chunks smaller than this are treated as noise and dropped
    pub min_chunk_bytes: usize,

    /// Flushes smaller than this are discarded without transcoding
    pub min_flush_bytes: usize,

    /// Wake phrases in priority order
    pub wake_phrases: Vec<String>,

    /// Container format of incoming chunks, as a file extension hint
    pub source_format: String,
}

impl SessionConfig {
    pub fn accumulation_window(&self) -> Duration {
        Duration::from_millis(self.accumulation_window_ms)
    }

    pub fn silence_timeout(&self) -> Duration {
        Duration::from_millis(self.silence_timeout_ms)
    }

    pub fn no_input_timeout(&self) -> Duration {
        Duration::from_millis(self.no_input_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            accumulation_window_ms: 3000,
            silence_timeout_ms: 3000,
            no_input_timeout_ms: 5000,
            min_chunk_bytes: 100,
            min_flush_bytes: 1000,
            wake_phrases: vec!["hey jarvis".to_string(), "hello jarvis".to_string()],
            source_format: "webm".to_string(),
        }
    }
}
