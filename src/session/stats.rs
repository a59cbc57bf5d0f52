use super::events::ConnectionId;
use super::state::Mode;
use super::timers::TimerKind;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time view of one voice session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub connection_id: ConnectionId,

    /// State machine state name (`idle`, `listening_dictation`, ...)
    pub state: String,

    pub mode: Mode,

    /// Whether incoming audio is accepted
    pub listening: bool,

    /// Whether command mode is awake
    pub awake: bool,

    /// Running dictation transcript
    pub transcript: String,

    /// Chunks waiting for the next flush
    pub buffered_chunks: usize,

    /// Total bytes waiting for the next flush
    pub buffered_bytes: usize,

    /// Timers currently armed
    pub pending_timers: Vec<TimerKind>,

    /// Flushes submitted to the worker and not yet applied
    pub flushes_in_flight: usize,

    /// Flushes whose outcome has been applied
    pub flushes_completed: u64,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the last non-empty recognition arrived
    pub last_speech_at: Option<DateTime<Utc>>,
}
