use serde::{Deserialize, Serialize};
use std::fmt;

/// What recognized text is used for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Free-form speech accumulated into a running transcript
    #[default]
    #[serde(alias = "ai")]
    Dictation,
    /// Wake-phrase gated capture of discrete commands
    #[serde(alias = "task")]
    Command,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Dictation => f.write_str("dictation"),
            Mode::Command => f.write_str("command"),
        }
    }
}

/// Listening state of one session.
///
/// Wakefulness only exists while listening in command mode, so a dictation
/// session can never be awake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// Not accepting audio; remembers the selected mode
    Idle { mode: Mode },
    /// Listening, recognized text extends the transcript
    Dictation,
    /// Listening for a wake phrase
    CommandAsleep,
    /// Wake phrase satisfied, utterances are commands
    CommandAwake,
}

impl VoiceState {
    /// Entry state when listening starts in `mode`
    pub fn listening(mode: Mode) -> Self {
        match mode {
            Mode::Dictation => VoiceState::Dictation,
            Mode::Command => VoiceState::CommandAsleep,
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            VoiceState::Idle { mode } => *mode,
            VoiceState::Dictation => Mode::Dictation,
            VoiceState::CommandAsleep | VoiceState::CommandAwake => Mode::Command,
        }
    }

    pub fn is_listening(&self) -> bool {
        !matches!(self, VoiceState::Idle { .. })
    }

    pub fn is_awake(&self) -> bool {
        matches!(self, VoiceState::CommandAwake)
    }

    /// Transition for `startListening`: re-starting in the current mode
    /// keeps the state, anything else enters the mode's listening state
    pub fn start(self, mode: Mode) -> Self {
        if self.is_listening() && self.mode() == mode {
            self
        } else {
            VoiceState::listening(mode)
        }
    }

    pub fn stop(self) -> Self {
        VoiceState::Idle { mode: self.mode() }
    }

    /// Wake transition; only valid while listening in command mode
    pub fn wake(self) -> Option<Self> {
        match self {
            VoiceState::CommandAsleep | VoiceState::CommandAwake => Some(VoiceState::CommandAwake),
            _ => None,
        }
    }

    /// Sleep transition; only valid while awake
    pub fn sleep(self) -> Option<Self> {
        match self {
            VoiceState::CommandAwake => Some(VoiceState::CommandAsleep),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VoiceState::Idle { .. } => "idle",
            VoiceState::Dictation => "listening_dictation",
            VoiceState::CommandAsleep => "listening_command_asleep",
            VoiceState::CommandAwake => "listening_command_awake",
        }
    }
}

impl Default for VoiceState {
    fn default() -> Self {
        VoiceState::Idle {
            mode: Mode::default(),
        }
    }
}
