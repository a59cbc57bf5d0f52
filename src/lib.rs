pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod recognition;
pub mod session;
pub mod wake_word;

pub use audio::{FfmpegTranscoder, NativeTranscoder, PcmAudio, Transcoder};
pub use config::Config;
pub use error::{Error, RecognitionError, Result, TranscodeError};
pub use http::{create_router, AppState, ClientEvent, ConnectionRegistry};
pub use recognition::{Recognition, Recognizer, WhisperRecognizer};
pub use session::{
    ConnectionId, Mode, SessionConfig, SessionContext, SessionEvent, SessionHandle,
    SessionSnapshot, SessionStore, Transport, VoiceState,
};
pub use wake_word::{WakeMatch, WakeWordDetector};
