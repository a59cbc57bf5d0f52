//! Error types for the voice session service

use thiserror::Error;

/// Result type alias for service-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service-level errors (configuration, start-up, IO)
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration sources could not be read or deserialized
    #[error("failed to load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure to turn a buffered audio flush into normalized PCM.
///
/// None of these are fatal: the flush is abandoned and the session keeps
/// listening.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// Nothing to decode
    #[error("no audio data to transcode")]
    EmptyInput,

    /// The container could not be probed or demuxed
    #[error("malformed audio container: {0}")]
    Malformed(String),

    /// The container holds a codec we cannot decode
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// The container has no decodable audio track or yielded no samples
    #[error("container has no decodable audio")]
    NoAudioTrack,

    /// Sample rate conversion failed
    #[error("resampling failed: {0}")]
    Resample(String),

    /// WAV encoding or decoding failed
    #[error("wav error: {0}")]
    Encode(#[from] hound::Error),

    /// Staging files could not be written or read
    #[error("audio staging failed: {0}")]
    Io(#[from] std::io::Error),

    /// The external transcoder exited unsuccessfully or could not be started
    #[error("external transcoder failed: {0}")]
    External(String),
}

/// Failure reported by the speech-to-text service.
///
/// "No speech" is not an error; see [`crate::recognition::Recognition::NoSpeech`].
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// The service could not be reached (connect error, timeout)
    #[error("recognition service unavailable: {0}")]
    Unavailable(String),

    /// The service answered with a non-success status
    #[error("recognition service returned {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The service answered with a body we could not parse
    #[error("invalid recognition response: {0}")]
    InvalidResponse(String),

    /// The audio could not be prepared for upload
    #[error("failed to encode audio for recognition: {0}")]
    Encoding(String),
}
