use crate::error::Result;
use crate::session::SessionConfig;
use serde::Deserialize;

/// Environment variable prefix; nested keys use `__`, e.g. `JARVIS__SERVICE__HTTP__PORT`
pub const ENV_PREFIX: &str = "JARVIS";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub speech: SessionConfig,
    pub recognizer: RecognizerConfig,
    pub transcoder: TranscoderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "jarvis-voice".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// OpenAI-compatible transcription endpoint
    pub endpoint: String,
    /// Bearer token; falls back to `OPENAI_API_KEY` when unset
    pub api_key: Option<String>,
    pub model: String,
    /// ISO-639-1 language hint
    pub language: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            api_key: None,
            model: "whisper-1".to_string(),
            language: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscoderBackend {
    /// In-process symphonia decoder; no Opus, so not for browser WebM
    Native,
    /// External ffmpeg binary
    #[default]
    Ffmpeg,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    pub backend: TranscoderBackend,
    pub ffmpeg_path: String,
    /// Directory for ffmpeg staging files; the system temp dir when unset
    pub staging_dir: Option<String>,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            backend: TranscoderBackend::Ffmpeg,
            ffmpeg_path: "ffmpeg".to_string(),
            staging_dir: None,
        }
    }
}

impl Config {
    /// Load from an optional config file (extension may be omitted) layered
    /// under `JARVIS__*` environment variables
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let mut cfg: Self = settings.try_deserialize()?;

        if cfg.recognizer.api_key.is_none() {
            cfg.recognizer.api_key = std::env::var("OPENAI_API_KEY").ok();
        }

        Ok(cfg)
    }
}
