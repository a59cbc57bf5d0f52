use anyhow::{Context, Result};
use clap::Parser;
use jarvis_voice::audio::{FfmpegTranscoder, NativeTranscoder, Transcoder};
use jarvis_voice::config::TranscoderBackend;
use jarvis_voice::{create_router, AppState, Config, WhisperRecognizer};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "jarvis-voice")]
#[command(about = "Voice session service: streamed audio in, recognized speech events out")]
struct Args {
    /// Config file (extension optional, missing file is fine)
    #[arg(short, long, default_value = "config/jarvis-voice")]
    config: String,

    /// Address to bind, overrides the config file
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on, overrides the config file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(bind) = args.bind {
        cfg.service.http.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("Jarvis Voice v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let transcoder: Arc<dyn Transcoder> = match cfg.transcoder.backend {
        TranscoderBackend::Native => Arc::new(NativeTranscoder::new()),
        TranscoderBackend::Ffmpeg => {
            let mut ffmpeg = FfmpegTranscoder::new(&cfg.transcoder.ffmpeg_path);
            if let Some(dir) = &cfg.transcoder.staging_dir {
                ffmpeg = ffmpeg.with_staging_dir(dir);
            }
            Arc::new(ffmpeg)
        }
    };
    let recognizer = Arc::new(WhisperRecognizer::new(&cfg.recognizer)?);

    info!("Transcoder: {}", transcoder.name());
    info!("Recognizer: {} ({})", cfg.recognizer.model, cfg.recognizer.endpoint);
    if cfg.recognizer.api_key.is_none() {
        info!("No recognizer API key configured");
    }

    let state = AppState::new(cfg.speech.clone(), transcoder, recognizer);
    let sessions = state.sessions.clone();
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    sessions.shutdown().await;

    Ok(())
}
