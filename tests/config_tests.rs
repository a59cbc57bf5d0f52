// Integration tests for configuration loading

use anyhow::Result;
use jarvis_voice::config::TranscoderBackend;
use jarvis_voice::Config;
use std::io::Write;

#[test]
fn test_missing_file_uses_defaults() -> Result<()> {
    let cfg = Config::load("/nonexistent/jarvis-voice")?;

    assert_eq!(cfg.service.http.bind, "127.0.0.1");
    assert_eq!(cfg.speech.accumulation_window_ms, 3000);
    assert_eq!(cfg.speech.silence_timeout_ms, 3000);
    assert_eq!(cfg.speech.no_input_timeout_ms, 5000);
    assert_eq!(cfg.speech.min_chunk_bytes, 100);
    assert_eq!(cfg.speech.wake_phrases, vec!["hey jarvis", "hello jarvis"]);
    assert_eq!(cfg.transcoder.backend, TranscoderBackend::Ffmpeg);
    assert!(cfg.transcoder.staging_dir.is_none());
    Ok(())
}

#[test]
fn test_file_values_override_defaults() -> Result<()> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(
        file,
        r#"
[speech]
accumulation_window_ms = 1500
wake_phrases = ["ok jarvis"]

[transcoder]
backend = "ffmpeg"
ffmpeg_path = "/usr/local/bin/ffmpeg"
"#
    )?;

    let path = file.path().to_string_lossy().to_string();
    let cfg = Config::load(&path)?;

    assert_eq!(cfg.speech.accumulation_window_ms, 1500);
    assert_eq!(cfg.speech.wake_phrases, vec!["ok jarvis"]);
    // Unset keys in a present section keep their defaults
    assert_eq!(cfg.speech.no_input_timeout_ms, 5000);
    assert_eq!(cfg.transcoder.backend, TranscoderBackend::Ffmpeg);
    assert_eq!(cfg.transcoder.ffmpeg_path, "/usr/local/bin/ffmpeg");
    Ok(())
}

#[test]
fn test_environment_overrides() -> Result<()> {
    std::env::set_var("JARVIS__SERVICE__HTTP__PORT", "6001");
    let cfg = Config::load("/nonexistent/jarvis-voice");
    std::env::remove_var("JARVIS__SERVICE__HTTP__PORT");

    assert_eq!(cfg?.service.http.port, 6001);
    Ok(())
}
