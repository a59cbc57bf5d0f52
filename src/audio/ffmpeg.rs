use super::pcm::{PcmAudio, TARGET_SAMPLE_RATE};
use super::transcode::Transcoder;
use crate::error::TranscodeError;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

/// Transcoder that shells out to ffmpeg.
///
/// Input and output are staged in temporary files which are removed when
/// the handles drop, on success and on every error path.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
    staging_dir: Option<PathBuf>,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            staging_dir: None,
        }
    }

    /// Stage temporary files in `dir` instead of the system temp dir
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    fn stage(&self, prefix: &str, suffix: &str) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix).suffix(suffix);
        match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait::async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        raw: Vec<u8>,
        format_hint: &str,
    ) -> Result<PcmAudio, TranscodeError> {
        if raw.is_empty() {
            return Err(TranscodeError::EmptyInput);
        }

        let input = self.stage("jarvis-in-", &format!(".{}", format_hint))?;
        let output = self.stage("jarvis-out-", ".wav")?;

        tokio::fs::write(input.path(), &raw).await?;
        debug!(
            "Staged {} bytes at {} for ffmpeg",
            raw.len(),
            input.path().display()
        );

        let result = Command::new(&self.ffmpeg_path)
            .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(input.path())
            .args(["-ac", "1", "-ar"])
            .arg(TARGET_SAMPLE_RATE.to_string())
            .args(["-acodec", "pcm_s16le", "-f", "wav"])
            .arg(output.path())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                TranscodeError::External(format!(
                    "failed to run {}: {}",
                    self.ffmpeg_path.display(),
                    e
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(TranscodeError::Malformed(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        let wav = tokio::fs::read(output.path()).await?;
        let pcm = PcmAudio::from_wav_bytes(&wav)?;
        if pcm.is_empty() {
            return Err(TranscodeError::NoAudioTrack);
        }

        Ok(pcm)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
