//! Audio transcoding: arbitrary compressed container -> 16kHz mono PCM
//!
//! A flush hands over the concatenation of every chunk buffered since the
//! previous flush. Chunks are fragments of a single encoded stream, so the
//! whole buffer is probed and decoded as one file.

use super::pcm::{PcmAudio, TARGET_SAMPLE_RATE};
use crate::error::TranscodeError;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Input frames per resampler call
const RESAMPLE_CHUNK: usize = 1024;

/// Converts a buffered audio flush into normalized PCM
#[async_trait::async_trait]
pub trait Transcoder: Send + Sync {
    /// Decode `raw` (one container file, hinted by file extension) to 16kHz mono
    async fn transcode(&self, raw: Vec<u8>, format_hint: &str)
        -> Result<PcmAudio, TranscodeError>;

    /// Transcoder name for logging
    fn name(&self) -> &str;
}

/// In-process transcoder built on symphonia + rubato.
///
/// Handles WAV, OGG/Vorbis, FLAC, MP3, MP4/AAC and the Matroska/WebM
/// container. Opus is not decodable here; use the ffmpeg transcoder for
/// browser MediaRecorder output.
#[derive(Debug, Default, Clone)]
pub struct NativeTranscoder;

impl NativeTranscoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Transcoder for NativeTranscoder {
    async fn transcode(
        &self,
        raw: Vec<u8>,
        format_hint: &str,
    ) -> Result<PcmAudio, TranscodeError> {
        if raw.is_empty() {
            return Err(TranscodeError::EmptyInput);
        }

        let hint = format_hint.to_string();
        tokio::task::spawn_blocking(move || decode_to_pcm(raw, &hint))
            .await
            .map_err(|e| TranscodeError::External(format!("decoder task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        "native"
    }
}

/// Decode, downmix and resample a complete container file. Blocking.
pub fn decode_to_pcm(raw: Vec<u8>, format_hint: &str) -> Result<PcmAudio, TranscodeError> {
    if raw.is_empty() {
        return Err(TranscodeError::EmptyInput);
    }

    let (samples, sample_rate) = decode_mono(raw, format_hint)?;
    if samples.is_empty() {
        return Err(TranscodeError::NoAudioTrack);
    }

    let resampled = resample(&samples, sample_rate, TARGET_SAMPLE_RATE)?;
    debug!(
        "Transcoded {} samples @ {}Hz -> {} samples @ {}Hz",
        samples.len(),
        sample_rate,
        resampled.len(),
        TARGET_SAMPLE_RATE
    );

    Ok(PcmAudio::from_f32(&resampled, TARGET_SAMPLE_RATE))
}

/// Decode the first audio track to mono f32, returning samples and source rate
fn decode_mono(raw: Vec<u8>, format_hint: &str) -> Result<(Vec<f32>, u32), TranscodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(raw)), Default::default());

    let mut hint = Hint::new();
    if !format_hint.is_empty() {
        hint.with_extension(format_hint);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| TranscodeError::Malformed(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(TranscodeError::NoAudioTrack)?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| TranscodeError::UnsupportedCodec(e.to_string()))?;

    let mut mono = Vec::new();
    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) if !mono.is_empty() => {
                // Truncated tail of a fragment; keep what decoded cleanly
                warn!("Stopping decode early: {}", e);
                break;
            }
            Err(e) => return Err(TranscodeError::Malformed(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count().max(1);
                sample_rate = spec.rate;

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);

                mono.extend(
                    buffer
                        .samples()
                        .chunks_exact(channels)
                        .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                );
            }
            Err(SymphoniaError::DecodeError(e)) => {
                debug!("Skipping undecodable packet: {}", e);
            }
            Err(e) => return Err(TranscodeError::Malformed(e.to_string())),
        }
    }

    if sample_rate == 0 {
        return Err(TranscodeError::NoAudioTrack);
    }

    Ok((mono, sample_rate))
}

/// Resample mono audio with rubato's FFT resampler
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, TranscodeError> {
    use rubato::{FftFixedIn, Resampler};

    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, RESAMPLE_CHUNK, 2, 1)
            .map_err(|e| TranscodeError::Resample(e.to_string()))?;

    let expected = samples.len() as u64 * u64::from(to_rate) / u64::from(from_rate);
    let mut output = Vec::with_capacity(expected as usize + RESAMPLE_CHUNK);

    // FftFixedIn rounds the chunk size to its FFT size; feed what it asks for
    let mut position = 0;
    while samples.len() - position >= resampler.input_frames_next() {
        let needed = resampler.input_frames_next();
        let frames = resampler
            .process(&[&samples[position..position + needed]], None)
            .map_err(|e| TranscodeError::Resample(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
        position += needed;
    }

    if position < samples.len() {
        let tail: [&[f32]; 1] = [&samples[position..]];
        let frames = resampler
            .process_partial(Some(&tail[..]), None)
            .map_err(|e| TranscodeError::Resample(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
    }

    Ok(output)
}
