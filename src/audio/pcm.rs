use crate::error::TranscodeError;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

/// Sample rate the recognizer expects
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Normalized mono 16-bit PCM audio, ready for recognition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmAudio {
    /// Mono i16 samples
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl PcmAudio {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Quantize normalized f32 samples (-1.0..=1.0) to i16
    pub fn from_f32(samples: &[f32], sample_rate: u32) -> Self {
        let samples = samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)
            .collect();

        Self::new(samples, sample_rate)
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Encode as a 16-bit mono WAV file in memory
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, hound::Error> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for &sample in &self.samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }

        Ok(cursor.into_inner())
    }

    /// Read a 16-bit integer WAV file, averaging channels down to mono
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self, TranscodeError> {
        let reader = WavReader::new(Cursor::new(bytes))?;
        let spec = reader.spec();

        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(TranscodeError::UnsupportedCodec(format!(
                "expected 16-bit integer WAV, got {}-bit {:?}",
                spec.bits_per_sample, spec.sample_format
            )));
        }

        let interleaved: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()?;

        let channels = usize::from(spec.channels.max(1));
        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                    (sum / channels as i32) as i16
                })
                .collect()
        };

        Ok(Self::new(samples, spec.sample_rate))
    }
}
