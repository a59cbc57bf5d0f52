pub mod ffmpeg;
pub mod pcm;
pub mod transcode;

pub use ffmpeg::FfmpegTranscoder;
pub use pcm::{PcmAudio, TARGET_SAMPLE_RATE};
pub use transcode::{decode_to_pcm, NativeTranscoder, Transcoder};
