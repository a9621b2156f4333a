//! Audio buffering, transcoding and device capabilities.

pub mod buffer;
pub mod device;
pub mod transcode;

pub use buffer::AudioFrameBuffer;
pub use device::{AudioCapture, AudioPlayback};
#[cfg(feature = "wav")]
pub use transcode::WavTranscoder;
pub use transcode::{PcmPassthrough, Transcoder};
