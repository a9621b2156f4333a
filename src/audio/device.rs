//! Local audio device capabilities.
//!
//! Device I/O is provided by the embedding application (cpal, PortAudio,
//! a file, ...). The relay only needs these two seams.

use async_trait::async_trait;

use crate::error::Result;

/// Microphone-like PCM16 source.
#[async_trait]
pub trait AudioCapture: Send {
    async fn start(&mut self) -> Result<()>;

    /// Next captured chunk, or `None` once capture has ended.
    ///
    /// Chunks must hold whole samples.
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Stop capturing and release the device. Must tolerate repeated calls.
    async fn stop(&mut self) -> Result<()>;
}

/// Speaker-like sink for fully buffered response audio.
pub trait AudioPlayback: Send + Sync {
    fn play(&self, audio: Vec<u8>) -> Result<()>;
}
