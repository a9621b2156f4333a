//! Participant delivery capability.
//!
//! A session talks to its participant only through these two traits, so the
//! same relay serves a browser over WebSocket, an in-process channel, or a
//! local microphone/speaker pair.

pub mod channel;
pub mod local;
pub mod websocket;

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{ParticipantInput, ParticipantMessage};

pub use channel::{channel_participant, ChannelSink, ChannelSource, ParticipantHandle};
pub use local::{CaptureSource, PlaybackSink};
pub use websocket::{split_websocket, WebSocketSink, WebSocketSource};

/// Relay → participant half. Shared; deliveries are serialized by the sink.
#[async_trait]
pub trait ParticipantSink: Send + Sync {
    async fn deliver(&self, message: ParticipantMessage) -> Result<()>;
}

/// Participant → relay half.
#[async_trait]
pub trait ParticipantSource: Send {
    /// Next input, or `None` once the participant has gone away.
    ///
    /// Must be cancel-safe: the relay drops pending calls on shutdown.
    async fn next_input(&mut self) -> Result<Option<ParticipantInput>>;

    /// Release resources held by the source (e.g. stop audio capture).
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
