//! Participant backed by a local capture/playback device pair.

use std::time::Duration;

use async_trait::async_trait;

use super::{ParticipantSink, ParticipantSource};
use crate::audio::{AudioCapture, AudioPlayback};
use crate::error::Result;
use crate::protocol::{ParticipantInput, ParticipantMessage};

/// Streams captured microphone chunks as participant audio input.
pub struct CaptureSource<C> {
    capture: C,
    started: bool,
    pacing: Option<Duration>,
}

impl<C: AudioCapture> CaptureSource<C> {
    pub fn new(capture: C) -> Self {
        Self {
            capture,
            started: false,
            pacing: None,
        }
    }

    /// Pause between chunks so capture does not outrun the upstream.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = Some(pacing);
        self
    }
}

#[async_trait]
impl<C: AudioCapture> ParticipantSource for CaptureSource<C> {
    async fn next_input(&mut self) -> Result<Option<ParticipantInput>> {
        if !self.started {
            self.capture.start().await?;
            self.started = true;
            tracing::info!("Audio capture started");
        } else if let Some(pacing) = self.pacing {
            tokio::time::sleep(pacing).await;
        }
        Ok(self.capture.read_chunk().await?.map(ParticipantInput::Audio))
    }

    async fn close(&mut self) -> Result<()> {
        if self.started {
            self.started = false;
            self.capture.stop().await?;
            tracing::info!("Audio capture stopped");
        }
        Ok(())
    }
}

/// Plays response audio locally; transcripts go to the log.
pub struct PlaybackSink<P> {
    playback: P,
}

impl<P: AudioPlayback> PlaybackSink<P> {
    pub fn new(playback: P) -> Self {
        Self { playback }
    }
}

#[async_trait]
impl<P: AudioPlayback> ParticipantSink for PlaybackSink<P> {
    async fn deliver(&self, message: ParticipantMessage) -> Result<()> {
        match message {
            ParticipantMessage::Audio { data } => self.playback.play(data)?,
            ParticipantMessage::Transcript { text } => tracing::info!(transcript = %text, "Heard"),
            ParticipantMessage::TextDelta { text } => tracing::debug!(delta = %text, "Text delta"),
            ParticipantMessage::AudioDone => tracing::debug!("Response audio complete"),
            ParticipantMessage::Error { message } => tracing::warn!(message = %message, "Session error"),
        }
        Ok(())
    }
}
