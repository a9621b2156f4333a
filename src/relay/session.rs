//! One relayed conversation: connect, run both forwarding loops, tear down.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use uuid::Uuid;

use super::upstream::{UpstreamConnection, UpstreamReader, UpstreamSender};
use crate::audio::Transcoder;
use crate::config::RelayConfig;
use crate::dispatch::{EventDispatcher, OutboundAction};
use crate::error::{RelayError, Result};
use crate::participant::{ParticipantSink, ParticipantSource};
use crate::protocol::{ClientEvent, ParticipantInput, ParticipantMessage, ServerEvent};
use crate::session::{
    SessionConfig, SessionConfigurator, TranscriptAccumulator, TranscriptRecord, TurnState,
};

/// Participant-visible text when the service cannot be reached.
pub const CONNECT_FAILED_MESSAGE: &str = "Error connecting to AI service.";

const WRITER_CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    UpstreamClosed,
    ParticipantClosed,
    ShutdownRequested,
}

/// Summary returned by [`DuplexRelay::run`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub end: SessionEnd,
    pub transcript: Vec<TranscriptRecord>,
}

/// Requests shutdown of a running session from anywhere.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Owns a single participant session end to end.
pub struct DuplexRelay {
    id: Uuid,
    config: Arc<RelayConfig>,
    session: SessionConfig,
    sink: Arc<dyn ParticipantSink>,
    source: Box<dyn ParticipantSource>,
    dispatcher: EventDispatcher,
    upstream: Option<UpstreamConnection>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    closed: bool,
}

impl DuplexRelay {
    /// Build a session; nothing is connected yet.
    pub fn new(
        config: Arc<RelayConfig>,
        sink: Arc<dyn ParticipantSink>,
        source: Box<dyn ParticipantSource>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let session = SessionConfigurator::build_from(&config);
        let dispatcher = EventDispatcher::new(transcoder, session.interrupt_response());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            config,
            session,
            sink,
            source,
            dispatcher,
            upstream: None,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            closed: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.id
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn turn_state(&self) -> TurnState {
        self.dispatcher.turn_state()
    }

    pub fn transcript(&self) -> &TranscriptAccumulator {
        self.dispatcher.transcript()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Open the upstream connection and negotiate the session.
    ///
    /// On failure the participant gets a single error message and the
    /// session is torn down.
    pub async fn connect(&mut self) -> Result<()> {
        if self.closed {
            return Err(RelayError::InvalidState("Session is closed".into()));
        }
        if self.upstream.is_some() {
            return Err(RelayError::InvalidState("Session is already connected".into()));
        }

        let mut bootstrap = vec![ClientEvent::SessionUpdate {
            session: self.session.clone(),
        }];
        if self.config.eager_response {
            if self.session.vad_enabled() {
                tracing::warn!(
                    session_id = %self.id,
                    "Eager response.create with server VAD may produce a second response"
                );
            }
            bootstrap.push(ClientEvent::ResponseCreate);
        }

        match UpstreamConnection::open(&self.config, &bootstrap).await {
            Ok(upstream) => {
                if self.config.eager_response {
                    self.dispatcher.response_requested();
                }
                self.upstream = Some(upstream);
                tracing::info!(session_id = %self.id, model = %self.config.model, "Upstream connected");
                Ok(())
            }
            Err(error) => {
                tracing::error!(session_id = %self.id, error = %error, "Upstream connect failed");
                if let Err(deliver_error) = self
                    .sink
                    .deliver(ParticipantMessage::error(CONNECT_FAILED_MESSAGE))
                    .await
                {
                    tracing::debug!(error = %deliver_error, "Could not report connect failure");
                }
                self.teardown().await;
                Err(error)
            }
        }
    }

    /// Send a user text message and request a response.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        self.sender()?.send_text(text).await
    }

    /// Append a chunk of captured PCM16 audio.
    pub async fn send_audio_chunk(&self, chunk: &[u8]) -> Result<()> {
        self.sender()?.send_audio_chunk(chunk).await
    }

    /// Relay in both directions until either side ends, then tear down.
    pub async fn run(&mut self) -> Result<SessionReport> {
        let (reader, mut writer, sender) = {
            let upstream = self
                .upstream
                .as_mut()
                .ok_or_else(|| RelayError::InvalidState("Session is not connected".into()))?;
            let reader = upstream
                .reader
                .take()
                .ok_or_else(|| RelayError::InvalidState("Session is already running".into()))?;
            let writer = upstream
                .writer
                .take()
                .ok_or_else(|| RelayError::InvalidState("Upstream writer is gone".into()))?;
            (reader, writer, upstream.sender.clone())
        };

        tracing::info!(session_id = %self.id, "Session running");
        let mut writer_finished = false;
        let outcome = {
            let mut shutdown_rx = self.shutdown_rx.clone();
            let upstream_loop =
                forward_upstream(reader, &mut self.dispatcher, self.sink.as_ref(), &sender);
            let participant_loop = forward_participant(self.source.as_mut(), &sender);

            tokio::select! {
                result = upstream_loop => result,
                result = participant_loop => result,
                joined = &mut writer => {
                    writer_finished = true;
                    writer_outcome(joined)
                }
                _ = wait_for_shutdown(&mut shutdown_rx) => Ok(SessionEnd::ShutdownRequested),
            }
        };

        if !writer_finished {
            if let Some(upstream) = self.upstream.as_mut() {
                upstream.writer = Some(writer);
            }
        }
        self.teardown().await;

        match outcome {
            Ok(end) => {
                tracing::info!(session_id = %self.id, end = ?end, "Session ended");
                Ok(SessionReport {
                    session_id: self.id,
                    end,
                    transcript: self.dispatcher.transcript().records().to_vec(),
                })
            }
            Err(error) => {
                tracing::warn!(session_id = %self.id, error = %error, "Session failed");
                Err(error)
            }
        }
    }

    /// Close the upstream and the participant source. Idempotent.
    pub async fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(upstream) = self.upstream.take() {
            let _ = upstream.shutdown_tx.send(true);
            drop(upstream.sender);
            if let Some(mut writer) = upstream.writer {
                match tokio::time::timeout(WRITER_CLOSE_GRACE, &mut writer).await {
                    Ok(joined) => {
                        if let Err(error) = writer_outcome(joined) {
                            tracing::debug!(error = %error, "Upstream writer ended with error");
                        }
                    }
                    Err(_) => {
                        tracing::warn!("Upstream writer did not close in time; aborting");
                        writer.abort();
                    }
                }
            }
        }

        if let Err(error) = self.source.close().await {
            tracing::warn!(error = %error, "Participant source close failed");
        }
        tracing::debug!(session_id = %self.id, "Session torn down");
    }

    /// Cloneable outbound handle, for sending from other tasks.
    pub fn sender(&self) -> Result<&UpstreamSender> {
        if self.closed {
            return Err(RelayError::Send("Session is closed".into()));
        }
        self.upstream
            .as_ref()
            .map(|upstream| &upstream.sender)
            .ok_or_else(|| RelayError::InvalidState("Session is not connected".into()))
    }
}

impl Drop for DuplexRelay {
    fn drop(&mut self) {
        if let Some(upstream) = self.upstream.take() {
            let _ = upstream.shutdown_tx.send(true);
            if let Some(writer) = upstream.writer {
                writer.abort();
            }
        }
    }
}

/// Task A: upstream → participant.
async fn forward_upstream(
    mut reader: UpstreamReader,
    dispatcher: &mut EventDispatcher,
    sink: &dyn ParticipantSink,
    sender: &UpstreamSender,
) -> Result<SessionEnd> {
    while let Some(frame) = reader.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => break,
            Err(error) => {
                tracing::warn!(error = %error, "Realtime websocket receive failed");
                break;
            }
        };

        let event = match message {
            Message::Text(text) => ServerEvent::parse(&text),
            Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => ServerEvent::parse(&text),
                Err(error) => Err(RelayError::decode(format!(
                    "binary frame is not UTF-8: {error}"
                ))),
            },
            Message::Close(frame) => {
                tracing::debug!(frame = ?frame, "Realtime websocket closed by peer");
                break;
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };
        let event = match event {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(error = %error, "Dropping undecodable upstream event");
                continue;
            }
        };

        for action in dispatcher.dispatch(event) {
            match action {
                OutboundAction::Participant(message) => sink.deliver(message).await?,
                OutboundAction::Upstream(event) => sender.send_event(&event).await?,
            }
        }
    }
    Ok(SessionEnd::UpstreamClosed)
}

/// Task B: participant → upstream.
async fn forward_participant(
    source: &mut dyn ParticipantSource,
    sender: &UpstreamSender,
) -> Result<SessionEnd> {
    loop {
        match source.next_input().await {
            Ok(Some(ParticipantInput::Text(text))) => {
                tracing::debug!(chars = text.len(), "Participant text");
                sender.send_text(&text).await?;
            }
            Ok(Some(ParticipantInput::Audio(chunk))) => sender.send_audio_chunk(&chunk).await?,
            Ok(None) => return Ok(SessionEnd::ParticipantClosed),
            Err(error) if !error.is_fatal() => {
                tracing::warn!(error = %error, "Dropping participant message");
            }
            Err(error) => return Err(error),
        }
    }
}

async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    while !*shutdown_rx.borrow_and_update() {
        if shutdown_rx.changed().await.is_err() {
            // The relay owns the sender, so this only happens while it drops.
            std::future::pending::<()>().await;
        }
    }
}

fn writer_outcome(
    joined: std::result::Result<Result<()>, tokio::task::JoinError>,
) -> Result<SessionEnd> {
    match joined {
        Ok(Ok(())) => Ok(SessionEnd::UpstreamClosed),
        Ok(Err(error)) => Err(error),
        Err(error) => Err(RelayError::Send(format!("Upstream writer task failed: {error}"))),
    }
}
