//! Upstream realtime WebSocket: handshake, bootstrap and the serialized writer.

use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::protocol::ClientEvent;

pub(crate) type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type UpstreamReader = SplitStream<UpstreamSocket>;
type UpstreamWriter = SplitSink<UpstreamSocket, Message>;

/// Cloneable handle onto the single outbound path of a connection.
///
/// Frames are queued on a bounded channel and written by one writer task, so
/// sends from different tasks never interleave.
#[derive(Debug, Clone)]
pub struct UpstreamSender {
    tx: mpsc::Sender<Message>,
    send_timeout: Duration,
}

impl UpstreamSender {
    pub async fn send_event(&self, event: &ClientEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        self.tx
            .send_timeout(Message::Text(payload.into()), self.send_timeout)
            .await
            .map_err(|error| match error {
                mpsc::error::SendTimeoutError::Timeout(_) => RelayError::Send(format!(
                    "outbound queue full; {} not sent",
                    event.event_type()
                )),
                mpsc::error::SendTimeoutError::Closed(_) => RelayError::Send(format!(
                    "upstream connection closed; {} not sent",
                    event.event_type()
                )),
            })?;
        tracing::debug!(event_type = event.event_type(), "Queued upstream event");
        Ok(())
    }

    /// `conversation.item.create` then `response.create`. The second event
    /// is only sent once the first has been queued.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        self.send_event(&ClientEvent::user_text(text)).await?;
        self.send_event(&ClientEvent::ResponseCreate).await
    }

    pub async fn send_audio_chunk(&self, chunk: &[u8]) -> Result<()> {
        self.send_event(&ClientEvent::audio_append(chunk)).await
    }
}

/// A live upstream connection after bootstrap.
pub(crate) struct UpstreamConnection {
    pub(crate) sender: UpstreamSender,
    pub(crate) reader: Option<UpstreamReader>,
    pub(crate) writer: Option<JoinHandle<Result<()>>>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
}

impl UpstreamConnection {
    /// Connect, send the bootstrap events in order, then start the writer.
    pub(crate) async fn open(config: &RelayConfig, bootstrap: &[ClientEvent]) -> Result<Self> {
        config.validate()?;
        let url = config.realtime_url()?;
        let mut socket = time::timeout(
            config.connect_timeout,
            connect_realtime_socket(&url, &config.api_key),
        )
        .await
        .map_err(|_| {
            RelayError::Connect(format!(
                "Realtime websocket connect timed out after {}ms",
                config.connect_timeout.as_millis()
            ))
        })??;

        for event in bootstrap {
            let payload = serde_json::to_string(event)?;
            socket
                .send(Message::Text(payload.into()))
                .await
                .map_err(|error| {
                    RelayError::Connect(format!(
                        "Realtime bootstrap send of {} failed: {error}",
                        event.event_type()
                    ))
                })?;
            tracing::debug!(event_type = event.event_type(), "Sent bootstrap event");
        }

        let (sink, reader) = socket.split();
        let (tx, rx) = mpsc::channel(config.outbound_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let writer = tokio::spawn(run_writer(sink, rx, shutdown_rx, config.heartbeat_interval));

        Ok(Self {
            sender: UpstreamSender {
                tx,
                send_timeout: config.send_timeout,
            },
            reader: Some(reader),
            writer: Some(writer),
            shutdown_tx,
        })
    }
}

/// Owns the write half. Ends on shutdown (after a close frame) or on the
/// first failed write.
async fn run_writer(
    mut sink: UpstreamWriter,
    mut rx: mpsc::Receiver<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
    heartbeat_interval: Duration,
) -> Result<()> {
    let mut heartbeat = time::interval(heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    let _ = sink.send(Message::Close(None)).await;
                    let _ = sink.close().await;
                    return Ok(());
                }
            }
            _ = heartbeat.tick() => {
                sink.send(Message::Ping(Default::default()))
                    .await
                    .map_err(|error| RelayError::Send(format!("Realtime heartbeat failed: {error}")))?;
            }
            message = rx.recv() => {
                let Some(message) = message else {
                    let _ = sink.close().await;
                    return Ok(());
                };
                sink.send(message)
                    .await
                    .map_err(|error| RelayError::Send(format!("Realtime websocket send failed: {error}")))?;
            }
        }
    }
}

async fn connect_realtime_socket(url: &str, api_key: &str) -> Result<UpstreamSocket> {
    let mut request = url.into_client_request().map_err(|error| {
        RelayError::Configuration(format!("Invalid realtime websocket URL: {error}"))
    })?;
    let auth_value = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|error| {
        RelayError::Configuration(format!("Invalid realtime auth header: {error}"))
    })?;
    request.headers_mut().insert("Authorization", auth_value);
    request
        .headers_mut()
        .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

    connect_async(request)
        .await
        .map(|(socket, _)| socket)
        .map_err(map_connect_error)
}

fn map_connect_error(error: WsError) -> RelayError {
    match error {
        WsError::Http(response) => {
            let status = response.status().as_u16();
            if matches!(status, 401 | 403) {
                RelayError::Connect(format!(
                    "Realtime websocket authentication failed with status {status}"
                ))
            } else {
                RelayError::Connect(format!(
                    "Realtime websocket handshake failed with status {status}"
                ))
            }
        }
        other => RelayError::Connect(format!("Realtime websocket connect failed: {other}")),
    }
}
