//! Participant connected over a WebSocket.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;

use async_trait::async_trait;

use super::{ParticipantSink, ParticipantSource};
use crate::error::{RelayError, Result};
use crate::protocol::{ParticipantInput, ParticipantMessage};

/// Outbound half; one frame at a time.
pub struct WebSocketSink<S> {
    inner: Mutex<SplitSink<WebSocketStream<S>, Message>>,
}

/// Inbound half.
pub struct WebSocketSource<S> {
    inner: SplitStream<WebSocketStream<S>>,
}

/// Split an accepted participant socket into relay halves.
pub fn split_websocket<S>(socket: WebSocketStream<S>) -> (WebSocketSink<S>, WebSocketSource<S>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (sink, stream) = socket.split();
    (
        WebSocketSink {
            inner: Mutex::new(sink),
        },
        WebSocketSource { inner: stream },
    )
}

impl<S> WebSocketSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Send a close frame. Errors are ignored; the peer may already be gone.
    pub async fn close(&self) {
        let mut sink = self.inner.lock().await;
        let _ = sink.send(Message::Close(None)).await;
        let _ = sink.close().await;
    }
}

#[async_trait]
impl<S> ParticipantSink for WebSocketSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn deliver(&self, message: ParticipantMessage) -> Result<()> {
        let payload = message.to_json()?;
        self.inner
            .lock()
            .await
            .send(Message::Text(payload.into()))
            .await
            .map_err(|error| {
                RelayError::Send(format!("participant {} send failed: {error}", message.kind()))
            })
    }
}

#[async_trait]
impl<S> ParticipantSource for WebSocketSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn next_input(&mut self) -> Result<Option<ParticipantInput>> {
        loop {
            let message = match self.inner.next().await {
                Some(Ok(message)) => message,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    return Ok(None)
                }
                Some(Err(error)) => {
                    tracing::warn!(error = %error, "Participant receive failed");
                    return Ok(None);
                }
            };
            match message {
                Message::Text(text) => return ParticipantInput::parse(&text).map(Some),
                Message::Binary(bytes) => {
                    let text = String::from_utf8(bytes.to_vec()).map_err(|error| {
                        RelayError::decode(format!("participant frame is not UTF-8: {error}"))
                    })?;
                    return ParticipantInput::parse(&text).map(Some);
                }
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }
}
