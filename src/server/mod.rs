//! Participant-facing WebSocket server: one relay session per connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::Instrument;

use crate::audio::Transcoder;
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::participant::split_websocket;
use crate::relay::{DuplexRelay, SessionReport};

/// Path participants connect on.
pub const SESSION_PATH: &str = "/ws";

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept participants forever. Each connection runs in its own task.
pub async fn serve(
    listener: TcpListener,
    config: Arc<RelayConfig>,
    transcoder: Arc<dyn Transcoder>,
) -> Result<()> {
    tracing::info!(address = ?listener.local_addr().ok(), "Relay listening");
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                tracing::warn!(error = %error, "Participant accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        let config = Arc::clone(&config);
        let transcoder = Arc::clone(&transcoder);
        tokio::spawn(
            async move {
                match handle_connection(stream, config, transcoder).await {
                    Ok(Some(report)) => tracing::info!(
                        session_id = %report.session_id,
                        end = ?report.end,
                        utterances = report.transcript.len(),
                        "Participant session finished"
                    ),
                    Ok(None) => {}
                    Err(error) => tracing::warn!(error = %error, "Participant session failed"),
                }
            }
            .instrument(tracing::info_span!("session", %peer)),
        );
    }
}

/// Upgrade one TCP connection and relay it. Returns `None` when the session
/// never reached the running state.
pub async fn handle_connection(
    stream: TcpStream,
    config: Arc<RelayConfig>,
    transcoder: Arc<dyn Transcoder>,
) -> Result<Option<SessionReport>> {
    let peer: Option<SocketAddr> = stream.peer_addr().ok();
    let socket = accept_hdr_async(stream, check_path)
        .await
        .map_err(|error| RelayError::Connect(format!("Participant handshake failed: {error}")))?;
    tracing::debug!(peer = ?peer, "Participant connected");

    let (sink, source) = split_websocket(socket);
    let sink = Arc::new(sink);
    let mut relay = DuplexRelay::new(config, sink.clone(), Box::new(source), transcoder);

    if relay.connect().await.is_err() {
        sink.close().await;
        return Ok(None);
    }
    let report = relay.run().await;
    sink.close().await;
    report.map(Some)
}

fn check_path(request: &Request, response: Response) -> std::result::Result<Response, ErrorResponse> {
    if request.uri().path() == SESSION_PATH {
        return Ok(response);
    }
    let mut rejection = ErrorResponse::new(Some(format!("no session endpoint at {}", request.uri().path())));
    *rejection.status_mut() = StatusCode::NOT_FOUND;
    Err(rejection)
}
