//! Shared test helpers: a scripted fake realtime service.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        handshake::server::{Request, Response},
        http::StatusCode,
        Message,
    },
};
use voxrelay::config::RelayConfig;

pub const WAIT: Duration = Duration::from_secs(2);

/// What the relay presented during the WebSocket handshake.
#[derive(Debug, Default, Clone)]
pub struct Handshake {
    pub authorization: String,
    pub beta: String,
    pub query: String,
}

/// A frame scripted for the fake service to send.
pub enum ServerFrame {
    Json(Value),
    Raw(String),
    Close,
    /// Drop the TCP connection without a close handshake.
    Drop,
}

/// One-connection fake of the realtime service.
pub struct FakeUpstream {
    pub url: String,
    received: mpsc::UnboundedReceiver<Value>,
    outbound: mpsc::UnboundedSender<ServerFrame>,
    handshake: Option<oneshot::Receiver<Handshake>>,
    pings: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl FakeUpstream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener
            .local_addr()
            .expect("local addr should be available");

        let (received_tx, received) = mpsc::unbounded_channel();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ServerFrame>();
        let (handshake_tx, handshake_rx) = oneshot::channel();
        let pings = Arc::new(AtomicUsize::new(0));
        let pings_seen = Arc::clone(&pings);

        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("server should accept");
            let ws = accept_hdr_async(stream, move |req: &Request, response: Response| {
                let header = |name: &str| {
                    req.headers()
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                };
                let _ = handshake_tx.send(Handshake {
                    authorization: header("authorization"),
                    beta: header("openai-beta"),
                    query: req.uri().query().unwrap_or_default().to_string(),
                });
                Ok(response)
            })
            .await
            .expect("handshake should succeed");

            let (mut write, mut read) = ws.split();
            loop {
                tokio::select! {
                    frame = read.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            let value = serde_json::from_str::<Value>(&text)
                                .expect("relay should send JSON");
                            let _ = received_tx.send(value);
                        }
                        Some(Ok(Message::Ping(_))) => {
                            pings_seen.fetch_add(1, Ordering::SeqCst);
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                    frame = outbound_rx.recv() => match frame {
                        Some(ServerFrame::Json(value)) => {
                            let _ = write.send(Message::Text(value.to_string().into())).await;
                        }
                        Some(ServerFrame::Raw(text)) => {
                            let _ = write.send(Message::Text(text.into())).await;
                        }
                        Some(ServerFrame::Drop) => break,
                        Some(ServerFrame::Close) | None => {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    },
                }
            }
        });

        Self {
            url: format!("ws://{address}/v1/realtime"),
            received,
            outbound,
            handshake: Some(handshake_rx),
            pings,
            task,
        }
    }

    pub fn config(&self) -> RelayConfig {
        relay_config(&self.url)
    }

    pub fn send(&self, value: Value) {
        let _ = self.outbound.send(ServerFrame::Json(value));
    }

    pub fn send_raw(&self, text: &str) {
        let _ = self.outbound.send(ServerFrame::Raw(text.to_string()));
    }

    pub fn close(&self) {
        let _ = self.outbound.send(ServerFrame::Close);
    }

    pub fn drop_connection(&self) {
        let _ = self.outbound.send(ServerFrame::Drop);
    }

    pub fn pings_seen(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub async fn handshake(&mut self) -> Handshake {
        let rx = self.handshake.take().expect("handshake already taken");
        timeout(WAIT, rx)
            .await
            .expect("handshake should arrive")
            .expect("handshake should be captured")
    }

    /// Next JSON event the relay sent upstream.
    pub async fn next_event(&mut self) -> Value {
        timeout(WAIT, self.received.recv())
            .await
            .expect("upstream event should arrive")
            .expect("connection should stay open")
    }

    /// Resolves once the relay has closed the connection.
    pub async fn wait_closed(mut self) {
        loop {
            match timeout(WAIT, self.received.recv())
                .await
                .expect("connection should close")
            {
                Some(_) => continue,
                None => break,
            }
        }
        self.task.await.expect("server task should complete");
    }
}

pub fn relay_config(url: &str) -> RelayConfig {
    RelayConfig {
        api_key: "test-key".into(),
        base_url: url.to_string(),
        model: "gpt-test-realtime".into(),
        instructions: "Be brief.".into(),
        heartbeat_interval: Duration::from_secs(60),
        connect_timeout: WAIT,
        send_timeout: Duration::from_millis(500),
        ..RelayConfig::default()
    }
}

/// A listener that refuses every handshake with `status`.
pub async fn rejecting_upstream(status: StatusCode) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let address = listener
        .local_addr()
        .expect("local addr should be available");
    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("server should accept");
        let result = accept_hdr_async(stream, move |_req: &Request, _response: Response| {
            let response = tokio_tungstenite::tungstenite::http::Response::builder()
                .status(status)
                .body(Some("rejected".to_string()))
                .expect("rejection response should build");
            Err(response)
        })
        .await;
        assert!(result.is_err());
    });
    (format!("ws://{address}/v1/realtime"), task)
}

pub fn shared(config: RelayConfig) -> Arc<RelayConfig> {
    Arc::new(config)
}
