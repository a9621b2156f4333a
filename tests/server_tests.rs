//! Participant WebSocket server tests.

mod common;

use std::sync::Arc;

use base64::Engine;
use futures::{SinkExt, Stream, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use common::{shared, FakeUpstream, WAIT};
use voxrelay::audio::PcmPassthrough;
use voxrelay::server::{serve, SESSION_PATH};

async fn start_relay(upstream: &FakeUpstream) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let address = listener
        .local_addr()
        .expect("local addr should be available");
    tokio::spawn(serve(
        listener,
        shared(upstream.config()),
        Arc::new(PcmPassthrough),
    ));
    format!("ws://{address}")
}

async fn next_json<S>(stream: &mut S) -> Value
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    loop {
        let frame = timeout(WAIT, stream.next())
            .await
            .expect("participant frame should arrive")
            .expect("participant socket should stay open")
            .expect("participant frame should be valid");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("relay should send JSON");
        }
    }
}

#[tokio::test]
async fn unknown_path_is_rejected_with_404() {
    let upstream = FakeUpstream::start().await;
    let base = start_relay(&upstream).await;

    let err = connect_async(format!("{base}/nope"))
        .await
        .expect_err("handshake should be refused");
    match err {
        WsError::Http(response) => assert_eq!(response.status().as_u16(), 404),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn browser_session_round_trip() {
    let mut upstream = FakeUpstream::start().await;
    let base = start_relay(&upstream).await;

    let (socket, _) = connect_async(format!("{base}{SESSION_PATH}"))
        .await
        .expect("participant should connect");
    let (mut write, mut read) = socket.split();

    assert_eq!(upstream.next_event().await["type"], "session.update");
    assert_eq!(upstream.next_event().await["type"], "response.create");

    write
        .send(Message::Text(
            json!({"type": "text", "data": "Hola"}).to_string().into(),
        ))
        .await
        .expect("participant send should succeed");
    let item = upstream.next_event().await;
    assert_eq!(item["type"], "conversation.item.create");
    assert_eq!(item["item"]["content"][0]["text"], "Hola");
    assert_eq!(upstream.next_event().await["type"], "response.create");

    // Malformed participant input is skipped.
    write
        .send(Message::Text("not json".to_string().into()))
        .await
        .expect("participant send should succeed");

    upstream.send(json!({"type": "response.audio.delta", "delta":
        base64::engine::general_purpose::STANDARD.encode([4u8, 0])}));
    upstream.send(json!({"type": "response.audio.done"}));
    upstream.send(json!({
        "type": "response.audio_transcript.done",
        "transcript": "¡Hola!"
    }));

    let audio = next_json(&mut read).await;
    assert_eq!(audio["type"], "audio");
    assert_eq!(
        audio["data"],
        base64::engine::general_purpose::STANDARD.encode([4u8, 0])
    );
    assert_eq!(next_json(&mut read).await, json!({"type": "audio_done"}));
    assert_eq!(next_json(&mut read).await, json!({"text": "¡Hola!"}));

    write
        .send(Message::Close(None))
        .await
        .expect("participant close should send");
    upstream.wait_closed().await;
}

#[tokio::test]
async fn keeps_accepting_after_a_failed_connection() {
    let mut upstream = FakeUpstream::start().await;
    let base = start_relay(&upstream).await;

    assert!(connect_async(format!("{base}/nope")).await.is_err());

    let (socket, _) = connect_async(format!("{base}{SESSION_PATH}"))
        .await
        .expect("participant should connect after a rejected one");
    assert_eq!(upstream.next_event().await["type"], "session.update");
    drop(socket);
}
