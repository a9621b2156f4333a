//! In-process participant backed by bounded channels.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ParticipantSink, ParticipantSource};
use crate::error::{RelayError, Result};
use crate::protocol::{ParticipantInput, ParticipantMessage};

/// Sink half handed to the relay.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ParticipantMessage>,
}

/// Source half handed to the relay.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<ParticipantInput>,
}

/// The embedding application's end of the channel pair.
#[derive(Debug)]
pub struct ParticipantHandle {
    pub inputs: mpsc::Sender<ParticipantInput>,
    pub messages: mpsc::Receiver<ParticipantMessage>,
}

/// Create a channel participant. Dropping `inputs` ends the session's
/// participant loop.
pub fn channel_participant(capacity: usize) -> (ChannelSink, ChannelSource, ParticipantHandle) {
    let (input_tx, input_rx) = mpsc::channel(capacity);
    let (message_tx, message_rx) = mpsc::channel(capacity);
    (
        ChannelSink { tx: message_tx },
        ChannelSource { rx: input_rx },
        ParticipantHandle {
            inputs: input_tx,
            messages: message_rx,
        },
    )
}

#[async_trait]
impl ParticipantSink for ChannelSink {
    async fn deliver(&self, message: ParticipantMessage) -> Result<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| RelayError::Send("participant channel closed".into()))
    }
}

#[async_trait]
impl ParticipantSource for ChannelSource {
    async fn next_input(&mut self) -> Result<Option<ParticipantInput>> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) -> Result<()> {
        self.rx.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn messages_flow_both_ways() {
        let (sink, mut source, mut handle) = channel_participant(4);

        handle
            .inputs
            .send(ParticipantInput::Text("hi".into()))
            .await
            .unwrap();
        assert_eq!(
            source.next_input().await.unwrap(),
            Some(ParticipantInput::Text("hi".into()))
        );

        sink.deliver(ParticipantMessage::AudioDone).await.unwrap();
        assert_eq!(handle.messages.recv().await, Some(ParticipantMessage::AudioDone));

        drop(handle);
        assert_eq!(source.next_input().await.unwrap(), None);
        assert!(matches!(
            sink.deliver(ParticipantMessage::AudioDone).await,
            Err(RelayError::Send(_))
        ));
    }
}
