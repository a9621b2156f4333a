//! Routes inbound service events to session components.

use std::sync::Arc;

use crate::audio::{AudioFrameBuffer, Transcoder};
use crate::protocol::{ClientEvent, ParticipantMessage, ServerEvent};
use crate::session::{
    TranscriptAccumulator, TranscriptSource, TurnRequest, TurnState, TurnStateMachine,
};

/// Something to deliver after dispatching an event.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundAction {
    Participant(ParticipantMessage),
    Upstream(ClientEvent),
}

/// Owns the audio buffer, transcript and turn state of one session.
pub struct EventDispatcher {
    audio: AudioFrameBuffer,
    transcript: TranscriptAccumulator,
    turn: TurnStateMachine,
    transcoder: Arc<dyn Transcoder>,
}

impl EventDispatcher {
    pub fn new(transcoder: Arc<dyn Transcoder>, interrupt_response: bool) -> Self {
        Self {
            audio: AudioFrameBuffer::new(),
            transcript: TranscriptAccumulator::new(),
            turn: TurnStateMachine::new(interrupt_response),
            transcoder,
        }
    }

    /// Apply one inbound event and return the resulting actions, in order.
    pub fn dispatch(&mut self, event: ServerEvent) -> Vec<OutboundAction> {
        tracing::debug!(event_type = event.event_type(), "Received upstream event");
        match event {
            ServerEvent::AudioTranscriptDone { transcript } => {
                self.finalized_transcript(TranscriptSource::Service, transcript)
            }
            ServerEvent::InputTranscriptionCompleted { transcript } => {
                self.finalized_transcript(TranscriptSource::Participant, transcript)
            }
            ServerEvent::AudioDelta { delta } => {
                self.turn.on_response_delta();
                self.audio.append(&delta);
                Vec::new()
            }
            ServerEvent::AudioDone => self.flush_audio(),
            ServerEvent::TextDelta { delta } => {
                self.turn.on_response_delta();
                vec![OutboundAction::Participant(ParticipantMessage::TextDelta {
                    text: delta,
                })]
            }
            ServerEvent::AudioTranscriptDelta { .. } => {
                self.turn.on_response_delta();
                Vec::new()
            }
            ServerEvent::SpeechStarted => turn_actions(self.turn.on_speech_started()),
            ServerEvent::SpeechStopped => turn_actions(self.turn.on_speech_stopped()),
            ServerEvent::ResponseDone => {
                self.turn.on_response_done();
                Vec::new()
            }
            ServerEvent::Error { message } => {
                tracing::warn!(message = %message, "Realtime service error");
                vec![OutboundAction::Participant(ParticipantMessage::Error { message })]
            }
            ServerEvent::SessionCreated { session_id } => {
                tracing::info!(upstream_session = ?session_id, "Upstream session created");
                Vec::new()
            }
            ServerEvent::SessionUpdated => {
                tracing::debug!("Upstream session configuration applied");
                Vec::new()
            }
            ServerEvent::ItemCreated { item } => {
                tracing::debug!(item = %item, "Conversation item created");
                Vec::new()
            }
            ServerEvent::Unknown { event_type } => {
                tracing::trace!(event_type = ?event_type, "Ignoring unrecognized event");
                Vec::new()
            }
        }
    }

    pub fn turn_state(&self) -> TurnState {
        self.turn.state()
    }

    /// Record a response requested outside the VAD flow.
    pub fn response_requested(&mut self) {
        self.turn.response_requested();
    }

    pub fn transcript(&self) -> &TranscriptAccumulator {
        &self.transcript
    }

    pub fn buffered_audio(&self) -> &AudioFrameBuffer {
        &self.audio
    }

    fn finalized_transcript(
        &mut self,
        source: TranscriptSource,
        transcript: String,
    ) -> Vec<OutboundAction> {
        self.transcript.append(source, transcript.clone());
        vec![OutboundAction::Participant(ParticipantMessage::Transcript {
            text: transcript,
        })]
    }

    fn flush_audio(&mut self) -> Vec<OutboundAction> {
        if !self.audio.is_sample_aligned() {
            tracing::warn!(bytes = self.audio.len(), "Response audio ends mid-sample");
        }
        let pcm = self.audio.flush();
        if pcm.is_empty() {
            return Vec::new();
        }

        match self.transcoder.encode(&pcm) {
            Ok(data) => {
                tracing::debug!(
                    pcm_bytes = pcm.len(),
                    encoded_bytes = data.len(),
                    format = self.transcoder.format_name(),
                    "Flushed response audio"
                );
                vec![
                    OutboundAction::Participant(ParticipantMessage::Audio { data }),
                    OutboundAction::Participant(ParticipantMessage::AudioDone),
                ]
            }
            Err(error) => {
                tracing::warn!(error = %error, pcm_bytes = pcm.len(), "Dropping response audio");
                vec![OutboundAction::Participant(ParticipantMessage::error(
                    format!("Audio could not be encoded: {error}"),
                ))]
            }
        }
    }
}

fn turn_actions(request: Option<TurnRequest>) -> Vec<OutboundAction> {
    match request {
        Some(TurnRequest::CreateResponse) => {
            vec![OutboundAction::Upstream(ClientEvent::ResponseCreate)]
        }
        Some(TurnRequest::CancelResponse) => {
            vec![OutboundAction::Upstream(ClientEvent::ResponseCancel)]
        }
        None => Vec::new(),
    }
}
