//! Turn-taking state machine driven by VAD and response lifecycle events.

use strum::{AsRefStr, Display};

/// Where the conversation is within the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum TurnState {
    #[default]
    Idle,
    SpeechDetected,
    AwaitingResponse,
    Responding,
}

/// A request the state machine wants sent upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRequest {
    CreateResponse,
    /// Barge-in: cancel the response currently being generated.
    CancelResponse,
}

/// Tracks [`TurnState`]. Transitions happen only in reaction to events.
#[derive(Debug, Clone, Default)]
pub struct TurnStateMachine {
    state: TurnState,
    interrupt_response: bool,
    /// Speech started during a response and has not stopped yet.
    overlapping_speech: bool,
}

impl TurnStateMachine {
    pub fn new(interrupt_response: bool) -> Self {
        Self {
            state: TurnState::Idle,
            interrupt_response,
            overlapping_speech: false,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// `input_audio_buffer.speech_started`.
    pub fn on_speech_started(&mut self) -> Option<TurnRequest> {
        match self.state {
            TurnState::Responding if self.interrupt_response => {
                self.transition(TurnState::SpeechDetected);
                Some(TurnRequest::CancelResponse)
            }
            TurnState::Responding => {
                tracing::debug!("Speech started while responding; barge-in disabled");
                self.overlapping_speech = true;
                None
            }
            _ => {
                self.transition(TurnState::SpeechDetected);
                None
            }
        }
    }

    /// `input_audio_buffer.speech_stopped`. Requests exactly one response per
    /// utterance, including one that began while a response was playing.
    pub fn on_speech_stopped(&mut self) -> Option<TurnRequest> {
        let overlapped = std::mem::take(&mut self.overlapping_speech);
        if self.state != TurnState::SpeechDetected && !overlapped {
            tracing::debug!(state = %self.state, "Ignoring speech stop outside of speech");
            return None;
        }
        self.transition(TurnState::AwaitingResponse);
        Some(TurnRequest::CreateResponse)
    }

    /// First audio/text delta of a response.
    pub fn on_response_delta(&mut self) {
        if matches!(self.state, TurnState::AwaitingResponse | TurnState::Idle) {
            self.transition(TurnState::Responding);
        }
    }

    /// `response.done`.
    pub fn on_response_done(&mut self) {
        self.transition(TurnState::Idle);
    }

    /// A response was requested outside the VAD flow (e.g. at connect).
    pub fn response_requested(&mut self) {
        if self.state == TurnState::Idle {
            self.transition(TurnState::AwaitingResponse);
        }
    }

    pub fn reset(&mut self) {
        self.state = TurnState::Idle;
        self.overlapping_speech = false;
    }

    fn transition(&mut self, next: TurnState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "Turn state transition");
            self.state = next;
        }
    }
}
