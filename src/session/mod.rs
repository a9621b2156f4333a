//! Per-session state: negotiation payload, turn tracking and transcript.

pub mod config;
pub mod transcript;
pub mod turn;

pub use config::{SessionConfig, SessionConfigurator, TurnDetection};
pub use transcript::{TranscriptAccumulator, TranscriptRecord, TranscriptSource};
pub use turn::{TurnRequest, TurnState, TurnStateMachine};
