//! Events received from the realtime service.

use serde_json::Value;

use super::decode_base64;
use crate::error::{RelayError, Result};

/// Inbound upstream events, classified by their `type` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    SessionCreated { session_id: Option<String> },
    SessionUpdated,
    /// Decoded PCM16 fragment.
    AudioDelta { delta: Vec<u8> },
    AudioDone,
    AudioTranscriptDelta { delta: String },
    AudioTranscriptDone { transcript: String },
    InputTranscriptionCompleted { transcript: String },
    TextDelta { delta: String },
    SpeechStarted,
    SpeechStopped,
    ResponseDone,
    ItemCreated { item: Value },
    Error { message: String },
    /// Unrecognized or missing `type`; ignored by dispatch.
    Unknown { event_type: Option<String> },
}

impl ServerEvent {
    /// Parse one text frame.
    pub fn parse(payload: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|error| RelayError::decode(format!("invalid event JSON: {error}")))?;
        Self::from_server_payload(&value)
    }

    /// Classify a parsed payload into a typed event.
    pub fn from_server_payload(payload: &Value) -> Result<Self> {
        if !payload.is_object() {
            return Err(RelayError::decode("event payload is not a JSON object"));
        }
        let Some(event_type) = payload.get("type").and_then(Value::as_str) else {
            return Ok(Self::Unknown { event_type: None });
        };

        let event = match event_type {
            "session.created" => Self::SessionCreated {
                session_id: string_at(payload, &["session", "id"]),
            },
            "session.updated" => Self::SessionUpdated,
            "response.audio.delta" => {
                let delta = required_string(payload, event_type, "delta")?;
                let delta = decode_base64(&delta).map_err(|error| {
                    RelayError::decode(format!("{event_type}: invalid base64 audio: {error}"))
                })?;
                Self::AudioDelta { delta }
            }
            "response.audio.done" => Self::AudioDone,
            "response.audio_transcript.delta" => Self::AudioTranscriptDelta {
                delta: required_string(payload, event_type, "delta")?,
            },
            "response.audio_transcript.done" => Self::AudioTranscriptDone {
                transcript: required_string(payload, event_type, "transcript")?,
            },
            "conversation.item.input_audio_transcription.completed" => {
                Self::InputTranscriptionCompleted {
                    transcript: required_string(payload, event_type, "transcript")?,
                }
            }
            "response.text.delta" => Self::TextDelta {
                delta: required_string(payload, event_type, "delta")?,
            },
            "input_audio_buffer.speech_started" => Self::SpeechStarted,
            "input_audio_buffer.speech_stopped" => Self::SpeechStopped,
            "response.done" => Self::ResponseDone,
            "conversation.item.created" => Self::ItemCreated {
                item: payload.get("item").cloned().unwrap_or(Value::Null),
            },
            "error" => Self::Error {
                message: string_at(payload, &["error", "message"])
                    .or_else(|| string_field(payload, "message"))
                    .unwrap_or_else(|| "An unknown error occurred.".to_string()),
            },
            other => Self::Unknown {
                event_type: Some(other.to_string()),
            },
        };
        Ok(event)
    }

    /// Wire `type` tag, for logging.
    pub fn event_type(&self) -> &str {
        match self {
            Self::SessionCreated { .. } => "session.created",
            Self::SessionUpdated => "session.updated",
            Self::AudioDelta { .. } => "response.audio.delta",
            Self::AudioDone => "response.audio.done",
            Self::AudioTranscriptDelta { .. } => "response.audio_transcript.delta",
            Self::AudioTranscriptDone { .. } => "response.audio_transcript.done",
            Self::InputTranscriptionCompleted { .. } => {
                "conversation.item.input_audio_transcription.completed"
            }
            Self::TextDelta { .. } => "response.text.delta",
            Self::SpeechStarted => "input_audio_buffer.speech_started",
            Self::SpeechStopped => "input_audio_buffer.speech_stopped",
            Self::ResponseDone => "response.done",
            Self::ItemCreated { .. } => "conversation.item.created",
            Self::Error { .. } => "error",
            Self::Unknown { event_type } => event_type.as_deref().unwrap_or("<missing>"),
        }
    }
}

fn required_string(payload: &Value, event_type: &str, field: &str) -> Result<String> {
    string_field(payload, field)
        .ok_or_else(|| RelayError::decode(format!("{event_type}: missing string field '{field}'")))
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str().map(ToString::to_string)
}
