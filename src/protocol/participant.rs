//! Messages exchanged with the participant.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::{decode_base64, encode_base64};
use crate::error::{RelayError, Result};

/// Participant → relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantInput {
    Text(String),
    /// Raw PCM16 captured on the participant side.
    Audio(Vec<u8>),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireInput {
    Text { data: String },
    Audio { data: String },
}

impl ParticipantInput {
    /// Parse `{"type":"text","data":...}` or `{"type":"audio","data":<base64>}`.
    pub fn parse(payload: &str) -> Result<Self> {
        let wire: WireInput = serde_json::from_str(payload)
            .map_err(|error| RelayError::decode(format!("invalid participant message: {error}")))?;
        match wire {
            WireInput::Text { data } => Ok(Self::Text(data)),
            WireInput::Audio { data } => decode_base64(&data)
                .map(Self::Audio)
                .map_err(|error| RelayError::decode(format!("invalid participant audio: {error}"))),
        }
    }
}

/// Relay → participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantMessage {
    /// Finalized transcript, sent as `{"text": ...}`.
    Transcript { text: String },
    /// Encoded audio for one completed response segment.
    Audio { data: Vec<u8> },
    AudioDone,
    Error { message: String },
    /// Partial response text.
    TextDelta { text: String },
}

impl ParticipantMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transcript { .. } => "text",
            Self::Audio { .. } => "audio",
            Self::AudioDone => "audio_done",
            Self::Error { .. } => "error",
            Self::TextDelta { .. } => "text_delta",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(RelayError::from)
    }
}

impl Serialize for ParticipantMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Transcript { text } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("text", text)?;
                map.end()
            }
            Self::Audio { data } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "audio")?;
                map.serialize_entry("data", &encode_base64(data))?;
                map.end()
            }
            Self::AudioDone => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("type", "audio_done")?;
                map.end()
            }
            Self::Error { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "error")?;
                map.serialize_entry("data", message)?;
                map.end()
            }
            Self::TextDelta { text } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "text_delta")?;
                map.serialize_entry("data", text)?;
                map.end()
            }
        }
    }
}
