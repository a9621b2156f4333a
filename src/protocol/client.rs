//! Events sent to the realtime service.

use serde::Serialize;

use super::serialize_audio_bytes;
use crate::session::SessionConfig;

/// Outbound upstream events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },

    #[serde(rename = "response.create")]
    ResponseCreate,

    #[serde(rename = "response.cancel")]
    ResponseCancel,

    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },

    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        #[serde(serialize_with = "serialize_audio_bytes")]
        audio: Vec<u8>,
    },
}

impl ClientEvent {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::ConversationItemCreate {
            item: ConversationItem::user_text(text),
        }
    }

    pub fn audio_append(chunk: impl Into<Vec<u8>>) -> Self {
        Self::InputAudioBufferAppend {
            audio: chunk.into(),
        }
    }

    /// Wire `type` tag, for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionUpdate { .. } => "session.update",
            Self::ResponseCreate => "response.create",
            Self::ResponseCancel => "response.cancel",
            Self::ConversationItemCreate { .. } => "conversation.item.create",
            Self::InputAudioBufferAppend { .. } => "input_audio_buffer.append",
        }
    }
}

/// A conversation message item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub role: String,
    pub content: Vec<ContentPart>,
}

impl ConversationItem {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            item_type: "message".into(),
            role: "user".into(),
            content: vec![ContentPart {
                content_type: "input_text".into(),
                text: text.into(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}
