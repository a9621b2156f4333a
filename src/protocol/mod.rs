//! Wire types for the upstream realtime protocol and the participant channel.
//!
//! Audio payloads are raw bytes internally and base64 strings on the wire.

pub mod client;
pub mod participant;
pub mod server;

pub use client::{ClientEvent, ContentPart, ConversationItem};
pub use participant::{ParticipantInput, ParticipantMessage};
pub use server::ServerEvent;

use base64::Engine;

pub(crate) fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub(crate) fn decode_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(text)
}

pub(crate) fn serialize_audio_bytes<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&encode_base64(bytes))
}
