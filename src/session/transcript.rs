//! Session-scoped transcript log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display};

/// Who spoke the transcribed utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TranscriptSource {
    Participant,
    Service,
}

/// One finalized utterance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptRecord {
    pub source: TranscriptSource,
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only, ordered transcript of the current session.
#[derive(Debug, Clone, Default)]
pub struct TranscriptAccumulator {
    records: Vec<TranscriptRecord>,
}

impl TranscriptAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, source: TranscriptSource, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(source = %source, transcript = %text, "Transcript");
        self.records.push(TranscriptRecord {
            source,
            text,
            recorded_at: Utc::now(),
        });
    }

    pub fn records(&self) -> &[TranscriptRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<TranscriptRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_keep_arrival_order_and_source() {
        let mut transcript = TranscriptAccumulator::new();
        transcript.append(TranscriptSource::Participant, "hola");
        transcript.append(TranscriptSource::Service, "hola, ¿qué tal?");

        let records = transcript.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source, TranscriptSource::Participant);
        assert_eq!(records[0].text, "hola");
        assert_eq!(records[1].source, TranscriptSource::Service);
        assert!(records[0].recorded_at <= records[1].recorded_at);
    }

    #[test]
    fn source_serializes_in_snake_case() {
        let value = serde_json::to_value(TranscriptSource::Participant).unwrap();
        assert_eq!(value, "participant");
        assert_eq!(TranscriptSource::Service.to_string(), "service");
    }
}
