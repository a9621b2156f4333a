//! Session negotiation payload.

use serde::Serialize;

use crate::config::RelayConfig;

pub const DEFAULT_VAD_THRESHOLD: f64 = 0.8;
pub const DEFAULT_PREFIX_PADDING_MS: u32 = 300;
pub const DEFAULT_SILENCE_DURATION_MS: u32 = 1000;
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const DEFAULT_TEMPERATURE: f64 = 0.6;

/// Output modalities requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Audio,
    Text,
}

/// Wire audio format for both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AudioFormat {
    #[serde(rename = "pcm16")]
    Pcm16,
}

/// Server-side voice activity detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub threshold: f64,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
    pub interrupt_response: bool,
}

impl Default for TurnDetection {
    fn default() -> Self {
        Self {
            kind: "server_vad",
            threshold: DEFAULT_VAD_THRESHOLD,
            prefix_padding_ms: DEFAULT_PREFIX_PADDING_MS,
            silence_duration_ms: DEFAULT_SILENCE_DURATION_MS,
            interrupt_response: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputAudioTranscription {
    pub model: String,
}

/// Immutable session configuration, sent verbatim in `session.update`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionConfig {
    pub modalities: Vec<Modality>,
    pub instructions: String,
    pub voice: String,
    pub input_audio_format: AudioFormat,
    pub output_audio_format: AudioFormat,
    /// `None` serializes as `null`, which disables server turn detection.
    pub turn_detection: Option<TurnDetection>,
    pub input_audio_transcription: InputAudioTranscription,
    pub temperature: f64,
}

impl SessionConfig {
    /// Whether the service will emit speech started/stopped events.
    pub fn vad_enabled(&self) -> bool {
        self.turn_detection.is_some()
    }

    /// Whether participant speech may cancel an in-flight response.
    pub fn interrupt_response(&self) -> bool {
        self.turn_detection
            .as_ref()
            .is_some_and(|vad| vad.interrupt_response)
    }
}

/// Builds the [`SessionConfig`] for a new connection.
pub struct SessionConfigurator;

impl SessionConfigurator {
    pub fn build(
        instructions: impl Into<String>,
        voice: impl Into<String>,
        vad_enabled: bool,
    ) -> SessionConfig {
        SessionConfig {
            modalities: vec![Modality::Audio, Modality::Text],
            instructions: instructions.into(),
            voice: voice.into(),
            input_audio_format: AudioFormat::Pcm16,
            output_audio_format: AudioFormat::Pcm16,
            turn_detection: vad_enabled.then(TurnDetection::default),
            input_audio_transcription: InputAudioTranscription {
                model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            },
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Build from relay configuration, honouring the barge-in flag.
    pub fn build_from(config: &RelayConfig) -> SessionConfig {
        let mut session = Self::build(
            config.instructions.clone(),
            config.voice.clone(),
            config.vad_enabled,
        );
        if let Some(vad) = session.turn_detection.as_mut() {
            vad.interrupt_response = config.interrupt_response;
        }
        session
    }
}
