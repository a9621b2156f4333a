//! Relay configuration (layered: defaults < file < env < code).
//!
//! The core never reads the environment itself. A [`RelayConfig`] is built
//! once at startup, validated, and shared read-only between sessions.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{RelayError, Result};

pub const DEFAULT_BASE_URL: &str = "wss://api.openai.com/v1/realtime";
pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview-2024-12-17";
pub const DEFAULT_VOICE: &str = "sage";
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Process-wide relay configuration.
#[derive(Clone)]
pub struct RelayConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub instructions: String,
    pub voice: String,
    /// Server-side VAD turn detection.
    pub vad_enabled: bool,
    /// Allow participant speech to cancel an in-flight response.
    pub interrupt_response: bool,
    /// Send a `response.create` right after the session is configured.
    pub eager_response: bool,
    /// Sample rate of the PCM16 audio exchanged with the service.
    pub sample_rate: u32,
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    /// Bound on queued outbound upstream frames.
    pub outbound_capacity: usize,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("instructions", &format_args!("{} chars", self.instructions.len()))
            .field("voice", &self.voice)
            .field("vad_enabled", &self.vad_enabled)
            .field("interrupt_response", &self.interrupt_response)
            .field("eager_response", &self.eager_response)
            .field("sample_rate", &self.sample_rate)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("connect_timeout", &self.connect_timeout)
            .field("send_timeout", &self.send_timeout)
            .field("outbound_capacity", &self.outbound_capacity)
            .finish()
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            instructions: String::new(),
            voice: DEFAULT_VOICE.to_string(),
            vad_enabled: true,
            interrupt_response: false,
            eager_response: true,
            sample_rate: DEFAULT_SAMPLE_RATE,
            heartbeat_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            send_timeout: Duration::from_secs(5),
            outbound_capacity: 256,
        }
    }
}

/// On-disk TOML layer. Every field is optional; durations are milliseconds.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub instructions: Option<String>,
    pub instructions_file: Option<PathBuf>,
    pub language: Option<String>,
    pub voice: Option<String>,
    pub vad_enabled: Option<bool>,
    pub interrupt_response: Option<bool>,
    pub eager_response: Option<bool>,
    pub sample_rate: Option<u32>,
    pub heartbeat_interval_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub send_timeout_ms: Option<u64>,
    pub outbound_capacity: Option<usize>,
}

impl RelayConfig {
    /// Load defaults, then the TOML file (explicit path, or the default
    /// location if it exists), then `.env` and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        let file_path = path.map(Path::to_path_buf).or_else(default_config_path);
        if let Some(file_path) = file_path {
            if path.is_some() || file_path.exists() {
                let raw = std::fs::read_to_string(&file_path)?;
                config.apply_file(toml::from_str(&raw).map_err(|error| {
                    RelayError::Configuration(format!(
                        "Invalid config file {}: {error}",
                        file_path.display()
                    ))
                })?)?;
                tracing::debug!(path = %file_path.display(), "Loaded config file");
            }
        }

        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay a parsed file layer.
    pub fn apply_file(&mut self, file: FileConfig) -> Result<()> {
        if let Some(api_key) = file.api_key {
            self.api_key = api_key;
        }
        if let Some(base_url) = file.base_url {
            self.base_url = base_url;
        }
        if let Some(model) = file.model {
            self.model = model;
        }
        if let Some(voice) = file.voice {
            self.voice = voice;
        }
        if let Some(instructions) = file.instructions {
            self.instructions = render_instructions(&instructions, file.language.as_deref());
        } else if let Some(template_path) = file.instructions_file {
            self.instructions = load_instructions(&template_path, file.language.as_deref())?;
        }
        if let Some(vad_enabled) = file.vad_enabled {
            self.vad_enabled = vad_enabled;
        }
        if let Some(interrupt_response) = file.interrupt_response {
            self.interrupt_response = interrupt_response;
        }
        if let Some(eager_response) = file.eager_response {
            self.eager_response = eager_response;
        }
        if let Some(sample_rate) = file.sample_rate {
            self.sample_rate = sample_rate;
        }
        if let Some(ms) = file.heartbeat_interval_ms {
            self.heartbeat_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = file.connect_timeout_ms {
            self.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.send_timeout_ms {
            self.send_timeout = Duration::from_millis(ms);
        }
        if let Some(capacity) = file.outbound_capacity {
            self.outbound_capacity = capacity;
        }
        Ok(())
    }

    /// Overlay environment variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup("OPENAI_API_KEY") {
            self.api_key = api_key;
        }
        if let Some(base_url) = lookup("OPENAI_REALTIME_URL") {
            self.base_url = base_url;
        }
        if let Some(model) = lookup("OPENAI_REALTIME_MODEL") {
            self.model = model;
        }
        if let Some(voice) = lookup("VOXRELAY_VOICE") {
            self.voice = voice;
        }
        if let Some(template_path) = lookup("VOXRELAY_INSTRUCTIONS_FILE") {
            let language = lookup("LANGUAGE");
            self.instructions = load_instructions(Path::new(&template_path), language.as_deref())?;
        }
        if let Some(flag) = lookup("VOXRELAY_VAD") {
            self.vad_enabled = parse_flag("VOXRELAY_VAD", &flag)?;
        }
        Ok(())
    }

    /// Reject configurations that cannot open a session.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(RelayError::Configuration("Missing OPENAI_API_KEY".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(RelayError::Configuration(
                "Realtime base URL cannot be empty".into(),
            ));
        }
        if self.outbound_capacity == 0 {
            return Err(RelayError::Configuration(
                "outbound_capacity must be at least 1".into(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(RelayError::Configuration("sample_rate must be non-zero".into()));
        }
        for (name, value) in [
            ("heartbeat_interval", self.heartbeat_interval),
            ("connect_timeout", self.connect_timeout),
            ("send_timeout", self.send_timeout),
        ] {
            if value.is_zero() {
                return Err(RelayError::Configuration(format!("{name} must be non-zero")));
            }
        }
        Ok(())
    }

    /// Upstream WebSocket URL with the model query parameter.
    pub fn realtime_url(&self) -> Result<String> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(RelayError::Configuration(
                "Realtime base URL cannot be empty".into(),
            ));
        }
        let separator = if trimmed.contains('?') { "&" } else { "?" };
        Ok(format!("{trimmed}{separator}model={}", self.model))
    }
}

/// Read an instructions template and substitute the language placeholders.
pub fn load_instructions(path: &Path, language: Option<&str>) -> Result<String> {
    let template = std::fs::read_to_string(path).map_err(|error| {
        RelayError::Configuration(format!(
            "Cannot read instructions file {}: {error}",
            path.display()
        ))
    })?;
    Ok(render_instructions(&template, language))
}

/// Replace `{l1}` and `{l2}` with the conversation language.
pub fn render_instructions(template: &str, language: Option<&str>) -> String {
    match language {
        Some(language) => template.replace("{l1}", language).replace("{l2}", language),
        None => template.to_string(),
    }
}

fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "voxrelay")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(RelayError::Configuration(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        "<unset>".to_string()
    } else {
        "<redacted>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn env_layer_overrides_file_layer() {
        let mut config = RelayConfig::default();
        config
            .apply_file(FileConfig {
                api_key: Some("file-key".into()),
                voice: Some("alloy".into()),
                vad_enabled: Some(true),
                ..FileConfig::default()
            })
            .unwrap();

        let env: HashMap<&str, &str> = [("OPENAI_API_KEY", "env-key"), ("VOXRELAY_VAD", "off")]
            .into_iter()
            .collect();
        config
            .apply_env(|key| env.get(key).map(|value| value.to_string()))
            .unwrap();

        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.voice, "alloy");
        assert!(!config.vad_enabled);
    }

    #[test]
    fn instructions_file_is_rendered_with_language() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instructions.txt");
        std::fs::write(&path, "Speak {l1}. Correct mistakes in {l2}.").unwrap();

        let mut config = RelayConfig::default();
        config
            .apply_file(FileConfig {
                instructions_file: Some(path),
                language: Some("Spanish".into()),
                ..FileConfig::default()
            })
            .unwrap();

        assert_eq!(config.instructions, "Speak Spanish. Correct mistakes in Spanish.");
    }

    #[test]
    fn missing_instructions_file_is_a_configuration_error() {
        let error = load_instructions(Path::new("/nonexistent/prompt.txt"), None).unwrap_err();
        assert!(matches!(error, RelayError::Configuration(_)));
    }

    #[test]
    fn load_reads_explicit_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxrelay.toml");
        std::fs::write(
            &path,
            "model = \"gpt-test\"\nsend_timeout_ms = 250\nouteroutbound = 1\n",
        )
        .unwrap();
        let error = RelayConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(error, RelayError::Configuration(_)));

        std::fs::write(&path, "model = \"gpt-test\"\nsend_timeout_ms = 250\n").unwrap();
        let config = RelayConfig::load(Some(&path)).unwrap();
        assert_eq!(config.model, "gpt-test");
        assert_eq!(config.send_timeout, Duration::from_millis(250));
    }

    #[test]
    fn validate_requires_api_key() {
        let config = RelayConfig::default();
        assert!(matches!(
            config.validate(),
            Err(RelayError::Configuration(message)) if message.contains("OPENAI_API_KEY")
        ));

        let config = RelayConfig {
            api_key: "sk-test".into(),
            ..RelayConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_durations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxrelay.toml");
        std::fs::write(&path, "api_key = \"sk-test\"\nheartbeat_interval_ms = 0\n").unwrap();
        let config = RelayConfig::load(Some(&path)).unwrap();
        assert!(matches!(
            config.validate(),
            Err(RelayError::Configuration(message)) if message.contains("heartbeat_interval")
        ));

        for config in [
            RelayConfig {
                api_key: "sk-test".into(),
                connect_timeout: Duration::ZERO,
                ..RelayConfig::default()
            },
            RelayConfig {
                api_key: "sk-test".into(),
                send_timeout: Duration::ZERO,
                ..RelayConfig::default()
            },
        ] {
            assert!(matches!(config.validate(), Err(RelayError::Configuration(_))));
        }
    }

    #[test]
    fn realtime_url_appends_model() {
        let mut config = RelayConfig {
            base_url: "ws://127.0.0.1:9/v1/realtime".into(),
            model: "m1".into(),
            ..RelayConfig::default()
        };
        assert_eq!(config.realtime_url().unwrap(), "ws://127.0.0.1:9/v1/realtime?model=m1");

        config.base_url = "ws://host/rt?debug=1".into();
        assert_eq!(config.realtime_url().unwrap(), "ws://host/rt?debug=1&model=m1");
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = RelayConfig {
            api_key: "sk-very-secret".into(),
            ..RelayConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn invalid_boolean_flag_is_rejected() {
        let mut config = RelayConfig::default();
        let error = config
            .apply_env(|key| (key == "VOXRELAY_VAD").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(error, RelayError::Configuration(_)));
    }
}
