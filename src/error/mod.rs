//! Error types for voxrelay.

use thiserror::Error;

/// Primary error type for all relay operations.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Connect error: {0}")]
    Connect(String),

    #[error("Send error: {0}")]
    Send(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Transcode error: {0}")]
    Transcode(String),

    #[error("Transport closed: {0}")]
    TransportClosed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Broad error category, used to decide whether a session survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Connect,
    Send,
    Decode,
    Transcode,
    TransportClosed,
    Configuration,
    Internal,
}

impl RelayError {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connect(_) => ErrorCategory::Connect,
            Self::Send(_) => ErrorCategory::Send,
            Self::Decode(_) => ErrorCategory::Decode,
            Self::Transcode(_) => ErrorCategory::Transcode,
            Self::TransportClosed(_) => ErrorCategory::TransportClosed,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::InvalidState(_) | Self::Io(_) | Self::Serialization(_) => ErrorCategory::Internal,
        }
    }

    /// Whether this error ends the session that observed it.
    ///
    /// Decode and transcode failures only cost the offending message; a closed
    /// transport ends the session but is a normal shutdown, not a failure.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self.category(),
            ErrorCategory::Decode | ErrorCategory::Transcode | ErrorCategory::TransportClosed
        )
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_and_transcode_errors_are_not_fatal() {
        assert!(!RelayError::decode("bad json").is_fatal());
        assert!(!RelayError::Transcode("encoder failed".into()).is_fatal());
        assert!(!RelayError::TransportClosed("peer left".into()).is_fatal());
    }

    #[test]
    fn connect_and_send_errors_are_fatal() {
        assert!(RelayError::Connect("handshake".into()).is_fatal());
        assert!(RelayError::Send("queue closed".into()).is_fatal());
        assert_eq!(
            RelayError::InvalidState("not connected".into()).category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn serde_errors_convert() {
        let error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let relay: RelayError = error.into();
        assert!(matches!(relay, RelayError::Serialization(_)));
    }
}
