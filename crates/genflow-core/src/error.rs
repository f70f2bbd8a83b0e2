//! Error types for the Genflow engine.
//!
//! Generation failures reported by the remote service are *not* represented
//! here: they are classified into [`crate::generation::ErrorKind`] values and
//! returned as a [`crate::generation::GenerationOutcome`]. `GenflowError`
//! covers everything else: storage, configuration, and rejections raised by
//! the engine itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Genflow engine.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GenflowError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Local input validation error (raised before any network call)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A submission is already running for this workflow variant
    #[error("A generation is already in progress for '{variant}'")]
    SubmissionInFlight { variant: String },

    /// The session was reset while the submission was running; the late
    /// result was discarded.
    #[error("Submission superseded by a session reset")]
    Superseded,

    /// The submission was cancelled by its owner
    #[error("Submission cancelled")]
    Cancelled,

    /// Illegal submission state transition
    #[error("Invalid transition: {event} while {from}")]
    InvalidTransition { from: String, event: String },

    /// Step navigation was refused
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GenflowError {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn navigation(message: impl Into<String>) -> Self {
        Self::Navigation(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True when the error means "a result arrived for a submission nobody
    /// is waiting on any more" (reset or cancelled). Callers usually drop
    /// these silently instead of showing them.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Superseded | Self::Cancelled)
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for GenflowError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for GenflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for GenflowError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for GenflowError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, GenflowError>`.
pub type Result<T> = std::result::Result<T, GenflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion_keeps_kind() {
        let err: GenflowError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        match err {
            GenflowError::Io { message } => assert!(message.contains("PermissionDenied")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_stale_errors() {
        assert!(GenflowError::Superseded.is_stale());
        assert!(GenflowError::Cancelled.is_stale());
        assert!(!GenflowError::internal("boom").is_stale());
    }

    #[test]
    fn test_in_flight_message_names_variant() {
        let err = GenflowError::SubmissionInFlight {
            variant: "try-on".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "A generation is already in progress for 'try-on'"
        );
    }
}
