//! Generation outcomes and the error taxonomy that drives the UI.

use crate::session::ResultRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Closed set of generation failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationFailed,
    AuthRequired,
    InsufficientCredits,
    RateLimited,
    GenerationFailed,
    Timeout,
    InternalError,
}

/// Action the UI offers next to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Re-invoke submit with the unchanged session.
    Retry,
    /// Send the user to the login flow.
    LogIn,
    /// Show the blocking upgrade dialog.
    UpgradeDialog,
}

impl ErrorKind {
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::AuthRequired => Recovery::LogIn,
            Self::InsufficientCredits => Recovery::UpgradeDialog,
            _ => Recovery::Retry,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "Some of the inputs could not be used. Check the uploads and try again.",
            Self::AuthRequired => "Please log in to continue.",
            Self::InsufficientCredits => "You do not have enough credits for this generation.",
            Self::RateLimited => "Too many requests. Please wait a moment and try again.",
            Self::GenerationFailed => "The image could not be generated for these inputs.",
            Self::Timeout => "The generation took too long. Please try again.",
            Self::InternalError => "Something went wrong. Please try again.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ValidationFailed => "validation_failed",
            Self::AuthRequired => "auth_required",
            Self::InsufficientCredits => "insufficient_credits",
            Self::RateLimited => "rate_limited",
            Self::GenerationFailed => "generation_failed",
            Self::Timeout => "timeout",
            Self::InternalError => "internal_error",
        };
        f.write_str(label)
    }
}

/// Credit counts carried by an insufficient-credits refusal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditShortfall {
    pub available: u32,
    pub required: u32,
}

/// A failure after classification, before it is turned into an outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub retry_after: Option<Duration>,
    pub shortfall: Option<CreditShortfall>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
            shortfall: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn with_shortfall(mut self, shortfall: CreditShortfall) -> Self {
        self.shortfall = Some(shortfall);
        self
    }

    /// Converts to an outcome; insufficient credits always short-circuit to
    /// the dedicated variant.
    pub fn into_outcome(self) -> GenerationOutcome {
        if self.kind == ErrorKind::InsufficientCredits {
            let shortfall = self.shortfall.unwrap_or(CreditShortfall {
                available: 0,
                required: 0,
            });
            return GenerationOutcome::InsufficientCredits {
                available: shortfall.available,
                required: shortfall.required,
            };
        }
        GenerationOutcome::Failed {
            kind: self.kind,
            message: self.message,
            retry_after: self.retry_after,
        }
    }
}

/// Result of one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Completed(ResultRef),
    Failed {
        kind: ErrorKind,
        message: String,
        retry_after: Option<Duration>,
    },
    InsufficientCredits {
        available: u32,
        required: u32,
    },
}

/// How the UI should surface an outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Presentation {
    Result(ResultRef),
    Inline {
        message: String,
        recovery: Recovery,
        retry_after: Option<Duration>,
    },
    UpgradeDialog {
        available: u32,
        required: u32,
    },
}

impl GenerationOutcome {
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        ClassifiedError::new(kind, message).into_outcome()
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Completed(_) => None,
            Self::Failed { kind, .. } => Some(*kind),
            Self::InsufficientCredits { .. } => Some(ErrorKind::InsufficientCredits),
        }
    }

    pub fn presentation(&self) -> Presentation {
        match self {
            Self::Completed(result) => Presentation::Result(result.clone()),
            Self::Failed {
                kind,
                message,
                retry_after,
            } => Presentation::Inline {
                message: if message.trim().is_empty() {
                    kind.default_message().to_string()
                } else {
                    message.clone()
                },
                recovery: kind.recovery(),
                retry_after: *retry_after,
            },
            Self::InsufficientCredits {
                available,
                required,
            } => Presentation::UpgradeDialog {
                available: *available,
                required: *required,
            },
        }
    }
}
