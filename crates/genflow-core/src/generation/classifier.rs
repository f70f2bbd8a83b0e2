//! Table-driven error classifier.
//!
//! Status codes are looked up in [`STATUS_TABLE`]. Only the refusal status
//! (403) defers to the body `code`, looked up in [`REFUSAL_CODE_TABLE`].
//! Anything not in the tables is an `InternalError`.

use super::outcome::{ClassifiedError, CreditShortfall, ErrorKind};
use super::service::{RemoteErrorBody, RemoteFailure};
use std::time::Duration;

/// How a status code is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRule {
    Kind(ErrorKind),
    /// Disambiguated by the body `code`; unknown codes are a refusal.
    ByCode,
}

pub const STATUS_TABLE: &[(u16, StatusRule)] = &[
    (400, StatusRule::Kind(ErrorKind::ValidationFailed)),
    (401, StatusRule::Kind(ErrorKind::AuthRequired)),
    (402, StatusRule::Kind(ErrorKind::InsufficientCredits)),
    (403, StatusRule::ByCode),
    (408, StatusRule::Kind(ErrorKind::Timeout)),
    (413, StatusRule::Kind(ErrorKind::ValidationFailed)),
    (415, StatusRule::Kind(ErrorKind::ValidationFailed)),
    (422, StatusRule::Kind(ErrorKind::ValidationFailed)),
    (429, StatusRule::Kind(ErrorKind::RateLimited)),
    (500, StatusRule::Kind(ErrorKind::InternalError)),
    (502, StatusRule::Kind(ErrorKind::InternalError)),
    (503, StatusRule::Kind(ErrorKind::InternalError)),
    (504, StatusRule::Kind(ErrorKind::Timeout)),
];

pub const REFUSAL_CODE_TABLE: &[(&str, ErrorKind)] = &[
    ("SHOP_NO_CREDITS", ErrorKind::InsufficientCredits),
    ("INSUFFICIENT_CREDITS", ErrorKind::InsufficientCredits),
    ("AUTH_REQUIRED", ErrorKind::AuthRequired),
    ("SESSION_EXPIRED", ErrorKind::AuthRequired),
    ("CONTENT_REJECTED", ErrorKind::GenerationFailed),
    ("GENERATION_FAILED", ErrorKind::GenerationFailed),
    ("UNSUPPORTED_FILE_TYPE", ErrorKind::ValidationFailed),
    ("INVALID_INPUT", ErrorKind::ValidationFailed),
];

/// Kind used for a 403 whose code is missing or unknown.
const REFUSAL_FALLBACK: ErrorKind = ErrorKind::GenerationFailed;

/// Looks up a status code. Total: unknown codes yield `InternalError`.
pub fn kind_for_status(status: u16, code: Option<&str>) -> ErrorKind {
    let rule = STATUS_TABLE
        .iter()
        .find(|(candidate, _)| *candidate == status)
        .map(|(_, rule)| *rule);

    match rule {
        Some(StatusRule::Kind(kind)) => kind,
        Some(StatusRule::ByCode) => code.map(kind_for_code).unwrap_or(REFUSAL_FALLBACK),
        None => ErrorKind::InternalError,
    }
}

fn kind_for_code(code: &str) -> ErrorKind {
    let normalized = code.trim().to_ascii_uppercase();
    REFUSAL_CODE_TABLE
        .iter()
        .find(|(candidate, _)| *candidate == normalized)
        .map(|(_, kind)| *kind)
        .unwrap_or(REFUSAL_FALLBACK)
}

/// Classifies a remote failure into exactly one kind.
pub fn classify(failure: &RemoteFailure) -> ClassifiedError {
    match failure {
        RemoteFailure::Http {
            status,
            body,
            retry_after,
        } => classify_http(*status, body, *retry_after),
        RemoteFailure::Transport {
            message,
            is_timeout: true,
        } => ClassifiedError::new(ErrorKind::Timeout, message.clone()),
        RemoteFailure::Transport { message, .. } => {
            ClassifiedError::new(ErrorKind::InternalError, message.clone())
        }
        RemoteFailure::Decode(message) => {
            ClassifiedError::new(ErrorKind::InternalError, message.clone())
        }
    }
}

fn classify_http(
    status: u16,
    body: &RemoteErrorBody,
    header_retry_after: Option<Duration>,
) -> ClassifiedError {
    let kind = kind_for_status(status, body.code.as_deref());
    let message = body
        .message
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| kind.default_message().to_string());

    let mut classified = ClassifiedError::new(kind, message);
    match kind {
        ErrorKind::RateLimited => {
            let retry_after = body
                .retry_after
                .map(Duration::from_secs)
                .or(header_retry_after);
            classified = classified.with_retry_after(retry_after);
        }
        ErrorKind::InsufficientCredits => {
            classified = classified.with_shortfall(CreditShortfall {
                available: body.available.unwrap_or(0),
                required: body.required.unwrap_or(0),
            });
        }
        _ => {}
    }
    classified
}
