//! Remote generation service contract.

use super::request::{EditRequest, GenerationRequest};
use crate::session::ResultRef;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque handle of a deferred server-side job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Response of the generate endpoint, decided once at the network boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateResponse {
    Immediate(ResultRef),
    Deferred(JobHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One status-check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub status: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "resultUrl")]
    pub result_ref: Option<ResultRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatus {
    pub fn pending() -> Self {
        Self {
            status: JobState::Pending,
            result_ref: None,
            error: None,
        }
    }

    pub fn completed(result: impl Into<ResultRef>) -> Self {
        Self {
            status: JobState::Completed,
            result_ref: Some(result.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: JobState::Failed,
            result_ref: None,
            error: Some(error.into()),
        }
    }
}

/// Structured error body returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, alias = "error")]
    pub message: Option<String>,
    /// Seconds.
    #[serde(default, alias = "retry_after")]
    pub retry_after: Option<u64>,
    #[serde(default)]
    pub available: Option<u32>,
    #[serde(default)]
    pub required: Option<u32>,
}

/// Raw failure signal of a remote call. Never leaves the orchestrator
/// unclassified.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteFailure {
    /// Non-success HTTP-style status with its decoded body.
    Http {
        status: u16,
        body: RemoteErrorBody,
        retry_after: Option<Duration>,
    },
    /// The request never produced a response.
    Transport { message: String, is_timeout: bool },
    /// A success response whose body could not be understood.
    Decode(String),
}

impl RemoteFailure {
    pub fn http(status: u16, body: RemoteErrorBody) -> Self {
        Self::Http {
            status,
            body,
            retry_after: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            is_timeout: false,
        }
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { status, body, .. } => write!(
                f,
                "HTTP {status}{}{}",
                body.code
                    .as_deref()
                    .map(|c| format!(" [{c}]"))
                    .unwrap_or_default(),
                body.message
                    .as_deref()
                    .map(|m| format!(": {m}"))
                    .unwrap_or_default()
            ),
            Self::Transport { message, .. } => write!(f, "transport error: {message}"),
            Self::Decode(message) => write!(f, "invalid response: {message}"),
        }
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteFailure>;

/// The remote generation service.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Starts a fresh generation.
    async fn generate(&self, request: &GenerationRequest) -> RemoteResult<GenerateResponse>;

    /// Queries a deferred job.
    async fn job_status(&self, job: &JobHandle) -> RemoteResult<JobStatus>;

    /// Refines an existing result. Synchronous by contract: `None` means the
    /// service produced nothing.
    async fn edit(&self, request: &EditRequest) -> RemoteResult<Option<ResultRef>>;
}
