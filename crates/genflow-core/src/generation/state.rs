//! Submission lifecycle as an explicit state machine.

use super::outcome::ErrorKind;
use super::service::JobHandle;
use crate::error::{GenflowError, Result};
use crate::session::ResultRef;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    AwaitingJob {
        job: JobHandle,
    },
    Completed {
        result: ResultRef,
    },
    Failed {
        kind: ErrorKind,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEvent {
    Submit,
    JobAccepted(JobHandle),
    Succeeded(ResultRef),
    Failed(ErrorKind),
    Reset,
}

impl SubmissionState {
    /// True while a submission owns the workflow instance.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Submitting | Self::AwaitingJob { .. })
    }

    /// The single transition function.
    pub fn transition(&self, event: SubmissionEvent) -> Result<SubmissionState> {
        use SubmissionEvent as E;
        use SubmissionState as S;

        let next = match (self, event) {
            (_, E::Reset) => S::Idle,
            (S::Idle | S::Completed { .. } | S::Failed { .. }, E::Submit) => S::Submitting,
            (S::Submitting, E::JobAccepted(job)) => S::AwaitingJob { job },
            (S::Submitting | S::AwaitingJob { .. }, E::Succeeded(result)) => {
                S::Completed { result }
            }
            (S::Submitting | S::AwaitingJob { .. }, E::Failed(kind)) => S::Failed { kind },
            (state, event) => {
                return Err(GenflowError::InvalidTransition {
                    from: state.to_string(),
                    event: format!("{event:?}"),
                });
            }
        };
        Ok(next)
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Submitting => f.write_str("submitting"),
            Self::AwaitingJob { job } => write!(f, "awaiting job {job}"),
            Self::Completed { result } => write!(f, "completed ({result})"),
            Self::Failed { kind } => write!(f, "failed ({kind})"),
        }
    }
}
