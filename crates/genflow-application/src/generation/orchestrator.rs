//! Generation orchestration for one workflow instance.

use super::poller::{JobPoller, PollOutcome, StatusCallback};
use crate::session::{SessionContainer, SubmissionTicket};
use genflow_core::config::PollingConfig;
use genflow_core::credits::CreditsNotifier;
use genflow_core::error::{GenflowError, Result};
use genflow_core::generation::{
    ClassifiedError, EditRequest, ErrorKind, GenerateResponse, GenerationOutcome,
    GenerationRequest, GenerationService, SubmissionEvent, SubmissionState, classify,
};
use genflow_core::session::ResultRef;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Drives submissions of one workflow variant.
///
/// At most one submission is in flight at a time; a second `submit` while
/// one is running is rejected with [`GenflowError::SubmissionInFlight`] and
/// makes no network call.
pub struct GenerationOrchestrator {
    container: Arc<SessionContainer>,
    service: Arc<dyn GenerationService>,
    credits: Arc<dyn CreditsNotifier>,
    poller: JobPoller,
    state: Mutex<SubmissionState>,
    /// Token of the running submission, if any.
    current: Mutex<Option<CancellationToken>>,
}

/// Resets the submission state if a submission future is dropped midway.
struct InFlightGuard<'a> {
    orchestrator: &'a GenerationOrchestrator,
    finished: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.orchestrator.transition(SubmissionEvent::Reset);
        }
        self.orchestrator.set_current(None);
    }
}

enum Attempt {
    Succeeded(ResultRef),
    Failed(ClassifiedError),
}

impl GenerationOrchestrator {
    pub fn new(
        container: Arc<SessionContainer>,
        service: Arc<dyn GenerationService>,
        credits: Arc<dyn CreditsNotifier>,
        polling: PollingConfig,
    ) -> Self {
        Self {
            container,
            poller: JobPoller::new(service.clone(), polling),
            service,
            credits,
            state: Mutex::new(SubmissionState::Idle),
            current: Mutex::new(None),
        }
    }

    pub fn container(&self) -> &Arc<SessionContainer> {
        &self.container
    }

    /// Current submission state.
    pub fn state(&self) -> SubmissionState {
        self.state
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    fn set_current(&self, token: Option<CancellationToken>) {
        if let Ok(mut current) = self.current.lock() {
            *current = token;
        }
    }

    /// Abandons the running submission without touching the session. The
    /// pending `submit` resolves to [`GenflowError::Cancelled`].
    pub fn cancel(&self) {
        if let Ok(current) = self.current.lock() {
            if let Some(token) = current.as_ref() {
                token.cancel();
            }
        }
    }

    fn transition(&self, event: SubmissionEvent) -> Result<SubmissionState> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| GenflowError::internal(format!("submission state poisoned: {e}")))?;
        let next = state.transition(event)?;
        *state = next.clone();
        Ok(next)
    }

    /// Submits the session: an edit of the current result when in edit mode
    /// with an instruction, otherwise a fresh generation.
    pub async fn submit(&self) -> Result<GenerationOutcome> {
        self.submit_with_status(None).await
    }

    /// Like [`submit`](Self::submit), reporting every job status response to
    /// `on_status` while a deferred job is polled.
    pub async fn submit_with_status(
        &self,
        on_status: Option<StatusCallback>,
    ) -> Result<GenerationOutcome> {
        let variant = self.container.variant();
        if let Err(err) = self.transition(SubmissionEvent::Submit) {
            return Err(match err {
                GenflowError::InvalidTransition { .. } => GenflowError::SubmissionInFlight {
                    variant: variant.to_string(),
                },
                other => other,
            });
        }
        let mut guard = InFlightGuard {
            orchestrator: self,
            finished: false,
        };

        let ticket = self.container.begin_submission().await;
        self.set_current(Some(ticket.token.clone()));
        let result = self.run(&ticket, on_status.as_ref()).await;

        guard.finished = true;
        let event = match &result {
            Ok(GenerationOutcome::Completed(result)) => SubmissionEvent::Succeeded(result.clone()),
            Ok(outcome) => {
                SubmissionEvent::Failed(outcome.kind().unwrap_or(ErrorKind::InternalError))
            }
            Err(_) => SubmissionEvent::Reset,
        };
        self.transition(event)?;
        result
    }

    async fn run(
        &self,
        ticket: &SubmissionTicket,
        on_status: Option<&StatusCallback>,
    ) -> Result<GenerationOutcome> {
        let variant = self.container.variant();

        let attempt = match EditRequest::from_session(&ticket.session) {
            Some(edit) => {
                tracing::info!(
                    target: "orchestrator",
                    "[{}] Editing {} (session {})",
                    variant,
                    edit.base_image,
                    ticket.session_id
                );
                self.run_edit(&edit, ticket).await?
            }
            None => match GenerationRequest::assemble(&ticket.session) {
                Ok(request) => {
                    tracing::info!(
                        target: "orchestrator",
                        "[{}] Generating from {} image(s) (session {})",
                        variant,
                        request.subject_images.len(),
                        ticket.session_id
                    );
                    self.run_generate(&request, ticket, on_status).await?
                }
                Err(invalid) => {
                    tracing::info!(
                        target: "orchestrator",
                        "[{}] Rejected locally: {}",
                        variant,
                        invalid.message
                    );
                    Attempt::Failed(invalid)
                }
            },
        };

        // A cancel may land together with the response.
        if ticket.token.is_cancelled() {
            return Err(self.stale_error(ticket.session_id).await);
        }

        match attempt {
            Attempt::Succeeded(result) => {
                self.container.apply_result(ticket, result.clone()).await?;
                self.credits.invalidate().await;
                tracing::info!(target: "orchestrator", "[{}] Completed: {}", variant, result);
                Ok(GenerationOutcome::Completed(result))
            }
            Attempt::Failed(classified) => {
                tracing::warn!(
                    target: "orchestrator",
                    "[{}] Failed ({}): {}",
                    variant,
                    classified.kind,
                    classified.message
                );
                Ok(classified.into_outcome())
            }
        }
    }

    async fn run_edit(&self, edit: &EditRequest, ticket: &SubmissionTicket) -> Result<Attempt> {
        let response = self.cancellable(ticket, self.service.edit(edit)).await?;
        Ok(match response {
            Ok(Some(result)) => Attempt::Succeeded(result),
            Ok(None) => Attempt::Failed(ClassifiedError::new(
                ErrorKind::GenerationFailed,
                "The edit produced no result.",
            )),
            Err(failure) => Attempt::Failed(classify(&failure)),
        })
    }

    async fn run_generate(
        &self,
        request: &GenerationRequest,
        ticket: &SubmissionTicket,
        on_status: Option<&StatusCallback>,
    ) -> Result<Attempt> {
        let response = self
            .cancellable(ticket, self.service.generate(request))
            .await?;

        let job = match response {
            Ok(GenerateResponse::Immediate(result)) => return Ok(Attempt::Succeeded(result)),
            Ok(GenerateResponse::Deferred(job)) => job,
            Err(failure) => return Ok(Attempt::Failed(classify(&failure))),
        };

        self.transition(SubmissionEvent::JobAccepted(job.clone()))?;
        tracing::info!(
            target: "orchestrator",
            "[{}] Job {} accepted",
            self.container.variant(),
            job
        );

        match self.poller.poll(&job, on_status, &ticket.token).await {
            PollOutcome::Completed(result) => Ok(Attempt::Succeeded(result)),
            PollOutcome::Failed(classified) => Ok(Attempt::Failed(classified)),
            PollOutcome::Cancelled => Err(self.stale_error(ticket.session_id).await),
        }
    }

    /// Races a remote call against the submission token.
    async fn cancellable<T>(
        &self,
        ticket: &SubmissionTicket,
        call: impl Future<Output = T>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = ticket.token.cancelled() => Err(self.stale_error(ticket.session_id).await),
            value = call => Ok(value),
        }
    }

    /// `Superseded` when the session was started over, `Cancelled` otherwise.
    async fn stale_error(&self, session_id: Uuid) -> GenflowError {
        let err = if self.container.session_id().await != session_id {
            GenflowError::Superseded
        } else {
            GenflowError::Cancelled
        };
        tracing::debug!(
            target: "orchestrator",
            "[{}] Submission abandoned: {}",
            self.container.variant(),
            err
        );
        err
    }
}
