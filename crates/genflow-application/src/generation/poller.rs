//! Job polling for deferred generations.

use genflow_core::config::PollingConfig;
use genflow_core::generation::{
    ClassifiedError, ErrorKind, GenerationService, JobHandle, JobState, JobStatus,
};
use genflow_core::session::ResultRef;
use std::sync::Arc;
use tokio::time::{Instant, sleep, timeout_at};
use tokio_util::sync::CancellationToken;

/// Receives every status response while a job is polled.
pub type StatusCallback = Arc<dyn Fn(&JobStatus) + Send + Sync>;

/// Terminal result of polling one job.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(ResultRef),
    Failed(ClassifiedError),
    /// The owner went away; no further ticks were scheduled.
    Cancelled,
}

/// Queries a job at a fixed interval until it is terminal, times out or is
/// cancelled. Ticks are strictly sequential.
pub struct JobPoller {
    service: Arc<dyn GenerationService>,
    config: PollingConfig,
}

impl JobPoller {
    pub fn new(service: Arc<dyn GenerationService>, config: PollingConfig) -> Self {
        Self { service, config }
    }

    pub async fn poll(
        &self,
        job: &JobHandle,
        on_status: Option<&StatusCallback>,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let deadline = Instant::now() + self.config.timeout();
        let interval = self.config.interval();
        let max_failures = self.config.max_consecutive_failures.max(1);
        let mut consecutive_failures = 0u32;
        let mut checks = 0u32;

        tracing::debug!(target: "job_poller", "Polling job {} every {:?}", job, interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(target: "job_poller", "Job {} polling cancelled", job);
                    return PollOutcome::Cancelled;
                }
                _ = sleep(interval) => {}
            }

            if Instant::now() >= deadline {
                return timed_out(job, checks);
            }

            let check = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(target: "job_poller", "Job {} polling cancelled", job);
                    return PollOutcome::Cancelled;
                }
                check = timeout_at(deadline, self.service.job_status(job)) => check,
            };
            checks += 1;

            let Ok(response) = check else {
                return timed_out(job, checks);
            };

            match response {
                Ok(status) => {
                    consecutive_failures = 0;
                    if let Some(callback) = on_status {
                        callback(&status);
                    }
                    match status.status {
                        JobState::Pending => {}
                        JobState::Completed => {
                            return match status.result_ref.filter(|r| !r.as_str().trim().is_empty())
                            {
                                Some(result) => {
                                    tracing::info!(
                                        target: "job_poller",
                                        "Job {} completed after {} checks",
                                        job,
                                        checks
                                    );
                                    PollOutcome::Completed(result)
                                }
                                None => PollOutcome::Failed(ClassifiedError::new(
                                    ErrorKind::GenerationFailed,
                                    "The job finished without a result.",
                                )),
                            };
                        }
                        JobState::Failed => {
                            let message = status
                                .error
                                .filter(|e| !e.trim().is_empty())
                                .unwrap_or_else(|| {
                                    ErrorKind::GenerationFailed.default_message().to_string()
                                });
                            tracing::info!(target: "job_poller", "Job {} failed: {}", job, message);
                            return PollOutcome::Failed(ClassifiedError::new(
                                ErrorKind::GenerationFailed,
                                message,
                            ));
                        }
                    }
                }
                Err(failure) => {
                    consecutive_failures += 1;
                    tracing::warn!(
                        target: "job_poller",
                        "Status check {}/{} for job {} failed: {}",
                        consecutive_failures,
                        max_failures,
                        job,
                        failure
                    );
                    if consecutive_failures >= max_failures {
                        return PollOutcome::Failed(ClassifiedError::new(
                            ErrorKind::InternalError,
                            format!("Lost contact with job {job}: {failure}"),
                        ));
                    }
                }
            }

            if Instant::now() >= deadline {
                return timed_out(job, checks);
            }
        }
    }
}

fn timed_out(job: &JobHandle, checks: u32) -> PollOutcome {
    tracing::warn!(target: "job_poller", "Job {} timed out after {} checks", job, checks);
    PollOutcome::Failed(ClassifiedError::new(
        ErrorKind::Timeout,
        ErrorKind::Timeout.default_message(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use genflow_core::generation::{
        EditRequest, GenerateResponse, GenerationRequest, RemoteFailure, RemoteResult,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replays scripted status responses; keeps answering pending when empty.
    struct ScriptedJobs {
        statuses: Mutex<VecDeque<RemoteResult<JobStatus>>>,
        checks: AtomicUsize,
    }

    impl ScriptedJobs {
        fn new(statuses: Vec<RemoteResult<JobStatus>>) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(statuses.into()),
                checks: AtomicUsize::new(0),
            })
        }

        fn checks(&self) -> usize {
            self.checks.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationService for ScriptedJobs {
        async fn generate(&self, _request: &GenerationRequest) -> RemoteResult<GenerateResponse> {
            unreachable!("poller never generates")
        }

        async fn job_status(&self, _job: &JobHandle) -> RemoteResult<JobStatus> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(JobStatus::pending()))
        }

        async fn edit(&self, _request: &EditRequest) -> RemoteResult<Option<ResultRef>> {
            unreachable!("poller never edits")
        }
    }

    fn config() -> PollingConfig {
        PollingConfig {
            interval_ms: 2_500,
            timeout_secs: 30,
            max_consecutive_failures: 3,
        }
    }

    fn poller(service: Arc<ScriptedJobs>) -> JobPoller {
        JobPoller::new(service, config())
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_and_reports_each_status() {
        let service = ScriptedJobs::new(vec![
            Ok(JobStatus::pending()),
            Ok(JobStatus::completed("r2")),
        ]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: StatusCallback = Arc::new(move |s: &JobStatus| {
            sink.lock().unwrap().push(s.status);
        });

        let started = Instant::now();
        let outcome = poller(service.clone())
            .poll(&JobHandle::new("j1"), Some(&callback), &CancellationToken::new())
            .await;

        assert_eq!(outcome, PollOutcome::Completed("r2".into()));
        assert_eq!(service.checks(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![JobState::Pending, JobState::Completed]);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(5_000));
        assert!(elapsed < Duration::from_millis(7_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_and_stops_ticking() {
        let service = ScriptedJobs::new(vec![]);
        let outcome = poller(service.clone())
            .poll(&JobHandle::new("j1"), None, &CancellationToken::new())
            .await;

        match outcome {
            PollOutcome::Failed(err) => assert_eq!(err.kind, ErrorKind::Timeout),
            other => panic!("unexpected outcome: {other:?}"),
        }
        let checks_at_timeout = service.checks();
        // 30s budget at 2.5s interval.
        assert_eq!(checks_at_timeout, 11);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(service.checks(), checks_at_timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_failed_check_is_tolerated() {
        let service = ScriptedJobs::new(vec![
            Err(RemoteFailure::transport("connection reset")),
            Ok(JobStatus::pending()),
            Err(RemoteFailure::transport("connection reset")),
            Ok(JobStatus::completed("r3")),
        ]);
        let outcome = poller(service.clone())
            .poll(&JobHandle::new("j1"), None, &CancellationToken::new())
            .await;
        assert_eq!(outcome, PollOutcome::Completed("r3".into()));
        assert_eq!(service.checks(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_failures_escalate_to_internal_error() {
        let service = ScriptedJobs::new(vec![
            Err(RemoteFailure::transport("down")),
            Err(RemoteFailure::transport("down")),
            Err(RemoteFailure::transport("down")),
            Ok(JobStatus::completed("never")),
        ]);
        let outcome = poller(service.clone())
            .poll(&JobHandle::new("j1"), None, &CancellationToken::new())
            .await;
        match outcome {
            PollOutcome::Failed(err) => assert_eq!(err.kind, ErrorKind::InternalError),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(service.checks(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_carries_reason() {
        let service = ScriptedJobs::new(vec![Ok(JobStatus::failed("face not detected"))]);
        let outcome = poller(service)
            .poll(&JobHandle::new("j1"), None, &CancellationToken::new())
            .await;
        assert_eq!(
            outcome,
            PollOutcome::Failed(ClassifiedError::new(
                ErrorKind::GenerationFailed,
                "face not detected"
            ))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_without_result_is_generation_failure() {
        let service = ScriptedJobs::new(vec![Ok(JobStatus {
            status: JobState::Completed,
            result_ref: None,
            error: None,
        })]);
        let outcome = poller(service)
            .poll(&JobHandle::new("j1"), None, &CancellationToken::new())
            .await;
        match outcome {
            PollOutcome::Failed(err) => assert_eq!(err.kind, ErrorKind::GenerationFailed),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_ticks() {
        let service = ScriptedJobs::new(vec![]);
        let token = CancellationToken::new();
        let poller = poller(service.clone());

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(6_000)).await;
            cancel.cancel();
        });

        let outcome = poller.poll(&JobHandle::new("j1"), None, &token).await;
        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(service.checks(), 2);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(service.checks(), 2);
    }
}
