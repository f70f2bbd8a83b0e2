//! Shared test doubles for the application integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use genflow_application::{CreditsCache, WorkflowInstance, WorkflowRegistry};
use genflow_core::config::PollingConfig;
use genflow_core::credits::{CreditsNotifier, CreditsSource};
use genflow_core::error::Result;
use genflow_core::generation::{
    EditRequest, GenerateResponse, GenerationRequest, GenerationService, JobHandle, JobStatus,
    RemoteResult,
};
use genflow_core::session::{CatalogId, OutputPrefs, ResultRef};
use genflow_core::workflow::WorkflowVariant;
use genflow_infrastructure::InMemorySessionStore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Scripted remote service that records every call.
#[derive(Default)]
pub struct MockGenerationService {
    generate_responses: Mutex<VecDeque<RemoteResult<GenerateResponse>>>,
    job_statuses: Mutex<VecDeque<RemoteResult<JobStatus>>>,
    edit_responses: Mutex<VecDeque<RemoteResult<Option<ResultRef>>>>,
    pub generate_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub edit_calls: AtomicUsize,
    pub generate_requests: Mutex<Vec<GenerationRequest>>,
    pub edit_requests: Mutex<Vec<EditRequest>>,
    /// When set, `generate` for that variant waits for a notification first.
    gate: Mutex<Option<(WorkflowVariant, Arc<Notify>)>>,
    on_respond: Mutex<Option<RespondHook>>,
}

/// Runs as a call is about to return; gets the call name.
pub type RespondHook = Arc<dyn Fn(&str) + Send + Sync>;

impl MockGenerationService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_generate(&self, response: RemoteResult<GenerateResponse>) {
        self.generate_responses.lock().unwrap().push_back(response);
    }

    pub fn push_status(&self, status: RemoteResult<JobStatus>) {
        self.job_statuses.lock().unwrap().push_back(status);
    }

    pub fn push_edit(&self, response: RemoteResult<Option<ResultRef>>) {
        self.edit_responses.lock().unwrap().push_back(response);
    }

    /// Makes `generate` calls for `variant` block until the returned notify
    /// fires.
    pub fn hold_generate(&self, variant: WorkflowVariant) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some((variant, notify.clone()));
        notify
    }

    /// Lets every later `generate` call through.
    pub fn release_holds(&self) {
        *self.gate.lock().unwrap() = None;
    }

    /// Installs a hook that runs right before each response is handed back.
    pub fn on_respond(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.on_respond.lock().unwrap() = Some(Arc::new(hook));
    }

    fn responding(&self, call: &str) {
        let hook = self.on_respond.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook(call);
        }
    }

    pub fn generate_count(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn status_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn edit_count(&self) -> usize {
        self.edit_calls.load(Ordering::SeqCst)
    }

    pub fn network_calls(&self) -> usize {
        self.generate_count() + self.status_count() + self.edit_count()
    }

    async fn wait_for_gate(&self, variant: WorkflowVariant) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some((held, notify)) = gate {
            if held == variant {
                notify.notified().await;
            }
        }
    }
}

#[async_trait]
impl GenerationService for MockGenerationService {
    async fn generate(&self, request: &GenerationRequest) -> RemoteResult<GenerateResponse> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.generate_requests.lock().unwrap().push(request.clone());
        self.wait_for_gate(request.variant).await;
        let response = self
            .generate_responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected generate call");
        self.responding("generate");
        response
    }

    async fn job_status(&self, _job: &JobHandle) -> RemoteResult<JobStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let status = self
            .job_statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(JobStatus::pending()));
        self.responding("job_status");
        status
    }

    async fn edit(&self, request: &EditRequest) -> RemoteResult<Option<ResultRef>> {
        self.edit_calls.fetch_add(1, Ordering::SeqCst);
        self.edit_requests.lock().unwrap().push(request.clone());
        let response = self
            .edit_responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected edit call");
        self.responding("edit");
        response
    }
}

/// Fixed balance source that counts reads.
pub struct FixedCredits {
    pub balance: u32,
    pub reads: AtomicUsize,
}

#[async_trait]
impl CreditsSource for FixedCredits {
    async fn remaining_credits(&self) -> Result<u32> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.balance)
    }
}

/// Counts invalidations.
#[derive(Default)]
pub struct CountingNotifier {
    pub invalidations: AtomicUsize,
}

#[async_trait]
impl CreditsNotifier for CountingNotifier {
    async fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

impl CountingNotifier {
    pub fn count(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

pub fn polling() -> PollingConfig {
    PollingConfig {
        interval_ms: 2_500,
        timeout_secs: 60,
        max_consecutive_failures: 3,
    }
}

pub struct Harness {
    pub registry: WorkflowRegistry,
    pub service: Arc<MockGenerationService>,
    pub store: Arc<InMemorySessionStore>,
    pub notifier: Arc<CountingNotifier>,
}

pub fn harness() -> Harness {
    harness_with(polling())
}

pub fn harness_with(polling: PollingConfig) -> Harness {
    let service = MockGenerationService::new();
    let store = Arc::new(InMemorySessionStore::new());
    let notifier = Arc::new(CountingNotifier::default());
    let registry = WorkflowRegistry::new(
        store.clone(),
        service.clone(),
        notifier.clone(),
        polling,
        OutputPrefs::default(),
    );
    Harness {
        registry,
        service,
        store,
        notifier,
    }
}

pub fn credits_cache(balance: u32) -> (Arc<CreditsCache>, Arc<FixedCredits>) {
    let source = Arc::new(FixedCredits {
        balance,
        reads: AtomicUsize::new(0),
    });
    (Arc::new(CreditsCache::new(source.clone())), source)
}

/// Fills every input and selection `variant` needs for a fresh generation.
pub async fn prepare(instance: &WorkflowInstance) {
    let container = instance.container();
    container
        .set_input(0, "data:image/png;base64,AAAA".to_string())
        .await
        .unwrap();
    if instance.variant().requires_subject() {
        container
            .select_subject(Some(CatalogId::Int(12)))
            .await
            .unwrap();
    }
    if instance.variant().requires_backdrop() {
        container
            .select_backdrop(Some(CatalogId::Text("sunset-beach".into())))
            .await
            .unwrap();
    }
}

/// Yields until `condition` holds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    while !condition() {
        tokio::task::yield_now().await;
    }
}
