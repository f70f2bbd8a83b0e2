use super::container::SessionContainer;
use crate::generation::{GenerationOrchestrator, StatusCallback};
use genflow_core::config::PollingConfig;
use genflow_core::credits::CreditsNotifier;
use genflow_core::error::Result;
use genflow_core::generation::{GenerationOutcome, GenerationService};
use genflow_core::session::{OutputPrefs, SessionStore};
use genflow_core::workflow::{GateAdvance, WorkflowVariant};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// What [`WorkflowInstance::advance`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Moved(usize),
    /// The last step was confirmed and the session was submitted.
    Submitted(GenerationOutcome),
}

/// One workflow variant: its session container and its own orchestrator.
pub struct WorkflowInstance {
    container: Arc<SessionContainer>,
    orchestrator: GenerationOrchestrator,
}

impl WorkflowInstance {
    pub fn new(container: Arc<SessionContainer>, orchestrator: GenerationOrchestrator) -> Self {
        Self {
            container,
            orchestrator,
        }
    }

    pub fn variant(&self) -> WorkflowVariant {
        self.container.variant()
    }

    pub fn container(&self) -> &SessionContainer {
        &self.container
    }

    pub fn orchestrator(&self) -> &GenerationOrchestrator {
        &self.orchestrator
    }

    /// Confirms the current step. On the last step this submits.
    pub async fn advance(&self) -> Result<AdvanceOutcome> {
        self.advance_with_status(None).await
    }

    pub async fn advance_with_status(
        &self,
        on_status: Option<StatusCallback>,
    ) -> Result<AdvanceOutcome> {
        match self.container.advance(self.orchestrator.is_busy()).await? {
            GateAdvance::Moved(step) => Ok(AdvanceOutcome::Moved(step)),
            GateAdvance::Submit => Ok(AdvanceOutcome::Submitted(
                self.orchestrator.submit_with_status(on_status).await?,
            )),
        }
    }

    pub async fn submit(&self) -> Result<GenerationOutcome> {
        self.orchestrator.submit().await
    }

    /// Resets the session. A submission still running resolves to
    /// `Superseded` and its result is dropped.
    pub async fn start_over(&self) -> Result<()> {
        self.container.start_over().await
    }
}

/// Creates workflow instances on first use and keeps them for reuse.
///
/// Variants never share a container or an in-flight guard; only the
/// credits notifier is common to all of them.
pub struct WorkflowRegistry {
    instances: Arc<RwLock<HashMap<WorkflowVariant, Arc<WorkflowInstance>>>>,
    store: Arc<dyn SessionStore>,
    service: Arc<dyn GenerationService>,
    credits: Arc<dyn CreditsNotifier>,
    polling: PollingConfig,
    defaults: OutputPrefs,
}

impl WorkflowRegistry {
    pub fn new(
        store: Arc<dyn SessionStore>,
        service: Arc<dyn GenerationService>,
        credits: Arc<dyn CreditsNotifier>,
        polling: PollingConfig,
        defaults: OutputPrefs,
    ) -> Self {
        Self {
            instances: Arc::new(RwLock::new(HashMap::new())),
            store,
            service,
            credits,
            polling,
            defaults,
        }
    }

    /// Returns the instance for `variant`, restoring it from the store the
    /// first time.
    pub async fn get(&self, variant: WorkflowVariant) -> Result<Arc<WorkflowInstance>> {
        {
            let instances = self.instances.read().await;
            if let Some(instance) = instances.get(&variant) {
                return Ok(instance.clone());
            }
        }

        let mut instances = self.instances.write().await;
        // Another caller may have created it while we waited.
        if let Some(instance) = instances.get(&variant) {
            return Ok(instance.clone());
        }

        let container = Arc::new(
            SessionContainer::open(variant, self.store.clone(), self.defaults).await?,
        );
        let orchestrator = GenerationOrchestrator::new(
            container.clone(),
            self.service.clone(),
            self.credits.clone(),
            self.polling,
        );
        let instance = Arc::new(WorkflowInstance::new(container, orchestrator));
        instances.insert(variant, instance.clone());
        tracing::debug!("[WorkflowRegistry] Created '{}' instance", variant);
        Ok(instance)
    }

    pub async fn start_over(&self, variant: WorkflowVariant) -> Result<()> {
        self.get(variant).await?.start_over().await
    }

    /// Drops the in-memory instance, abandoning any running submission.
    /// The stored session stays and is restored on next use.
    pub async fn release(&self, variant: WorkflowVariant) {
        let removed = self.instances.write().await.remove(&variant);
        if let Some(instance) = removed {
            instance.orchestrator().cancel();
            tracing::debug!("[WorkflowRegistry] Released '{}' instance", variant);
        }
    }

    pub async fn loaded_variants(&self) -> Vec<WorkflowVariant> {
        let instances = self.instances.read().await;
        WorkflowVariant::ALL
            .into_iter()
            .filter(|v| instances.contains_key(v))
            .collect()
    }
}
