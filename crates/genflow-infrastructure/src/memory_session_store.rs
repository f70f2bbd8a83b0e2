//! In-memory session store for tests and ephemeral embedding.

use async_trait::async_trait;
use genflow_core::error::Result;
use genflow_core::session::{SessionStore, WorkflowSession};
use genflow_core::workflow::WorkflowVariant;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<WorkflowVariant, WorkflowSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of variants with a stored session.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, variant: WorkflowVariant) -> Result<Option<WorkflowSession>> {
        Ok(self.sessions.read().await.get(&variant).cloned())
    }

    async fn save(&self, session: &WorkflowSession) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.variant, session.clone());
        Ok(())
    }

    async fn clear(&self, variant: WorkflowVariant) -> Result<()> {
        self.sessions.write().await.remove(&variant);
        Ok(())
    }
}
