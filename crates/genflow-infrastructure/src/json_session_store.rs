//! File-backed session store.
//!
//! One JSON snapshot per workflow variant at `<sessions_dir>/<variant>.json`.

use crate::paths::GenflowPaths;
use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use genflow_core::error::{GenflowError, Result};
use genflow_core::session::{SessionStore, WorkflowSession};
use genflow_core::workflow::WorkflowVariant;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct JsonFileSessionStore {
    sessions_dir: PathBuf,
}

impl JsonFileSessionStore {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }

    /// Store rooted at the platform default sessions directory.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(GenflowPaths::sessions_dir()?))
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn file_for(&self, variant: WorkflowVariant) -> AtomicJsonFile<WorkflowSession> {
        AtomicJsonFile::new(
            self.sessions_dir
                .join(format!("{}.json", variant.as_str())),
        )
    }
}

/// Repairs a snapshot written by an older step table.
fn normalize(variant: WorkflowVariant, mut session: WorkflowSession) -> Option<WorkflowSession> {
    if session.variant != variant {
        tracing::warn!(
            "Ignoring session snapshot for '{}' stored under '{}'",
            session.variant,
            variant
        );
        return None;
    }
    session.gate = session.gate.clamp_to(variant.step_count());
    Some(session)
}

#[async_trait]
impl SessionStore for JsonFileSessionStore {
    async fn load(&self, variant: WorkflowVariant) -> Result<Option<WorkflowSession>> {
        let file = self.file_for(variant);
        let loaded = tokio::task::spawn_blocking(move || file.load())
            .await
            .map_err(|e| GenflowError::internal(format!("Failed to join task: {}", e)))??;

        match loaded {
            Some(session) => {
                tracing::debug!("Loaded '{}' session {}", variant, session.session_id);
                Ok(normalize(variant, session))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session: &WorkflowSession) -> Result<()> {
        let file = self.file_for(session.variant);
        let snapshot = session.clone();
        tokio::task::spawn_blocking(move || file.save(&snapshot))
            .await
            .map_err(|e| GenflowError::internal(format!("Failed to join task: {}", e)))??;
        Ok(())
    }

    async fn clear(&self, variant: WorkflowVariant) -> Result<()> {
        let file = self.file_for(variant);
        tokio::task::spawn_blocking(move || file.remove())
            .await
            .map_err(|e| GenflowError::internal(format!("Failed to join task: {}", e)))??;
        tracing::info!("Cleared stored '{}' session", variant);
        Ok(())
    }
}
