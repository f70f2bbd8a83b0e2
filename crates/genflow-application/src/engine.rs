//! Wires the production collaborators together.

use crate::credits_cache::CreditsCache;
use crate::session::WorkflowRegistry;
use genflow_core::config::EngineConfig;
use genflow_core::error::Result;
use genflow_infrastructure::{ConfigService, GenflowPaths, JsonFileSessionStore};
use genflow_interaction::HttpGenerationService;
use std::sync::Arc;

/// The engine as an application uses it: a registry over the file store
/// and the HTTP service, plus the shared credits cache.
pub struct GenflowEngine {
    pub config: EngineConfig,
    pub registry: WorkflowRegistry,
    pub credits: Arc<CreditsCache>,
}

impl GenflowEngine {
    /// Loads configuration from the usual locations and builds the engine.
    pub fn from_config_service(config_service: &ConfigService) -> Result<Self> {
        Self::from_config(config_service.get_config()?)
    }

    pub fn from_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let sessions_dir = match &config.storage.sessions_dir {
            Some(dir) => dir.clone(),
            None => GenflowPaths::sessions_dir()?,
        };
        let store = Arc::new(JsonFileSessionStore::new(sessions_dir));
        let service = Arc::new(HttpGenerationService::from_config(&config.service)?);
        let credits = Arc::new(CreditsCache::new(service.clone()));

        let registry = WorkflowRegistry::new(
            store,
            service,
            credits.clone(),
            config.polling,
            config.defaults,
        );

        tracing::debug!(
            "[GenflowEngine] Service at {}, polling every {:?}",
            config.service.base_url,
            config.polling.interval()
        );

        Ok(Self {
            config,
            registry,
            credits,
        })
    }
}
