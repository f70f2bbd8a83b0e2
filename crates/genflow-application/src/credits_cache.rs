use async_trait::async_trait;
use genflow_core::credits::{CreditsNotifier, CreditsSource};
use genflow_core::error::Result;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Last-read credits balance, shared by every workflow variant.
///
/// Never mutated locally: it only caches what the source reports and is
/// emptied by [`CreditsNotifier::invalidate`] after a successful submission.
pub struct CreditsCache {
    source: Arc<dyn CreditsSource>,
    balance: RwLock<Option<u32>>,
}

impl CreditsCache {
    pub fn new(source: Arc<dyn CreditsSource>) -> Self {
        Self {
            source,
            balance: RwLock::new(None),
        }
    }

    /// Cached balance, if one was read since the last invalidation.
    pub async fn cached(&self) -> Option<u32> {
        *self.balance.read().await
    }

    /// Returns the balance, reading it from the source when not cached.
    pub async fn remaining(&self) -> Result<u32> {
        if let Some(balance) = self.cached().await {
            return Ok(balance);
        }
        let balance = self.source.remaining_credits().await?;
        *self.balance.write().await = Some(balance);
        Ok(balance)
    }
}

#[async_trait]
impl CreditsNotifier for CreditsCache {
    async fn invalidate(&self) {
        *self.balance.write().await = None;
        tracing::debug!("[CreditsCache] Balance invalidated");
    }
}
