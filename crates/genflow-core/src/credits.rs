//! Credits collaborators.
//!
//! The remaining-credits balance is shared by all workflow variants and is
//! owned elsewhere. The engine only invalidates it after a successful paid
//! submission so balance displays re-read it.

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CreditsNotifier: Send + Sync {
    /// Drops any cached balance.
    async fn invalidate(&self);
}

/// Reads the current balance from the billing side.
#[async_trait]
pub trait CreditsSource: Send + Sync {
    async fn remaining_credits(&self) -> Result<u32>;
}

/// Notifier for setups without a balance display.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCreditsNotifier;

#[async_trait]
impl CreditsNotifier for NoopCreditsNotifier {
    async fn invalidate(&self) {}
}
