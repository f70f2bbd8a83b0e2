//! Session persistence trait.

use async_trait::async_trait;

use super::model::WorkflowSession;
use crate::error::Result;
use crate::workflow::WorkflowVariant;

/// Storage adapter that lets a session survive navigation.
///
/// Keys are scoped per workflow variant; each variant holds at most one
/// session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the stored session for `variant`, if any.
    async fn load(&self, variant: WorkflowVariant) -> Result<Option<WorkflowSession>>;

    /// Saves the full session shape.
    async fn save(&self, session: &WorkflowSession) -> Result<()>;

    /// Deletes the stored session for `variant`. Deleting a missing entry
    /// is not an error.
    async fn clear(&self, variant: WorkflowVariant) -> Result<()>;
}
