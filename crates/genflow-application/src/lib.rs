//! Application layer for Genflow.
//!
//! Coordinates the domain crate with storage and the remote service: the
//! per-variant session containers, the generation orchestrator and job
//! poller, and the shared credits cache.

pub mod credits_cache;
pub mod engine;
pub mod generation;
pub mod session;

pub use credits_cache::CreditsCache;
pub use engine::GenflowEngine;
pub use generation::{GenerationOrchestrator, JobPoller, PollOutcome, StatusCallback};
pub use session::{
    AdvanceOutcome, SessionContainer, SubmissionTicket, WorkflowInstance, WorkflowRegistry,
};
