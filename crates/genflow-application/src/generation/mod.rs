pub mod orchestrator;
pub mod poller;

pub use orchestrator::GenerationOrchestrator;
pub use poller::{JobPoller, PollOutcome, StatusCallback};
