pub mod container;
pub mod registry;

pub use container::{SessionContainer, SubmissionTicket};
pub use registry::{AdvanceOutcome, WorkflowInstance, WorkflowRegistry};
