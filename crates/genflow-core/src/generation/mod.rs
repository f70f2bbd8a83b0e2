//! Generation domain: requests, the remote service contract, outcomes and
//! their classification, and the submission state machine.

pub mod classifier;
mod outcome;
mod request;
mod service;
mod state;

pub use classifier::classify;
pub use outcome::{
    ClassifiedError, CreditShortfall, ErrorKind, GenerationOutcome, Presentation, Recovery,
};
pub use request::{EditRequest, GenerationRequest, SubjectImage, SubjectImageKind};
pub use service::{
    GenerateResponse, GenerationService, JobHandle, JobState, JobStatus, RemoteErrorBody,
    RemoteFailure, RemoteResult,
};
pub use state::{SubmissionEvent, SubmissionState};
