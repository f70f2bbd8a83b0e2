//! Domain layer of the Genflow generation workflow engine.
//!
//! Pure state and rules: workflow variants and the step gate, the
//! per-variant session with its edit history, request assembly, the error
//! taxonomy and classifier, and the traits the outer layers implement.

pub mod config;
pub mod credits;
pub mod error;
pub mod generation;
pub mod session;
pub mod workflow;

// Re-export common error type
pub use error::GenflowError;
