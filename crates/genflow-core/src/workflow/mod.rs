//! Workflow variants and step navigation.

mod step_gate;
mod variant;

pub use step_gate::{GateAdvance, StepGate};
pub use variant::{
    GARMENT_BACK_SLOT, GARMENT_FRONT_SLOT, StepDefinition, StepPredicate, WorkflowVariant,
};
