//! Workflow variants and their step tables.

use crate::error::{GenflowError, Result};
use crate::generation::SubjectImageKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the concrete generation flows that share the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowVariant {
    /// Product photo composited with a subject (model) and a backdrop.
    Composite,
    /// Garment (front/back) dressed onto a selected person.
    TryOn,
    /// Uploaded photo placed onto a new backdrop.
    BackdropSwap,
}

/// Completion predicate of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPredicate {
    /// At least one input image is present.
    HasInput,
    /// A subject has been selected.
    HasSubject,
    /// A backdrop has been selected.
    HasBackdrop,
    /// Optional step.
    Always,
    /// Terminal step: no submission may be running.
    NotSubmitting,
}

/// A named step in a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDefinition {
    pub name: &'static str,
    pub predicate: StepPredicate,
}

const fn step(name: &'static str, predicate: StepPredicate) -> StepDefinition {
    StepDefinition { name, predicate }
}

const COMPOSITE_STEPS: &[StepDefinition] = &[
    step("upload", StepPredicate::HasInput),
    step("subject", StepPredicate::HasSubject),
    step("backdrop", StepPredicate::HasBackdrop),
    step("refine", StepPredicate::Always),
    step("generate", StepPredicate::NotSubmitting),
];

const TRY_ON_STEPS: &[StepDefinition] = &[
    step("garment", StepPredicate::HasInput),
    step("model", StepPredicate::HasSubject),
    step("refine", StepPredicate::Always),
    step("generate", StepPredicate::NotSubmitting),
];

const BACKDROP_SWAP_STEPS: &[StepDefinition] = &[
    step("upload", StepPredicate::HasInput),
    step("backdrop", StepPredicate::HasBackdrop),
    step("refine", StepPredicate::Always),
    step("generate", StepPredicate::NotSubmitting),
];

/// Garment slot holding the front view.
pub const GARMENT_FRONT_SLOT: u8 = 0;
/// Garment slot holding the back view.
pub const GARMENT_BACK_SLOT: u8 = 1;

impl WorkflowVariant {
    pub const ALL: [WorkflowVariant; 3] = [
        WorkflowVariant::Composite,
        WorkflowVariant::TryOn,
        WorkflowVariant::BackdropSwap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Composite => "composite",
            Self::TryOn => "try-on",
            Self::BackdropSwap => "backdrop-swap",
        }
    }

    /// Ordered step table. The last entry is always the submission step.
    pub fn steps(&self) -> &'static [StepDefinition] {
        match self {
            Self::Composite => COMPOSITE_STEPS,
            Self::TryOn => TRY_ON_STEPS,
            Self::BackdropSwap => BACKDROP_SWAP_STEPS,
        }
    }

    pub fn step_count(&self) -> usize {
        self.steps().len()
    }

    /// Index of the step called `name`, if any.
    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.steps().iter().position(|s| s.name == name)
    }

    pub fn requires_subject(&self) -> bool {
        matches!(self, Self::Composite | Self::TryOn)
    }

    pub fn requires_backdrop(&self) -> bool {
        matches!(self, Self::Composite | Self::BackdropSwap)
    }

    /// Maps an input slot to the kind of subject image it carries.
    ///
    /// Returns `None` for slots the variant does not use.
    pub fn slot_kind(&self, slot: u8) -> Option<SubjectImageKind> {
        match self {
            Self::TryOn => match slot {
                GARMENT_FRONT_SLOT => Some(SubjectImageKind::GarmentFront),
                GARMENT_BACK_SLOT => Some(SubjectImageKind::GarmentBack),
                _ => None,
            },
            Self::Composite => Some(SubjectImageKind::Product),
            Self::BackdropSwap => Some(SubjectImageKind::Photo),
        }
    }
}

impl fmt::Display for WorkflowVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowVariant {
    type Err = GenflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "composite" => Ok(Self::Composite),
            "try-on" | "tryon" => Ok(Self::TryOn),
            "backdrop-swap" | "backdropswap" => Ok(Self::BackdropSwap),
            other => Err(GenflowError::not_found("workflow variant", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_variant_ends_with_generate() {
        for variant in WorkflowVariant::ALL {
            let last = variant.steps().last().unwrap();
            assert_eq!(last.name, "generate");
            assert_eq!(last.predicate, StepPredicate::NotSubmitting);
        }
    }

    #[test]
    fn test_parse_round_trips_display() {
        for variant in WorkflowVariant::ALL {
            let parsed: WorkflowVariant = variant.to_string().parse().unwrap();
            assert_eq!(parsed, variant);
        }
        assert!("portrait".parse::<WorkflowVariant>().is_err());
    }

    #[test]
    fn test_try_on_slots() {
        let v = WorkflowVariant::TryOn;
        assert_eq!(v.slot_kind(0), Some(SubjectImageKind::GarmentFront));
        assert_eq!(v.slot_kind(1), Some(SubjectImageKind::GarmentBack));
        assert_eq!(v.slot_kind(2), None);
    }

    #[test]
    fn test_step_index_lookup() {
        assert_eq!(WorkflowVariant::Composite.step_index("backdrop"), Some(2));
        assert_eq!(WorkflowVariant::TryOn.step_index("backdrop"), None);
    }
}
