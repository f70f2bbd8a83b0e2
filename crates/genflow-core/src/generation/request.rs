//! Request assembly.
//!
//! A [`GenerationRequest`] is a snapshot built from the session at submission
//! time; later edits to the session do not affect it.

use super::outcome::{ClassifiedError, ErrorKind};
use crate::session::{AspectRatio, CatalogId, OutputPrefs, Resolution, ResultRef, WorkflowSession};
use crate::workflow::WorkflowVariant;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectImageKind {
    Product,
    GarmentFront,
    GarmentBack,
    Photo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectImage {
    pub kind: SubjectImageKind,
    pub data: String,
}

/// Fresh generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub variant: WorkflowVariant,
    pub subject_images: Vec<SubjectImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<CatalogId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backdrop_id: Option<CatalogId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
}

impl GenerationRequest {
    /// Builds a request from the session's inputs, selections and
    /// preferences.
    ///
    /// Fails with `ValidationFailed` when no concrete subject image could be
    /// resolved or a selection the variant requires is missing.
    pub fn assemble(session: &WorkflowSession) -> Result<Self, ClassifiedError> {
        let variant = session.variant;
        let subject_images: Vec<SubjectImage> = session
            .inputs
            .iter()
            .filter(|(_, data)| !data.trim().is_empty())
            .filter_map(|(slot, data)| {
                let kind = variant.slot_kind(*slot);
                if kind.is_none() {
                    tracing::debug!(%variant, slot, "ignoring input slot not used by variant");
                }
                kind.map(|kind| SubjectImage {
                    kind,
                    data: data.clone(),
                })
            })
            .collect();

        if subject_images.is_empty() {
            return Err(ClassifiedError::new(
                ErrorKind::ValidationFailed,
                "no usable input",
            ));
        }

        let selections = &session.selections;
        if variant.requires_subject() && selections.subject_id.is_none() {
            return Err(ClassifiedError::new(
                ErrorKind::ValidationFailed,
                "no subject selected",
            ));
        }
        if variant.requires_backdrop() && selections.backdrop_id.is_none() {
            return Err(ClassifiedError::new(
                ErrorKind::ValidationFailed,
                "no backdrop selected",
            ));
        }

        let OutputPrefs {
            aspect_ratio,
            resolution,
        } = session.output_prefs;

        Ok(Self {
            variant,
            subject_images,
            subject_id: selections.subject_id.clone(),
            backdrop_id: selections.backdrop_id.clone(),
            instruction: session
                .has_instruction()
                .then(|| session.instruction_text.trim().to_string()),
            aspect_ratio,
            resolution,
        })
    }
}

/// Refinement of an existing result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub base_image: ResultRef,
    pub instruction: String,
}

impl EditRequest {
    /// Builds an edit request when the session is in edit mode with a
    /// non-empty instruction and a current result.
    pub fn from_session(session: &WorkflowSession) -> Option<Self> {
        if !session.wants_edit() {
            return None;
        }
        let base_image = session.current_result.clone()?;
        Some(Self {
            base_image,
            instruction: session.instruction_text.trim().to_string(),
        })
    }
}
