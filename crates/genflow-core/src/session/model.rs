//! Workflow session domain model.
//!
//! This module contains the per-variant session that holds everything a user
//! entered across the wizard steps, plus the result timeline.

use crate::error::Result;
use crate::workflow::{GateAdvance, StepDefinition, StepGate, StepPredicate, WorkflowVariant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Input slot identifier (front/back, or sequential upload index).
pub type SlotId = u8;

/// Opaque encoded image: a data URI or a remote URL.
pub type ImageData = String;

/// Opaque reference to a generated artifact (URL or identifier).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRef(String);

impl ResultRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResultRef {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ResultRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of an external catalog entry (subject or backdrop).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogId {
    Int(i64),
    Text(String),
}

impl CatalogId {
    /// Parses user input: integers become `Int`, anything else `Text`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        trimmed
            .parse::<i64>()
            .map(Self::Int)
            .unwrap_or_else(|_| Self::Text(trimmed.to_string()))
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

/// Catalog selections; `None` until chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selections {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<CatalogId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_id: Option<CatalogId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "9:16")]
    Story,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "16:9")]
    Widescreen,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Story,
        AspectRatio::Landscape,
        AspectRatio::Widescreen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "3:4",
            Self::Story => "9:16",
            Self::Landscape => "4:3",
            Self::Widescreen => "16:9",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ratio| ratio.as_str() == raw.trim())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "1k")]
    Standard,
    #[serde(rename = "2k")]
    High,
    #[serde(rename = "4k")]
    Ultra,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::Standard, Resolution::High, Resolution::Ultra];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "1k",
            Self::High => "2k",
            Self::Ultra => "4k",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|res| res.as_str() == lowered)
    }
}

/// Output format preferences shared across the session's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPrefs {
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub resolution: Resolution,
}

/// All user-entered, resumable state of one workflow variant.
///
/// `result_history` holds prior results oldest first and never contains
/// `current_result`; together they form a linear timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSession {
    /// Lifecycle identity; regenerated on start over.
    pub session_id: Uuid,
    pub variant: WorkflowVariant,
    pub gate: StepGate,
    #[serde(default)]
    pub inputs: BTreeMap<SlotId, ImageData>,
    #[serde(default)]
    pub selections: Selections,
    #[serde(default)]
    pub instruction_text: String,
    #[serde(default)]
    pub is_edit_mode: bool,
    #[serde(default)]
    pub result_history: Vec<ResultRef>,
    #[serde(default)]
    pub current_result: Option<ResultRef>,
    #[serde(default)]
    pub output_prefs: OutputPrefs,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowSession {
    pub fn new(variant: WorkflowVariant, output_prefs: OutputPrefs) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            variant,
            gate: StepGate::new(variant.step_count()),
            inputs: BTreeMap::new(),
            selections: Selections::default(),
            instruction_text: String::new(),
            is_edit_mode: false,
            result_history: Vec::new(),
            current_result: None,
            output_prefs,
            updated_at: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn current_step(&self) -> usize {
        self.gate.current()
    }

    pub fn max_unlocked_step(&self) -> usize {
        self.gate.max_unlocked()
    }

    pub fn current_step_definition(&self) -> StepDefinition {
        let steps = self.variant.steps();
        steps[self.gate.current().min(steps.len() - 1)]
    }

    /// True when at least one slot holds a non-blank image.
    pub fn has_input(&self) -> bool {
        self.inputs.values().any(|data| !data.trim().is_empty())
    }

    pub fn has_instruction(&self) -> bool {
        !self.instruction_text.trim().is_empty()
    }

    pub fn predicate_satisfied(&self, predicate: StepPredicate, is_submitting: bool) -> bool {
        match predicate {
            StepPredicate::HasInput => self.has_input(),
            StepPredicate::HasSubject => self.selections.subject_id.is_some(),
            StepPredicate::HasBackdrop => self.selections.backdrop_id.is_some(),
            StepPredicate::Always => true,
            StepPredicate::NotSubmitting => !is_submitting,
        }
    }

    /// Advances the wizard if the current step's predicate holds.
    pub fn advance(&mut self, is_submitting: bool) -> Result<GateAdvance> {
        let definition = self.current_step_definition();
        let ok = self.predicate_satisfied(definition.predicate, is_submitting);
        let advanced = self.gate.advance(ok)?;
        self.touch();
        Ok(advanced)
    }

    pub fn go_to(&mut self, target: usize) -> bool {
        let moved = self.gate.go_to(target);
        if moved {
            self.touch();
        }
        moved
    }

    pub fn set_input(&mut self, slot: SlotId, data: impl Into<ImageData>) {
        self.inputs.insert(slot, data.into());
        self.touch();
    }

    pub fn remove_input(&mut self, slot: SlotId) -> Option<ImageData> {
        let removed = self.inputs.remove(&slot);
        self.touch();
        removed
    }

    pub fn clear_inputs(&mut self) {
        self.inputs.clear();
        self.touch();
    }

    pub fn select_subject(&mut self, subject_id: Option<CatalogId>) {
        self.selections.subject_id = subject_id;
        self.touch();
    }

    pub fn select_backdrop(&mut self, backdrop_id: Option<CatalogId>) {
        self.selections.backdrop_id = backdrop_id;
        self.touch();
    }

    pub fn set_instruction(&mut self, text: impl Into<String>) {
        self.instruction_text = text.into();
        self.touch();
    }

    pub fn set_output_prefs(&mut self, prefs: OutputPrefs) {
        self.output_prefs = prefs;
        self.touch();
    }

    /// Whether the next submission edits the current result instead of
    /// generating from scratch.
    pub fn wants_edit(&self) -> bool {
        self.is_edit_mode && self.has_instruction() && self.current_result.is_some()
    }

    /// Applies a successful generation: the current result moves to the
    /// history, edit mode turns on and the instruction is consumed.
    pub fn apply_success(&mut self, result: ResultRef) {
        let previous = self.current_result.clone();
        self.apply_success_after(previous, result);
    }

    /// Like [`apply_success`](Self::apply_success), pushing `previous` (the
    /// current result when the submission started) rather than whatever is
    /// current now.
    ///
    /// Entries equal to `result` are dropped from the history, and
    /// `previous` is not pushed when the history already holds it.
    pub fn apply_success_after(&mut self, previous: Option<ResultRef>, result: ResultRef) {
        if let Some(previous) = previous {
            if previous != result && !self.result_history.contains(&previous) {
                self.result_history.push(previous);
            }
        }
        self.result_history.retain(|entry| *entry != result);
        self.current_result = Some(result);
        self.is_edit_mode = true;
        self.instruction_text.clear();
        self.touch();
    }
}
