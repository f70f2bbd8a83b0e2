//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: the per-variant session (`WorkflowSession`) and its value types
//! - `history`: edit history operations on the result timeline
//! - `repository`: storage trait (`SessionStore`)

mod history;
mod model;
mod repository;

pub use model::{
    AspectRatio, CatalogId, ImageData, OutputPrefs, Resolution, ResultRef, Selections, SlotId,
    WorkflowSession,
};
pub use repository::SessionStore;
