//! Domain model for the incident board and its analysis tools.
//!
//! # Responsibility
//! - Define the canonical records read from and written to the store.
//! - Keep categorical fields as closed enums with exhaustive matching.
//!
//! # Invariants
//! - Every record is identified by a store-assigned opaque key.
//! - `status=late` is only ever assigned by board reconciliation.
//! - Archival is terminal: no un-archive path exists.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod action_plan;
pub mod card;
pub mod cause;
pub mod failure_mode;
pub mod pdca;
pub mod session;

/// Generates a unique child key for appended records.
///
/// Mirrors the store's append primitive: keys are opaque and never reused.
pub fn new_record_key() -> String {
    Uuid::new_v4().to_string()
}

/// Input validation failures raised before any write happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Card title is empty after trimming.
    EmptyTitle,
    /// Failure mode is missing its process step.
    EmptyStep,
    /// Failure mode is missing its failure-mode description.
    EmptyFailureMode,
    /// Cause text is empty after trimming.
    EmptyCauseText,
    /// Action plan item is missing `what`.
    EmptyActionWhat,
    /// Canvas session title is empty after trimming.
    EmptySessionTitle,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "card title cannot be empty"),
            Self::EmptyStep => write!(f, "failure mode requires a process step"),
            Self::EmptyFailureMode => write!(f, "failure mode description cannot be empty"),
            Self::EmptyCauseText => write!(f, "cause text cannot be empty"),
            Self::EmptyActionWhat => write!(f, "action item requires `what`"),
            Self::EmptySessionTitle => write!(f, "session title cannot be empty"),
        }
    }
}

impl Error for ValidationError {}

/// Trims and maps empty strings to `None`.
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}
