//! Root-cause suggestion over a cause-and-effect diagram.
//!
//! # Invariants
//! - Categories are scored by total impact; the heaviest category wins and
//!   its heaviest cause is suggested.
//! - Ties go to the first category in declaration order (uncategorised
//!   causes last) and to the earliest cause inside a category.
//! - A pin that points at a deleted cause counts as no pin.

use crate::model::cause::{CauseCategory, CauseNode};

/// Causes of one diagram bone, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CauseGroup<'a> {
    /// `None` is the uncategorised pool.
    pub category: Option<CauseCategory>,
    pub causes: Vec<&'a CauseNode>,
}

impl CauseGroup<'_> {
    pub fn total_impact(&self) -> u64 {
        self.causes.iter().map(|cause| u64::from(cause.impact)).sum()
    }

    pub fn label(&self) -> &'static str {
        self.category.map(CauseCategory::label).unwrap_or("Other")
    }
}

/// Groups causes by category in declaration order, uncategorised last.
/// Empty groups are kept so every bone is drawn.
pub fn group_causes(causes: &[CauseNode]) -> Vec<CauseGroup<'_>> {
    CauseCategory::ALL
        .into_iter()
        .map(Some)
        .chain(std::iter::once(None))
        .map(|category| CauseGroup {
            category,
            causes: causes.iter().filter(|cause| cause.cat == category).collect(),
        })
        .collect()
}

/// Current root-cause designation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootCauseSelection {
    /// Chosen by a person; automatic suggestion is off.
    Pinned { cause_id: String },
    Suggested {
        category: Option<CauseCategory>,
        cause_id: String,
    },
    Empty,
}

impl RootCauseSelection {
    pub fn cause_id(&self) -> Option<&str> {
        match self {
            Self::Pinned { cause_id } | Self::Suggested { cause_id, .. } => Some(cause_id),
            Self::Empty => None,
        }
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, Self::Pinned { .. })
    }
}

/// Heaviest cause of the heaviest category.
pub fn suggest_root_cause(causes: &[CauseNode]) -> RootCauseSelection {
    let mut best_group: Option<CauseGroup<'_>> = None;
    for group in group_causes(causes) {
        if group.causes.is_empty() {
            continue;
        }
        let heavier = best_group
            .as_ref()
            .map_or(true, |best| group.total_impact() > best.total_impact());
        if heavier {
            best_group = Some(group);
        }
    }

    let Some(group) = best_group else {
        return RootCauseSelection::Empty;
    };

    let mut best: Option<&CauseNode> = None;
    for cause in group.causes {
        if best.map_or(true, |current| cause.impact > current.impact) {
            best = Some(cause);
        }
    }

    match best {
        Some(cause) => RootCauseSelection::Suggested {
            category: group.category,
            cause_id: cause.id.clone(),
        },
        None => RootCauseSelection::Empty,
    }
}

/// Resolves the designation from stored pin state and the current causes.
pub fn resolve_root_cause(
    causes: &[CauseNode],
    pinned_id: Option<&str>,
    pinned: bool,
) -> RootCauseSelection {
    if pinned {
        if let Some(id) = pinned_id {
            if causes.iter().any(|cause| cause.id == id) {
                return RootCauseSelection::Pinned {
                    cause_id: id.to_string(),
                };
            }
        }
    }
    suggest_root_cause(causes)
}
