//! Healthcare failure-mode records.
//!
//! # Invariants
//! - Severity and probability categories are closed 1..=4 scales.
//! - `hazard_score`, `risk_level` and `decision` are derived from the draft
//!   and only become authoritative once persisted.

use super::{new_record_key, ValidationError};
use crate::engine::decision::{decide, ActionDecision, DecisionStatus, RiskBarriers};
use crate::engine::risk::{assess, RiskAssessment, RiskTier};
use serde::{Deserialize, Serialize};

/// Severity scale (1 = minor .. 4 = catastrophic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SeverityCategory {
    Minor = 1,
    Moderate = 2,
    Major = 3,
    Catastrophic = 4,
}

impl SeverityCategory {
    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Minor),
            2 => Some(Self::Moderate),
            3 => Some(Self::Major),
            4 => Some(Self::Catastrophic),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Minor => "Minor",
            Self::Moderate => "Moderate",
            Self::Major => "Major",
            Self::Catastrophic => "Catastrophic",
        }
    }
}

impl TryFrom<u8> for SeverityCategory {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_level(value).ok_or_else(|| format!("severity category out of range: {value}"))
    }
}

impl From<SeverityCategory> for u8 {
    fn from(value: SeverityCategory) -> Self {
        value.level()
    }
}

/// Probability scale (1 = remote .. 4 = frequent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProbabilityCategory {
    Remote = 1,
    Uncommon = 2,
    Occasional = 3,
    Frequent = 4,
}

impl ProbabilityCategory {
    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Remote),
            2 => Some(Self::Uncommon),
            3 => Some(Self::Occasional),
            4 => Some(Self::Frequent),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Remote => "Remote",
            Self::Uncommon => "Uncommon",
            Self::Occasional => "Occasional",
            Self::Frequent => "Frequent",
        }
    }
}

impl TryFrom<u8> for ProbabilityCategory {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_level(value)
            .ok_or_else(|| format!("probability category out of range: {value}"))
    }
}

impl From<ProbabilityCategory> for u8 {
    fn from(value: ProbabilityCategory) -> Self {
        value.level()
    }
}

/// In-progress failure-mode form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureModeDraft {
    pub step: String,
    pub failure_mode: String,
    pub cause: String,
    pub effect: String,
    pub controls: String,
    pub severity_cat: SeverityCategory,
    pub prob_cat: ProbabilityCategory,
    pub single_point: bool,
    pub control_effective: bool,
    pub detectable: bool,
    pub action: String,
    pub owner: String,
    pub due: Option<String>,
}

impl Default for FailureModeDraft {
    /// Blank form: moderate severity, occasional probability, barriers in place.
    fn default() -> Self {
        Self {
            step: String::new(),
            failure_mode: String::new(),
            cause: String::new(),
            effect: String::new(),
            controls: String::new(),
            severity_cat: SeverityCategory::Moderate,
            prob_cat: ProbabilityCategory::Occasional,
            single_point: false,
            control_effective: true,
            detectable: true,
            action: String::new(),
            owner: String::new(),
            due: None,
        }
    }
}

impl FailureModeDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.step.trim().is_empty() {
            return Err(ValidationError::EmptyStep);
        }
        if self.failure_mode.trim().is_empty() {
            return Err(ValidationError::EmptyFailureMode);
        }
        Ok(())
    }

    pub fn barriers(&self) -> RiskBarriers {
        RiskBarriers {
            single_point: self.single_point,
            control_effective: self.control_effective,
            detectable: self.detectable,
        }
    }

    /// Live preview of score, tier and decision for the current form values.
    pub fn preview(&self) -> FailureModePreview {
        let risk = assess(self.severity_cat, self.prob_cat);
        let decision = decide(risk.hazard_score, self.barriers());
        FailureModePreview { risk, decision }
    }
}

/// Derived scoring shown while a form is being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureModePreview {
    pub risk: RiskAssessment,
    pub decision: ActionDecision,
}

/// Persisted failure-mode record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureModeRecord {
    #[serde(default)]
    pub id: String,
    pub step: String,
    pub failure_mode: String,
    pub cause: String,
    pub effect: String,
    pub controls: String,
    pub severity_cat: SeverityCategory,
    pub prob_cat: ProbabilityCategory,
    pub hazard_score: u8,
    pub risk_level: RiskTier,
    pub decision: DecisionStatus,
    pub decision_text: String,
    pub single_point: bool,
    pub control_effective: bool,
    pub detectable: bool,
    pub action: String,
    pub owner: String,
    pub due: Option<String>,
    pub created_by: Option<String>,
    pub created_at: String,
}

impl FailureModeRecord {
    /// Freezes a draft into a record, persisting the derived decision.
    pub fn from_draft(
        draft: &FailureModeDraft,
        created_by: Option<String>,
        created_at: impl Into<String>,
    ) -> Self {
        let preview = draft.preview();
        Self {
            id: new_record_key(),
            step: draft.step.trim().to_string(),
            failure_mode: draft.failure_mode.trim().to_string(),
            cause: draft.cause.trim().to_string(),
            effect: draft.effect.trim().to_string(),
            controls: draft.controls.trim().to_string(),
            severity_cat: draft.severity_cat,
            prob_cat: draft.prob_cat,
            hazard_score: preview.risk.hazard_score,
            risk_level: preview.risk.tier,
            decision: preview.decision.status,
            decision_text: preview.decision.rationale().to_string(),
            single_point: draft.single_point,
            control_effective: draft.control_effective,
            detectable: draft.detectable,
            action: draft.action.trim().to_string(),
            owner: draft.owner.trim().to_string(),
            due: draft.due.clone().filter(|value| !value.trim().is_empty()),
            created_by,
            created_at: created_at.into(),
        }
    }
}
