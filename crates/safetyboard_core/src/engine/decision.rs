//! Failure-mode decision tree: corrective-action plan or monitoring.
//!
//! Rules are evaluated in order and the first match wins, so the same
//! barrier flags can yield different rationales depending on the score.
//! This is a heuristic policy, not a certified clinical algorithm.

use serde::{Deserialize, Serialize};

/// Scores below this value are monitored regardless of barriers.
pub const ACTION_SCORE_THRESHOLD: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Monitor,
    Action,
}

impl DecisionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monitor => "monitor",
            Self::Action => "action",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "monitor" => Some(Self::Monitor),
            "action" => Some(Self::Action),
            _ => None,
        }
    }
}

/// Which rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionReason {
    LowOrModerateRisk,
    AdequateBarriers,
    InsufficientControls,
    SinglePointOfFailure,
    RequiresEvaluation,
}

impl DecisionReason {
    pub fn rationale(self) -> &'static str {
        match self {
            Self::LowOrModerateRisk => "Low/moderate risk: maintain controls and monitor.",
            Self::AdequateBarriers => {
                "High score, but barriers and detectability are adequate: maintain controls and monitor."
            }
            Self::InsufficientControls => {
                "Action plan required: insufficient controls and/or low detectability."
            }
            Self::SinglePointOfFailure => {
                "Action plan required: single point of failure (reduce reliance on a single barrier)."
            }
            Self::RequiresEvaluation => "Requires evaluation and possible corrective/preventive action.",
        }
    }
}

/// Barrier flags of one failure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskBarriers {
    pub single_point: bool,
    pub control_effective: bool,
    pub detectable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionDecision {
    pub status: DecisionStatus,
    pub reason: DecisionReason,
}

impl ActionDecision {
    fn new(status: DecisionStatus, reason: DecisionReason) -> Self {
        Self { status, reason }
    }

    pub fn rationale(&self) -> &'static str {
        self.reason.rationale()
    }
}

pub fn decide(hazard_score: u8, barriers: RiskBarriers) -> ActionDecision {
    let RiskBarriers {
        single_point,
        control_effective,
        detectable,
    } = barriers;

    if hazard_score < ACTION_SCORE_THRESHOLD {
        return ActionDecision::new(DecisionStatus::Monitor, DecisionReason::LowOrModerateRisk);
    }
    if !single_point && control_effective && detectable {
        return ActionDecision::new(DecisionStatus::Monitor, DecisionReason::AdequateBarriers);
    }
    if !control_effective || !detectable {
        return ActionDecision::new(DecisionStatus::Action, DecisionReason::InsufficientControls);
    }
    if single_point {
        return ActionDecision::new(DecisionStatus::Action, DecisionReason::SinglePointOfFailure);
    }
    ActionDecision::new(DecisionStatus::Action, DecisionReason::RequiresEvaluation)
}
