//! Hazard score and risk tier.

use crate::model::failure_mode::{ProbabilityCategory, SeverityCategory};
use serde::{Deserialize, Serialize};

pub const HIGH_THRESHOLD: u8 = 12;
pub const SIGNIFICANT_THRESHOLD: u8 = 8;
pub const MODERATE_THRESHOLD: u8 = 4;

/// Risk tier derived from the hazard score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Moderate,
    Significant,
    High,
}

impl RiskTier {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::Significant => "Significant",
            Self::High => "High",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Low" => Some(Self::Low),
            "Moderate" => Some(Self::Moderate),
            "Significant" => Some(Self::Significant),
            "High" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskAssessment {
    /// `severity × probability`, 1..=16.
    pub hazard_score: u8,
    pub tier: RiskTier,
}

pub fn hazard_score(severity: SeverityCategory, probability: ProbabilityCategory) -> u8 {
    severity.level() * probability.level()
}

/// Inclusive lower bounds, checked high to low.
pub fn risk_tier(hazard_score: u8) -> RiskTier {
    if hazard_score >= HIGH_THRESHOLD {
        RiskTier::High
    } else if hazard_score >= SIGNIFICANT_THRESHOLD {
        RiskTier::Significant
    } else if hazard_score >= MODERATE_THRESHOLD {
        RiskTier::Moderate
    } else {
        RiskTier::Low
    }
}

pub fn assess(severity: SeverityCategory, probability: ProbabilityCategory) -> RiskAssessment {
    let hazard_score = hazard_score(severity, probability);
    RiskAssessment {
        hazard_score,
        tier: risk_tier(hazard_score),
    }
}
