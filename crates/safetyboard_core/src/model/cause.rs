//! Cause-and-effect (6M) diagram nodes.

use super::{new_record_key, ValidationError};
use serde::{Deserialize, Serialize};

/// The six fixed causal categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CauseCategory {
    Method,
    Machine,
    Material,
    Manpower,
    Environment,
    Measurement,
}

impl CauseCategory {
    pub const ALL: [CauseCategory; 6] = [
        CauseCategory::Method,
        CauseCategory::Machine,
        CauseCategory::Material,
        CauseCategory::Manpower,
        CauseCategory::Environment,
        CauseCategory::Measurement,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Machine => "machine",
            Self::Material => "material",
            Self::Manpower => "manpower",
            Self::Environment => "environment",
            Self::Measurement => "measurement",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Method => "Method",
            Self::Machine => "Machine",
            Self::Material => "Material",
            Self::Manpower => "Manpower",
            Self::Environment => "Environment",
            Self::Measurement => "Measurement",
        }
    }
}

/// One recorded cause. `cat = None` keeps it in the unsorted pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CauseNode {
    #[serde(default)]
    pub id: String,
    pub cat: Option<CauseCategory>,
    pub text: String,
    /// Weight used by root-cause suggestion; always >= 1.
    pub impact: u32,
    pub created_by: Option<String>,
    pub created_at: String,
}

impl CauseNode {
    /// Builds a cause, trimming text and clamping impact to at least 1.
    pub fn new(
        cat: Option<CauseCategory>,
        text: &str,
        impact: u32,
        created_by: Option<String>,
        created_at: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyCauseText);
        }
        Ok(Self {
            id: new_record_key(),
            cat,
            text: text.to_string(),
            impact: impact.max(1),
            created_by,
            created_at: created_at.into(),
        })
    }
}
