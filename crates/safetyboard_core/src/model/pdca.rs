//! Plan-do-check-act cycle tracker.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdcaStage {
    #[default]
    Plan,
    Do,
    Check,
    Act,
}

impl PdcaStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Do => "do",
            Self::Check => "check",
            Self::Act => "act",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "plan" => Some(Self::Plan),
            "do" => Some(Self::Do),
            "check" => Some(Self::Check),
            "act" => Some(Self::Act),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Plan => "Plan",
            Self::Do => "Do",
            Self::Check => "Check",
            Self::Act => "Act",
        }
    }
}

/// One PDCA document per owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PdcaCycle {
    pub stage: PdcaStage,
    pub plan: String,
    #[serde(rename = "do")]
    pub do_: String,
    pub check: String,
    pub act: String,
    pub updated_by: Option<String>,
    pub updated_at: Option<String>,
}

impl PdcaCycle {
    pub fn text_for(&self, stage: PdcaStage) -> &str {
        match stage {
            PdcaStage::Plan => &self.plan,
            PdcaStage::Do => &self.do_,
            PdcaStage::Check => &self.check,
            PdcaStage::Act => &self.act,
        }
    }
}
