//! Standalone canvas sessions and tool ownership.
//!
//! # Invariants
//! - Every tool record belongs to exactly one owner: a card or a session.
//! - Tool usage flags are tracked for cards only.

use super::card::CardId;
use super::{new_record_key, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type SessionId = String;

/// Analysis tool kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Ishikawa,
    #[serde(rename = "5w2h")]
    ActionPlan,
    Pdca,
    Fmea,
    Notes,
}

impl ToolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ishikawa => "ishikawa",
            Self::ActionPlan => "5w2h",
            Self::Pdca => "pdca",
            Self::Fmea => "fmea",
            Self::Notes => "notes",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ishikawa" => Some(Self::Ishikawa),
            "5w2h" => Some(Self::ActionPlan),
            "pdca" => Some(Self::Pdca),
            "fmea" => Some(Self::Fmea),
            "notes" => Some(Self::Notes),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ishikawa => "Cause-and-effect diagram",
            Self::ActionPlan => "5W2H action plan",
            Self::Pdca => "PDCA cycle",
            Self::Fmea => "HFMEA",
            Self::Notes => "Notes canvas",
        }
    }
}

/// Container that owns tool records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToolOwner {
    Card(CardId),
    Session(SessionId),
}

impl ToolOwner {
    pub fn id(&self) -> &str {
        match self {
            Self::Card(id) | Self::Session(id) => id,
        }
    }

    pub fn is_card(&self) -> bool {
        matches!(self, Self::Card(_))
    }
}

impl Display for ToolOwner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Card(id) => write!(f, "card {id}"),
            Self::Session(id) => write!(f, "session {id}"),
        }
    }
}

/// Canvas session not linked to any card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSession {
    #[serde(default)]
    pub id: SessionId,
    pub title: String,
    pub tool_type: ToolKind,
    pub created_by: Option<String>,
    pub created_at: String,
    pub root_cause_id: Option<String>,
    #[serde(default)]
    pub root_cause_pinned: bool,
    pub ishikawa_effect: Option<String>,
}

impl ToolSession {
    pub fn new(
        title: &str,
        tool_type: ToolKind,
        created_by: Option<String>,
        created_at: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptySessionTitle);
        }
        Ok(Self {
            id: new_record_key(),
            title: title.to_string(),
            tool_type,
            created_by,
            created_at: created_at.into(),
            root_cause_id: None,
            root_cause_pinned: false,
            ishikawa_effect: None,
        })
    }
}

/// Free-text notes document, one per owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotesDoc {
    pub text: String,
    pub updated_by: Option<String>,
    pub updated_at: Option<String>,
}
