//! Card domain model.
//!
//! # Responsibility
//! - Define the unit of work shown on the board (event, task or project).
//! - Carry the event investigation record ("PCT") fields.
//!
//! # Invariants
//! - `severity` is meaningful only for `CardType::Event`.
//! - `status` is a cached projection: `Late` is assigned by reconciliation,
//!   and `Done` is the only user escape from `Late`.
//! - `date`/`deadline` are kept as raw ISO strings; unparseable values mean
//!   "no deadline computable", never an error.

use super::{new_record_key, non_empty, ValidationError};
use serde::{Deserialize, Serialize};

/// Opaque store-assigned card key.
pub type CardId = String;

/// Card category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    /// Adverse event or near miss; drives regulatory deadlines.
    #[default]
    Event,
    /// Internal management task.
    Task,
    /// Improvement project.
    Project,
}

impl CardType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Task => "task",
            Self::Project => "project",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "event" => Some(Self::Event),
            "task" => Some(Self::Task),
            "project" => Some(Self::Project),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Event => "Event",
            Self::Task => "Task",
            Self::Project => "Project",
        }
    }
}

/// Harm classification of a safety event.
///
/// Unknown wire values decode as `Unclassified`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    NoHarm,
    Mild,
    Moderate,
    Severe,
    Death,
    NearMiss,
    #[default]
    #[serde(other)]
    Unclassified,
}

impl Severity {
    pub const ALL: [Severity; 7] = [
        Severity::NoHarm,
        Severity::Mild,
        Severity::Moderate,
        Severity::Severe,
        Severity::Death,
        Severity::NearMiss,
        Severity::Unclassified,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoHarm => "no_harm",
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
            Self::Death => "death",
            Self::NearMiss => "near_miss",
            Self::Unclassified => "unclassified",
        }
    }

    /// Lenient parse used on store reads: unknown values are unclassified.
    pub fn parse(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|severity| severity.as_str() == value)
            .unwrap_or(Self::Unclassified)
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::NoHarm => "No harm",
            Self::Mild => "Mild harm",
            Self::Moderate => "Moderate harm",
            Self::Severe => "Severe harm",
            Self::Death => "Death",
            Self::NearMiss => "Near miss",
            Self::Unclassified => "Unclassified",
        }
    }
}

/// Board column / card lifecycle state.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    #[default]
    Backlog,
    Doing,
    Late,
    Done,
}

impl CardStatus {
    /// Columns in display order.
    pub const COLUMNS: [CardStatus; 4] = [
        CardStatus::Backlog,
        CardStatus::Doing,
        CardStatus::Late,
        CardStatus::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Doing => "doing",
            Self::Late => "late",
            Self::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "backlog" => Some(Self::Backlog),
            "doing" => Some(Self::Doing),
            "late" => Some(Self::Late),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Analysis tools that have recorded data for a card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsUsed {
    pub ishikawa: bool,
    pub w2h: bool,
    pub pdca: bool,
    pub fmea: bool,
}

/// Event investigation record fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PctFields {
    pub event_code: Option<String>,
    pub patient_name: Option<String>,
    pub patient_dob: Option<String>,
    pub notification_date: Option<String>,
    pub notification_system: Option<String>,
    pub notification_text: Option<String>,
    pub chronology_text: Option<String>,
    pub outcome_text: Option<String>,
    pub interview_text: Option<String>,
    pub investigation_team: Option<String>,
    pub conclusion_text: Option<String>,
}

impl PctFields {
    pub const DEFAULT_NOTIFICATION_SYSTEM: &'static str = "Docnix";

    /// Returns a copy with blank strings mapped to `None` and the
    /// notification system defaulted.
    pub fn normalized(&self) -> Self {
        Self {
            event_code: non_empty(self.event_code.as_deref()),
            patient_name: non_empty(self.patient_name.as_deref()),
            patient_dob: non_empty(self.patient_dob.as_deref()),
            notification_date: non_empty(self.notification_date.as_deref()),
            notification_system: non_empty(self.notification_system.as_deref())
                .or_else(|| Some(Self::DEFAULT_NOTIFICATION_SYSTEM.to_string())),
            notification_text: non_empty(self.notification_text.as_deref()),
            chronology_text: non_empty(self.chronology_text.as_deref()),
            outcome_text: non_empty(self.outcome_text.as_deref()),
            interview_text: non_empty(self.interview_text.as_deref()),
            investigation_team: non_empty(self.investigation_team.as_deref()),
            conclusion_text: non_empty(self.conclusion_text.as_deref()),
        }
    }
}

/// Canonical card record.
///
/// Field names follow the store's persisted shape (`type`, `desc`, camelCase).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Card {
    /// Store key. Snapshot decoding fills it from the map key.
    pub id: CardId,
    #[serde(rename = "type")]
    pub kind: CardType,
    pub title: String,
    pub desc: String,
    pub unit: String,
    pub owner: String,
    pub severity: Severity,
    /// Event date (ISO `YYYY-MM-DD`), base of the regulatory deadline.
    pub date: Option<String>,
    /// Manually set due date (ISO `YYYY-MM-DD`).
    pub deadline: Option<String>,
    pub status: CardStatus,
    pub archived: bool,
    pub archived_at: Option<String>,
    pub archived_by: Option<String>,
    pub created_by: Option<String>,
    pub created_at: Option<String>,
    pub quality_related: bool,
    pub tools_used: ToolsUsed,
    /// Designated root cause among this card's causes.
    pub root_cause_id: Option<String>,
    /// `true` when a human pinned `root_cause_id`.
    pub root_cause_pinned: bool,
    /// Custom cause-and-effect diagram effect label.
    pub ishikawa_effect: Option<String>,
    #[serde(flatten)]
    pub pct: PctFields,
}

impl Card {
    /// Creates a backlog card with a generated key.
    pub fn new(kind: CardType, title: impl Into<String>) -> Self {
        Self::with_id(new_record_key(), kind, title)
    }

    /// Creates a backlog card with a caller-provided key.
    pub fn with_id(id: impl Into<CardId>, kind: CardType, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            ..Self::default()
        }
    }

    /// Validates fields required on every write.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }

    pub fn is_event(&self) -> bool {
        self.kind == CardType::Event
    }

    /// Whether the card still belongs on the active board.
    pub fn is_active(&self) -> bool {
        !self.archived
    }
}

#[cfg(test)]
mod tests {
    use super::{Card, CardStatus, CardType, PctFields, Severity};

    #[test]
    fn unknown_severity_decodes_as_unclassified() {
        let severity: Severity = serde_json::from_str("\"catastrophic\"").unwrap();
        assert_eq!(severity, Severity::Unclassified);
        assert_eq!(Severity::parse("near_miss"), Severity::NearMiss);
    }

    #[test]
    fn new_card_starts_in_backlog_and_active() {
        let card = Card::new(CardType::Task, "restock crash cart");
        assert_eq!(card.status, CardStatus::Backlog);
        assert!(card.is_active());
        assert!(!card.id.is_empty());
    }

    #[test]
    fn normalized_pct_drops_blank_values_and_defaults_system() {
        let pct = PctFields {
            patient_name: Some("   ".to_string()),
            event_code: Some(" 42 ".to_string()),
            ..PctFields::default()
        };
        let normalized = pct.normalized();
        assert_eq!(normalized.patient_name, None);
        assert_eq!(normalized.event_code.as_deref(), Some("42"));
        assert_eq!(normalized.notification_system.as_deref(), Some("Docnix"));
    }
}
