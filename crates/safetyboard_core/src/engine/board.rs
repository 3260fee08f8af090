//! Board state machine: column placement, status corrections and moves.
//!
//! # Responsibility
//! - Project a snapshot onto the four board columns (read-only `classify`).
//! - Plan the `late` corrections implied by a snapshot.
//! - Decide user moves and apply corrections through a caller sink
//!   (`reconcile`, the only write path).
//!
//! # Invariants
//! - Archived cards are ignored entirely.
//! - An overdue card that is not `Done` is placed in `Late`.
//! - Nothing here ever moves a `Late` card out of `Late` on its own.
//! - The display filter never changes status or corrections.

use super::deadline::NotificationPolicy;
use super::overdue::{resolve_overdue, OverdueInfo};
use crate::model::card::{Card, CardId, CardStatus, CardType, Severity};
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::BTreeMap;
use std::fmt::Display;

/// Severity chip filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeverityFilter {
    #[default]
    All,
    /// Severe harm and death.
    Severe,
    Moderate,
    /// Mild harm, no harm and near misses.
    Mild,
}

impl SeverityFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Some(Self::All),
            "severe" => Some(Self::Severe),
            "moderate" => Some(Self::Moderate),
            "mild" => Some(Self::Mild),
            _ => None,
        }
    }

    pub fn admits(self, severity: Severity) -> bool {
        match self {
            Self::All => true,
            Self::Severe => matches!(severity, Severity::Severe | Severity::Death),
            Self::Moderate => severity == Severity::Moderate,
            Self::Mild => matches!(
                severity,
                Severity::Mild | Severity::NoHarm | Severity::NearMiss
            ),
        }
    }
}

/// Search term × severity chip, applied for display only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardFilter {
    search_term: String,
    severity: SeverityFilter,
}

impl BoardFilter {
    pub fn new(search_term: &str, severity: SeverityFilter) -> Self {
        Self {
            search_term: search_term.trim().to_lowercase(),
            severity,
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn severity(&self) -> SeverityFilter {
        self.severity
    }

    /// Non-event cards only pass the `All` chip.
    pub fn matches(&self, card: &Card) -> bool {
        if self.severity != SeverityFilter::All {
            if card.kind != CardType::Event || !self.severity.admits(card.severity) {
                return false;
            }
        }

        if self.search_term.is_empty() {
            return true;
        }
        let haystack = [
            card.title.as_str(),
            card.desc.as_str(),
            card.unit.as_str(),
            card.created_by.as_deref().unwrap_or_default(),
            card.pct.event_code.as_deref().unwrap_or_default(),
        ]
        .join(" ")
        .to_lowercase();
        haystack.contains(&self.search_term)
    }
}

/// Presentation state passed explicitly into board queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    pub filter: BoardFilter,
    pub open_card_id: Option<CardId>,
}

/// One card placed in a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedCard {
    pub card_id: CardId,
    pub column: CardStatus,
    pub overdue: OverdueInfo,
}

/// Pending `late` correction for a card whose stored status is stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusCorrection {
    pub card_id: CardId,
    pub from: CardStatus,
}

impl StatusCorrection {
    pub const TARGET: CardStatus = CardStatus::Late;
}

/// Column projection of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    columns: BTreeMap<CardStatus, Vec<PlacedCard>>,
    pub corrections: Vec<StatusCorrection>,
}

impl BoardView {
    pub fn column(&self, status: CardStatus) -> &[PlacedCard] {
        self.columns.get(&status).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, status: CardStatus) -> usize {
        self.column(status).len()
    }

    /// Column of `card_id`, when displayed.
    pub fn column_of(&self, card_id: &str) -> Option<CardStatus> {
        self.columns
            .iter()
            .find(|(_, cards)| cards.iter().any(|placed| placed.card_id == card_id))
            .map(|(status, _)| *status)
    }
}

/// Column a card belongs to, given its overdue evaluation.
pub fn placement(card: &Card, overdue: &OverdueInfo) -> CardStatus {
    if card.status != CardStatus::Done && overdue.is_overdue {
        CardStatus::Late
    } else {
        card.status
    }
}

/// Corrections implied by a snapshot, independent of any display filter.
pub fn plan_corrections(
    cards: &[Card],
    policy: &NotificationPolicy,
    today: NaiveDate,
) -> Vec<StatusCorrection> {
    cards
        .iter()
        .filter(|card| card.is_active())
        .filter(|card| !matches!(card.status, CardStatus::Done | CardStatus::Late))
        .filter(|card| resolve_overdue(card, policy, today).is_overdue)
        .map(|card| StatusCorrection {
            card_id: card.id.clone(),
            from: card.status,
        })
        .collect()
}

/// Read-only classification of a snapshot.
pub fn classify(
    cards: &[Card],
    filter: &BoardFilter,
    policy: &NotificationPolicy,
    today: NaiveDate,
) -> BoardView {
    let mut columns: BTreeMap<CardStatus, Vec<PlacedCard>> = CardStatus::COLUMNS
        .into_iter()
        .map(|status| (status, Vec::new()))
        .collect();

    for card in cards.iter().filter(|card| card.is_active()) {
        if !filter.matches(card) {
            continue;
        }
        let overdue = resolve_overdue(card, policy, today);
        let column = placement(card, &overdue);
        columns.entry(column).or_default().push(PlacedCard {
            card_id: card.id.clone(),
            column,
            overdue,
        });
    }

    BoardView {
        columns,
        corrections: plan_corrections(cards, policy, today),
    }
}

/// Why a user move was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    /// The card is overdue; only `done` (or staying `late`) is allowed.
    Overdue,
    /// `late` is system-assigned and the card is not overdue.
    LateNotOverdue,
}

impl MoveRejection {
    pub fn message(self) -> &'static str {
        match self {
            Self::Overdue => {
                "This card is overdue. Adjust its date, severity or deadline, or mark it as done."
            }
            Self::LateNotOverdue => "Only overdue cards can be placed in the late column.",
        }
    }
}

/// Outcome of a user-initiated move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDecision {
    /// Persist `status`.
    Accept(CardStatus),
    /// Refuse; when `reassert_late` is set the caller re-writes `late`.
    Reject {
        reason: MoveRejection,
        reassert_late: bool,
    },
}

/// Decides a drag or quick action to `target`.
pub fn decide_move(
    card: &Card,
    target: CardStatus,
    policy: &NotificationPolicy,
    today: NaiveDate,
) -> MoveDecision {
    if target == CardStatus::Done {
        return MoveDecision::Accept(CardStatus::Done);
    }

    let overdue = resolve_overdue(card, policy, today);
    match (target, overdue.is_overdue) {
        (CardStatus::Late, true) => MoveDecision::Accept(CardStatus::Late),
        // Dropping a late card back onto its own column is a no-op.
        (CardStatus::Late, false) if card.status == CardStatus::Late => {
            MoveDecision::Accept(CardStatus::Late)
        }
        (CardStatus::Late, false) => MoveDecision::Reject {
            reason: MoveRejection::LateNotOverdue,
            reassert_late: false,
        },
        (_, true) => MoveDecision::Reject {
            reason: MoveRejection::Overdue,
            reassert_late: true,
        },
        (other, false) => MoveDecision::Accept(other),
    }
}

/// Write side of reconciliation.
pub trait StatusSink {
    type Error: Display;

    fn persist_status(&self, card_id: &str, status: CardStatus) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub applied: Vec<CardId>,
    pub failed: Vec<CardId>,
}

/// Applies corrections best-effort. Failures are logged and reported, never
/// raised; the next refresh retries them.
pub fn reconcile<S: StatusSink + ?Sized>(
    corrections: &[StatusCorrection],
    sink: &S,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    for correction in corrections {
        match sink.persist_status(&correction.card_id, StatusCorrection::TARGET) {
            Ok(()) => {
                info!(
                    "event=status_correction module=board status=ok card_id={} from={}",
                    correction.card_id,
                    correction.from.as_str()
                );
                report.applied.push(correction.card_id.clone());
            }
            Err(err) => {
                warn!(
                    "event=status_correction module=board status=error card_id={} error={}",
                    correction.card_id, err
                );
                report.failed.push(correction.card_id.clone());
            }
        }
    }
    report
}
