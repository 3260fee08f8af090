//! Board use cases: card lifecycle, moves, reconciliation and indicators.
//!
//! # Responsibility
//! - Create and edit cards with the board's normalisation rules.
//! - Turn engine decisions (placement, moves, corrections) into writes.
//!
//! # Invariants
//! - `late` is only written by reconciliation or by re-asserting it on a
//!   rejected move.
//! - Archived cards are read-only here.
//! - Non-event cards are stored with severity `unclassified`.

use super::{Actor, BoardServiceError};
use crate::engine::board::{
    classify, decide_move, plan_corrections, reconcile, BoardView, MoveDecision, MoveRejection,
    ReconcileReport, StatusSink, UiState,
};
use crate::engine::deadline::{regulatory_deadline, NotificationPolicy, RegulatoryDeadline};
use crate::engine::indicators::{compute_indicators, BoardIndicators};
use crate::engine::overdue::{resolve_overdue, OverdueInfo};
use crate::model::card::{Card, CardId, CardStatus, CardType, PctFields, Severity};
use crate::model::non_empty;
use crate::repo::card_repo::{ArchiveScope, CardDetails, CardListQuery, CardRepository};
use crate::repo::RepoError;
use chrono::NaiveDate;
use log::info;

pub type BoardResult<T> = Result<T, BoardServiceError>;

/// Input for a new card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCard {
    pub kind: CardType,
    pub title: String,
    pub details: CardDetails,
}

/// Result of a user move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved(CardStatus),
    Rejected(MoveRejection),
}

/// Writes corrections through a card repository.
pub struct RepoStatusSink<'a, R: CardRepository>(pub &'a R);

impl<R: CardRepository> StatusSink for RepoStatusSink<'_, R> {
    type Error = RepoError;

    fn persist_status(&self, card_id: &str, status: CardStatus) -> Result<(), RepoError> {
        self.0.update_status(card_id, status)
    }
}

pub struct BoardService<R: CardRepository> {
    repo: R,
    policy: NotificationPolicy,
}

fn normalized_details(kind: CardType, details: &CardDetails) -> CardDetails {
    CardDetails {
        desc: details.desc.trim().to_string(),
        unit: details.unit.trim().to_string(),
        owner: details.owner.trim().to_string(),
        severity: if kind == CardType::Event {
            details.severity
        } else {
            Severity::Unclassified
        },
        date: non_empty(details.date.as_deref()),
        deadline: non_empty(details.deadline.as_deref()),
        quality_related: details.quality_related,
    }
}

impl<R: CardRepository> BoardService<R> {
    pub fn new(repo: R, policy: NotificationPolicy) -> Self {
        Self { repo, policy }
    }

    pub fn policy(&self) -> &NotificationPolicy {
        &self.policy
    }

    /// Creates a backlog card and returns the stored record.
    pub fn create_card(&self, input: &NewCard, actor: &Actor) -> BoardResult<Card> {
        let details = normalized_details(input.kind, &input.details);
        let mut card = Card::new(input.kind, input.title.trim());
        card.validate()?;
        card.desc = details.desc;
        card.unit = details.unit;
        card.owner = details.owner;
        card.severity = details.severity;
        card.date = details.date;
        card.deadline = details.deadline;
        card.quality_related = details.quality_related;
        card.created_by = actor.user.clone();
        card.created_at = Some(actor.timestamp());
        if card.is_event() {
            card.pct.notification_date = Some(actor.date().format("%Y-%m-%d").to_string());
            card.pct.notification_system = Some(PctFields::DEFAULT_NOTIFICATION_SYSTEM.to_string());
        }

        let card_id = self.repo.create_card(&card)?;
        info!(
            "event=card_create module=board status=ok card_id={} kind={}",
            card_id,
            card.kind.as_str()
        );
        self.repo
            .get_card(&card_id)?
            .ok_or(BoardServiceError::InconsistentState(
                "created card not found in read-back",
            ))
    }

    pub fn card(&self, card_id: &str) -> BoardResult<Card> {
        self.repo
            .get_card(card_id)?
            .ok_or_else(|| BoardServiceError::CardNotFound(card_id.to_string()))
    }

    fn active_card(&self, card_id: &str) -> BoardResult<Card> {
        let card = self.card(card_id)?;
        if card.archived {
            return Err(BoardServiceError::CardArchived(card.id));
        }
        Ok(card)
    }

    /// Every stored card, archived included.
    pub fn snapshot(&self) -> BoardResult<Vec<Card>> {
        Ok(self.repo.list_cards(&CardListQuery {
            scope: ArchiveScope::All,
            kind: None,
        })?)
    }

    /// Read-only board projection for the given presentation state.
    pub fn board(&self, ui: &UiState, today: NaiveDate) -> BoardResult<BoardView> {
        let cards = self.snapshot()?;
        Ok(classify(&cards, &ui.filter, &self.policy, today))
    }

    /// Persists `late` for every active card that became overdue.
    pub fn reconcile(&self, today: NaiveDate) -> BoardResult<ReconcileReport> {
        let cards = self.snapshot()?;
        let corrections = plan_corrections(&cards, &self.policy, today);
        let report = reconcile(&corrections, &RepoStatusSink(&self.repo));
        info!(
            "event=board_reconcile module=board status=ok planned={} applied={} failed={}",
            corrections.len(),
            report.applied.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Drag or quick action to `target`.
    pub fn move_card(
        &self,
        card_id: &str,
        target: CardStatus,
        today: NaiveDate,
    ) -> BoardResult<MoveOutcome> {
        let card = self.active_card(card_id)?;
        match decide_move(&card, target, &self.policy, today) {
            MoveDecision::Accept(status) => {
                if status != card.status {
                    self.repo.update_status(&card.id, status)?;
                }
                info!(
                    "event=card_move module=board status=ok card_id={} from={} to={}",
                    card.id,
                    card.status.as_str(),
                    status.as_str()
                );
                Ok(MoveOutcome::Moved(status))
            }
            MoveDecision::Reject {
                reason,
                reassert_late,
            } => {
                if reassert_late && card.status != CardStatus::Late {
                    self.repo.update_status(&card.id, CardStatus::Late)?;
                }
                info!(
                    "event=card_move module=board status=rejected card_id={} target={}",
                    card.id,
                    target.as_str()
                );
                Ok(MoveOutcome::Rejected(reason))
            }
        }
    }

    /// "Move to doing" quick action.
    pub fn start_card(&self, card_id: &str, today: NaiveDate) -> BoardResult<MoveOutcome> {
        self.move_card(card_id, CardStatus::Doing, today)
    }

    /// "Mark done" quick action; always accepted.
    pub fn mark_done(&self, card_id: &str, today: NaiveDate) -> BoardResult<MoveOutcome> {
        self.move_card(card_id, CardStatus::Done, today)
    }

    pub fn rename(&self, card_id: &str, title: &str) -> BoardResult<()> {
        self.active_card(card_id)?;
        self.repo.update_title(card_id, title)?;
        Ok(())
    }

    pub fn update_details(&self, card_id: &str, details: &CardDetails) -> BoardResult<Card> {
        let card = self.active_card(card_id)?;
        self.repo
            .update_details(card_id, &normalized_details(card.kind, details))?;
        self.card(card_id)
    }

    /// Saves the event investigation record; blank fields are cleared.
    pub fn save_pct(&self, card_id: &str, pct: &PctFields) -> BoardResult<Card> {
        let card = self.active_card(card_id)?;
        if !card.is_event() {
            return Err(BoardServiceError::NotAnEvent(card.id));
        }
        self.repo.save_pct(card_id, &pct.normalized())?;
        info!("event=pct_save module=board status=ok card_id={card_id}");
        self.card(card_id)
    }

    /// Terminal archival: `archived`, `status=done`, archival stamp.
    pub fn archive(&self, card_id: &str, actor: &Actor) -> BoardResult<Card> {
        self.card(card_id)?;
        self.repo
            .archive_card(card_id, actor.user.as_deref(), &actor.timestamp())?;
        info!("event=card_archive module=board status=ok card_id={card_id}");
        self.card(card_id)
    }

    pub fn indicators(&self, today: NaiveDate) -> BoardResult<BoardIndicators> {
        let cards = self.snapshot()?;
        Ok(compute_indicators(&cards, &self.policy, today))
    }

    pub fn overdue(&self, card: &Card, today: NaiveDate) -> OverdueInfo {
        resolve_overdue(card, &self.policy, today)
    }

    pub fn regulatory_deadline(&self, card: &Card, today: NaiveDate) -> RegulatoryDeadline {
        regulatory_deadline(&self.policy, card.severity, card.date.as_deref(), today)
    }

    /// Ids of active cards currently displayed in `status`.
    pub fn column_ids(
        &self,
        ui: &UiState,
        status: CardStatus,
        today: NaiveDate,
    ) -> BoardResult<Vec<CardId>> {
        Ok(self
            .board(ui, today)?
            .column(status)
            .iter()
            .map(|placed| placed.card_id.clone())
            .collect())
    }
}
