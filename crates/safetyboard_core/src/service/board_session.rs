//! Live board driven by store snapshots.
//!
//! # Responsibility
//! - Re-classify on every snapshot and issue `late` corrections once.
//! - Own the presentation state (filter, open detail panel).
//!
//! # Invariants
//! - A correction already written is not re-issued while the store still
//!   reports the stale status; a failed one is retried on the next snapshot.
//! - Corrections never depend on the active filter.

use crate::engine::board::{classify, reconcile, BoardFilter, BoardView, StatusSink, UiState};
use crate::engine::deadline::NotificationPolicy;
use crate::model::card::{Card, CardId, CardStatus};
use chrono::NaiveDate;
use log::debug;
use std::collections::HashMap;

pub struct BoardSession {
    policy: NotificationPolicy,
    ui: UiState,
    pending: HashMap<CardId, CardStatus>,
}

impl BoardSession {
    pub fn new(policy: NotificationPolicy) -> Self {
        Self {
            policy,
            ui: UiState::default(),
            pending: HashMap::new(),
        }
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut UiState {
        &mut self.ui
    }

    pub fn set_filter(&mut self, filter: BoardFilter) {
        self.ui.filter = filter;
    }

    pub fn open_card(&mut self, card_id: Option<CardId>) {
        self.ui.open_card_id = card_id;
    }

    /// Corrections written but not yet reflected by the store.
    pub fn pending_corrections(&self) -> usize {
        self.pending.len()
    }

    /// Handles one snapshot: classify, then write outstanding corrections.
    pub fn apply_snapshot<S: StatusSink + ?Sized>(
        &mut self,
        cards: &[Card],
        today: NaiveDate,
        sink: &S,
    ) -> BoardView {
        let view = classify(cards, &self.ui.filter, &self.policy, today);

        self.pending.retain(|card_id, from| {
            view.corrections
                .iter()
                .any(|correction| &correction.card_id == card_id && correction.from == *from)
        });

        let outstanding: Vec<_> = view
            .corrections
            .iter()
            .filter(|correction| !self.pending.contains_key(&correction.card_id))
            .cloned()
            .collect();
        if !outstanding.is_empty() {
            let report = reconcile(&outstanding, sink);
            for correction in &outstanding {
                if report.applied.contains(&correction.card_id) {
                    self.pending
                        .insert(correction.card_id.clone(), correction.from);
                }
            }
        }

        if let Some(open_id) = self.ui.open_card_id.as_deref() {
            let still_open = cards
                .iter()
                .any(|card| card.id == open_id && card.is_active());
            if !still_open {
                debug!("event=detail_close module=board card_id={open_id}");
                self.ui.open_card_id = None;
            }
        }

        view
    }
}

#[cfg(test)]
mod tests {
    use super::BoardSession;
    use crate::engine::board::{BoardFilter, SeverityFilter, StatusSink};
    use crate::engine::date_math::parse_iso_date;
    use crate::engine::deadline::NotificationPolicy;
    use crate::model::card::{Card, CardStatus, CardType, Severity};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        writes: RefCell<Vec<String>>,
        fail: bool,
    }

    impl StatusSink for RecordingSink {
        type Error = String;

        fn persist_status(&self, card_id: &str, _status: CardStatus) -> Result<(), String> {
            self.writes.borrow_mut().push(card_id.to_string());
            if self.fail {
                Err("store offline".to_string())
            } else {
                Ok(())
            }
        }
    }

    fn overdue_task(id: &str) -> Card {
        let mut card = Card::with_id(id, CardType::Task, "renew protocol");
        card.deadline = Some("2024-01-05".to_string());
        card.status = CardStatus::Doing;
        card
    }

    #[test]
    fn correction_is_issued_once_until_store_catches_up() {
        let today = parse_iso_date("2024-01-10").unwrap();
        let sink = RecordingSink::default();
        let mut session = BoardSession::new(NotificationPolicy::default());
        let mut cards = vec![overdue_task("t1")];

        let view = session.apply_snapshot(&cards, today, &sink);
        assert_eq!(view.column_of("t1"), Some(CardStatus::Late));
        session.apply_snapshot(&cards, today, &sink);
        assert_eq!(sink.writes.borrow().len(), 1);
        assert_eq!(session.pending_corrections(), 1);

        cards[0].status = CardStatus::Late;
        session.apply_snapshot(&cards, today, &sink);
        assert_eq!(session.pending_corrections(), 0);
        assert_eq!(sink.writes.borrow().len(), 1);
    }

    #[test]
    fn failed_correction_is_retried() {
        let today = parse_iso_date("2024-01-10").unwrap();
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        let mut session = BoardSession::new(NotificationPolicy::default());
        let cards = vec![overdue_task("t1")];

        session.apply_snapshot(&cards, today, &sink);
        session.apply_snapshot(&cards, today, &sink);
        assert_eq!(sink.writes.borrow().len(), 2);
        assert_eq!(session.pending_corrections(), 0);
    }

    #[test]
    fn corrections_ignore_the_active_filter() {
        let today = parse_iso_date("2024-01-10").unwrap();
        let sink = RecordingSink::default();
        let mut session = BoardSession::new(NotificationPolicy::default());
        session.set_filter(BoardFilter::new("", SeverityFilter::Severe));

        let view = session.apply_snapshot(&[overdue_task("t1")], today, &sink);
        assert_eq!(view.column_of("t1"), None);
        assert_eq!(sink.writes.borrow().as_slice(), ["t1".to_string()]);
    }

    #[test]
    fn detail_panel_closes_when_card_is_archived() {
        let today = parse_iso_date("2024-01-10").unwrap();
        let sink = RecordingSink::default();
        let mut session = BoardSession::new(NotificationPolicy::default());
        let mut card = Card::with_id("e1", CardType::Event, "fall");
        card.severity = Severity::Mild;
        session.open_card(Some("e1".to_string()));

        session.apply_snapshot(std::slice::from_ref(&card), today, &sink);
        assert_eq!(session.ui().open_card_id.as_deref(), Some("e1"));

        card.archived = true;
        session.apply_snapshot(&[card], today, &sink);
        assert_eq!(session.ui().open_card_id, None);
    }
}
