//! Overdue detection for one card.
//!
//! # Invariants
//! - `Done` cards are never overdue.
//! - For events with a computable regulatory deadline, that deadline wins
//!   over any manual `deadline`.
//! - Only strictly negative `days_left` is overdue; due today is on time.

use super::date_math::{days_between, parse_iso_date};
use super::deadline::{regulatory_deadline, NotificationPolicy};
use crate::model::card::{Card, CardStatus, CardType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which rule produced the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverdueRule {
    Regulatory,
    Manual,
    None,
}

impl OverdueRule {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regulatory => "regulatory",
            Self::Manual => "manual",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverdueInfo {
    pub is_overdue: bool,
    pub rule: OverdueRule,
    pub due_date: Option<NaiveDate>,
    pub days_left: Option<i64>,
}

impl OverdueInfo {
    const NOT_JUDGED: Self = Self {
        is_overdue: false,
        rule: OverdueRule::None,
        due_date: None,
        days_left: None,
    };

    fn from_days_left(rule: OverdueRule, due_date: NaiveDate, days_left: i64) -> Self {
        Self {
            is_overdue: days_left < 0,
            rule,
            due_date: Some(due_date),
            days_left: Some(days_left),
        }
    }
}

/// Decides whether `card` is overdue as of `today`.
pub fn resolve_overdue(card: &Card, policy: &NotificationPolicy, today: NaiveDate) -> OverdueInfo {
    if card.status == CardStatus::Done {
        return OverdueInfo::NOT_JUDGED;
    }

    if card.kind == CardType::Event && card.date.is_some() {
        let regulatory = regulatory_deadline(policy, card.severity, card.date.as_deref(), today);
        if let (Some(due), Some(days_left)) = (regulatory.deadline_date, regulatory.days_left) {
            return OverdueInfo::from_days_left(OverdueRule::Regulatory, due, days_left);
        }
        // Unparseable event date: fall back to the manual deadline below.
    }

    if let Some(due) = card.deadline.as_deref().and_then(parse_iso_date) {
        return OverdueInfo::from_days_left(OverdueRule::Manual, due, days_between(today, due));
    }

    OverdueInfo::NOT_JUDGED
}

/// Compact due tag: `D-3` (three days left), `D-0` (due today), `D+2`
/// (two days overdue).
pub fn due_tag(days_left: i64) -> String {
    if days_left >= 0 {
        format!("D-{days_left}")
    } else {
        format!("D+{}", days_left.unsigned_abs())
    }
}

/// Display urgency bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueUrgency {
    Ok,
    AtRisk,
    Expired,
}

pub const AT_RISK_WINDOW_DAYS: i64 = 2;

impl DueUrgency {
    pub fn from_days_left(days_left: i64) -> Self {
        if days_left < 0 {
            Self::Expired
        } else if days_left <= AT_RISK_WINDOW_DAYS {
            Self::AtRisk
        } else {
            Self::Ok
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{due_tag, resolve_overdue, DueUrgency, OverdueRule};
    use crate::engine::date_math::parse_iso_date;
    use crate::engine::deadline::NotificationPolicy;
    use crate::model::card::{Card, CardStatus, CardType, Severity};
    use chrono::NaiveDate;

    fn date(value: &str) -> NaiveDate {
        parse_iso_date(value).unwrap()
    }

    fn event(severity: Severity, event_date: &str) -> Card {
        let mut card = Card::with_id("e1", CardType::Event, "fall in ward");
        card.severity = severity;
        card.date = Some(event_date.to_string());
        card
    }

    #[test]
    fn due_today_is_not_overdue_but_yesterday_is() {
        let policy = NotificationPolicy::default();
        let card = event(Severity::Severe, "2024-01-01");

        let due_today = resolve_overdue(&card, &policy, date("2024-01-06"));
        assert_eq!(due_today.days_left, Some(0));
        assert!(!due_today.is_overdue);

        let day_after = resolve_overdue(&card, &policy, date("2024-01-07"));
        assert_eq!(day_after.days_left, Some(-1));
        assert!(day_after.is_overdue);
        assert_eq!(day_after.rule, OverdueRule::Regulatory);
    }

    #[test]
    fn done_cards_are_never_overdue() {
        let mut card = event(Severity::Death, "2020-01-01");
        card.status = CardStatus::Done;
        let info = resolve_overdue(&card, &NotificationPolicy::default(), date("2024-01-01"));
        assert!(!info.is_overdue);
        assert_eq!(info.rule, OverdueRule::None);
        assert_eq!(info.days_left, None);
    }

    #[test]
    fn regulatory_rule_takes_priority_over_manual_deadline() {
        let mut card = event(Severity::Mild, "2024-01-01");
        card.deadline = Some("2023-12-01".to_string());
        let info = resolve_overdue(&card, &NotificationPolicy::default(), date("2024-01-05"));
        assert_eq!(info.rule, OverdueRule::Regulatory);
        assert!(!info.is_overdue);
    }

    #[test]
    fn task_uses_manual_deadline() {
        let mut card = Card::with_id("t1", CardType::Task, "audit");
        card.deadline = Some("2024-02-01".to_string());
        let info = resolve_overdue(&card, &NotificationPolicy::default(), date("2024-01-20"));
        assert_eq!(info.rule, OverdueRule::Manual);
        assert_eq!(info.days_left, Some(12));
        assert!(!info.is_overdue);
    }

    #[test]
    fn invalid_event_date_falls_back_to_manual_deadline() {
        let mut card = event(Severity::Severe, "not-a-date");
        card.deadline = Some("2024-01-01".to_string());
        let info = resolve_overdue(&card, &NotificationPolicy::default(), date("2024-01-03"));
        assert_eq!(info.rule, OverdueRule::Manual);
        assert!(info.is_overdue);
    }

    #[test]
    fn no_dates_means_not_judged() {
        let card = Card::with_id("p1", CardType::Project, "new protocol");
        let info = resolve_overdue(&card, &NotificationPolicy::default(), date("2024-01-03"));
        assert_eq!(info.rule, OverdueRule::None);
        assert!(!info.is_overdue);
    }

    #[test]
    fn due_tag_and_urgency() {
        assert_eq!(due_tag(3), "D-3");
        assert_eq!(due_tag(0), "D-0");
        assert_eq!(due_tag(-2), "D+2");
        assert_eq!(DueUrgency::from_days_left(-1), DueUrgency::Expired);
        assert_eq!(DueUrgency::from_days_left(2), DueUrgency::AtRisk);
        assert_eq!(DueUrgency::from_days_left(3), DueUrgency::Ok);
    }
}
