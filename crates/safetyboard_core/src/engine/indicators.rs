//! Board summary counters.

use super::date_math::format_iso_date;
use super::deadline::{regulatory_deadline, NotificationPolicy};
use crate::model::card::{Card, CardStatus};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardIndicators {
    /// Active cards not yet done.
    pub open: usize,
    /// Active cards whose event date is today.
    pub today: usize,
    /// Open events still inside their notification window.
    pub regulatory_on_time: usize,
    /// Open events past their notification window.
    pub regulatory_late: usize,
    /// Finished cards (done or archived) analysed with both the diagram and PDCA.
    pub complete: usize,
}

pub fn compute_indicators(
    cards: &[Card],
    policy: &NotificationPolicy,
    today: NaiveDate,
) -> BoardIndicators {
    let today_iso = format_iso_date(today);
    let mut indicators = BoardIndicators::default();

    for card in cards {
        let analysed = card.tools_used.ishikawa && card.tools_used.pdca;
        if card.archived {
            if analysed {
                indicators.complete += 1;
            }
            continue;
        }

        let done = card.status == CardStatus::Done;
        if !done {
            indicators.open += 1;
        }
        if card.date.as_deref() == Some(today_iso.as_str()) {
            indicators.today += 1;
        }
        if card.is_event() && !done {
            let deadline = regulatory_deadline(policy, card.severity, card.date.as_deref(), today);
            match deadline.days_left {
                Some(days) if days >= 0 => indicators.regulatory_on_time += 1,
                Some(_) => indicators.regulatory_late += 1,
                None => {}
            }
        }
        if done && analysed {
            indicators.complete += 1;
        }
    }

    indicators
}
