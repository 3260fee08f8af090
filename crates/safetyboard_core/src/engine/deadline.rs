//! Regulatory notification deadline.
//!
//! # Invariants
//! - `deadline = event_date + days_limit` in calendar days.
//! - A missing or unparseable event date yields `days_left = None`, which is
//!   distinct from `Some(0)` ("due today").

use super::date_math::{add_days, days_between, format_iso_date, parse_iso_date};
use crate::model::card::Severity;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MANDATORY_LABEL: &str = "mandatory notification";
pub const RECOMMENDED_LABEL: &str = "recommended notification";
pub const CLASSIFY_LABEL: &str = "classify severity for a precise notification rule";
pub const NO_BASE_DATE_LABEL: &str = "no event date";
pub const INVALID_BASE_DATE_LABEL: &str = "invalid event date";

/// Notification timeline policy.
///
/// `moderate_is_mandatory` is a local interpretation, kept configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPolicy {
    /// Day limit for severe harm and death.
    pub severe_days_limit: u32,
    /// Day limit for every other severity.
    pub standard_days_limit: u32,
    pub moderate_is_mandatory: bool,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            severe_days_limit: 5,
            standard_days_limit: 10,
            moderate_is_mandatory: true,
        }
    }
}

/// Rule row selected for one severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationRule {
    pub days_limit: u32,
    pub mandatory: bool,
    pub label: &'static str,
}

impl NotificationPolicy {
    pub fn rule_for(&self, severity: Severity) -> NotificationRule {
        match severity {
            Severity::Severe | Severity::Death => NotificationRule {
                days_limit: self.severe_days_limit,
                mandatory: true,
                label: MANDATORY_LABEL,
            },
            Severity::Moderate => NotificationRule {
                days_limit: self.standard_days_limit,
                mandatory: self.moderate_is_mandatory,
                label: if self.moderate_is_mandatory {
                    MANDATORY_LABEL
                } else {
                    RECOMMENDED_LABEL
                },
            },
            Severity::Mild | Severity::NoHarm | Severity::NearMiss => NotificationRule {
                days_limit: self.standard_days_limit,
                mandatory: false,
                label: RECOMMENDED_LABEL,
            },
            Severity::Unclassified => NotificationRule {
                days_limit: self.standard_days_limit,
                mandatory: false,
                label: CLASSIFY_LABEL,
            },
        }
    }
}

/// Regulatory deadline evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegulatoryDeadline {
    pub deadline_date: Option<NaiveDate>,
    /// `None` when no deadline is computable.
    pub days_left: Option<i64>,
    pub days_limit: u32,
    pub mandatory: bool,
    pub label: &'static str,
}

impl RegulatoryDeadline {
    pub fn is_computable(&self) -> bool {
        self.deadline_date.is_some()
    }

    pub fn deadline_iso(&self) -> Option<String> {
        self.deadline_date.map(format_iso_date)
    }
}

/// Computes the notification deadline for an event anchored at `event_date`.
pub fn regulatory_deadline(
    policy: &NotificationPolicy,
    severity: Severity,
    event_date: Option<&str>,
    today: NaiveDate,
) -> RegulatoryDeadline {
    let rule = policy.rule_for(severity);
    let uncomputable = |label| RegulatoryDeadline {
        deadline_date: None,
        days_left: None,
        days_limit: rule.days_limit,
        mandatory: rule.mandatory,
        label,
    };

    let Some(raw) = event_date else {
        return uncomputable(NO_BASE_DATE_LABEL);
    };
    let Some(base) = parse_iso_date(raw) else {
        return uncomputable(INVALID_BASE_DATE_LABEL);
    };
    let Some(deadline) = add_days(base, rule.days_limit) else {
        return uncomputable(INVALID_BASE_DATE_LABEL);
    };

    RegulatoryDeadline {
        deadline_date: Some(deadline),
        days_left: Some(days_between(today, deadline)),
        days_limit: rule.days_limit,
        mandatory: rule.mandatory,
        label: rule.label,
    }
}
