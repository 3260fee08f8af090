//! Use-case services over the repositories.
//!
//! # Responsibility
//! - Orchestrate repository calls into board and analysis-tool use cases.
//! - Keep FFI and CLI callers decoupled from storage details.
//!
//! # Invariants
//! - Services never read the clock for decisions; `today` and write stamps
//!   arrive as parameters.
//! - Services never bypass repository validation.

use crate::model::ValidationError;
use crate::repo::RepoError;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod archive_service;
pub mod board_service;
pub mod board_session;
pub mod cause_service;
pub mod fmea_service;
pub mod plan_service;
pub mod session_service;

/// Who performs a write, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user: Option<String>,
    pub at: DateTime<Utc>,
}

impl Actor {
    pub fn new(user: Option<&str>, at: DateTime<Utc>) -> Self {
        Self {
            user: user
                .map(str::trim)
                .filter(|user| !user.is_empty())
                .map(str::to_string),
            at,
        }
    }

    /// Stamp for the current instant.
    pub fn now(user: Option<&str>) -> Self {
        Self::new(user, Utc::now())
    }

    /// RFC 3339 timestamp with millisecond precision.
    pub fn timestamp(&self) -> String {
        self.at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn date(&self) -> NaiveDate {
        self.at.date_naive()
    }
}

#[derive(Debug)]
pub enum BoardServiceError {
    Validation(ValidationError),
    CardNotFound(String),
    /// Archived cards are read-only.
    CardArchived(String),
    /// Investigation fields only apply to events.
    NotAnEvent(String),
    /// Persisted card disappeared between write and read-back.
    InconsistentState(&'static str),
    Repo(RepoError),
}

impl Display for BoardServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::CardNotFound(id) => write!(f, "card not found: {id}"),
            Self::CardArchived(id) => write!(f, "card is archived: {id}"),
            Self::NotAnEvent(id) => write!(f, "card is not an event: {id}"),
            Self::InconsistentState(details) => write!(f, "inconsistent board state: {details}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BoardServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for BoardServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for BoardServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "card",
                id,
            } => Self::CardNotFound(id),
            other => Self::Repo(other),
        }
    }
}

#[derive(Debug)]
pub enum ToolServiceError {
    Validation(ValidationError),
    /// Owner or child record missing.
    NotFound { entity: &'static str, id: String },
    Repo(RepoError),
    /// Report exporter failure.
    Export(String),
}

impl Display for ToolServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Export(message) => write!(f, "report export failed: {message}"),
        }
    }
}

impl Error for ToolServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ToolServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ToolServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Repo(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Actor;
    use chrono::{TimeZone, Utc};

    #[test]
    fn actor_trims_user_and_formats_millis() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let actor = Actor::new(Some("  "), at);
        assert_eq!(actor.user, None);
        assert_eq!(actor.timestamp(), "2024-03-01T08:30:00.000Z");
        assert_eq!(actor.date().to_string(), "2024-03-01");
    }
}
