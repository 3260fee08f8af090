//! Core domain logic for the patient-safety incident board.
//! This crate is the single source of truth for board and analysis invariants.

pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod report;
pub mod service;
pub mod snapshot;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use engine::board::{BoardFilter, BoardView, SeverityFilter, UiState};
pub use engine::deadline::NotificationPolicy;
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::card::{Card, CardId, CardStatus, CardType, Severity};
pub use model::session::{ToolKind, ToolOwner};
pub use model::ValidationError;
pub use repo::analysis_repo::{AnalysisRepository, SqliteAnalysisRepository};
pub use repo::card_repo::{CardRepository, SqliteCardRepository};
pub use repo::session_repo::{SessionRepository, SqliteSessionRepository};
pub use repo::{RepoError, RepoResult};
pub use service::board_service::{BoardService, MoveOutcome, NewCard};
pub use service::board_session::BoardSession;
pub use service::{Actor, BoardServiceError, ToolServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
