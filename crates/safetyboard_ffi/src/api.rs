//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level board functions to Dart via FRB.
//! - Flatten core results into plain envelopes with a diagnostic message.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - `today` is read once per call, at this boundary, never inside core.

use rusqlite::Connection;
use safetyboard_core::db::open_db;
use safetyboard_core::engine::board::BoardFilter;
use safetyboard_core::engine::date_math::today;
use safetyboard_core::engine::overdue::due_tag;
use safetyboard_core::model::card::PctFields;
use safetyboard_core::model::failure_mode::{
    FailureModeDraft, ProbabilityCategory, SeverityCategory,
};
use safetyboard_core::repo::card_repo::CardDetails;
use safetyboard_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Actor, BoardService, CardStatus, CardType, CoreConfig, MoveOutcome, NewCard, Severity,
    SeverityFilter, SqliteCardRepository, UiState,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

const ENTRY_DB_FILE_NAME: &str = "safetyboard_entry.sqlite3";
static ENTRY_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static ENTRY_CONFIG: OnceLock<Result<CoreConfig, String>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One card as drawn in a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardCardItem {
    pub card_id: String,
    pub title: String,
    /// `event|task|project`.
    pub kind: String,
    pub severity: String,
    /// `D-n` / `D+n` when a deadline applies.
    pub due_tag: Option<String>,
    pub overdue: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardColumnItem {
    /// `backlog|doing|late|done`.
    pub status: String,
    pub cards: Vec<BoardCardItem>,
}

/// Board response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardColumnsResponse {
    pub ok: bool,
    pub columns: Vec<BoardColumnItem>,
    /// Late corrections written during this call.
    pub corrections_applied: u32,
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryActionResponse {
    pub ok: bool,
    pub card_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl EntryActionResponse {
    fn success(message: impl Into<String>, card_id: String) -> Self {
        Self {
            ok: true,
            card_id: Some(card_id),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            card_id: None,
            message: message.into(),
        }
    }
}

/// Live HFMEA scoring for a form being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FmeaPreviewResponse {
    pub ok: bool,
    pub hazard_score: u8,
    pub risk_level: String,
    /// `monitor|action`.
    pub decision: String,
    pub rationale: String,
    pub message: String,
}

/// Reconciles overdue cards, then returns the filtered columns.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Unknown `severity_filter` values are rejected.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn board_columns(search: String, severity_filter: String) -> BoardColumnsResponse {
    let failure = |message: String| BoardColumnsResponse {
        ok: false,
        columns: Vec::new(),
        corrections_applied: 0,
        message,
    };
    let Some(severity) = SeverityFilter::parse(&severity_filter) else {
        return failure(format!(
            "board_columns failed: unsupported severity filter `{}`",
            severity_filter.trim()
        ));
    };
    let ui = UiState {
        filter: BoardFilter::new(&search, severity),
        open_card_id: None,
    };

    let result = with_board_service(|service| {
        let today = today();
        let report = service.reconcile(today).map_err(|err| err.to_string())?;
        let cards: HashMap<String, _> = service
            .snapshot()
            .map_err(|err| err.to_string())?
            .into_iter()
            .map(|card| (card.id.clone(), card))
            .collect();
        let view = service.board(&ui, today).map_err(|err| err.to_string())?;

        let columns = CardStatus::COLUMNS
            .into_iter()
            .map(|status| BoardColumnItem {
                status: status.as_str().to_string(),
                cards: view
                    .column(status)
                    .iter()
                    .filter_map(|placed| {
                        let card = cards.get(&placed.card_id)?;
                        Some(BoardCardItem {
                            card_id: card.id.clone(),
                            title: card.title.clone(),
                            kind: card.kind.as_str().to_string(),
                            severity: card.severity.as_str().to_string(),
                            due_tag: placed.overdue.days_left.map(due_tag),
                            overdue: placed.overdue.is_overdue,
                        })
                    })
                    .collect(),
            })
            .collect();
        Ok((columns, report.applied.len()))
    });

    match result {
        Ok((columns, applied)) => BoardColumnsResponse {
            ok: true,
            columns,
            corrections_applied: u32::try_from(applied).unwrap_or(u32::MAX),
            message: "Board loaded.".to_string(),
        },
        Err(err) => failure(format!("board_columns failed: {err}")),
    }
}

/// Creates a backlog card.
///
/// Input semantics:
/// - `kind`: `event|task|project`.
/// - `severity`: severity key; ignored for non-events.
/// - Dates are ISO `YYYY-MM-DD`; blank means unset.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn entry_create_card(
    kind: String,
    title: String,
    severity: String,
    event_date: Option<String>,
    deadline: Option<String>,
    user: Option<String>,
) -> EntryActionResponse {
    let Some(kind) = CardType::parse(kind.trim()) else {
        return EntryActionResponse::failure(format!(
            "entry_create_card failed: unsupported card type `{}`",
            kind.trim()
        ));
    };
    let input = NewCard {
        kind,
        title,
        details: CardDetails {
            severity: Severity::parse(severity.trim()),
            date: event_date,
            deadline,
            ..CardDetails::default()
        },
    };
    let actor = Actor::now(user.as_deref());

    match with_board_service(|service| {
        service
            .create_card(&input, &actor)
            .map_err(|err| err.to_string())
    }) {
        Ok(card) => EntryActionResponse::success("Card created.", card.id),
        Err(err) => EntryActionResponse::failure(format!("entry_create_card failed: {err}")),
    }
}

/// Moves a card to `target` (`backlog|doing|late|done`).
///
/// # FFI contract
/// - Rejected moves return `ok=false` with the user-facing reason.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn entry_move_card(card_id: String, target: String) -> EntryActionResponse {
    let Some(target) = CardStatus::parse(target.trim()) else {
        return EntryActionResponse::failure(format!(
            "entry_move_card failed: unsupported status `{}`",
            target.trim()
        ));
    };

    match with_board_service(|service| {
        service
            .move_card(card_id.trim(), target, today())
            .map_err(|err| err.to_string())
    }) {
        Ok(MoveOutcome::Moved(status)) => EntryActionResponse::success(
            format!("Card moved to {}.", status.as_str()),
            card_id.trim().to_string(),
        ),
        Ok(MoveOutcome::Rejected(reason)) => EntryActionResponse {
            ok: false,
            card_id: Some(card_id.trim().to_string()),
            message: reason.message().to_string(),
        },
        Err(err) => EntryActionResponse::failure(format!("entry_move_card failed: {err}")),
    }
}

/// Archives a card. Archival is terminal.
#[flutter_rust_bridge::frb(sync)]
pub fn entry_archive_card(card_id: String, user: Option<String>) -> EntryActionResponse {
    let actor = Actor::now(user.as_deref());
    match with_board_service(|service| {
        service
            .archive(card_id.trim(), &actor)
            .map_err(|err| err.to_string())
    }) {
        Ok(card) => EntryActionResponse::success("Card archived.", card.id),
        Err(err) => EntryActionResponse::failure(format!("entry_archive_card failed: {err}")),
    }
}

/// Saves the investigation record of an event card.
#[flutter_rust_bridge::frb(sync)]
pub fn entry_save_event_record(
    card_id: String,
    event_code: Option<String>,
    conclusion: Option<String>,
) -> EntryActionResponse {
    let result = with_board_service(|service| {
        let current = service.card(card_id.trim()).map_err(|err| err.to_string())?;
        let pct = PctFields {
            event_code,
            conclusion_text: conclusion,
            ..current.pct
        };
        service
            .save_pct(card_id.trim(), &pct)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(card) => EntryActionResponse::success("Event record saved.", card.id),
        Err(err) => {
            EntryActionResponse::failure(format!("entry_save_event_record failed: {err}"))
        }
    }
}

/// Scores a failure mode without persisting it.
///
/// # FFI contract
/// - Categories are 1..=4; anything else returns `ok=false`.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn fmea_preview(
    severity_cat: u8,
    prob_cat: u8,
    single_point: bool,
    control_effective: bool,
    detectable: bool,
) -> FmeaPreviewResponse {
    let categories = SeverityCategory::from_level(severity_cat)
        .zip(ProbabilityCategory::from_level(prob_cat));
    let Some((severity_cat, prob_cat)) = categories else {
        return FmeaPreviewResponse {
            ok: false,
            hazard_score: 0,
            risk_level: String::new(),
            decision: String::new(),
            rationale: String::new(),
            message: "fmea_preview failed: categories must be between 1 and 4".to_string(),
        };
    };

    let preview = FailureModeDraft {
        severity_cat,
        prob_cat,
        single_point,
        control_effective,
        detectable,
        ..FailureModeDraft::default()
    }
    .preview();
    FmeaPreviewResponse {
        ok: true,
        hazard_score: preview.risk.hazard_score,
        risk_level: preview.risk.tier.label().to_string(),
        decision: preview.decision.status.as_str().to_string(),
        rationale: preview.decision.rationale().to_string(),
        message: String::new(),
    }
}

fn entry_config() -> Result<&'static CoreConfig, String> {
    ENTRY_CONFIG
        .get_or_init(|| load_entry_config(std::env::var("SAFETYBOARD_CONFIG").ok().as_deref()))
        .as_ref()
        .map_err(Clone::clone)
}

fn load_entry_config(path: Option<&str>) -> Result<CoreConfig, String> {
    match path.map(str::trim).filter(|path| !path.is_empty()) {
        Some(path) => CoreConfig::from_json_file(path)
            .map_err(|err| format!("entry config load failed: {err}")),
        None => Ok(CoreConfig::default()),
    }
}

/// `SAFETYBOARD_DB_PATH` wins over `config.db_path`, which wins over the
/// temp-dir fallback.
fn entry_db_path_for(config: &CoreConfig, env_override: Option<&str>) -> PathBuf {
    if let Some(raw) = env_override {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    config
        .db_path
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join(ENTRY_DB_FILE_NAME))
}

fn resolve_entry_db_path(config: &CoreConfig) -> PathBuf {
    ENTRY_DB_PATH
        .get_or_init(|| {
            entry_db_path_for(config, std::env::var("SAFETYBOARD_DB_PATH").ok().as_deref())
        })
        .clone()
}

fn open_entry_db(config: &CoreConfig) -> Result<Connection, String> {
    open_db(resolve_entry_db_path(config)).map_err(|err| format!("entry DB open failed: {err}"))
}

fn board_service<'conn>(
    conn: &'conn Connection,
    config: &CoreConfig,
) -> Result<BoardService<SqliteCardRepository<'conn>>, String> {
    let repo = SqliteCardRepository::try_new(conn)
        .map_err(|err| format!("entry repo init failed: {err}"))?;
    Ok(BoardService::new(repo, config.policy))
}

fn with_board_service<T>(
    f: impl FnOnce(&BoardService<SqliteCardRepository<'_>>) -> Result<T, String>,
) -> Result<T, String> {
    let config = entry_config()?;
    let conn = open_entry_db(config)?;
    let service = board_service(&conn, config)?;
    f(&service)
}

#[cfg(test)]
mod tests {
    use super::{
        board_columns, board_service, core_version, entry_archive_card, entry_create_card,
        entry_db_path_for, entry_move_card, fmea_preview, init_logging, load_entry_config, ping,
    };
    use safetyboard_core::db::open_db_in_memory;
    use safetyboard_core::engine::date_math::parse_iso_date;
    use safetyboard_core::repo::card_repo::CardDetails;
    use safetyboard_core::{Actor, CardStatus, CardType, CoreConfig, NewCard, Severity, UiState};
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn created_card_appears_in_backlog() {
        let title = unique_token("entry-create");
        let created = entry_create_card(
            "task".to_string(),
            title.clone(),
            String::new(),
            None,
            None,
            Some("nurse".to_string()),
        );
        assert!(created.ok, "{}", created.message);
        let card_id = created.card_id.expect("created card should return card_id");

        let board = board_columns(title, "all".to_string());
        assert!(board.ok, "{}", board.message);
        let backlog = board
            .columns
            .iter()
            .find(|column| column.status == "backlog")
            .expect("backlog column");
        assert!(backlog.cards.iter().any(|card| card.card_id == card_id));
    }

    #[test]
    fn overdue_event_is_corrected_and_refuses_doing() {
        let title = unique_token("entry-overdue");
        let created = entry_create_card(
            "event".to_string(),
            title.clone(),
            "severe".to_string(),
            Some("2000-01-01".to_string()),
            None,
            None,
        );
        assert!(created.ok, "{}", created.message);
        let card_id = created.card_id.expect("card_id");

        let board = board_columns(title, "severe".to_string());
        assert!(board.ok, "{}", board.message);
        let late = board
            .columns
            .iter()
            .find(|column| column.status == "late")
            .expect("late column");
        assert!(late.cards.iter().any(|card| card.card_id == card_id && card.overdue));

        let moved = entry_move_card(card_id.clone(), "doing".to_string());
        assert!(!moved.ok);
        assert!(moved.message.contains("overdue"));

        let done = entry_move_card(card_id.clone(), "done".to_string());
        assert!(done.ok, "{}", done.message);
        let archived = entry_archive_card(card_id, None);
        assert!(archived.ok, "{}", archived.message);
    }

    #[test]
    fn board_columns_rejects_unknown_filter() {
        let response = board_columns(String::new(), "critical".to_string());
        assert!(!response.ok);
        assert!(response.columns.is_empty());
    }

    #[test]
    fn entry_create_card_rejects_blank_title() {
        let response = entry_create_card(
            "task".to_string(),
            "   ".to_string(),
            String::new(),
            None,
            None,
            None,
        );
        assert!(!response.ok);
        assert!(response.message.contains("title"));
    }

    #[test]
    fn fmea_preview_requires_action_without_effective_controls() {
        let preview = fmea_preview(4, 4, false, false, true);
        assert!(preview.ok);
        assert_eq!(preview.hazard_score, 16);
        assert_eq!(preview.risk_level, "High");
        assert_eq!(preview.decision, "action");
        assert!(!fmea_preview(0, 2, false, true, true).ok);
    }

    #[test]
    fn configured_policy_drives_board_placement() {
        let strict = CoreConfig::from_json_str(r#"{"policy":{"severe_days_limit":3}}"#).unwrap();
        let today = parse_iso_date("2024-01-10").unwrap();
        let column_under = |config: &CoreConfig| {
            let conn = open_db_in_memory().unwrap();
            let service = board_service(&conn, config).unwrap();
            let card = service
                .create_card(
                    &NewCard {
                        kind: CardType::Event,
                        title: "Wrong site marking".to_string(),
                        details: CardDetails {
                            severity: Severity::Severe,
                            date: Some("2024-01-06".to_string()),
                            ..CardDetails::default()
                        },
                    },
                    &Actor::now(Some("nurse")),
                )
                .unwrap();
            service.reconcile(today).unwrap();
            service
                .board(&UiState::default(), today)
                .unwrap()
                .column_of(&card.id)
        };

        assert_eq!(column_under(&strict), Some(CardStatus::Late));
        assert_eq!(column_under(&CoreConfig::default()), Some(CardStatus::Backlog));
    }

    #[test]
    fn config_file_and_env_resolve_entry_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("safetyboard.json");
        std::fs::write(
            &path,
            r#"{"db_path":"/data/board.sqlite3","policy":{"moderate_is_mandatory":false}}"#,
        )
        .unwrap();

        let config = load_entry_config(path.to_str()).unwrap();
        assert!(!config.policy.moderate_is_mandatory);
        assert_eq!(
            entry_db_path_for(&config, None),
            PathBuf::from("/data/board.sqlite3")
        );
        assert_eq!(
            entry_db_path_for(&config, Some(" /tmp/override.sqlite3 ")),
            PathBuf::from("/tmp/override.sqlite3")
        );
        assert!(entry_db_path_for(&CoreConfig::default(), Some("  "))
            .ends_with("safetyboard_entry.sqlite3"));

        assert_eq!(load_entry_config(Some("")).unwrap(), CoreConfig::default());
        let missing = load_entry_config(dir.path().join("absent.json").to_str());
        assert!(missing.unwrap_err().contains("entry config load failed"));
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
