//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `safetyboard_core` linkage.
//! - With a database (argument or config `db_path`), reconcile the board
//!   and print column counts for today.
//!
//! Usage: `safetyboard_cli [--config <file.json>] [db_path]`

use safetyboard_core::engine::date_math::today;
use safetyboard_core::{
    open_db, BoardService, CardStatus, CoreConfig, SqliteCardRepository, UiState,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    config_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let path = args
                .next()
                .ok_or_else(|| "`--config` expects a file path".to_string())?;
            parsed.config_path = Some(PathBuf::from(path));
        } else if parsed.db_path.is_none() {
            parsed.db_path = Some(PathBuf::from(arg));
        } else {
            return Err(format!("unexpected argument `{arg}`"));
        }
    }
    Ok(parsed)
}

fn main() -> ExitCode {
    println!("safetyboard_core ping={}", safetyboard_core::ping());
    println!("safetyboard_core version={}", safetyboard_core::core_version());

    match run(std::env::args().skip(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("safetyboard error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: impl IntoIterator<Item = String>) -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args(args)?;
    let config = match &args.config_path {
        Some(path) => CoreConfig::from_json_file(path)?,
        None => CoreConfig::default(),
    };
    let Some(db_path) = args.db_path.or_else(|| config.db_path.clone()) else {
        return Ok(());
    };
    print_board(&db_path, &config)
}

fn print_board(db_path: &Path, config: &CoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db(db_path)?;
    let service = BoardService::new(SqliteCardRepository::try_new(&conn)?, config.policy);
    let today = today();
    let report = service.reconcile(today)?;
    println!(
        "reconcile applied={} failed={}",
        report.applied.len(),
        report.failed.len()
    );

    let view = service.board(&UiState::default(), today)?;
    for status in CardStatus::COLUMNS {
        println!("column {}={}", status.as_str(), view.count(status));
    }
    Ok(())
}
