//! CLI smoke entry point.
//!
//! Opens both aggregate stores against the configured database (in-memory
//! when none is configured) and prints a one-line summary per store.

use mood_tracker_core::{
    mood_stats, AppConfig, KeyValueStore, SqliteKeyValueStore, StorageError, Workspace,
};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    let config = AppConfig::from_env();
    if let Some(log_dir) = std::env::args().nth(1) {
        let level = config
            .log_level
            .clone()
            .unwrap_or_else(|| mood_tracker_core::default_log_level().to_string());
        if let Err(err) = mood_tracker_core::init_logging(&level, &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mood_tracker: {err}");
            log::error!("event=cli_run module=cli status=error error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &AppConfig) -> Result<(), StorageError> {
    let backing: Arc<dyn KeyValueStore> = match &config.database_path {
        Some(path) => Arc::new(SqliteKeyValueStore::open(path)?),
        None => Arc::new(SqliteKeyValueStore::open_in_memory()?),
    };
    let workspace = Workspace::open(config, Some(backing));

    let companies = workspace.companies().snapshot();
    println!(
        "mood_tracker_core version={} companies={} users={} tasks={}",
        mood_tracker_core::core_version(),
        companies.companies.len(),
        companies.users.len(),
        companies.tasks.len()
    );

    let stats = mood_stats(&workspace.moods().snapshot());
    println!(
        "mood entries={} average_score={:.2}",
        stats.total_entries, stats.average_score
    );
    Ok(())
}
