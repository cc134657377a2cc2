//! Client-resident data layer for the mood tracker.
//! Persisted aggregates, derived views, the offline resource cache and
//! push notification delivery live here.

pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod storage;
pub mod store;
pub mod view;
pub mod worker;

pub use config::AppConfig;
pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::company::{
    Company, CompanyAggregate, Department, NewTask, NewUser, Role, Task, User,
};
pub use model::mood::{MoodAggregate, MoodEntry, MoodEntryPatch, NewMoodEntry};
pub use model::stat::{DepartmentMoodStats, MoodStats, StatKind, StatRecord};
pub use model::EntityId;
pub use storage::{
    KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StorageError, StorageResult,
};
pub use store::company_store::CompanyStore;
pub use store::mood_store::MoodStore;
pub use store::persisted::{Aggregate, PersistedStore, Subscription};
pub use store::workspace::{CompanyDeletePolicy, Workspace};
pub use store::{StoreError, StoreResult};
pub use view::stats::{mood_stats, stat_records, StatsView};
pub use worker::{BackgroundWorker, WorkerError, WorkerEvent, WorkerOutcome};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
