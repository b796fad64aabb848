//! Storage and selection core for a classroom random student picker.
//! This crate owns the persisted roster shape, its migrations and the
//! pick policies; UI layers call into it.

pub mod config;
pub mod db;
pub mod format;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{LoggingConfig, PickPolicy, StoreConfig};
pub use format::{format_time, relative, relative_time};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::roster::{
    Group, GroupId, HistoryEntry, Root, Student, StudentId, Timestamp, CURRENT_VERSION,
};
pub use repo::kv_repo::{
    KvRepository, MemoryKvRepository, RepoError, RepoResult, SqliteKvRepository,
};
pub use service::clock::{Clock, FixedClock, SystemClock};
pub use service::migrator::{upgrade, MigrationError, Upgraded};
pub use service::picker::{cycle_limited_plan, fair_pool, PickPlan};
pub use service::random::{IndexSource, PcgIndexSource, ScriptedIndexSource, SecureIndexSource};
pub use service::store::{LoadOutcome, Store, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
