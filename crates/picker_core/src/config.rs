//! Store and logging configuration.
//!
//! # Responsibility
//! - Hold the tunables callers pass into `Store` and `init_logging`.
//! - Parse them from JSON with every field optional.
//!
//! # Invariants
//! - Unknown JSON fields are rejected so typos do not silently fall back.

use serde::{Deserialize, Serialize};

pub const DEFAULT_STORAGE_KEY: &str = "rsp:data";
pub const DEFAULT_GROUP_TITLE: &str = "Default Group";

const DEFAULT_LOG_FILE_BASENAME: &str = "picker";
const DEFAULT_MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_LOG_FILES: usize = 5;

/// Selection policy used by `Store::pick_next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickPolicy {
    /// Uniform draw among the least-picked students.
    Fair,
    /// Uniform draw among students under the group's cycle cap.
    #[default]
    CycleLimited,
}

impl PickPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fair => "fair",
            Self::CycleLimited => "cycle_limited",
        }
    }
}

/// Settings for one `Store` handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Key under which the serialized root is stored.
    pub storage_key: String,
    /// Title given to groups the loader creates.
    pub default_group_title: String,
    pub pick_policy: PickPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_group_title: DEFAULT_GROUP_TITLE.to_string(),
            pick_policy: PickPolicy::default(),
        }
    }
}

impl StoreConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn with_policy(mut self, pick_policy: PickPolicy) -> Self {
        self.pick_policy = pick_policy;
        self
    }
}

/// Settings for the rolling file logger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`, case-insensitive.
    pub level: String,
    /// Absolute directory for log files.
    pub log_dir: String,
    pub file_basename: String,
    pub max_file_size_bytes: u64,
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            log_dir: String::new(),
            file_basename: DEFAULT_LOG_FILE_BASENAME.to_string(),
            max_file_size_bytes: DEFAULT_MAX_LOG_FILE_SIZE_BYTES,
            max_files: DEFAULT_MAX_LOG_FILES,
        }
    }
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>, log_dir: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            log_dir: log_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
