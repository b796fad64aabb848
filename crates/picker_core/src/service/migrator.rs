//! Versioned upgrade chain for the persisted roster record.
//!
//! # Responsibility
//! - Detect the schema version of a raw stored record.
//! - Upgrade legacy shapes step by step to `CURRENT_VERSION`.
//! - Repair referential gaps (missing ids, stale current group, empty map).
//!
//! # Invariants
//! - Each step is total over JSON objects and idempotent.
//! - Each step strictly raises the version tag, so the chain terminates.
//! - A record that is not an object or does not decode is reported as
//!   corrupt; callers reset rather than surface the error.

use crate::model::roster::{new_id, Group, Root, CURRENT_VERSION, MIN_CYCLES};
use log::{info, warn};
use serde_json::{json, Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

type JsonObject = Map<String, Value>;

/// Reasons a stored record is treated as corrupt.
#[derive(Debug)]
pub enum MigrationError {
    Parse(serde_json::Error),
    NotAnObject,
    InvalidVersion(Value),
    Decode(serde_json::Error),
}

impl Display for MigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "stored record is not valid JSON: {err}"),
            Self::NotAnObject => write!(f, "stored record is not a JSON object"),
            Self::InvalidVersion(value) => write!(f, "unrecognized version tag `{value}`"),
            Self::Decode(err) => write!(f, "stored record does not match the schema: {err}"),
        }
    }
}

impl Error for MigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) | Self::Decode(err) => Some(err),
            Self::NotAnObject | Self::InvalidVersion(_) => None,
        }
    }
}

/// Result of upgrading a stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upgraded {
    pub root: Root,
    /// Version tag found in storage before any step ran.
    pub from_version: u32,
    /// At least one chain step ran.
    pub migrated: bool,
    /// Sanity pass changed the decoded record.
    pub repaired: bool,
}

impl Upgraded {
    pub fn changed(&self) -> bool {
        self.migrated || self.repaired
    }
}

struct MigrationStep {
    name: &'static str,
    min_version: u32,
    max_version: u32,
    apply: fn(JsonObject, &str) -> JsonObject,
}

const STEPS: &[MigrationStep] = &[
    MigrationStep {
        name: "flat_to_groups",
        min_version: 0,
        max_version: 1,
        apply: wrap_flat_record,
    },
    MigrationStep {
        name: "ensure_cycles",
        min_version: 2,
        max_version: 4,
        apply: ensure_group_cycles,
    },
];

/// Parses and upgrades a raw stored record.
///
/// `default_group_title` names groups the chain or sanity pass creates.
pub fn upgrade(raw: &str, default_group_title: &str) -> Result<Upgraded, MigrationError> {
    let value: Value = serde_json::from_str(raw).map_err(MigrationError::Parse)?;
    let Value::Object(mut record) = value else {
        return Err(MigrationError::NotAnObject);
    };

    let from_version = detect_version(&record)?;
    let mut version = from_version;
    let mut migrated = false;

    while version < CURRENT_VERSION {
        let Some(step) = STEPS
            .iter()
            .find(|step| (step.min_version..=step.max_version).contains(&version))
        else {
            break;
        };
        record = (step.apply)(record, default_group_title);
        let next = detect_version(&record)?;
        info!(
            "event=schema_migrate module=migrator status=ok step={} from={version} to={next}",
            step.name
        );
        migrated = true;
        if next <= version {
            break;
        }
        version = next;
    }

    if version > CURRENT_VERSION {
        warn!(
            "event=schema_migrate module=migrator status=skipped reason=newer_version version={version} current={CURRENT_VERSION}"
        );
    }

    let cycles_repaired = normalize_group_cycles(&mut record);
    let mut root: Root =
        serde_json::from_value(Value::Object(record)).map_err(MigrationError::Decode)?;
    let repaired = repair(&mut root, default_group_title) || cycles_repaired;

    Ok(Upgraded {
        root,
        from_version,
        migrated,
        repaired,
    })
}

/// Reads the version tag. Absent, null and zero all mean version 1.
pub fn detect_version(record: &JsonObject) -> Result<u32, MigrationError> {
    match record.get("version") {
        None | Some(Value::Null) => Ok(1),
        Some(value) => value
            .as_u64()
            .map(|version| u32::try_from(version.max(1)).unwrap_or(u32::MAX))
            .ok_or_else(|| MigrationError::InvalidVersion(value.clone())),
    }
}

/// Version 1: flat `{students, history}` becomes one group.
fn wrap_flat_record(mut record: JsonObject, default_group_title: &str) -> JsonObject {
    let students = take_array(&mut record, "students");
    let history = take_array(&mut record, "history");
    let group_id = new_id();

    let mut groups = JsonObject::new();
    groups.insert(
        group_id.clone(),
        json!({
            "id": group_id,
            "title": default_group_title,
            "cycles": MIN_CYCLES,
            "students": students,
            "history": history,
        }),
    );

    let mut upgraded = JsonObject::new();
    upgraded.insert("groups".to_string(), Value::Object(groups));
    upgraded.insert("currentGroupId".to_string(), Value::String(group_id));
    upgraded.insert("version".to_string(), json!(2));
    upgraded
}

/// Versions 2 to 4: every group gets a positive `cycles`.
fn ensure_group_cycles(mut record: JsonObject, _default_group_title: &str) -> JsonObject {
    normalize_group_cycles(&mut record);
    record.insert("version".to_string(), json!(CURRENT_VERSION));
    record
}

/// Rewrites every missing, non-integer or non-positive `cycles` to 1 and
/// saturates values above `u32::MAX`. Returns whether any group changed.
///
/// Runs for every version so one bad group never fails the typed decode.
fn normalize_group_cycles(record: &mut JsonObject) -> bool {
    let Some(groups) = record.get_mut("groups").and_then(Value::as_object_mut) else {
        return false;
    };
    let mut changed = false;
    for group in groups.values_mut().filter_map(Value::as_object_mut) {
        let normalized = match group.get("cycles").and_then(Value::as_u64) {
            Some(cycles) if cycles > u64::from(u32::MAX) => Some(u32::MAX),
            Some(cycles) if cycles >= u64::from(MIN_CYCLES) => None,
            _ => Some(MIN_CYCLES),
        };
        if let Some(cycles) = normalized {
            group.insert("cycles".to_string(), json!(cycles));
            changed = true;
        }
    }
    changed
}

fn take_array(record: &mut JsonObject, key: &str) -> Value {
    match record.remove(key) {
        Some(Value::Array(items)) => Value::Array(items),
        _ => Value::Array(Vec::new()),
    }
}

/// Restores root invariants on a decoded record. Returns whether it changed.
pub fn repair(root: &mut Root, default_group_title: &str) -> bool {
    let mut changed = false;

    for (key, group) in &mut root.groups {
        if group.id != *key {
            group.id = key.clone();
            changed = true;
        }
        if group.cycles < MIN_CYCLES {
            group.cycles = MIN_CYCLES;
            changed = true;
        }
    }

    if root.groups.is_empty() {
        let group = Group::new(default_group_title, MIN_CYCLES);
        root.current_group_id = group.id.clone();
        root.groups.insert(group.id.clone(), group);
        changed = true;
    }

    if !root.groups.contains_key(&root.current_group_id) {
        if let Some(first) = root.first_group_id().cloned() {
            root.current_group_id = first;
            changed = true;
        }
    }

    if root.version < CURRENT_VERSION {
        root.version = CURRENT_VERSION;
        changed = true;
    }

    changed
}
