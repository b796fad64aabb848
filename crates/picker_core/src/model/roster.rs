//! Roster records: students, history entries, groups and the root document.
//!
//! # Responsibility
//! - Define the serialized shape of the single persisted record.
//! - Provide constructors that uphold id and cycle invariants.
//!
//! # Invariants
//! - Freshly generated ids are v4 UUIDs and are never reused.
//! - History entries carry a denormalized name snapshot, not a reference.
//! - `cycles` never drops below `MIN_CYCLES`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Opaque student identifier. Legacy records may hold non-UUID strings.
pub type StudentId = String;

/// Opaque group identifier, also used as the key in `Root::groups`.
pub type GroupId = String;

/// Unix epoch milliseconds.
pub type Timestamp = i64;

/// Schema version written by this crate.
pub const CURRENT_VERSION: u32 = 5;

/// Lower bound for `Group::cycles`.
pub const MIN_CYCLES: u32 = 1;

/// Generates a fresh opaque id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Clamps a caller-provided cycle count into the valid range.
pub fn clamp_cycles(cycles: i64) -> u32 {
    u32::try_from(cycles.max(i64::from(MIN_CYCLES))).unwrap_or(u32::MAX)
}

/// One student on a group roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    /// Pick timestamps in append order. Its length is the pick count.
    #[serde(default)]
    pub picks: Vec<Timestamp>,
    /// Fields not modeled here, kept verbatim across rewrites.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Student {
    /// Creates a student with a generated id and no picks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            picks: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Number of times this student has been picked since the last reset.
    pub fn pick_count(&self) -> usize {
        self.picks.len()
    }
}

/// One recorded pick. Survives deletion of the student it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: StudentId,
    /// Name at pick time, rewritten when the student is renamed.
    pub name: String,
    pub timestamp: Timestamp,
    /// Fields not modeled here, kept verbatim across rewrites.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Named roster sharing one pick history and cycle cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Empty when absent from a legacy record; repaired from the map key.
    #[serde(default)]
    pub id: GroupId,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_cycles")]
    pub cycles: u32,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Fields not modeled here, kept verbatim across rewrites.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_cycles() -> u32 {
    MIN_CYCLES
}

impl Group {
    /// Creates an empty group with a generated id.
    pub fn new(title: impl Into<String>, cycles: u32) -> Self {
        Self::with_id(new_id(), title, cycles)
    }

    /// Creates an empty group under a caller-provided id.
    pub fn with_id(id: GroupId, title: impl Into<String>, cycles: u32) -> Self {
        Self {
            id,
            title: title.into(),
            cycles: cycles.max(MIN_CYCLES),
            students: Vec::new(),
            history: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|student| student.id == id)
    }

    pub fn student_mut(&mut self, id: &str) -> Option<&mut Student> {
        self.students.iter_mut().find(|student| student.id == id)
    }

    /// Empties every pick list and the history, keeping the roster.
    pub fn reset_counts(&mut self) {
        for student in &mut self.students {
            student.picks.clear();
        }
        self.history.clear();
    }

    /// Appends a pick for `student_id` at `timestamp`.
    ///
    /// Returns `None` when the student is not on this roster.
    pub fn record_pick(&mut self, student_id: &str, timestamp: Timestamp) -> Option<HistoryEntry> {
        let student = self.student_mut(student_id)?;
        student.picks.push(timestamp);
        let entry = HistoryEntry {
            id: student.id.clone(),
            name: student.name.clone(),
            timestamp,
            extra: Map::new(),
        };
        self.history.push(entry.clone());
        Some(entry)
    }

    /// Duplicates the roster under a new id with fresh student ids.
    ///
    /// Pick lists and history start empty; `cycles` is carried over.
    pub fn duplicate(&self, title: impl Into<String>) -> Self {
        let mut copy = Self::new(title, self.cycles);
        copy.students = self
            .students
            .iter()
            .map(|student| Student::new(student.name.clone()))
            .collect();
        copy
    }
}

/// The whole persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    #[serde(default)]
    pub groups: BTreeMap<GroupId, Group>,
    /// Empty when absent from a legacy record; repaired by the loader.
    #[serde(rename = "currentGroupId", default)]
    pub current_group_id: GroupId,
    #[serde(default)]
    pub version: u32,
    /// Fields not modeled here, kept verbatim across rewrites.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Root {
    /// Creates a current-version root holding one empty group.
    pub fn fresh(default_group_title: &str) -> Self {
        let group = Group::new(default_group_title, MIN_CYCLES);
        let current_group_id = group.id.clone();
        let mut groups = BTreeMap::new();
        groups.insert(group.id.clone(), group);
        Self {
            groups,
            current_group_id,
            version: CURRENT_VERSION,
            extra: Map::new(),
        }
    }

    pub fn current_group(&self) -> Option<&Group> {
        self.groups.get(&self.current_group_id)
    }

    pub fn current_group_mut(&mut self) -> Option<&mut Group> {
        self.groups.get_mut(&self.current_group_id)
    }

    /// First group id in map order, used when the current group goes away.
    pub fn first_group_id(&self) -> Option<&GroupId> {
        self.groups.keys().next()
    }
}
