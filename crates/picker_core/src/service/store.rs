//! Roster store: load/save protocol and CRUD operations.
//!
//! # Responsibility
//! - Load the single record through the migrator, writing upgrades back.
//! - Apply group and student mutations as whole-record read-modify-write.
//! - Report referential misses as `None`/`false`, never as errors.
//!
//! # Invariants
//! - Every operation reloads from the backend; nothing is cached.
//! - A mutation that finds no target does not write.
//! - The last remaining group can never be deleted.

use crate::config::StoreConfig;
use crate::model::roster::{clamp_cycles, Group, GroupId, HistoryEntry, Root, Student, MIN_CYCLES};
use crate::repo::kv_repo::{KvRepository, RepoError};
use crate::service::clock::{Clock, SystemClock};
use crate::service::migrator::upgrade;
use crate::service::random::{IndexSource, SecureIndexSource};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Backend transport failures. Record content problems never surface here.
#[derive(Debug)]
pub enum StoreError {
    Repo(RepoError),
    Encode(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode roster record: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// How `Store::load_with_outcome` obtained the returned root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing was stored; a fresh root was written.
    Fresh,
    /// Stored record was already current and consistent.
    Current,
    /// At least one version step ran; the upgrade was written back.
    Migrated,
    /// Record was current but needed invariant repair; written back.
    Repaired,
    /// Record was corrupt; replaced by a fresh root.
    Reset,
}

impl LoadOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Current => "current",
            Self::Migrated => "migrated",
            Self::Repaired => "repaired",
            Self::Reset => "reset",
        }
    }
}

/// Handle over one persisted roster record.
pub struct Store<R: KvRepository> {
    repo: R,
    config: StoreConfig,
    pub(crate) index_source: Box<dyn IndexSource>,
    pub(crate) clock: Box<dyn Clock>,
}

impl<R: KvRepository> Store<R> {
    /// Creates a store with OS randomness and the system clock.
    pub fn new(repo: R, config: StoreConfig) -> Self {
        Self {
            repo,
            config,
            index_source: Box::new(SecureIndexSource::new()),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_index_source(mut self, index_source: impl IndexSource + 'static) -> Self {
        self.index_source = Box::new(index_source);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Loads the current root, migrating or resetting as needed.
    pub fn load(&self) -> StoreResult<Root> {
        self.load_with_outcome().map(|(root, _)| root)
    }

    /// Loads the current root and reports which load path was taken.
    ///
    /// Fresh, migrated, repaired and reset roots are persisted before return.
    pub fn load_with_outcome(&self) -> StoreResult<(Root, LoadOutcome)> {
        let key = self.config.storage_key.as_str();
        let title = self.config.default_group_title.as_str();

        let (root, outcome, from_version) = match self.repo.get_item(key)? {
            None => (Root::fresh(title), LoadOutcome::Fresh, None),
            Some(raw) => match upgrade(&raw, title) {
                Ok(upgraded) => {
                    let outcome = if upgraded.migrated {
                        LoadOutcome::Migrated
                    } else if upgraded.repaired {
                        LoadOutcome::Repaired
                    } else {
                        LoadOutcome::Current
                    };
                    (upgraded.root, outcome, Some(upgraded.from_version))
                }
                Err(err) => {
                    warn!(
                        "event=store_load module=store status=recovered outcome=reset error={err}"
                    );
                    (Root::fresh(title), LoadOutcome::Reset, None)
                }
            },
        };

        if outcome != LoadOutcome::Current {
            self.save(&root)?;
            info!(
                "event=store_load module=store status=ok outcome={} from_version={} groups={}",
                outcome.as_str(),
                from_version.map_or_else(|| "none".to_string(), |version| version.to_string()),
                root.groups.len()
            );
        }
        Ok((root, outcome))
    }

    /// Serializes and writes the whole root.
    pub fn save(&self, root: &Root) -> StoreResult<()> {
        let encoded = serde_json::to_string(root).map_err(StoreError::Encode)?;
        self.repo
            .set_item(self.config.storage_key.as_str(), encoded.as_str())?;
        debug!(
            "event=store_save module=store status=ok bytes={}",
            encoded.len()
        );
        Ok(())
    }

    /// Load, mutate, and persist only when `mutate` reports a change.
    fn update<T>(
        &self,
        mutate: impl FnOnce(&mut Root) -> Option<T>,
    ) -> StoreResult<Option<T>> {
        let mut root = self.load()?;
        let result = mutate(&mut root);
        if result.is_some() {
            self.save(&root)?;
        }
        Ok(result)
    }

    fn update_current<T>(
        &self,
        mutate: impl FnOnce(&mut Group) -> Option<T>,
    ) -> StoreResult<Option<T>> {
        self.update(|root| root.current_group_mut().and_then(mutate))
    }

    // Groups

    /// Creates a group with one cycle.
    pub fn create_group(&self, title: &str) -> StoreResult<Group> {
        self.create_group_with_cycles(title, i64::from(MIN_CYCLES))
    }

    /// Creates a group; `cycles` is clamped to at least 1.
    pub fn create_group_with_cycles(&self, title: &str, cycles: i64) -> StoreResult<Group> {
        let mut root = self.load()?;
        let group = Group::new(title.trim(), clamp_cycles(cycles));
        root.groups.insert(group.id.clone(), group.clone());
        self.save(&root)?;
        info!(
            "event=group_create module=store status=ok group_id={} cycles={}",
            group.id, group.cycles
        );
        Ok(group)
    }

    /// Deletes a group. Refuses to delete the last one.
    ///
    /// When the current group is deleted, current moves to the first
    /// remaining group.
    pub fn delete_group(&self, group_id: &str) -> StoreResult<bool> {
        let deleted = self.update(|root| {
            if root.groups.len() <= 1 || !root.groups.contains_key(group_id) {
                return None;
            }
            root.groups.remove(group_id);
            if root.current_group_id == group_id {
                root.current_group_id = root.first_group_id()?.clone();
            }
            Some(())
        })?;
        if deleted.is_none() {
            debug!("event=group_delete module=store status=rejected group_id={group_id}");
        }
        Ok(deleted.is_some())
    }

    pub fn set_current_group(&self, group_id: &str) -> StoreResult<bool> {
        let switched = self.update(|root| {
            if !root.groups.contains_key(group_id) {
                return None;
            }
            root.current_group_id = group_id.to_string();
            Some(())
        })?;
        Ok(switched.is_some())
    }

    pub fn rename_group(&self, group_id: &str, title: &str) -> StoreResult<bool> {
        let renamed = self.update(|root| {
            let group = root.groups.get_mut(group_id)?;
            group.title = title.trim().to_string();
            Some(())
        })?;
        Ok(renamed.is_some())
    }

    /// Copies a group's roster and cycle cap under a new id.
    ///
    /// Students get fresh ids and empty pick lists; history starts empty.
    /// Returns `None` when `source_group_id` is unknown.
    pub fn copy_group(&self, source_group_id: &str, title: &str) -> StoreResult<Option<Group>> {
        self.update(|root| {
            let copy = root.groups.get(source_group_id)?.duplicate(title.trim());
            root.groups.insert(copy.id.clone(), copy.clone());
            Some(copy)
        })
    }

    /// Sets a group's cycle cap, clamped to at least 1.
    pub fn set_cycles(&self, group_id: &str, cycles: i64) -> StoreResult<bool> {
        let updated = self.update(|root| {
            root.groups.get_mut(group_id)?.cycles = clamp_cycles(cycles);
            Some(())
        })?;
        Ok(updated.is_some())
    }

    pub fn current_cycles(&self) -> StoreResult<u32> {
        Ok(self
            .current_group()?
            .map_or(MIN_CYCLES, |group| group.cycles))
    }

    pub fn current_group(&self) -> StoreResult<Option<Group>> {
        let mut root = self.load()?;
        let current_group_id = root.current_group_id.clone();
        Ok(root.groups.remove(&current_group_id))
    }

    pub fn current_group_id(&self) -> StoreResult<GroupId> {
        Ok(self.load()?.current_group_id)
    }

    pub fn all_groups(&self) -> StoreResult<Vec<Group>> {
        Ok(self.load()?.groups.into_values().collect())
    }

    // Students of the current group

    /// Adds a student with a trimmed name to the current group.
    pub fn add_student(&self, name: &str) -> StoreResult<Option<Student>> {
        self.update_current(|group| {
            let student = Student::new(name.trim());
            group.students.push(student.clone());
            Some(student)
        })
    }

    /// Removes a student from the roster. History is kept.
    pub fn delete_student(&self, student_id: &str) -> StoreResult<bool> {
        let removed = self.update_current(|group| {
            let before = group.students.len();
            group.students.retain(|student| student.id != student_id);
            (group.students.len() != before).then_some(())
        })?;
        Ok(removed.is_some())
    }

    /// Renames a student and every history entry recorded under its id.
    pub fn rename_student(&self, student_id: &str, new_name: &str) -> StoreResult<bool> {
        let renamed = self.update_current(|group| {
            let name = new_name.trim().to_string();
            group.student_mut(student_id)?.name = name.clone();
            for entry in group
                .history
                .iter_mut()
                .filter(|entry| entry.id == student_id)
            {
                entry.name = name.clone();
            }
            Some(())
        })?;
        Ok(renamed.is_some())
    }

    /// Empties the current group's roster and history.
    pub fn clear_all(&self) -> StoreResult<bool> {
        let cleared = self.update_current(|group| {
            group.students.clear();
            group.history.clear();
            Some(())
        })?;
        Ok(cleared.is_some())
    }

    /// Clears every pick list and the history of the current group.
    pub fn reset_counts(&self) -> StoreResult<bool> {
        let reset = self.update_current(|group| {
            group.reset_counts();
            Some(())
        })?;
        Ok(reset.is_some())
    }

    /// Records a pick for `student_id` in the current group at clock time.
    pub fn record_pick(&self, student_id: &str) -> StoreResult<Option<HistoryEntry>> {
        let now = self.clock.now_ms();
        self.update_current(|group| group.record_pick(student_id, now))
    }

    pub fn students(&self) -> StoreResult<Vec<Student>> {
        Ok(self
            .current_group()?
            .map(|group| group.students)
            .unwrap_or_default())
    }

    pub fn history(&self) -> StoreResult<Vec<HistoryEntry>> {
        Ok(self
            .current_group()?
            .map(|group| group.history)
            .unwrap_or_default())
    }

    pub fn student(&self, student_id: &str) -> StoreResult<Option<Student>> {
        Ok(self.current_group()?.and_then(|group| {
            group
                .students
                .into_iter()
                .find(|student| student.id == student_id)
        }))
    }
}
