//! Next-student selection policies.
//!
//! # Responsibility
//! - Build the candidate pool for the fair and cycle-limited policies.
//! - Draw from the pool and record the pick in one read-modify-write.
//!
//! # Invariants
//! - An empty roster yields `None` and writes nothing.
//! - A cycle reset and the pick that follows it are persisted together.

use crate::config::PickPolicy;
use crate::model::roster::{HistoryEntry, Student};
use crate::repo::kv_repo::KvRepository;
use crate::service::store::{Store, StoreResult};
use log::info;

/// Candidate pool for one draw, as indices into the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickPlan {
    Draw(Vec<usize>),
    /// Every student hit the cycle cap: clear counts, then draw from everyone.
    ResetThenDrawAll,
}

/// Students whose pick count equals the roster minimum.
pub fn fair_pool(students: &[Student]) -> Vec<usize> {
    let Some(min) = students.iter().map(Student::pick_count).min() else {
        return Vec::new();
    };
    students
        .iter()
        .enumerate()
        .filter(|(_, student)| student.pick_count() == min)
        .map(|(index, _)| index)
        .collect()
}

/// Pool for the cycle-limited policy under a cap of `cycles` picks.
pub fn cycle_limited_plan(students: &[Student], cycles: u32) -> PickPlan {
    let cap = cycles as usize;
    let eligible: Vec<usize> = students
        .iter()
        .enumerate()
        .filter(|(_, student)| student.pick_count() < cap)
        .map(|(index, _)| index)
        .collect();

    // Covers both "all exhausted" and an unexpectedly empty eligible pool.
    if eligible.is_empty() {
        PickPlan::ResetThenDrawAll
    } else {
        PickPlan::Draw(eligible)
    }
}

impl<R: KvRepository> Store<R> {
    /// Picks the next student with the configured policy.
    pub fn pick_next(&mut self) -> StoreResult<Option<HistoryEntry>> {
        let policy = self.config().pick_policy;
        self.pick_with(policy)
    }

    /// Uniform draw among the least-picked students.
    pub fn pick_fair(&mut self) -> StoreResult<Option<HistoryEntry>> {
        self.pick_with(PickPolicy::Fair)
    }

    /// Uniform draw among students below the group's cycle cap.
    pub fn pick_cycle_limited(&mut self) -> StoreResult<Option<HistoryEntry>> {
        self.pick_with(PickPolicy::CycleLimited)
    }

    pub fn pick_with(&mut self, policy: PickPolicy) -> StoreResult<Option<HistoryEntry>> {
        let mut root = self.load()?;
        let now = self.clock.now_ms();
        let Some(group) = root.current_group_mut() else {
            return Ok(None);
        };
        if group.students.is_empty() {
            return Ok(None);
        }

        let plan = match policy {
            PickPolicy::Fair => PickPlan::Draw(fair_pool(&group.students)),
            PickPolicy::CycleLimited => cycle_limited_plan(&group.students, group.cycles),
        };
        let (pool, reset) = match plan {
            PickPlan::Draw(pool) => (pool, false),
            PickPlan::ResetThenDrawAll => {
                group.reset_counts();
                ((0..group.students.len()).collect::<Vec<_>>(), true)
            }
        };

        let slot = self
            .index_source
            .next_index(pool.len())
            .min(pool.len() - 1);
        let student_id = group.students[pool[slot]].id.clone();
        let entry = group.record_pick(&student_id, now);
        let group_id = group.id.clone();

        self.save(&root)?;
        info!(
            "event=pick module=picker status=ok policy={} group_id={group_id} pool_size={} reset={reset}",
            policy.as_str(),
            pool.len()
        );
        Ok(entry)
    }
}
