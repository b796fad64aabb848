//! Wall-clock source for pick timestamps.

use crate::model::roster::Timestamp;
use chrono::Utc;
use std::cell::Cell;

/// Millisecond wall clock.
pub trait Clock {
    fn now_ms(&self) -> Timestamp;
}

/// System time in Unix epoch milliseconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Timestamp {
        Utc::now().timestamp_millis()
    }
}

/// Deterministic clock for tests and replays.
///
/// Returns `start` on the first call and advances by `step` after each call.
#[derive(Debug)]
pub struct FixedClock {
    next: Cell<Timestamp>,
    step: Timestamp,
}

impl FixedClock {
    pub fn at(now: Timestamp) -> Self {
        Self::stepping(now, 0)
    }

    pub fn stepping(start: Timestamp, step: Timestamp) -> Self {
        Self {
            next: Cell::new(start),
            step,
        }
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> Timestamp {
        let now = self.next.get();
        self.next.set(now.saturating_add(self.step));
        now
    }
}
