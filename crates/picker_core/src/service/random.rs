//! Uniform random index draws for the picker.
//!
//! # Responsibility
//! - Draw an index in `[0, len)` for a non-empty candidate pool.
//! - Prefer the OS CSPRNG; fall back to a seeded PCG generator.
//!
//! # Invariants
//! - Callers never pass `len == 0`; implementations still return 0 for it.
//! - Secure draws reduce a full-range `u32` modulo `len` (bias is negligible
//!   for classroom-sized pools).

use log::warn;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of uniform indices into a candidate pool.
pub trait IndexSource {
    fn next_index(&mut self, len: usize) -> usize;
}

/// OS-backed source with a pseudo-random fallback.
#[derive(Debug)]
pub struct SecureIndexSource {
    fallback: PcgIndexSource,
    fallback_logged: bool,
}

impl SecureIndexSource {
    pub fn new() -> Self {
        Self {
            fallback: PcgIndexSource::from_time(),
            fallback_logged: false,
        }
    }
}

impl Default for SecureIndexSource {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexSource for SecureIndexSource {
    fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        match getrandom::u32() {
            Ok(value) => value as usize % len,
            Err(err) => {
                if !self.fallback_logged {
                    warn!(
                        "event=random_fallback module=random status=degraded error={err}"
                    );
                    self.fallback_logged = true;
                }
                self.fallback.next_index(len)
            }
        }
    }
}

/// Seeded PCG source scaling a unit float into `[0, len)`.
#[derive(Debug, Clone)]
pub struct PcgIndexSource {
    rng: Pcg32,
}

impl PcgIndexSource {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Seeds from the current time; used only when the OS source is unavailable.
    pub fn from_time() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or(0x853c_49e6_748f_ea9b);
        Self::seeded(seed)
    }
}

impl IndexSource for PcgIndexSource {
    fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let unit: f64 = self.rng.random();
        ((unit * len as f64).floor() as usize).min(len - 1)
    }
}

/// Replays a fixed script of indices, each reduced modulo the pool size.
///
/// The script repeats once exhausted; an empty script always yields 0.
#[derive(Debug, Clone, Default)]
pub struct ScriptedIndexSource {
    script: Vec<usize>,
    position: usize,
}

impl ScriptedIndexSource {
    pub fn new(script: impl Into<Vec<usize>>) -> Self {
        Self {
            script: script.into(),
            position: 0,
        }
    }
}

impl IndexSource for ScriptedIndexSource {
    fn next_index(&mut self, len: usize) -> usize {
        if len == 0 || self.script.is_empty() {
            return 0;
        }
        let value = self.script[self.position % self.script.len()];
        self.position += 1;
        value % len
    }
}
