//! Roster use-case services.
//!
//! # Responsibility
//! - Upgrade stored records and enforce roster invariants.
//! - Expose group, student and pick operations over any `KvRepository`.
//! - Keep randomness and time injectable.

pub mod clock;
pub mod migrator;
pub mod picker;
pub mod random;
pub mod store;
