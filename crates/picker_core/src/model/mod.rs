//! Persisted domain model for rosters, groups and pick history.
//!
//! # Responsibility
//! - Define the canonical record shapes written to the key-value backend.
//! - Keep JSON field names stable across schema versions.
//!
//! # Invariants
//! - `Root::groups` is non-empty once a record leaves the loader.
//! - `Root::current_group_id` always resolves to a present group.
//! - `Group::cycles` is at least 1.

pub mod roster;
