//! Storage backend abstractions for the single persisted record.
//!
//! # Responsibility
//! - Define the string key-value contract the store persists through.
//! - Isolate SQLite details from store/migration logic.
//!
//! # Invariants
//! - Repositories store opaque strings; they never parse record content.
//! - A missing key is `Ok(None)`, never an error.

pub mod kv_repo;
