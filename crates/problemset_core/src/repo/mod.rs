//! Repository layer for persisted problem sets.
//!
//! # Responsibility
//! - Define the storage contract the service layer talks to.
//! - Isolate SQLite query details from orchestration code.
//!
//! # Invariants
//! - Writes run `ProblemSet::check()` first; no invalid set reaches storage.
//! - Missing rows surface as `RepoError::NotFound`, not as transport errors.

pub mod set_repo;
