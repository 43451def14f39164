//! Problem set domain model.
//!
//! # Responsibility
//! - Define the canonical `ProblemSet` record and its embedded problems.
//! - Keep wire leniency (server payload quirks) out of the typed fields.
//!
//! # Invariants
//! - A `ProblemSet` owns its `ProblemList`; problems never outlive the set.
//! - Date ordering is validated per save attempt, not per mutation.

pub mod problem;
pub mod problem_set;
mod wire;
