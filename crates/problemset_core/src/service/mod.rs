//! Use-case services over the problem set model.
//!
//! # Responsibility
//! - Combine record mutations with persistence (save, add problem, load).
//! - Keep CLI/UI callers decoupled from storage details.

pub mod problem_set_service;
