//! Core domain logic for homework problem sets.
//! This crate is the single source of truth for problem set invariants.

pub mod config;
pub mod db;
pub mod events;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{load_config, parse_config, AppConfig, ConfigError, CourseConfig, DateSettings};
pub use events::{DateErrorEvent, SetErrorKind, SetEvent, SetEvents};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::problem::{Problem, ProblemId, ProblemList};
pub use model::problem_set::{
    field_description, DateField, DateOrderError, HideOption, IpRestriction, ModelError,
    ProblemSet, SetValidationError,
};
pub use repo::set_repo::{
    RepoError, RepoResult, SaveOutcome, SetRepository, SetSummary, SqliteSetRepository,
};
pub use service::problem_set_service::{ProblemSetService, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
