//! Problem set use-case service.
//!
//! # Responsibility
//! - Validate once per save attempt, then persist.
//! - Persist immediately after every added problem.
//! - Load stored sets through the same response parsing a server reply uses.
//!
//! # Invariants
//! - A failed validation never reaches the repository.
//! - The service is bound to one course; every path it logs is that
//!   course's resource path.

use crate::config::{CourseConfig, DateSettings};
use crate::model::problem::{Problem, ProblemId};
use crate::model::problem_set::{ModelError, ProblemSet, SetValidationError};
use crate::repo::set_repo::{RepoError, SaveOutcome, SetRepository, SetSummary};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    /// The candidate state failed validation; nothing was stored.
    Validation(SetValidationError),
    /// A stored or supplied payload could not be applied to the model.
    Model(ModelError),
    SetNotFound(String),
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Model(err) => write!(f, "{err}"),
            Self::SetNotFound(set_id) => write!(f, "problem set not found: {set_id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Model(err) => Some(err),
            Self::SetNotFound(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<SetValidationError> for ServiceError {
    fn from(value: SetValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ModelError> for ServiceError {
    fn from(value: ModelError) -> Self {
        Self::Model(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { set_id, .. } => Self::SetNotFound(set_id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Problem set operations for one course.
pub struct ProblemSetService<R: SetRepository> {
    repo: R,
    course: CourseConfig,
}

impl<R: SetRepository> ProblemSetService<R> {
    pub fn new(repo: R, course: CourseConfig) -> Self {
        Self { repo, course }
    }

    pub fn course(&self) -> &CourseConfig {
        &self.course
    }

    /// Resource path of `set` in this service's course.
    pub fn url(&self, set: &ProblemSet) -> String {
        set.url(&self.course)
    }

    /// Validates the full candidate state once, then stores it.
    ///
    /// On date-ordering failure the set also emits `SetEvent::DateError`.
    /// A first successful save assigns `id = set_id`.
    pub fn save(&self, set: &mut ProblemSet) -> ServiceResult<SaveOutcome> {
        let url = self.url(set);
        if let Err(err) = set.validate() {
            warn!(
                "event=set_save module=service status=rejected url={} error={}",
                url, err
            );
            return Err(err.into());
        }

        let assigns_id = set.is_new();
        if assigns_id {
            set.id = Some(set.set_id.clone());
        }
        let outcome = match self.repo.save_set(&self.course, set) {
            Ok(outcome) => outcome,
            Err(err) => {
                if assigns_id {
                    set.id = None;
                }
                warn!(
                    "event=set_save module=service status=error url={} error={}",
                    url, err
                );
                return Err(err.into());
            }
        };

        info!(
            "event=set_save module=service status=ok url={} outcome={} problems={}",
            url,
            outcome.as_str(),
            set.problems().len()
        );
        Ok(outcome)
    }

    /// Adds a copy of `problem` under the next free id and saves the set.
    ///
    /// The problem stays in the list even when the save fails.
    pub fn add_problem(&self, set: &mut ProblemSet, problem: &Problem) -> ServiceResult<ProblemId> {
        let problem_id = set.add_problem(problem);
        self.save(set)?;
        Ok(problem_id)
    }

    /// Loads a stored set, or `None` when the course has no such set.
    pub fn load(
        &self,
        set_id: &str,
        date_settings: DateSettings,
    ) -> ServiceResult<Option<ProblemSet>> {
        let Some(body) = self.repo.fetch_set(&self.course, set_id)? else {
            return Ok(None);
        };
        Ok(Some(ProblemSet::from_response(body, date_settings)?))
    }

    /// Refreshes `set` from storage, keeping its settings and subscribers.
    ///
    /// Problems deferred before the load are added and saved right away.
    pub fn reload(&self, set: &mut ProblemSet) -> ServiceResult<()> {
        let body = self
            .repo
            .fetch_set(&self.course, &set.set_id)?
            .ok_or_else(|| ServiceError::SetNotFound(set.set_id.clone()))?;

        let had_pending = !set.pending_problems().is_empty();
        set.hydrate(body)?;
        if had_pending && set.pending_problems().is_empty() {
            self.save(set)?;
        }
        Ok(())
    }

    pub fn delete(&self, set_id: &str) -> ServiceResult<()> {
        self.repo.delete_set(&self.course, set_id)?;
        info!(
            "event=set_delete module=service status=ok course_id={} set_id={}",
            self.course.course_id, set_id
        );
        Ok(())
    }

    pub fn list_sets(&self) -> ServiceResult<Vec<SetSummary>> {
        Ok(self.repo.list_sets(&self.course)?)
    }
}
