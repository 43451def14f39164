//! Problem set repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Store and return the wire body of each set, keyed by course and set id.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Writes call `ProblemSet::check()` before touching SQL.
//! - Stored bodies always include the embedded `problems` array.
//! - Rows are addressed by `(course_id, set_id)`; `resource_path` mirrors
//!   `ProblemSet::url` for the same course.

use crate::config::CourseConfig;
use crate::db::DbError;
use crate::model::problem_set::{ModelError, ProblemSet, SetValidationError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Validation(SetValidationError),
    Model(ModelError),
    Db(DbError),
    NotFound { course_id: String, set_id: String },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Model(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { course_id, set_id } => {
                write!(f, "problem set not found: {course_id}/{set_id}")
            }
            Self::InvalidData(message) => write!(f, "invalid stored problem set: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Model(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<SetValidationError> for RepoError {
    fn from(value: SetValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ModelError> for RepoError {
    fn from(value: ModelError) -> Self {
        Self::Model(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Whether a save inserted a new row or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

impl SaveOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }
}

/// Listing row for one stored set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetSummary {
    pub set_id: String,
    pub resource_path: String,
    pub problem_count: usize,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// Persistence contract for problem sets.
pub trait SetRepository {
    fn save_set(&self, course: &CourseConfig, set: &ProblemSet) -> RepoResult<SaveOutcome>;
    /// Returns the stored body exactly as a server would respond.
    fn fetch_set(&self, course: &CourseConfig, set_id: &str) -> RepoResult<Option<Value>>;
    fn delete_set(&self, course: &CourseConfig, set_id: &str) -> RepoResult<()>;
    /// Sets of one course ordered by `set_id`.
    fn list_sets(&self, course: &CourseConfig) -> RepoResult<Vec<SetSummary>>;
}

/// SQLite-backed set repository.
pub struct SqliteSetRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSetRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SetRepository for SqliteSetRepository<'_> {
    fn save_set(&self, course: &CourseConfig, set: &ProblemSet) -> RepoResult<SaveOutcome> {
        set.check()?;

        let body = serde_json::to_string(&set.to_body()?)
            .map_err(|err| RepoError::Model(ModelError::Json(err)))?;
        let problem_count = i64::try_from(set.problems().len())
            .map_err(|_| RepoError::InvalidData("problem count overflow".to_string()))?;

        let updated = self.conn.execute(
            "UPDATE problem_sets
             SET
                resource_path = ?1,
                body = ?2,
                problem_count = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE course_id = ?4 AND set_id = ?5;",
            params![
                set.url(course),
                body,
                problem_count,
                course.course_id,
                set.set_id
            ],
        )?;
        if updated > 0 {
            return Ok(SaveOutcome::Updated);
        }

        self.conn.execute(
            "INSERT INTO problem_sets (course_id, set_id, resource_path, body, problem_count)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                course.course_id,
                set.set_id,
                set.url(course),
                body,
                problem_count
            ],
        )?;
        Ok(SaveOutcome::Created)
    }

    fn fetch_set(&self, course: &CourseConfig, set_id: &str) -> RepoResult<Option<Value>> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM problem_sets WHERE course_id = ?1 AND set_id = ?2;",
                params![course.course_id, set_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        body.map(|text| {
            serde_json::from_str(&text).map_err(|err| {
                RepoError::InvalidData(format!("body of `{set_id}` is not valid JSON: {err}"))
            })
        })
        .transpose()
    }

    fn delete_set(&self, course: &CourseConfig, set_id: &str) -> RepoResult<()> {
        let deleted = self.conn.execute(
            "DELETE FROM problem_sets WHERE course_id = ?1 AND set_id = ?2;",
            params![course.course_id, set_id],
        )?;

        if deleted == 0 {
            return Err(RepoError::NotFound {
                course_id: course.course_id.clone(),
                set_id: set_id.to_string(),
            });
        }
        Ok(())
    }

    fn list_sets(&self, course: &CourseConfig) -> RepoResult<Vec<SetSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT set_id, resource_path, problem_count, updated_at
             FROM problem_sets
             WHERE course_id = ?1
             ORDER BY set_id ASC;",
        )?;

        let mut rows = stmt.query([course.course_id.as_str()])?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            summaries.push(parse_summary_row(row)?);
        }
        Ok(summaries)
    }
}

fn parse_summary_row(row: &Row<'_>) -> RepoResult<SetSummary> {
    let set_id: String = row.get("set_id")?;
    let raw_count: i64 = row.get("problem_count")?;
    let problem_count = usize::try_from(raw_count).map_err(|_| {
        RepoError::InvalidData(format!(
            "negative problem_count `{raw_count}` for set `{set_id}`"
        ))
    })?;

    Ok(SetSummary {
        resource_path: row.get("resource_path")?,
        updated_at: row.get("updated_at")?,
        set_id,
        problem_count,
    })
}
