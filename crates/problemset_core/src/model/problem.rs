//! Problem entries embedded in a problem set.
//!
//! # Responsibility
//! - Define the `Problem` record carried inside a set's `problems` array.
//! - Provide the ordered `ProblemList` owned by a `ProblemSet`.
//!
//! # Invariants
//! - `ProblemList` preserves insertion/server order.
//! - `next_problem_id` is `max(problem_id) + 1`, or `1` for an empty list,
//!   independent of list order.
//! - Attributes not modelled explicitly survive decode/encode via `extra`.

use crate::model::wire;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a problem within its set.
pub type ProblemId = u32;

const DEFAULT_PROBLEM_VALUE: i64 = 1;
const UNLIMITED_ATTEMPTS: i64 = -1;

/// One problem assigned in a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Position-independent id; assigned by `ProblemSet::add_problem`.
    #[serde(default, deserialize_with = "wire::problem_id")]
    pub problem_id: ProblemId,
    /// Path of the problem source relative to the course templates.
    #[serde(default)]
    pub source_file: String,
    /// Weight of the problem in the set score.
    #[serde(default = "default_value", deserialize_with = "wire::int")]
    pub value: i64,
    /// `-1` means unlimited.
    #[serde(default = "unlimited_attempts", deserialize_with = "wire::int")]
    pub max_attempts: i64,
    /// Any further attributes the server sends for this problem.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Problem {
    /// Creates an unsaved problem (`problem_id = 0`) for the given source file.
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            problem_id: 0,
            source_file: source_file.into(),
            value: DEFAULT_PROBLEM_VALUE,
            max_attempts: UNLIMITED_ATTEMPTS,
            extra: Map::new(),
        }
    }

    /// Sets an attribute not covered by the typed fields.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

fn default_value() -> i64 {
    DEFAULT_PROBLEM_VALUE
}

fn unlimited_attempts() -> i64 {
    UNLIMITED_ATTEMPTS
}

/// Ordered problem collection owned by a set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProblemList {
    problems: Vec<Problem>,
}

impl ProblemList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next free id: one past the largest id present.
    pub fn next_problem_id(&self) -> ProblemId {
        self.problems
            .iter()
            .map(|problem| problem.problem_id)
            .max()
            .map_or(1, |max| max.saturating_add(1))
    }

    pub fn push(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    /// Replaces all entries, keeping the given order.
    pub fn replace(&mut self, problems: Vec<Problem>) {
        self.problems = problems;
    }

    pub fn get(&self, problem_id: ProblemId) -> Option<&Problem> {
        self.problems
            .iter()
            .find(|problem| problem.problem_id == problem_id)
    }

    pub fn last(&self) -> Option<&Problem> {
        self.problems.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Problem> {
        self.problems.iter()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}

impl From<Vec<Problem>> for ProblemList {
    fn from(problems: Vec<Problem>) -> Self {
        Self { problems }
    }
}

impl<'a> IntoIterator for &'a ProblemList {
    type Item = &'a Problem;
    type IntoIter = std::slice::Iter<'a, Problem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
