//! Problem set domain model.
//!
//! # Responsibility
//! - Hold assignment configuration (dates, scoring, display flags) and the
//!   owned problem list.
//! - Derive default dates from a due date and the course timing settings.
//! - Validate date ordering once per save attempt and notify observers.
//! - Merge server responses without letting the generic attribute merge
//!   clobber the specialised problem list.
//!
//! # Invariants
//! - `open_date <= due_date <= answer_date` whenever the dates are set.
//! - With reduced scoring enabled:
//!   `open_date <= reduced_scoring_date <= due_date`.
//! - An unset date is skipped; the dates on either side of it are still
//!   compared with each other.
//! - Ordering is only enforced by `check`/`validate`, never on mutation.

use crate::config::{CourseConfig, DateSettings};
use crate::events::{DateErrorEvent, SetEvent, SetEvents};
use crate::model::problem::{Problem, ProblemId, ProblemList};
use crate::model::wire;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::Receiver;

static SET_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid set name regex"));

const SECONDS_PER_MINUTE: i64 = 60;

/// One of the four scheduling dates of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateField {
    Open,
    Due,
    Answer,
    ReducedScoring,
}

impl DateField {
    pub const ALL: [DateField; 4] = [
        DateField::Open,
        DateField::Due,
        DateField::Answer,
        DateField::ReducedScoring,
    ];

    /// Wire attribute name.
    pub fn attribute(self) -> &'static str {
        match self {
            Self::Open => "open_date",
            Self::Due => "due_date",
            Self::Answer => "answer_date",
            Self::ReducedScoring => "reduced_scoring_date",
        }
    }

    /// Human-readable name used in error messages and events.
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "open date",
            Self::Due => "due date",
            Self::Answer => "answer date",
            Self::ReducedScoring => "reduced scoring date",
        }
    }

    pub fn from_attribute(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.attribute() == name)
    }
}

/// Pairs that must satisfy `first <= second`, checked in this order.
///
/// The trailing pair only decides anything when `due_date` is unset; with
/// all three dates set it follows from the first two.
const ALWAYS_ORDERED: [(DateField, DateField); 3] = [
    (DateField::Open, DateField::Due),
    (DateField::Due, DateField::Answer),
    (DateField::Open, DateField::Answer),
];

const REDUCED_SCORING_ORDERED: [(DateField, DateField); 3] = [
    (DateField::ReducedScoring, DateField::Due),
    (DateField::Open, DateField::ReducedScoring),
    (DateField::ReducedScoring, DateField::Answer),
];

/// Visibility policy for scores and work.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HideOption {
    #[default]
    #[serde(rename = "N")]
    Never,
    #[serde(rename = "Y")]
    Always,
    BeforeAnswerDate,
    /// Any value this build does not know; kept verbatim.
    #[serde(untagged)]
    Other(String),
}

/// IP-based access restriction mode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IpRestriction {
    #[default]
    No,
    RestrictTo,
    DenyFrom,
    /// Any value this build does not know; kept verbatim.
    #[serde(untagged)]
    Other(String),
}

/// Two set dates found in the wrong order: `first` is after `second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateOrderError {
    pub first: DateField,
    pub second: DateField,
}

impl Display for DateOrderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is after {}", self.first.label(), self.second.label())
    }
}

impl Error for DateOrderError {}

/// Reasons a set cannot be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetValidationError {
    InvalidSetName(String),
    DateOrder(DateOrderError),
}

impl Display for SetValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSetName(name) => write!(
                f,
                "invalid set name `{name}`: use only letters, digits, `_`, `.` and `-`"
            ),
            Self::DateOrder(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SetValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidSetName(_) => None,
            Self::DateOrder(err) => Some(err),
        }
    }
}

impl From<DateOrderError> for SetValidationError {
    fn from(value: DateOrderError) -> Self {
        Self::DateOrder(value)
    }
}

/// Failures while converting or recomputing set state.
#[derive(Debug)]
pub enum ModelError {
    Json(serde_json::Error),
    NotAnObject,
    DateOutOfRange(i64),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid problem set payload: {err}"),
            Self::NotAnObject => write!(f, "problem set payload must be a JSON object"),
            Self::DateOutOfRange(epoch) => write!(f, "date out of range: {epoch}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::NotAnObject | Self::DateOutOfRange(_) => None,
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// A graded collection of problems with shared scheduling and display
/// configuration.
///
/// Dates are epoch seconds. Timing settings and subscribers are local state
/// and never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemSet {
    /// Server-side identity; `None` until first persisted.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub set_id: String,
    pub set_header: String,
    pub hardcopy_header: String,
    #[serde(deserialize_with = "wire::epoch_opt")]
    pub open_date: Option<i64>,
    #[serde(deserialize_with = "wire::epoch_opt")]
    pub due_date: Option<i64>,
    #[serde(deserialize_with = "wire::epoch_opt")]
    pub answer_date: Option<i64>,
    #[serde(deserialize_with = "wire::epoch_opt")]
    pub reduced_scoring_date: Option<i64>,
    #[serde(deserialize_with = "wire::flag")]
    pub visible: bool,
    #[serde(deserialize_with = "wire::flag")]
    pub enable_reduced_scoring: bool,
    pub assignment_type: String,
    #[serde(deserialize_with = "wire::int")]
    pub attempts_per_version: i64,
    #[serde(deserialize_with = "wire::int")]
    pub time_interval: i64,
    #[serde(deserialize_with = "wire::int")]
    pub versions_per_interval: i64,
    #[serde(deserialize_with = "wire::int")]
    pub version_time_limit: i64,
    #[serde(deserialize_with = "wire::int")]
    pub version_creation_time: i64,
    #[serde(deserialize_with = "wire::int")]
    pub problem_randorder: i64,
    #[serde(deserialize_with = "wire::int")]
    pub version_last_attempt_time: i64,
    #[serde(deserialize_with = "wire::int")]
    pub problems_per_page: i64,
    pub hide_score: HideOption,
    pub hide_score_by_problem: HideOption,
    pub hide_work: HideOption,
    pub time_limit_cap: String,
    pub restrict_ip: IpRestriction,
    pub relax_restrict_ip: String,
    pub restricted_login_proctor: String,
    #[serde(deserialize_with = "wire::null_default")]
    pub assigned_users: Vec<String>,
    #[serde(deserialize_with = "wire::null_default")]
    problems: ProblemList,
    #[serde(skip)]
    date_settings: DateSettings,
    #[serde(skip)]
    pending_problems: Vec<Problem>,
    #[serde(skip)]
    events: SetEvents,
}

impl Default for ProblemSet {
    fn default() -> Self {
        Self {
            id: None,
            set_id: String::new(),
            set_header: String::new(),
            hardcopy_header: String::new(),
            open_date: None,
            due_date: None,
            answer_date: None,
            reduced_scoring_date: None,
            visible: false,
            enable_reduced_scoring: false,
            assignment_type: String::new(),
            attempts_per_version: -1,
            time_interval: 0,
            versions_per_interval: 0,
            version_time_limit: 0,
            version_creation_time: 0,
            problem_randorder: 0,
            version_last_attempt_time: 0,
            problems_per_page: 1,
            hide_score: HideOption::Never,
            hide_score_by_problem: HideOption::Never,
            hide_work: HideOption::Never,
            time_limit_cap: "0".to_string(),
            restrict_ip: IpRestriction::No,
            relax_restrict_ip: "No".to_string(),
            restricted_login_proctor: "No".to_string(),
            assigned_users: Vec::new(),
            problems: ProblemList::new(),
            date_settings: DateSettings::default(),
            pending_problems: Vec::new(),
            events: SetEvents::default(),
        }
    }
}

impl ProblemSet {
    /// Creates an empty set using the given timing settings.
    pub fn new(set_id: impl Into<String>, date_settings: DateSettings) -> Self {
        Self {
            set_id: set_id.into(),
            date_settings,
            ..Self::default()
        }
    }

    /// Pre-populates the problem list, keeping the given ids and order.
    pub fn with_problems(mut self, problems: Vec<Problem>) -> Self {
        self.problems = ProblemList::from(problems);
        self
    }

    /// Builds a set from a full server response.
    pub fn from_response(response: Value, date_settings: DateSettings) -> Result<Self, ModelError> {
        let mut set = Self {
            date_settings,
            ..Self::default()
        };
        set.hydrate(response)?;
        Ok(set)
    }

    /// Whether the set has never been persisted.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn problems(&self) -> &ProblemList {
        &self.problems
    }

    pub fn date_settings(&self) -> &DateSettings {
        &self.date_settings
    }

    pub fn set_date_settings(&mut self, date_settings: DateSettings) {
        self.date_settings = date_settings;
    }

    /// Registers an observer for this set's events.
    pub fn subscribe(&mut self) -> Receiver<SetEvent> {
        self.events.subscribe()
    }

    /// Problems queued while the server list is not loaded yet.
    pub fn pending_problems(&self) -> &[Problem] {
        &self.pending_problems
    }

    /// Queues a problem to be added once the server list arrives.
    ///
    /// The queue drains, with fresh ids, the next time a response carrying
    /// `problems` is parsed.
    pub fn defer_problem(&mut self, problem: Problem) {
        self.pending_problems.push(problem);
    }

    pub fn date(&self, field: DateField) -> Option<i64> {
        match field {
            DateField::Open => self.open_date,
            DateField::Due => self.due_date,
            DateField::Answer => self.answer_date,
            DateField::ReducedScoring => self.reduced_scoring_date,
        }
    }

    pub fn set_date(&mut self, field: DateField, value: Option<i64>) {
        let slot = match field {
            DateField::Open => &mut self.open_date,
            DateField::Due => &mut self.due_date,
            DateField::Answer => &mut self.answer_date,
            DateField::ReducedScoring => &mut self.reduced_scoring_date,
        };
        *slot = value;
    }

    /// Resource path of this set: `<prefix>courses/<course>/sets/<set_id>`.
    ///
    /// An empty `set_id` yields a path ending in `sets/`.
    pub fn url(&self, course: &CourseConfig) -> String {
        format!(
            "{}courses/{}/sets/{}",
            course.url_prefix, course.course_id, self.set_id
        )
    }

    /// Sets all four dates from a due date (now when `None`).
    ///
    /// The due date moves to the configured time of day on its calendar day;
    /// the other dates are offset from it by the configured minutes.
    ///
    /// # Errors
    /// - Returns `DateOutOfRange` when `due` is not a representable instant.
    pub fn set_default_dates(&mut self, due: Option<i64>) -> Result<&mut Self, ModelError> {
        self.set_default_dates_at(due, Utc::now().timestamp())
    }

    /// `set_default_dates` with an explicit clock: `now` stands in for a
    /// missing `due`.
    pub fn set_default_dates_at(
        &mut self,
        due: Option<i64>,
        now: i64,
    ) -> Result<&mut Self, ModelError> {
        let due = due.unwrap_or(now);
        let settings = self.date_settings;

        let local_due = local_datetime(due, settings.utc_offset)?;
        let due_date = local_epoch(
            local_due.date_naive(),
            settings.due_time,
            settings.utc_offset,
        )
        .ok_or(ModelError::DateOutOfRange(due))?;

        self.due_date = Some(due_date);
        self.open_date = Some(due_date.saturating_sub(minutes(settings.open_prior_minutes)));
        self.answer_date = Some(due_date.saturating_add(minutes(settings.answers_after_minutes)));
        self.reduced_scoring_date =
            Some(due_date.saturating_sub(minutes(settings.reduced_scoring_minutes)));

        Ok(self)
    }

    /// Moves `field` to the calendar day of `date`, keeping its time of day.
    ///
    /// An unset field takes `date` as is.
    pub fn set_date_keeping_time(
        &mut self,
        field: DateField,
        date: i64,
    ) -> Result<&mut Self, ModelError> {
        let Some(current) = self.date(field) else {
            self.set_date(field, Some(date));
            return Ok(self);
        };

        let offset = self.date_settings.utc_offset;
        let current = local_datetime(current, offset)?;
        let target = local_datetime(date, offset)?;
        let merged = local_epoch(target.date_naive(), current.time(), offset)
            .ok_or(ModelError::DateOutOfRange(date))?;

        self.set_date(field, Some(merged));
        Ok(self)
    }

    /// Checks date ordering without notifying observers.
    pub fn check_dates(&self) -> Result<(), DateOrderError> {
        let reduced: &[(DateField, DateField)] = if self.enable_reduced_scoring {
            &REDUCED_SCORING_ORDERED
        } else {
            &[]
        };

        for &(first, second) in ALWAYS_ORDERED.iter().chain(reduced) {
            if let (Some(a), Some(b)) = (self.date(first), self.date(second)) {
                if a > b {
                    return Err(DateOrderError { first, second });
                }
            }
        }

        Ok(())
    }

    pub fn check_set_name(&self) -> Result<(), SetValidationError> {
        if SET_NAME_RE.is_match(&self.set_id) {
            Ok(())
        } else {
            Err(SetValidationError::InvalidSetName(self.set_id.clone()))
        }
    }

    /// Full candidate-state check with no side effects.
    pub fn check(&self) -> Result<(), SetValidationError> {
        self.check_dates()?;
        self.check_set_name()
    }

    /// Validates the whole set once for a save attempt.
    ///
    /// A date-ordering failure is also emitted as `SetEvent::DateError`.
    pub fn validate(&mut self) -> Result<(), SetValidationError> {
        if let Err(err) = self.check_dates() {
            debug!(
                "event=set_validate module=model status=error set_id={} error_code=date_order error={}",
                self.set_id, err
            );
            self.events.emit(SetEvent::DateError(DateErrorEvent::new(
                self.set_id.clone(),
                err.first,
                err.second,
            )));
            return Err(err.into());
        }

        self.check_set_name()
    }

    /// Copies `problem` into the list under the next free id.
    ///
    /// Emits `SetEvent::ProblemsChanged`. Persisting is the caller's job
    /// (see `ProblemSetService::add_problem`).
    pub fn add_problem(&mut self, problem: &Problem) -> ProblemId {
        let problem_id = self.problems.next_problem_id();
        let mut added = problem.clone();
        added.problem_id = problem_id;
        self.problems.push(added);

        self.events.emit(SetEvent::ProblemsChanged {
            set_id: self.set_id.clone(),
            problem_count: self.problems.len(),
        });
        problem_id
    }

    /// Takes the `problems` field out of a server response.
    ///
    /// When present (and not null) it replaces the local list and drains any
    /// deferred problems. The remaining attributes are returned for the
    /// generic merge.
    pub fn parse_server_response(
        &mut self,
        response: Value,
    ) -> Result<Map<String, Value>, ModelError> {
        let Value::Object(mut attributes) = response else {
            return Err(ModelError::NotAnObject);
        };

        if let Some(problems) = take_problems(&mut attributes)? {
            self.install_problems(problems);
        }
        Ok(attributes)
    }

    /// Overlays wire attributes onto the current state.
    ///
    /// Unknown keys are ignored; local settings and subscribers are kept.
    pub fn set_attributes(&mut self, attributes: Map<String, Value>) -> Result<(), ModelError> {
        let merged = self.merged(attributes)?;
        self.commit(merged);
        Ok(())
    }

    /// Applies a server response: problems first, then everything else.
    ///
    /// Either the whole response is applied or the set is left untouched.
    pub fn hydrate(&mut self, response: Value) -> Result<(), ModelError> {
        let Value::Object(mut attributes) = response else {
            return Err(ModelError::NotAnObject);
        };

        let problems = take_problems(&mut attributes)?;
        let merged = self.merged(attributes)?;

        self.commit(merged);
        if let Some(problems) = problems {
            self.install_problems(problems);
        }
        Ok(())
    }

    /// Decodes the current state overlaid with `attributes` into a new value.
    fn merged(&self, attributes: Map<String, Value>) -> Result<ProblemSet, ModelError> {
        let Value::Object(mut current) = serde_json::to_value(self)? else {
            return Err(ModelError::NotAnObject);
        };
        current.extend(attributes);
        Ok(serde_json::from_value(Value::Object(current))?)
    }

    /// Replaces the wire attributes with `merged`'s, keeping local-only state.
    fn commit(&mut self, mut merged: ProblemSet) {
        merged.date_settings = self.date_settings;
        merged.pending_problems = std::mem::take(&mut self.pending_problems);
        merged.events = std::mem::take(&mut self.events);
        *self = merged;
    }

    fn install_problems(&mut self, problems: Vec<Problem>) {
        self.problems.replace(problems);
        for problem in std::mem::take(&mut self.pending_problems) {
            self.add_problem(&problem);
        }
    }

    /// Request body for persistence: all attributes plus the problems array.
    pub fn to_body(&self) -> Result<Value, ModelError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Removes and decodes `problems`; absent and `null` both yield `None`.
fn take_problems(attributes: &mut Map<String, Value>) -> Result<Option<Vec<Problem>>, ModelError> {
    match attributes.remove("problems") {
        None | Some(Value::Null) => Ok(None),
        Some(problems) => Ok(Some(serde_json::from_value(problems)?)),
    }
}

/// Describes a set attribute for form labels and tooltips.
pub fn field_description(attribute: &str) -> Option<&'static str> {
    let description = match attribute {
        "set_id" => "Homework Set Name",
        "set_header" => "Header File for Homework Set",
        "hardcopy_header" => "Header File for A Hardcopy of the Homework Set",
        "open_date" => "Date and Time that the Homework Set opens",
        "due_date" => "Date and Time that the Homework Set is due",
        "answer_date" => "Date and time that the answers are made available",
        "reduced_scoring_date" => "Date and time that reduced scoring begins",
        "visible" => "Visible to Students",
        "enable_reduced_scoring" => "Is reduced scoring available?",
        "assignment_type" => "Type of the Assignment",
        "attempts_per_version" => "Number of Attempts Per Version",
        "time_interval" => "Time interval for creating new versions",
        "versions_per_interval" => "Number of versions allowed per time interval",
        "version_time_limit" => "Version Time Limit",
        "version_creation_time" => "Version Creation Time",
        "problem_randorder" => "View Problems in a Random Order",
        "version_last_attempt_time" => "Time of the last attempt on a version",
        "problems_per_page" => "Number of Problems Per Page",
        "hide_score" => "Hide the Score to the Student",
        "hide_score_by_problem" => "Hide the Score by Problem?",
        "hide_work" => "Hide the Work?",
        "time_limit_cap" => "Cap the version time limit at the due date",
        "restrict_ip" => "Restrict access by IP address",
        "relax_restrict_ip" => "Relax the IP restriction after the answer date",
        "restricted_login_proctor" => "Restricted to Login Proctor",
        "assigned_users" => "Users assigned to this set",
        _ => return None,
    };
    Some(description)
}

fn minutes(count: i64) -> i64 {
    count.saturating_mul(SECONDS_PER_MINUTE)
}

fn local_datetime(epoch: i64, offset: FixedOffset) -> Result<DateTime<FixedOffset>, ModelError> {
    DateTime::from_timestamp(epoch, 0)
        .map(|utc| utc.with_timezone(&offset))
        .ok_or(ModelError::DateOutOfRange(epoch))
}

fn local_epoch(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> Option<i64> {
    date.and_time(time)
        .and_local_timezone(offset)
        .single()
        .map(|datetime| datetime.timestamp())
}
