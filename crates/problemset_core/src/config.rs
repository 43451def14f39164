//! Course and date-default configuration.
//!
//! # Responsibility
//! - Parse the course timing settings (`pg{...}` keys) into typed values.
//! - Describe the course resource location used to build set paths.
//! - Load both from a TOML file for CLI/tooling callers.
//!
//! # Invariants
//! - Configuration is always passed explicitly; nothing here is global.
//! - Malformed values are rejected at parse time, never propagated into
//!   date arithmetic.
//! - Missing keys fall back to the platform defaults below.

use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const TIME_ASSIGN_DUE_KEY: &str = "pg{timeAssignDue}";
pub const OPEN_PRIOR_TO_DUE_KEY: &str = "pg{assignOpenPriorToDue}";
pub const ANSWERS_AFTER_DUE_KEY: &str = "pg{answersOpenAfterDueDate}";
pub const REDUCED_SCORING_PERIOD_KEY: &str = "pg{ansEvalDefaults}{reducedScoringPeriod}";
pub const TIMEZONE_OFFSET_KEY: &str = "timezone_offset";

const DEFAULT_DUE_HOUR: u32 = 23;
const DEFAULT_DUE_MINUTE: u32 = 59;
const DEFAULT_OPEN_PRIOR_MINUTES: i64 = 7 * 24 * 60;
const DEFAULT_ANSWERS_AFTER_MINUTES: i64 = 2 * 24 * 60;
const DEFAULT_REDUCED_SCORING_MINUTES: i64 = 0;

const TIME_OF_DAY_FORMATS: &[&str] = &["%I:%M%p", "%H:%M", "%H:%M:%S"];

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml(toml::de::Error),
    InvalidSetting {
        key: String,
        value: String,
        reason: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Toml(err) => write!(f, "invalid config file: {err}"),
            Self::InvalidSetting { key, value, reason } => {
                write!(f, "invalid setting `{key}` = `{value}`: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Toml(err) => Some(err),
            Self::InvalidSetting { .. } => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Toml(value)
    }
}

/// Timing defaults used to derive set dates from a due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSettings {
    /// Time of day every due date is moved to.
    pub due_time: NaiveTime,
    /// Minutes between open date and due date.
    pub open_prior_minutes: i64,
    /// Minutes between due date and answer release.
    pub answers_after_minutes: i64,
    /// Minutes before the due date at which reduced scoring starts.
    pub reduced_scoring_minutes: i64,
    /// Course-local offset used for all calendar/time-of-day arithmetic.
    pub utc_offset: FixedOffset,
}

impl Default for DateSettings {
    fn default() -> Self {
        Self {
            due_time: NaiveTime::from_hms_opt(DEFAULT_DUE_HOUR, DEFAULT_DUE_MINUTE, 0)
                .unwrap_or_default(),
            open_prior_minutes: DEFAULT_OPEN_PRIOR_MINUTES,
            answers_after_minutes: DEFAULT_ANSWERS_AFTER_MINUTES,
            reduced_scoring_minutes: DEFAULT_REDUCED_SCORING_MINUTES,
            utc_offset: utc(),
        }
    }
}

impl DateSettings {
    /// Parses settings from the string-keyed map the course server exposes.
    ///
    /// # Errors
    /// - Returns `InvalidSetting` for a present but unparseable value.
    pub fn from_map(settings: &BTreeMap<String, String>) -> ConfigResult<Self> {
        let mut parsed = Self::default();

        if let Some(raw) = settings.get(TIME_ASSIGN_DUE_KEY) {
            parsed.due_time = parse_time_of_day(raw).ok_or_else(|| {
                invalid(TIME_ASSIGN_DUE_KEY, raw, "expected hh:mmAM/PM or HH:MM")
            })?;
        }
        if let Some(raw) = settings.get(OPEN_PRIOR_TO_DUE_KEY) {
            parsed.open_prior_minutes = parse_minutes(OPEN_PRIOR_TO_DUE_KEY, raw)?;
        }
        if let Some(raw) = settings.get(ANSWERS_AFTER_DUE_KEY) {
            parsed.answers_after_minutes = parse_minutes(ANSWERS_AFTER_DUE_KEY, raw)?;
        }
        if let Some(raw) = settings.get(REDUCED_SCORING_PERIOD_KEY) {
            parsed.reduced_scoring_minutes = parse_minutes(REDUCED_SCORING_PERIOD_KEY, raw)?;
        }
        if let Some(raw) = settings.get(TIMEZONE_OFFSET_KEY) {
            parsed.utc_offset = parse_utc_offset(raw)
                .ok_or_else(|| invalid(TIMEZONE_OFFSET_KEY, raw, "expected +HH:MM or UTC"))?;
        }

        Ok(parsed)
    }
}

/// Location of the active course on the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CourseConfig {
    /// Prefix every resource path starts with, e.g. `/api/`.
    pub url_prefix: String,
    pub course_id: String,
}

impl CourseConfig {
    pub fn new(url_prefix: impl Into<String>, course_id: impl Into<String>) -> Self {
        Self {
            url_prefix: url_prefix.into(),
            course_id: course_id.into(),
        }
    }
}

/// Full tool configuration as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub course: CourseConfig,
    pub date_settings: DateSettings,
}

#[derive(Debug, Deserialize)]
struct RawAppConfig {
    course: CourseConfig,
    #[serde(default)]
    date_settings: BTreeMap<String, toml::Value>,
}

/// Parses a TOML config document.
///
/// ```toml
/// [course]
/// url_prefix = "/api/"
/// course_id = "math101"
///
/// [date_settings]
/// "pg{timeAssignDue}" = "11:59PM"
/// "pg{assignOpenPriorToDue}" = 10080
/// ```
pub fn parse_config(text: &str) -> ConfigResult<AppConfig> {
    let raw: RawAppConfig = toml::from_str(text)?;
    let settings = raw
        .date_settings
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                toml::Value::String(text) => text,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect::<BTreeMap<_, _>>();

    Ok(AppConfig {
        course: raw.course,
        date_settings: DateSettings::from_map(&settings)?,
    })
}

/// Reads and parses a TOML config file.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<AppConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

fn invalid(key: &str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let compact = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    TIME_OF_DAY_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&compact, format).ok())
}

/// Reads the leading integer of `raw`, ignoring any trailing unit text.
fn parse_minutes(key: &str, raw: &str) -> ConfigResult<i64> {
    let trimmed = raw.trim();
    let digits_end = trimmed
        .char_indices()
        .find(|&(index, c)| !(c.is_ascii_digit() || (index == 0 && (c == '-' || c == '+'))))
        .map_or(trimmed.len(), |(index, _)| index);

    trimmed[..digits_end]
        .parse::<i64>()
        .map_err(|_| invalid(key, raw, "expected a whole number of minutes"))
}

fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let trimmed = raw.trim();
    if !trimmed.is_ascii() {
        return None;
    }
    if matches!(trimmed.to_ascii_uppercase().as_str(), "Z" | "UTC" | "GMT") {
        return Some(utc());
    }

    let (sign, rest) = match trimmed.as_bytes().first()? {
        b'+' => (1, &trimmed[1..]),
        b'-' => (-1, &trimmed[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((hours, minutes)) => (hours, minutes),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours = hours.parse::<i32>().ok()?;
    let minutes = minutes.parse::<i32>().ok()?;
    if !(0..60).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn utc() -> FixedOffset {
    Utc.fix()
}

#[cfg(test)]
mod tests {
    use super::{
        parse_config, parse_minutes, parse_time_of_day, parse_utc_offset, ConfigError,
        DateSettings, OPEN_PRIOR_TO_DUE_KEY, TIMEZONE_OFFSET_KEY, TIME_ASSIGN_DUE_KEY,
    };
    use chrono::NaiveTime;
    use std::collections::BTreeMap;

    #[test]
    fn time_of_day_accepts_twelve_and_twenty_four_hour_forms() {
        let expected = NaiveTime::from_hms_opt(14, 0, 0).unwrap();
        assert_eq!(parse_time_of_day("02:00PM"), Some(expected));
        assert_eq!(parse_time_of_day("2:00 pm"), Some(expected));
        assert_eq!(parse_time_of_day("14:00"), Some(expected));
        assert_eq!(parse_time_of_day("teatime"), None);
    }

    #[test]
    fn minutes_use_leading_integer() {
        assert_eq!(parse_minutes("k", "1440").unwrap(), 1440);
        assert_eq!(parse_minutes("k", " 30 minutes").unwrap(), 30);
        assert!(parse_minutes("k", "soon").is_err());
    }

    #[test]
    fn utc_offset_forms() {
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(
            parse_utc_offset("-05:00").unwrap().local_minus_utc(),
            -5 * 3600
        );
        assert_eq!(
            parse_utc_offset("+0530").unwrap().local_minus_utc(),
            5 * 3600 + 30 * 60
        );
        assert!(parse_utc_offset("05:00").is_none());
    }

    #[test]
    fn from_map_rejects_non_ascii_offset() {
        let mut map = BTreeMap::new();
        map.insert(TIMEZONE_OFFSET_KEY.to_string(), "+1é1".to_string());

        assert!(parse_utc_offset("+1é1").is_none());
        let err = DateSettings::from_map(&map).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidSetting { ref key, .. } if key == TIMEZONE_OFFSET_KEY)
        );
    }

    #[test]
    fn from_map_rejects_malformed_values() {
        let mut map = BTreeMap::new();
        map.insert(OPEN_PRIOR_TO_DUE_KEY.to_string(), "a week".to_string());

        let err = DateSettings::from_map(&map).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidSetting { ref key, .. } if key == OPEN_PRIOR_TO_DUE_KEY)
        );
    }

    #[test]
    fn from_map_keeps_defaults_for_missing_keys() {
        let mut map = BTreeMap::new();
        map.insert(TIME_ASSIGN_DUE_KEY.to_string(), "9:30AM".to_string());

        let settings = DateSettings::from_map(&map).unwrap();
        assert_eq!(settings.due_time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(
            settings.open_prior_minutes,
            DateSettings::default().open_prior_minutes
        );
    }

    #[test]
    fn parse_config_reads_course_and_stringifies_numbers() {
        let config = parse_config(
            r#"
            [course]
            url_prefix = "/api/"
            course_id = "123"

            [date_settings]
            "pg{timeAssignDue}" = "14:00"
            "pg{assignOpenPriorToDue}" = 1440
            "pg{answersOpenAfterDueDate}" = "0"
            "#,
        )
        .unwrap();

        assert_eq!(config.course.course_id, "123");
        assert_eq!(config.date_settings.open_prior_minutes, 1440);
        assert_eq!(config.date_settings.answers_after_minutes, 0);
    }
}
