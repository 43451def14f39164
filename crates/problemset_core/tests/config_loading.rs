use chrono::NaiveTime;
use problemset_core::{load_config, ConfigError, ProblemSet};
use std::io::Write;

#[test]
fn load_config_drives_default_dates() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[course]
url_prefix = "/webwork3/api/"
course_id = "calc1"

[date_settings]
"pg{{timeAssignDue}}" = "02:00PM"
"pg{{assignOpenPriorToDue}}" = 1440
"pg{{answersOpenAfterDueDate}}" = 0
"pg{{ansEvalDefaults}}{{reducedScoringPeriod}}" = 0
timezone_offset = "+00:00"
"#
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(
        config.date_settings.due_time,
        NaiveTime::from_hms_opt(14, 0, 0).unwrap()
    );

    let mut set = ProblemSet::new("hw1", config.date_settings);
    set.set_default_dates(Some(1_710_460_800)).unwrap(); // 2024-03-15 00:00 UTC

    assert_eq!(set.due_date, Some(1_710_460_800 + 14 * 3600));
    assert_eq!(set.open_date, Some(1_710_460_800 - 10 * 3600));
    assert_eq!(
        set.url(&config.course),
        "/webwork3/api/courses/calc1/sets/hw1"
    );
}

#[test]
fn load_config_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn load_config_rejects_bad_time_of_day() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[course]
url_prefix = "/api/"
course_id = "c"

[date_settings]
"pg{{timeAssignDue}}" = "noon-ish"
"#
    )
    .unwrap();

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("pg{timeAssignDue}"));
}
