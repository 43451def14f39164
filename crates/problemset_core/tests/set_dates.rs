use chrono::{FixedOffset, NaiveTime, TimeZone, Utc};
use problemset_core::{DateField, DateSettings, ProblemSet};

fn settings(due: &str, open_prior: i64, answers_after: i64, reduced: i64) -> DateSettings {
    DateSettings {
        due_time: NaiveTime::parse_from_str(due, "%H:%M").unwrap(),
        open_prior_minutes: open_prior,
        answers_after_minutes: answers_after,
        reduced_scoring_minutes: reduced,
        utc_offset: FixedOffset::east_opt(0).unwrap(),
    }
}

fn epoch(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> i64 {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
        .timestamp()
}

#[test]
fn default_dates_follow_timing_settings() {
    let mut set = ProblemSet::new("hw1", settings("14:00", 1440, 0, 0));
    let due_input = epoch(2024, 3, 15, 9, 27) + 13;

    set.set_default_dates(Some(due_input)).unwrap();

    let due = epoch(2024, 3, 15, 14, 0);
    assert_eq!(set.due_date, Some(due));
    assert_eq!(set.open_date, Some(due - 24 * 3600));
    assert_eq!(set.answer_date, Some(due));
    assert_eq!(set.reduced_scoring_date, Some(due));
}

#[test]
fn default_dates_apply_every_offset() {
    let mut set = ProblemSet::new("hw2", settings("23:59", 10080, 2880, 120));

    set.set_default_dates(Some(epoch(2024, 9, 2, 0, 5))).unwrap();

    let due = epoch(2024, 9, 2, 23, 59);
    assert_eq!(set.due_date, Some(due));
    assert_eq!(set.open_date, Some(due - 7 * 24 * 3600));
    assert_eq!(set.answer_date, Some(due + 2 * 24 * 3600));
    assert_eq!(set.reduced_scoring_date, Some(due - 2 * 3600));
    assert!(set.check_dates().is_ok());
}

#[test]
fn default_dates_use_course_offset_for_calendar_day() {
    let mut course_settings = settings("14:00", 0, 0, 0);
    course_settings.utc_offset = FixedOffset::west_opt(5 * 3600).unwrap();
    let mut set = ProblemSet::new("hw3", course_settings);

    // 02:00 UTC on the 16th is still the 15th at UTC-5.
    set.set_default_dates(Some(epoch(2024, 3, 16, 2, 0))).unwrap();

    assert_eq!(set.due_date, Some(epoch(2024, 3, 15, 19, 0)));
}

#[test]
fn default_dates_without_input_use_clock_day() {
    let mut set = ProblemSet::new("hw4", settings("14:00", 60, 30, 0));
    let now = epoch(2024, 3, 15, 22, 45);

    set.set_default_dates_at(None, now).unwrap();

    let due = epoch(2024, 3, 15, 14, 0);
    assert_eq!(set.due_date, Some(due));
    assert_eq!(set.open_date, Some(due - 3600));
    assert_eq!(set.answer_date, Some(due + 30 * 60));
    assert_eq!(set.reduced_scoring_date, Some(due));
}

#[test]
fn explicit_due_date_ignores_clock() {
    let mut set = ProblemSet::new("hw4", settings("14:00", 60, 0, 0));

    set.set_default_dates_at(Some(epoch(2024, 3, 15, 9, 0)), epoch(2030, 1, 1, 0, 0))
        .unwrap();

    assert_eq!(set.due_date, Some(epoch(2024, 3, 15, 14, 0)));
}

#[test]
fn out_of_range_due_date_is_an_error() {
    let mut set = ProblemSet::new("hw5", DateSettings::default());
    assert!(set.set_default_dates(Some(i64::MAX)).is_err());
    assert_eq!(set.due_date, None);
}

#[test]
fn set_date_keeping_time_changes_only_calendar_date() {
    let mut set = ProblemSet::new("hw6", DateSettings::default());
    set.due_date = Some(epoch(2024, 3, 15, 14, 30));

    set.set_date_keeping_time(DateField::Due, epoch(2024, 4, 2, 3, 11))
        .unwrap();

    assert_eq!(set.due_date, Some(epoch(2024, 4, 2, 14, 30)));
}

#[test]
fn set_date_keeping_time_respects_course_offset() {
    let mut course_settings = DateSettings::default();
    course_settings.utc_offset = FixedOffset::west_opt(5 * 3600).unwrap();
    let mut set = ProblemSet::new("hw7", course_settings);
    // 23:00 local on Mar 15 == 04:00 UTC on Mar 16.
    set.answer_date = Some(epoch(2024, 3, 16, 4, 0));

    // 12:00 local on Apr 1.
    set.set_date_keeping_time(DateField::Answer, epoch(2024, 4, 1, 17, 0))
        .unwrap();

    assert_eq!(set.answer_date, Some(epoch(2024, 4, 2, 4, 0)));
}

#[test]
fn set_date_keeping_time_on_unset_field_takes_value() {
    let mut set = ProblemSet::new("hw8", DateSettings::default());
    let target = epoch(2024, 5, 1, 8, 45);

    set.set_date_keeping_time(DateField::ReducedScoring, target)
        .unwrap();

    assert_eq!(set.reduced_scoring_date, Some(target));
}
