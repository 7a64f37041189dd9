//! Tests for recurrence mapping and occurrence expansion.

use agenda_engine::recurrence::frequency_for;
use agenda_engine::{
    map_recurrence, Appointment, EngineError, FrequencyUnit, RecurrenceRule, RecurringOptions,
};
use chrono::{TimeZone, Utc};
use rrule::Frequency;

// ---------------------------------------------------------------------------
// map_recurrence
// ---------------------------------------------------------------------------

#[test]
fn absent_options_mean_no_rule() {
    assert_eq!(map_recurrence(None), None);
}

#[test]
fn each_unit_maps_to_matching_frequency() {
    let expected = [
        (FrequencyUnit::Seconds, Frequency::Secondly),
        (FrequencyUnit::Minutes, Frequency::Minutely),
        (FrequencyUnit::Hours, Frequency::Hourly),
        (FrequencyUnit::Days, Frequency::Daily),
        (FrequencyUnit::Weeks, Frequency::Weekly),
        (FrequencyUnit::Months, Frequency::Monthly),
        (FrequencyUnit::Years, Frequency::Yearly),
    ];
    for (unit, frequency) in expected {
        assert_eq!(frequency_for(unit), Some(frequency), "unit {:?}", unit);
    }
}

#[test]
fn unspecified_unit_means_no_rule() {
    let options = RecurringOptions::new(FrequencyUnit::Unspecified, 1, Some(3));
    assert_eq!(map_recurrence(Some(&options)), None);
}

#[test]
fn interval_and_count_are_carried_through() {
    let options = RecurringOptions::new(FrequencyUnit::Months, 3, Some(12));

    let rule = map_recurrence(Some(&options)).expect("mapped unit yields a rule");

    assert_eq!(rule, RecurrenceRule::new(Frequency::Monthly, 3, Some(12)));
}

#[test]
fn zero_and_negative_counts_are_not_validated() {
    for count in [0, -1, i32::MIN] {
        let options = RecurringOptions::new(FrequencyUnit::Days, 1, Some(count));
        let rule = map_recurrence(Some(&options)).unwrap();
        assert_eq!(rule.count, Some(count));
    }
}

#[test]
fn unbounded_count_stays_absent() {
    let options = RecurringOptions::new(FrequencyUnit::Weeks, 1, None);
    let rule = map_recurrence(Some(&options)).unwrap();
    assert_eq!(rule.count, None);
    assert_eq!(rule.to_string(), "FREQ=WEEKLY;INTERVAL=1");
}

#[test]
fn unknown_unit_string_deserializes_as_unspecified() {
    let options: RecurringOptions =
        serde_json::from_str(r#"{"type": "FORTNIGHTS", "interval": 1, "count": 4}"#).unwrap();
    assert_eq!(options.frequency, FrequencyUnit::Unspecified);
    assert_eq!(map_recurrence(Some(&options)), None);
}

#[test]
fn missing_interval_defaults_to_one() {
    let options: RecurringOptions = serde_json::from_str(r#"{"type": "DAYS"}"#).unwrap();
    assert_eq!(options.interval, 1);
    assert_eq!(options.count, None);
}

// ---------------------------------------------------------------------------
// RRULE text
// ---------------------------------------------------------------------------

#[test]
fn rule_text_parses_back() {
    let rule = RecurrenceRule::new(Frequency::Yearly, 2, Some(-4));
    let parsed: RecurrenceRule = rule.to_string().parse().unwrap();
    assert_eq!(parsed, rule);
}

#[test]
fn rule_text_ignores_unrelated_parts() {
    let parsed: RecurrenceRule = "FREQ=WEEKLY;BYDAY=MO,WE;COUNT=6".parse().unwrap();
    assert_eq!(parsed, RecurrenceRule::new(Frequency::Weekly, 1, Some(6)));
}

#[test]
fn rule_text_without_freq_is_rejected() {
    let result = "INTERVAL=2;COUNT=3".parse::<RecurrenceRule>();
    assert!(matches!(result, Err(EngineError::Parse(_))));
}

// ---------------------------------------------------------------------------
// Occurrence expansion
// ---------------------------------------------------------------------------

#[test]
fn daily_rule_expands_to_count_windows() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let rule = RecurrenceRule::new(Frequency::Daily, 1, Some(3));

    let windows = rule.occurrences(start, 60, 100).expect("should expand");

    assert_eq!(windows.len(), 3);
    assert_eq!(windows[0].start, start);
    assert_eq!(windows[2].start, Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap());
    assert_eq!(windows[2].end, Utc.with_ymd_and_hms(2026, 3, 3, 10, 0, 0).unwrap());
}

#[test]
fn weekly_interval_two_skips_a_week() {
    let start = Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap();
    let rule = RecurrenceRule::new(Frequency::Weekly, 2, Some(2));

    let windows = rule.occurrences(start, 30, 100).unwrap();

    assert_eq!(windows.len(), 2);
    assert_eq!(windows[1].start, Utc.with_ymd_and_hms(2026, 3, 16, 14, 0, 0).unwrap());
}

#[test]
fn unbounded_rule_is_capped_by_limit() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let rule = RecurrenceRule::new(Frequency::Daily, 1, None);

    let windows = rule.occurrences(start, 15, 10).unwrap();

    assert_eq!(windows.len(), 10);
}

#[test]
fn zero_count_expands_to_nothing() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let rule = RecurrenceRule::new(Frequency::Daily, 1, Some(0));

    assert!(rule.occurrences(start, 15, 10).unwrap().is_empty());
}

#[test]
fn negative_count_cannot_be_expanded() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let rule = RecurrenceRule::new(Frequency::Daily, 1, Some(-2));

    let result = rule.occurrences(start, 15, 10);

    assert!(matches!(result, Err(EngineError::InvalidRule(_))));
}

#[test]
fn zero_interval_cannot_be_expanded() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let rule = RecurrenceRule::new(Frequency::Daily, 0, Some(2));

    let result = rule.occurrences(start, 15, 10);

    assert!(matches!(result, Err(EngineError::InvalidRule(_))));
}

#[test]
fn non_recurring_appointment_has_one_occurrence() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let appointment = Appointment::new(start, 50, "Consult");

    let windows = appointment.occurrences(10).unwrap();

    assert_eq!(windows, vec![appointment.window()]);
}

#[test]
fn recurring_appointment_expands_through_its_options() {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let appointment = Appointment::new(start, 50, "Consult")
        .with_recurrence(RecurringOptions::new(FrequencyUnit::Days, 7, Some(4)));

    let windows = appointment.occurrences(10).unwrap();

    assert_eq!(windows.len(), 4);
    assert_eq!(windows[1].start, Utc.with_ymd_and_hms(2026, 3, 8, 9, 0, 0).unwrap());
}
