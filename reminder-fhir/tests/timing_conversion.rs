use chrono::{NaiveDate, NaiveTime};
use reminder_core::{
    Bounds, ClinicalResource, DailySchedule, DayCode, DurationUnit, MealCode, ReminderError,
    StartTime,
};
use reminder_fhir::{resources_from_value, schedule_window_from_value, timing_from_value};
use serde_json::json;

#[test]
fn when_takes_precedence_over_time_of_day_and_frequency() {
    let timing = timing_from_value(&json!({
        "repeat": {
            "when": ["PCD", "WAKE", "ACM"],
            "timeOfDay": ["08:00:00"],
            "frequency": 3
        }
    }))
    .expect("timing should convert");

    assert_eq!(
        timing.daily,
        DailySchedule::When(vec![MealCode::AfterLunch, MealCode::BeforeBreakfast])
    );
    assert!(timing.window.bounds.is_none());
}

#[test]
fn time_of_day_accepts_short_and_long_forms() {
    let timing = timing_from_value(&json!({
        "repeat": { "timeOfDay": ["21:00", "07:30:00"], "dayOfWeek": ["sat", "sun"] }
    }))
    .expect("timing should convert");

    assert_eq!(
        timing.daily,
        DailySchedule::TimeOfDay(vec![
            NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
        ])
    );
    assert_eq!(timing.day_of_week, vec![DayCode::Sat, DayCode::Sun]);
}

#[test]
fn extensions_fill_start_fields() {
    let timing = timing_from_value(&json!({
        "extension": [
            { "url": "http://example.org/fhir/StructureDefinition/start-date", "valueDateTime": "2024-05-06T22:00:00-05:00" },
            { "url": "http://example.org/fhir/StructureDefinition/start-time", "valueDateTime": "2024-05-06T13:00:00Z" },
            { "url": "http://example.org/fhir/StructureDefinition/unrelated", "valueString": "x" }
        ],
        "repeat": {
            "boundsDuration": { "value": 3, "unit": "months" },
            "frequency": 1
        }
    }))
    .expect("timing should convert");

    assert_eq!(timing.window.start_date, NaiveDate::from_ymd_opt(2024, 5, 6));
    assert!(matches!(timing.start_time, Some(StartTime::Instant(_))));
    assert_eq!(
        timing.window.bounds,
        Some(Bounds::Duration {
            value: 3,
            unit: DurationUnit::Month
        })
    );
    assert!(!timing.window.needs_start_date);
    assert!(!timing.window.needs_start_time);
}

#[test]
fn dosage_timing_without_daily_schedule_is_malformed() {
    let result = timing_from_value(&json!({
        "repeat": { "boundsPeriod": { "start": "2024-05-01", "end": "2024-05-02" } }
    }));
    assert!(matches!(result, Err(ReminderError::MalformedTiming(_))));
}

#[test]
fn half_open_period_is_malformed() {
    let result = timing_from_value(&json!({
        "repeat": { "boundsPeriod": { "start": "2024-05-01" }, "frequency": 1 }
    }));
    assert!(matches!(result, Err(ReminderError::MalformedTiming(_))));
}

#[test]
fn single_resource_is_accepted_without_bundle() {
    let resources = resources_from_value(&json!({
        "resourceType": "ServiceRequest",
        "id": "sr-walk",
        "code": { "coding": [{ "display": "Walk for 30 minutes" }] },
        "occurrenceTiming": {
            "repeat": { "boundsPeriod": { "start": "2024-05-01", "end": "2024-05-31" } }
        },
        "contained": [
            { "resourceType": "ServiceRequest", "occurrenceTiming": { "repeat": { "when": ["AFT"] } } },
            { "resourceType": "Observation" }
        ]
    }))
    .expect("resource should convert");

    assert_eq!(resources.len(), 1);
    match &resources[0] {
        ClinicalResource::Service(request) => {
            assert_eq!(request.action, "Walk for 30 minutes");
            assert_eq!(request.occurrences.len(), 1);
            assert_eq!(request.occurrences[0].meal_codes(), &[MealCode::Afternoon]);
        }
        other => panic!("expected a service request, got {other:?}"),
    }
}

#[test]
fn schedule_window_needs_no_daily_schedule() {
    let window = schedule_window_from_value(&json!({
        "extension": [
            { "url": "http://example.org/fhir/StructureDefinition/start-date", "valueDate": "2024-05-06" },
            { "url": "http://example.org/fhir/StructureDefinition/needs-start-time", "valueBoolean": true }
        ],
        "repeat": { "boundsDuration": { "value": 10, "code": "d" } }
    }))
    .expect("window should convert");

    assert_eq!(
        window.bounds,
        Some(Bounds::Duration {
            value: 10,
            unit: DurationUnit::Day
        })
    );
    assert_eq!(window.start_date, NaiveDate::from_ymd_opt(2024, 5, 6));
    assert!(!window.needs_start_date);
    assert!(window.needs_start_time);
}
