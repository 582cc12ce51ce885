use std::fs;

use chrono::{DateTime, NaiveTime, Utc};
use reminder_core::{ReminderConfig, ReminderError, SetupField};
use reminder_fhir::{generate_reminders_str, generate_reminders_value, pending_setup_value};
use serde_json::{json, Value};

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn english_config() -> ReminderConfig {
    ReminderConfig {
        locale: "en-US".to_string(),
        ..ReminderConfig::default()
    }
}

// Monday 2024-05-06, 10:00 in Bogota.
fn monday_morning() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-06T15:00:00Z")
        .expect("valid instant")
        .with_timezone(&Utc)
}

#[test]
fn reminder_bundle_matches_golden() {
    let bundle = fs::read_to_string(fixture_path("reminder_bundle.json"))
        .expect("could not read sample bundle");

    let records = generate_reminders_str(&bundle, &english_config(), monday_morning(), None)
        .expect("could not generate reminders");

    let actual = serde_json::to_value(records).expect("could not serialize records");

    let expected = fs::read_to_string(fixture_path("reminder_records.json"))
        .expect("could not read golden records");
    let expected_value: Value = serde_json::from_str(&expected).expect("golden is not valid JSON");

    assert_eq!(actual, expected_value);
}

#[test]
fn explicit_reminder_time_replaces_derived_anchors() {
    let bundle = fs::read_to_string(fixture_path("reminder_bundle.json"))
        .expect("could not read sample bundle");
    let nine = NaiveTime::from_hms_opt(9, 0, 0).expect("valid time");

    let records = generate_reminders_str(&bundle, &english_config(), monday_morning(), Some(nine))
        .expect("could not generate reminders");

    assert_eq!(records.len(), 4);
    assert_eq!(
        records[0].recurrence_rules,
        vec!["FREQ=DAILY;BYHOUR=9;BYMINUTE=0;BYSECOND=0;INTERVAL=1"]
    );
    assert_eq!(
        records[1].recurrence_rules,
        vec![
            "FREQ=WEEKLY;BYDAY=TH;BYHOUR=9;BYMINUTE=0;BYSECOND=0;INTERVAL=1",
            "FREQ=WEEKLY;BYDAY=MO;BYHOUR=9;BYMINUTE=0;BYSECOND=0;INTERVAL=1",
        ]
    );
    // Speech still lists every daily time.
    assert_eq!(records[0].text, "Take 500 mg of Metformin at 08:00 and at 20:00.");
}

#[test]
fn spanish_locale_renders_spanish_text() {
    let bundle = fs::read_to_string(fixture_path("reminder_bundle.json"))
        .expect("could not read sample bundle");

    let records = generate_reminders_str(&bundle, &ReminderConfig::default(), monday_morning(), None)
        .expect("could not generate reminders");

    assert_eq!(records[1].locale, "es-CO");
    assert_eq!(
        records[1].text,
        "Toma 1 tablet de Losartan antes del desayuno y después de la cena."
    );
    assert_eq!(records[3].text, "Measure blood glucose antes del almuerzo.");
}

#[test]
fn pending_setup_is_reported_and_blocks_generation() {
    let bundle = fs::read_to_string(fixture_path("pending_setup_bundle.json"))
        .expect("could not read pending bundle");
    let value: Value = serde_json::from_str(&bundle).expect("bundle is not valid JSON");

    let pending = pending_setup_value(&value).expect("could not inspect bundle");
    assert_eq!(pending, vec![("med-new".to_string(), vec![SetupField::StartDate])]);

    let result = generate_reminders_str(&bundle, &english_config(), monday_morning(), None);
    assert!(matches!(
        result,
        Err(ReminderError::IncompleteSchedule { ref resource, .. }) if resource == "med-new"
    ));
}

#[test]
fn non_bundle_input_without_resource_type_is_rejected() {
    let result = generate_reminders_str("{\"entry\": []}", &english_config(), monday_morning(), None);
    assert!(matches!(result, Err(ReminderError::MissingData)));

    let result = generate_reminders_str("not json", &english_config(), monday_morning(), None);
    assert!(matches!(result, Err(ReminderError::Parse(_))));
}

#[test]
fn service_parent_with_only_bounds_schedules_its_occurrences() {
    let bundle = json!({
        "resourceType": "Bundle",
        "entry": [{
            "resource": {
                "resourceType": "ServiceRequest",
                "id": "sr-pressure",
                "code": { "text": "measure blood pressure" },
                "occurrenceTiming": {
                    "repeat": { "boundsPeriod": { "start": "2024-05-01", "end": "2024-05-31" } }
                },
                "contained": [{
                    "resourceType": "ServiceRequest",
                    "occurrenceTiming": { "repeat": { "dayOfWeek": ["mon"], "when": ["ACM"] } }
                }]
            }
        }]
    });

    let records = generate_reminders_value(&bundle, &english_config(), monday_morning(), None)
        .expect("could not generate reminders");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].resource_id, "sr-pressure");
    assert_eq!(
        records[0].recurrence_rules,
        vec!["FREQ=WEEKLY;BYDAY=MO;BYHOUR=6;BYMINUTE=30;BYSECOND=0;INTERVAL=1"]
    );
    assert_eq!(records[0].text, "Measure blood pressure before breakfast.");
    assert_eq!(records[0].end, "2024-06-01T00:00:00.000");
}
