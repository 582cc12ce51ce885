//! FHIR JSON to typed reminder resources, plus string/value entry points
//! for the reminder engine.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use reminder_core::formatter::formatter_for_locale;
use reminder_core::{
    Bounds, ClinicalResource, DailySchedule, DayCode, DosageInstruction, Dose, DurationUnit,
    MealCode, MedicationRequest, OccurrencesPerDay, ReminderConfig, ReminderDataGenerator,
    ReminderError, ReminderRecord, ReminderResult, ScheduleWindow, ServiceRequest, SetupField,
    StartTime, Timing,
};
use serde_json::Value;

/// Last path segment of the extension carrying the schedule start date.
pub const START_DATE_EXTENSION: &str = "start-date";
pub const START_TIME_EXTENSION: &str = "start-time";
pub const NEEDS_START_DATE_EXTENSION: &str = "needs-start-date";
pub const NEEDS_START_TIME_EXTENSION: &str = "needs-start-time";

/// Read every supported resource from a JSON string.
pub fn resources_from_str(json: &str) -> ReminderResult<Vec<ClinicalResource>> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| ReminderError::Parse(err.to_string()))?;
    resources_from_value(&value)
}

/// Read every supported resource from a `Bundle` or a single resource.
/// Resource types the engine does not schedule are skipped.
pub fn resources_from_value(value: &Value) -> ReminderResult<Vec<ClinicalResource>> {
    let resource_type = value
        .get("resourceType")
        .and_then(Value::as_str)
        .ok_or(ReminderError::MissingData)?;

    if resource_type != "Bundle" {
        return Ok(resource_from_value(value)?.into_iter().collect());
    }

    let entries = value
        .get("entry")
        .and_then(Value::as_array)
        .ok_or(ReminderError::MissingData)?;

    let mut resources = Vec::new();
    for entry in entries {
        let Some(resource) = entry.get("resource") else {
            continue;
        };
        if let Some(parsed) = resource_from_value(resource)? {
            resources.push(parsed);
        }
    }
    Ok(resources)
}

fn resource_from_value(resource: &Value) -> ReminderResult<Option<ClinicalResource>> {
    match resource
        .get("resourceType")
        .and_then(Value::as_str)
        .unwrap_or_default()
    {
        "MedicationRequest" => Ok(Some(ClinicalResource::Medication(
            medication_request_from_value(resource)?,
        ))),
        "ServiceRequest" => Ok(Some(ClinicalResource::Service(
            service_request_from_value(resource)?,
        ))),
        other => {
            tracing::debug!(resource_type = other, "resource type not scheduled, skipping");
            Ok(None)
        }
    }
}

pub fn medication_request_from_value(resource: &Value) -> ReminderResult<MedicationRequest> {
    let medication = resource
        .get("medicationCodeableConcept")
        .and_then(extract_codeable_text)
        .or_else(|| {
            resource.get("medicationReference").and_then(|value| {
                value
                    .get("display")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| "Medication not specified".to_string());

    let dosage_instructions = resource
        .get("dosageInstruction")
        .and_then(Value::as_array)
        .map(|dosages| {
            dosages
                .iter()
                .map(dosage_from_value)
                .collect::<ReminderResult<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    Ok(MedicationRequest {
        id: resource_id(resource, "medication"),
        medication,
        dosage_instructions,
    })
}

fn dosage_from_value(dosage: &Value) -> ReminderResult<DosageInstruction> {
    let timing = dosage
        .get("timing")
        .ok_or_else(|| ReminderError::MalformedTiming("dosage instruction without timing".into()))
        .and_then(timing_from_value)?;

    let dose = dosage
        .get("doseAndRate")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|dose_and_rate| dose_and_rate.get("doseQuantity"))
        .and_then(|quantity| {
            let value = quantity.get("value")?.as_f64()?;
            let unit = quantity
                .get("unit")
                .or_else(|| quantity.get("code"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some(Dose { value, unit })
        });

    Ok(DosageInstruction {
        text: dosage
            .get("text")
            .and_then(Value::as_str)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()),
        dose,
        timing,
    })
}

/// A service request; its schedule occurrences come from `contained`
/// resources carrying an `occurrenceTiming`. The parent `occurrenceTiming`
/// only bounds the window, so it needs no daily schedule.
pub fn service_request_from_value(resource: &Value) -> ReminderResult<ServiceRequest> {
    let window = resource
        .get("occurrenceTiming")
        .ok_or_else(|| ReminderError::MalformedTiming("service request without occurrenceTiming".into()))
        .and_then(schedule_window_from_value)?;

    let occurrences = resource
        .get("contained")
        .and_then(Value::as_array)
        .map(|contained| {
            contained
                .iter()
                .filter_map(|child| child.get("occurrenceTiming"))
                .map(timing_from_value)
                .collect::<ReminderResult<Vec<_>>>()
        })
        .transpose()?
        .unwrap_or_default();

    Ok(ServiceRequest {
        id: resource_id(resource, "service"),
        action: resource
            .get("code")
            .and_then(extract_codeable_text)
            .unwrap_or_else(|| "Service".to_string()),
        window,
        occurrences,
    })
}

/// Read the bounds and start-date setup of a FHIR `Timing`, ignoring its
/// daily schedule.
pub fn schedule_window_from_value(timing: &Value) -> ReminderResult<ScheduleWindow> {
    let mut window = ScheduleWindow {
        bounds: timing.get("repeat").map(bounds).transpose()?.flatten(),
        ..ScheduleWindow::default()
    };

    for (name, extension) in named_extensions(timing) {
        match name {
            START_DATE_EXTENSION => {
                window.start_date = extension_text(extension, &["valueDate", "valueDateTime"])
                    .map(parse_date_value)
                    .transpose()?;
            }
            NEEDS_START_DATE_EXTENSION => window.needs_start_date = extension_flag(extension),
            NEEDS_START_TIME_EXTENSION => window.needs_start_time = extension_flag(extension),
            _ => {}
        }
    }

    Ok(window)
}

/// Convert a FHIR `Timing`. The daily schedule is taken from `when`, then
/// `timeOfDay`, then `frequency`; a repeat block with none of them is
/// malformed.
pub fn timing_from_value(timing: &Value) -> ReminderResult<Timing> {
    let repeat = timing
        .get("repeat")
        .ok_or_else(|| ReminderError::MalformedTiming("timing without repeat".into()))?;

    let mut parsed = Timing::new(daily_schedule(repeat)?);
    parsed.window = schedule_window_from_value(timing)?;
    parsed.day_of_week = string_array(repeat, "dayOfWeek")
        .map(|code| code.parse::<DayCode>())
        .collect::<ReminderResult<Vec<_>>>()?;
    parsed.start_time = named_extensions(timing)
        .filter(|(name, _)| *name == START_TIME_EXTENSION)
        .filter_map(|(_, extension)| extension_text(extension, &["valueTime", "valueDateTime"]))
        .last()
        .map(parse_start_time)
        .transpose()?;

    Ok(parsed)
}

/// Extensions of `value` keyed by the last segment of their URL.
fn named_extensions(value: &Value) -> impl Iterator<Item = (&str, &Value)> {
    value
        .get("extension")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(|extension| {
            let url = extension.get("url").and_then(Value::as_str)?;
            Some((url.rsplit('/').next()?, extension))
        })
}

fn daily_schedule(repeat: &Value) -> ReminderResult<DailySchedule> {
    let when: Vec<MealCode> = string_array(repeat, "when")
        .filter_map(|code| match code.parse::<MealCode>() {
            Ok(parsed) if parsed.is_symbolic() => Some(parsed),
            _ => {
                tracing::warn!(code, "unsupported timing code ignored");
                None
            }
        })
        .collect();
    if !when.is_empty() {
        return Ok(DailySchedule::When(when));
    }

    let time_of_day = string_array(repeat, "timeOfDay")
        .map(parse_time)
        .collect::<ReminderResult<Vec<_>>>()?;
    if !time_of_day.is_empty() {
        return Ok(DailySchedule::TimeOfDay(time_of_day));
    }

    match repeat.get("frequency").and_then(Value::as_u64) {
        Some(frequency) => u32::try_from(frequency)
            .map(DailySchedule::Frequency)
            .map_err(|_| ReminderError::MalformedTiming(format!("frequency {frequency} too large"))),
        None => Err(ReminderError::MalformedTiming(
            "repeat has no when, timeOfDay or frequency".into(),
        )),
    }
}

fn bounds(repeat: &Value) -> ReminderResult<Option<Bounds>> {
    if let Some(period) = repeat.get("boundsPeriod") {
        let start = period.get("start").and_then(Value::as_str);
        let end = period.get("end").and_then(Value::as_str);
        return match (start, end) {
            (Some(start), Some(end)) => Ok(Some(Bounds::Period {
                start: parse_date_value(start)?,
                end: parse_date_value(end)?,
            })),
            _ => Err(ReminderError::MalformedTiming(
                "boundsPeriod needs both start and end".into(),
            )),
        };
    }

    if let Some(duration) = repeat.get("boundsDuration") {
        let value = duration
            .get("value")
            .and_then(Value::as_f64)
            .filter(|value| *value >= 0.0)
            .ok_or_else(|| ReminderError::MalformedTiming("boundsDuration without value".into()))?;
        let unit = duration
            .get("code")
            .or_else(|| duration.get("unit"))
            .and_then(Value::as_str)
            .ok_or_else(|| ReminderError::MalformedTiming("boundsDuration without unit".into()))?;
        return Ok(Some(Bounds::Duration {
            value: value.round() as u32,
            unit: DurationUnit::from_code(unit),
        }));
    }

    Ok(None)
}

fn string_array<'a>(value: &'a Value, field: &str) -> impl Iterator<Item = &'a str> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_str)
}

fn extension_text<'a>(extension: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .find_map(|field| extension.get(*field).and_then(Value::as_str))
}

fn extension_flag(extension: &Value) -> bool {
    extension
        .get("valueBoolean")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// A FHIR `date`, or the local calendar date of a `dateTime`.
fn parse_date_value(value: &str) -> ReminderResult<NaiveDate> {
    parse_date(value)
        .or_else(|| parse_datetime(value).map(|dt| dt.date_naive()))
        .ok_or_else(|| ReminderError::Parse(format!("invalid date {value:?}")))
}

fn parse_start_time(value: &str) -> ReminderResult<StartTime> {
    if let Some(instant) = parse_datetime(value) {
        return Ok(StartTime::Instant(instant));
    }
    parse_time(value).map(StartTime::Local)
}

fn parse_time(value: &str) -> ReminderResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| ReminderError::Parse(format!("invalid time {value:?}")))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn parse_datetime(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok()
}

fn extract_codeable_text(value: &Value) -> Option<String> {
    if let Some(text) = value.get("text").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return Some(text.trim().to_string());
        }
    }

    if let Some(codings) = value.get("coding").and_then(Value::as_array) {
        for coding in codings {
            if let Some(display) = coding.get("display").and_then(Value::as_str) {
                if !display.trim().is_empty() {
                    return Some(display.trim().to_string());
                }
            }
            if let Some(code) = coding.get("code").and_then(Value::as_str) {
                if !code.trim().is_empty() {
                    return Some(code.trim().to_string());
                }
            }
        }
    }

    None
}

fn resource_id(resource: &Value, fallback: &str) -> String {
    resource
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{fallback}-unknown"))
}

/// Resources that still need patient input, with what they need. The
/// caller routes these to data collection instead of reminder generation.
pub fn pending_setup_value(bundle: &Value) -> ReminderResult<Vec<(String, Vec<SetupField>)>> {
    Ok(resources_from_value(bundle)?
        .into_iter()
        .filter_map(|resource| {
            let missing = resource.pending_setup();
            (!missing.is_empty()).then(|| (resource.id().to_string(), missing))
        })
        .collect())
}

/// Build delivery records from a JSON bundle.
pub fn generate_reminders_str(
    bundle_json: &str,
    config: &ReminderConfig,
    now: DateTime<Utc>,
    reminder_time: Option<NaiveTime>,
) -> ReminderResult<Vec<ReminderRecord>> {
    let value: Value =
        serde_json::from_str(bundle_json).map_err(|err| ReminderError::Parse(err.to_string()))?;
    generate_reminders_value(&value, config, now, reminder_time)
}

/// Build delivery records from a `serde_json::Value` bundle, using the
/// formatter matching `config.locale`.
pub fn generate_reminders_value(
    bundle: &Value,
    config: &ReminderConfig,
    now: DateTime<Utc>,
    reminder_time: Option<NaiveTime>,
) -> ReminderResult<Vec<ReminderRecord>> {
    let resources = resources_from_value(bundle)?;
    let formatter = formatter_for_locale(&config.locale);
    let generator = ReminderDataGenerator::with_reference_time(config, formatter.as_ref(), now)?;
    generator.generate(&resources, reminder_time)
}

/// Occurrence search over the service requests of a bundle. `now` is read
/// in the configured timezone to find "today".
pub fn search_occurrences_value(
    bundle: &Value,
    config: &ReminderConfig,
    now: DateTime<Utc>,
    filter: MealCode,
) -> ReminderResult<Vec<OccurrencesPerDay>> {
    let today = now.with_timezone(&config.tz()?).date_naive();
    let requests: Vec<ServiceRequest> = resources_from_value(bundle)?
        .into_iter()
        .filter_map(|resource| match resource {
            ClinicalResource::Service(request) => Some(request),
            ClinicalResource::Medication(_) => None,
        })
        .collect();
    Ok(reminder_core::search_occurrences_for(&requests, today, filter))
}
