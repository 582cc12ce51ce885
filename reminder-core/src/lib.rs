//! Core logic turning FHIR timing schedules into reminder records.
//!
//! The crate is a pure computation library: callers hand in typed clinical
//! resources, a reference "now" and a timezone, and get back reminder data
//! ready for a delivery sink. Network I/O and dialogue state live elsewhere.

pub mod codes;
pub mod delivery;
pub mod formatter;
pub mod generator;
pub mod medication;
pub mod model;
pub mod occurrence;
pub mod recurrence;
pub mod service;
pub mod timing;

use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub use codes::{DayCode, MealCode};
pub use delivery::{deliver_all, DeliveryReport, ReminderRecord, ReminderSink, SinkError};
pub use formatter::{formatter_for_locale, EnglishFormatter, ReminderFormatter, SpanishFormatter};
pub use generator::{generate_reminder_data, GenerationContext, ReminderDataGenerator, ResourceReminders};
pub use model::{
    Bounds, ClinicalResource, DailySchedule, DailySlot, DosageInstruction, Dose, DurationUnit,
    MedicationRequest, OccurrencesPerDay, ResourceReminderData, ScheduleWindow, ServiceRequest,
    StartTime, Timing, Window,
};
pub use occurrence::{search_occurrences, search_occurrences_for};
pub use recurrence::{build_recurrence_rules, RecurrenceRule};
pub use timing::{daily_times, resolve_daily_times, resolve_window};

/// Runtime settings shared by the generator, the WASM bridge and the CLI.
///
/// Every field has a default, so a partial JSON object is a valid override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReminderConfig {
    /// IANA timezone of the patient.
    pub timezone: String,
    /// Locale tag handed to the formatter and the delivery sink.
    pub locale: String,
    /// Clock times used when a reminder must fire at a meal-relative slot.
    pub meal_clock: MealClock,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            timezone: "America/Bogota".to_string(),
            locale: "es-CO".to_string(),
            meal_clock: MealClock::default(),
        }
    }
}

impl ReminderConfig {
    /// The configured timezone, parsed.
    pub fn tz(&self) -> Result<Tz, ReminderError> {
        parse_timezone(&self.timezone)
    }
}

/// Local clock times of the meals that symbolic timing codes refer to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MealClock {
    pub breakfast: NaiveTime,
    pub lunch: NaiveTime,
    pub dinner: NaiveTime,
    /// Minutes between a "before"/"after" slot and the meal itself. Must be
    /// within one day either way.
    pub meal_offset_minutes: i64,
    /// Times of the `MORN`/`AFT`/`EVE`/`NIGHT` day parts.
    pub morning: NaiveTime,
    pub afternoon: NaiveTime,
    pub evening: NaiveTime,
    pub night: NaiveTime,
}

impl Default for MealClock {
    fn default() -> Self {
        Self {
            breakfast: hm(7, 0),
            lunch: hm(12, 0),
            dinner: hm(19, 0),
            meal_offset_minutes: 30,
            morning: hm(8, 0),
            afternoon: hm(15, 0),
            evening: hm(18, 0),
            night: hm(21, 0),
        }
    }
}

impl MealClock {
    /// Clock times a meal code stands for. Generic meal codes expand to all
    /// three meals; synthetic codes have no clock time.
    pub fn clock_times(&self, code: MealCode) -> ReminderResult<Vec<NaiveTime>> {
        let offset = self.meal_offset()?;
        let before = |meal: NaiveTime| meal - offset;
        let after = |meal: NaiveTime| meal + offset;
        let meals = [self.breakfast, self.lunch, self.dinner];

        Ok(match code {
            MealCode::BeforeBreakfast => vec![before(self.breakfast)],
            MealCode::Breakfast => vec![self.breakfast],
            MealCode::AfterBreakfast => vec![after(self.breakfast)],
            MealCode::Morning => vec![self.morning],
            MealCode::BeforeLunch => vec![before(self.lunch)],
            MealCode::Lunch => vec![self.lunch],
            MealCode::AfterLunch => vec![after(self.lunch)],
            MealCode::Afternoon => vec![self.afternoon],
            MealCode::BeforeDinner => vec![before(self.dinner)],
            MealCode::Dinner => vec![self.dinner],
            MealCode::AfterDinner => vec![after(self.dinner)],
            MealCode::Evening => vec![self.evening],
            MealCode::BeforeMeals => meals.iter().copied().map(before).collect(),
            MealCode::WithMeals => meals.to_vec(),
            MealCode::AfterMeals => meals.iter().copied().map(after).collect(),
            MealCode::Night => vec![self.night],
            MealCode::Exact | MealCode::AllDay => Vec::new(),
        })
    }

    /// `meal_offset_minutes` as a duration, limited to one day either way.
    pub fn meal_offset(&self) -> ReminderResult<Duration> {
        if self.meal_offset_minutes.unsigned_abs() > MAX_MEAL_OFFSET_MINUTES {
            return Err(ReminderError::Other(format!(
                "meal offset of {} minutes exceeds {MAX_MEAL_OFFSET_MINUTES}",
                self.meal_offset_minutes
            )));
        }
        Duration::try_minutes(self.meal_offset_minutes).ok_or_else(|| {
            ReminderError::Other(format!(
                "meal offset of {} minutes out of range",
                self.meal_offset_minutes
            ))
        })
    }
}

const MAX_MEAL_OFFSET_MINUTES: u64 = 24 * 60;

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Input a timing still needs before it can be scheduled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SetupField {
    StartDate,
    StartTime,
}

/// Errors raised while resolving schedules and generating reminders.
#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("input is missing the minimum required data")]
    MissingData,
    #[error("could not read input: {0}")]
    Parse(String),
    #[error("{resource} still needs {missing:?} before it can be scheduled")]
    IncompleteSchedule {
        resource: String,
        missing: Vec<SetupField>,
    },
    #[error("malformed timing: {0}")]
    MalformedTiming(String),
    #[error("unknown timezone: {0}")]
    InvalidTimezone(String),
    #[error("other error: {0}")]
    Other(String),
}

pub type ReminderResult<T> = Result<T, ReminderError>;

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz, ReminderError> {
    name.parse::<Tz>()
        .map_err(|_| ReminderError::InvalidTimezone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: ReminderConfig =
            serde_json::from_str(r#"{"locale":"en-US","meal_clock":{"lunch":"13:00:00"}}"#)
                .expect("config should parse");

        assert_eq!(config.locale, "en-US");
        assert_eq!(config.timezone, "America/Bogota");
        assert_eq!(config.meal_clock.lunch, hm(13, 0));
        assert_eq!(config.meal_clock.breakfast, hm(7, 0));
    }

    #[test]
    fn generic_meal_codes_expand_to_every_meal() {
        let clock = MealClock::default();
        assert_eq!(
            clock.clock_times(MealCode::BeforeMeals).unwrap(),
            vec![hm(6, 30), hm(11, 30), hm(18, 30)]
        );
        assert_eq!(clock.clock_times(MealCode::AfterDinner).unwrap(), vec![hm(19, 30)]);
        assert!(clock.clock_times(MealCode::AllDay).unwrap().is_empty());
    }

    #[test]
    fn oversized_meal_offset_is_an_error() {
        let config: ReminderConfig =
            serde_json::from_str(r#"{"meal_clock":{"meal_offset_minutes":9000000000000000}}"#)
                .expect("config should parse");

        assert!(matches!(
            config.meal_clock.clock_times(MealCode::BeforeBreakfast),
            Err(ReminderError::Other(_))
        ));
        assert!(config.meal_clock.clock_times(MealCode::AllDay).is_err());
    }

    #[test]
    fn negative_meal_offset_within_a_day_is_accepted() {
        let clock = MealClock {
            meal_offset_minutes: -15,
            ..MealClock::default()
        };
        assert_eq!(clock.clock_times(MealCode::BeforeLunch).unwrap(), vec![hm(12, 15)]);
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        assert!(matches!(
            parse_timezone("Mars/Olympus"),
            Err(ReminderError::InvalidTimezone(_))
        ));
        assert!(parse_timezone("America/Bogota").is_ok());
    }
}
