//! Typed clinical input and reminder output.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codes::{DayCode, MealCode};
use crate::{ReminderError, SetupField};

/// How the schedule window is bounded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Bounds {
    /// Absolute calendar dates, end date inclusive.
    Period { start: NaiveDate, end: NaiveDate },
    /// Relative to the start date carried by the timing extension.
    Duration { value: u32, unit: DurationUnit },
}

/// Unit of a `boundsDuration`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Day,
    Week,
    Month,
    /// Unrecognized unit, kept for logging.
    Other(String),
}

impl DurationUnit {
    /// Map a UCUM or plain-English unit.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "d" | "day" | "days" => DurationUnit::Day,
            "wk" | "week" | "weeks" => DurationUnit::Week,
            "mo" | "month" | "months" => DurationUnit::Month,
            other => DurationUnit::Other(other.to_string()),
        }
    }
}

/// Which of the three mutually exclusive ways sets the times within a day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DailySchedule {
    /// Symbolic meal-relative codes.
    When(Vec<MealCode>),
    /// Exact local clock times.
    TimeOfDay(Vec<NaiveTime>),
    /// Evenly spaced times per day, anchored at the start time.
    Frequency(u32),
}

/// Anchor time for frequency-based schedules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StartTime {
    /// Already a patient-local time of day.
    Local(NaiveTime),
    /// A full instant; converted to the patient timezone before use.
    Instant(DateTime<FixedOffset>),
}

/// Bounds of a schedule plus the setup state of its start date.
///
/// A service request parent only carries this part; its daily times come
/// from the contained occurrences.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduleWindow {
    #[serde(default)]
    pub bounds: Option<Bounds>,
    /// Date a duration-bounded schedule starts on.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// The patient still has to pick the start date.
    #[serde(default)]
    pub needs_start_date: bool,
    /// The patient still has to pick the start time.
    #[serde(default)]
    pub needs_start_time: bool,
}

impl ScheduleWindow {
    /// Input the patient still has to provide before scheduling.
    pub fn pending_setup(&self) -> Vec<SetupField> {
        let mut missing = Vec::new();
        if self.needs_start_date {
            missing.push(SetupField::StartDate);
        }
        if self.needs_start_time {
            missing.push(SetupField::StartTime);
        }
        missing
    }

    /// Fail fast when a schedule flagged as incomplete reaches scheduling.
    pub fn ensure_schedulable(&self, resource: &str) -> Result<(), ReminderError> {
        let missing = self.pending_setup();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ReminderError::IncompleteSchedule {
                resource: resource.to_string(),
                missing,
            })
        }
    }
}

/// A FHIR `Timing` reduced to what reminders need: a window, the times of
/// each day and the weekdays it applies to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timing {
    #[serde(flatten)]
    pub window: ScheduleWindow,
    pub daily: DailySchedule,
    /// Empty means every day.
    #[serde(default)]
    pub day_of_week: Vec<DayCode>,
    /// Anchor of a frequency schedule.
    #[serde(default)]
    pub start_time: Option<StartTime>,
}

impl Timing {
    /// An unbounded, every-day timing with no setup pending.
    pub fn new(daily: DailySchedule) -> Self {
        Self {
            window: ScheduleWindow::default(),
            daily,
            day_of_week: Vec::new(),
            start_time: None,
        }
    }

    pub fn pending_setup(&self) -> Vec<SetupField> {
        self.window.pending_setup()
    }

    pub fn ensure_schedulable(&self, resource: &str) -> Result<(), ReminderError> {
        self.window.ensure_schedulable(resource)
    }

    /// True when `day` is one of the scheduled weekdays.
    pub fn occurs_on(&self, day: DayCode) -> bool {
        self.day_of_week.is_empty() || self.day_of_week.contains(&day)
    }

    /// Symbolic meal codes of a `when` schedule, empty otherwise.
    pub fn meal_codes(&self) -> &[MealCode] {
        match &self.daily {
            DailySchedule::When(codes) => codes,
            _ => &[],
        }
    }
}

/// One entry of the list of times read out to the patient.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DailySlot {
    Meal(MealCode),
    Clock(NaiveTime),
}

impl DailySlot {
    /// Meal code of the slot; clock times map to `EXACT`.
    pub fn code(&self) -> MealCode {
        match self {
            DailySlot::Meal(code) => *code,
            DailySlot::Clock(_) => MealCode::Exact,
        }
    }
}

impl fmt::Display for DailySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DailySlot::Meal(code) => write!(f, "{code}"),
            DailySlot::Clock(time) => write!(f, "{}", time.format("%H:%M")),
        }
    }
}

/// Resolved UTC interval a reminder is active in, end exclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Amount taken per administration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dose {
    pub value: f64,
    pub unit: String,
}

/// One `dosageInstruction` of a medication request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DosageInstruction {
    /// Free-text sig as written by the prescriber.
    pub text: Option<String>,
    pub dose: Option<Dose>,
    pub timing: Timing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationRequest {
    pub id: String,
    /// Display name of the medication.
    pub medication: String,
    pub dosage_instructions: Vec<DosageInstruction>,
}

/// A service request whose occurrences are carried by contained
/// sub-resources; the parent timing bounds the window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceRequest {
    pub id: String,
    /// What the patient is asked to do, e.g. "measure blood glucose".
    pub action: String,
    pub window: ScheduleWindow,
    pub occurrences: Vec<Timing>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A resource the engine builds reminders for.
#[serde(tag = "resource_type", rename_all = "snake_case")]
pub enum ClinicalResource {
    Medication(MedicationRequest),
    Service(ServiceRequest),
}

impl ClinicalResource {
    pub fn id(&self) -> &str {
        match self {
            ClinicalResource::Medication(request) => &request.id,
            ClinicalResource::Service(request) => &request.id,
        }
    }

    /// Setup still missing on any timing of the resource, deduplicated.
    pub fn pending_setup(&self) -> Vec<SetupField> {
        let windows: Vec<&ScheduleWindow> = match self {
            ClinicalResource::Medication(request) => request
                .dosage_instructions
                .iter()
                .map(|dosage| &dosage.timing.window)
                .collect(),
            ClinicalResource::Service(request) => std::iter::once(&request.window)
                .chain(request.occurrences.iter().map(|occurrence| &occurrence.window))
                .collect(),
        };

        let mut missing = Vec::new();
        for field in windows.into_iter().flat_map(ScheduleWindow::pending_setup) {
            if !missing.contains(&field) {
                missing.push(field);
            }
        }
        missing
    }
}

/// Reminder data built for one dosage instruction or one occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceReminderData {
    pub resource_id: String,
    /// Display text of the reminder.
    pub text: String,
    /// Spoken form of `text`.
    pub ssml: String,
    /// Times read out to the patient.
    pub times: Vec<DailySlot>,
    /// RFC 5545 RRULE values, one per time and weekday.
    pub recurrence_rules: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub locale: String,
}

/// Meal codes with at least one occurrence on a given day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OccurrencesPerDay {
    pub date: NaiveDate,
    pub day: DayCode,
    pub codes: Vec<MealCode>,
}
