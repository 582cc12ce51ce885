//! Resolution of a schedule into a concrete window and the times of a day.

use chrono::{
    DateTime, Days, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

use crate::model::{
    Bounds, DailySchedule, DailySlot, DurationUnit, ScheduleWindow, StartTime, Timing, Window,
};
use crate::{ReminderError, ReminderResult, SetupField};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Compute the UTC window a schedule covers.
///
/// A period covers its start date through its end date inclusive. A duration
/// starts at the extension start date and ends at the end of the day the
/// duration lands on. Without bounds the window collapses to `now`.
pub fn resolve_window(schedule: &ScheduleWindow, tz: Tz, now: DateTime<Utc>) -> ReminderResult<Window> {
    match &schedule.bounds {
        Some(Bounds::Period { start, end }) => {
            let after_end = end.checked_add_days(Days::new(1)).ok_or_else(|| {
                ReminderError::MalformedTiming(format!("period end {end} out of range"))
            })?;
            Ok(Window {
                start: start_of_day(*start, tz),
                end: start_of_day(after_end, tz),
            })
        }
        Some(Bounds::Duration { value, unit }) => {
            let start_date = resolve_start_date(schedule)?;
            let last_day = add_duration(start_date, *value, unit)?;
            Ok(Window {
                start: start_of_day(start_date, tz),
                end: end_of_day(last_day, tz),
            })
        }
        None => Ok(Window {
            start: now,
            end: now,
        }),
    }
}

/// Split the day into `frequency` intervals anchored at `start`.
///
/// Slot `i` sits at `i * 1440 / frequency` minutes, rounded to the nearest
/// minute, so intervals differ by at most one minute. Returns the local
/// times sorted ascending. The first element equals `start` unless an
/// interval wraps past midnight.
pub fn daily_times(frequency: u32, start: NaiveTime) -> ReminderResult<Vec<NaiveTime>> {
    if frequency == 0 || frequency > MINUTES_PER_DAY {
        return Err(ReminderError::MalformedTiming(format!(
            "frequency must be between 1 and {MINUTES_PER_DAY}, got {frequency}"
        )));
    }

    let anchor = NaiveTime::from_hms_opt(start.hour(), start.minute(), 0).unwrap_or(start);
    let mut times: Vec<NaiveTime> = (0..frequency)
        .map(|index| {
            let offset = slot_offset_minutes(index, frequency);
            anchor.overflowing_add_signed(Duration::minutes(offset)).0
        })
        .collect();
    times.sort();
    Ok(times)
}

/// Minutes from the anchor to slot `index`, rounded half up.
fn slot_offset_minutes(index: u32, frequency: u32) -> i64 {
    let scaled = u64::from(index) * u64::from(MINUTES_PER_DAY) * 2 + u64::from(frequency);
    (scaled / (u64::from(frequency) * 2)) as i64
}

/// Times of day a timing fires, for speech and rule building.
///
/// `when` codes come out in meal order, `timeOfDay` values chronologically,
/// and frequencies expand from the resolved start time.
pub fn resolve_daily_times(timing: &Timing, tz: Tz) -> ReminderResult<Vec<DailySlot>> {
    match &timing.daily {
        DailySchedule::When(codes) => {
            let mut codes = codes.clone();
            codes.sort();
            codes.dedup();
            Ok(codes.into_iter().map(DailySlot::Meal).collect())
        }
        DailySchedule::TimeOfDay(times) => {
            let mut times = times.clone();
            times.sort();
            times.dedup();
            Ok(times.into_iter().map(DailySlot::Clock).collect())
        }
        DailySchedule::Frequency(frequency) => {
            let start = resolve_start_time(timing, tz)?;
            Ok(daily_times(*frequency, start)?
                .into_iter()
                .map(DailySlot::Clock)
                .collect())
        }
    }
}

/// Start date carried by the timing extension.
pub fn resolve_start_date(schedule: &ScheduleWindow) -> ReminderResult<NaiveDate> {
    match schedule.start_date {
        Some(date) => Ok(date),
        None if schedule.needs_start_date => Err(ReminderError::IncompleteSchedule {
            resource: "timing".to_string(),
            missing: vec![SetupField::StartDate],
        }),
        None => Err(ReminderError::MalformedTiming(
            "duration-bounded timing without a start date".to_string(),
        )),
    }
}

/// Start time carried by the timing extension, as a patient-local time.
pub fn resolve_start_time(timing: &Timing, tz: Tz) -> ReminderResult<NaiveTime> {
    match timing.start_time {
        Some(StartTime::Local(time)) => Ok(time),
        Some(StartTime::Instant(instant)) => Ok(instant.with_timezone(&tz).time()),
        None if timing.window.needs_start_time => Err(ReminderError::IncompleteSchedule {
            resource: "timing".to_string(),
            missing: vec![SetupField::StartTime],
        }),
        None => Err(ReminderError::MalformedTiming(
            "frequency-based timing without a start time".to_string(),
        )),
    }
}

fn add_duration(start: NaiveDate, value: u32, unit: &DurationUnit) -> ReminderResult<NaiveDate> {
    let shifted = match unit {
        DurationUnit::Day => start.checked_add_days(Days::new(u64::from(value))),
        DurationUnit::Week => start.checked_add_days(Days::new(u64::from(value) * 7)),
        DurationUnit::Month => start.checked_add_months(Months::new(value)),
        DurationUnit::Other(code) => {
            // Only d/wk/mo are defined; anything else leaves the date as is.
            tracing::warn!(unit = %code, "unsupported duration unit, window not extended");
            Some(start)
        }
    };
    shifted.ok_or_else(|| {
        ReminderError::MalformedTiming(format!("duration {value} {unit:?} from {start} out of range"))
    })
}

/// Midnight of `date` in `tz`, as UTC.
pub fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    local_to_utc(date.and_time(NaiveTime::MIN), tz)
}

/// Last millisecond of `date` in `tz`, as UTC.
pub fn end_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    local_to_utc(date.and_time(last), tz)
}

/// Map a patient-local wall time to UTC. Ambiguous times take the earlier
/// instant; times inside a DST gap move one hour forward.
pub fn local_to_utc(local: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}
