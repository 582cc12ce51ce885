//! Reminder generation run: per-resource data, expiry filter, start clamp.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::codes::DayCode;
use crate::delivery::ReminderRecord;
use crate::formatter::ReminderFormatter;
use crate::model::{ClinicalResource, DailySlot, ResourceReminderData, Window};
use crate::recurrence::rules_for_times;
use crate::{MealClock, ReminderConfig, ReminderResult};

/// Everything a resource-specific generator needs for one run.
pub struct GenerationContext<'a> {
    /// Reference instant of the run.
    pub now: DateTime<Utc>,
    /// Patient timezone.
    pub timezone: Tz,
    pub locale: &'a str,
    pub formatter: &'a dyn ReminderFormatter,
    pub meal_clock: &'a MealClock,
    /// Explicit recurrence anchor. When `None`, anchors come from the
    /// clock values of the speech times.
    pub reminder_time: Option<NaiveTime>,
}

impl GenerationContext<'_> {
    /// Clock times the reminder fires at.
    pub fn anchor_times(&self, times: &[DailySlot]) -> ReminderResult<Vec<NaiveTime>> {
        if let Some(time) = self.reminder_time {
            return Ok(vec![time]);
        }
        let mut anchors = Vec::with_capacity(times.len());
        for slot in times {
            match slot {
                DailySlot::Clock(time) => anchors.push(*time),
                DailySlot::Meal(code) => anchors.extend(self.meal_clock.clock_times(*code)?),
            }
        }
        anchors.sort();
        anchors.dedup();
        Ok(anchors)
    }

    /// One rule per anchor time and scheduled weekday.
    pub fn recurrence_rules(&self, times: &[DailySlot], days: &[DayCode]) -> ReminderResult<Vec<String>> {
        Ok(rules_for_times(&self.anchor_times(times)?, days))
    }

    /// Assemble the data of one reminder from its resolved parts.

    pub fn reminder_data(
        &self,
        resource_id: &str,
        text: String,
        ssml: String,
        times: Vec<DailySlot>,
        days: &[DayCode],
        window: Window,
    ) -> ReminderResult<ResourceReminderData> {
        let recurrence_rules = self.recurrence_rules(&times, days)?;
        Ok(ResourceReminderData {
            resource_id: resource_id.to_string(),
            text,
            ssml,
            times,
            recurrence_rules,
            start: window.start,
            end: window.end,
            locale: self.locale.to_string(),
        })
    }
}

/// Resource-specific extraction of reminder data.
pub trait ResourceReminders {
    fn reminder_data(&self, ctx: &GenerationContext<'_>) -> ReminderResult<Vec<ResourceReminderData>>;
}

impl ResourceReminders for ClinicalResource {
    fn reminder_data(&self, ctx: &GenerationContext<'_>) -> ReminderResult<Vec<ResourceReminderData>> {
        match self {
            ClinicalResource::Medication(request) => request.reminder_data(ctx),
            ClinicalResource::Service(request) => request.reminder_data(ctx),
        }
    }
}

/// One generation run. `now` is captured once and used for every filter and
/// clamp decision of the run.
pub struct ReminderDataGenerator<'a> {
    now: DateTime<Utc>,
    timezone: Tz,
    locale: String,
    meal_clock: MealClock,
    formatter: &'a dyn ReminderFormatter,
}

impl<'a> ReminderDataGenerator<'a> {
    /// A run anchored at the current time.
    pub fn new(config: &ReminderConfig, formatter: &'a dyn ReminderFormatter) -> ReminderResult<Self> {
        Self::with_reference_time(config, formatter, Utc::now())
    }

    /// A run anchored at `now`. Fails on an unknown timezone or an
    /// out-of-range meal offset.
    pub fn with_reference_time(
        config: &ReminderConfig,
        formatter: &'a dyn ReminderFormatter,
        now: DateTime<Utc>,
    ) -> ReminderResult<Self> {
        config.meal_clock.meal_offset()?;
        Ok(Self {
            now,
            timezone: config.tz()?,
            locale: config.locale.clone(),
            meal_clock: config.meal_clock.clone(),
            formatter,
        })
    }

    /// The instant captured for this run.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Reminder data still relevant at `now`, with past starts clamped.
    pub fn reminder_data(
        &self,
        resources: &[ClinicalResource],
        reminder_time: Option<NaiveTime>,
    ) -> ReminderResult<Vec<ResourceReminderData>> {
        let ctx = GenerationContext {
            now: self.now,
            timezone: self.timezone,
            locale: &self.locale,
            formatter: self.formatter,
            meal_clock: &self.meal_clock,
            reminder_time,
        };

        let mut kept = Vec::new();
        for resource in resources {
            for data in resource.reminder_data(&ctx)? {
                if let Some(data) = self.clamp(data) {
                    kept.push(data);
                }
            }
        }
        Ok(kept)
    }

    /// Delivery-ready records for every surviving reminder.
    pub fn generate(
        &self,
        resources: &[ClinicalResource],
        reminder_time: Option<NaiveTime>,
    ) -> ReminderResult<Vec<ReminderRecord>> {
        Ok(self
            .reminder_data(resources, reminder_time)?
            .iter()
            .map(|data| ReminderRecord::from_data(data, self.timezone))
            .collect())
    }

    fn clamp(&self, mut data: ResourceReminderData) -> Option<ResourceReminderData> {
        if data.end <= self.now {
            tracing::debug!(resource = %data.resource_id, end = %data.end, "reminder window already over");
            return None;
        }
        if data.recurrence_rules.is_empty() {
            tracing::debug!(resource = %data.resource_id, "no clock time to anchor the reminder");
            return None;
        }
        if data.start < self.now {
            tracing::debug!(resource = %data.resource_id, start = %data.start, "reminder start moved to now");
            data.start = self.now;
        }
        Some(data)
    }
}

/// Convenience wrapper running a single generation with `reference_time` as
/// "now".
pub fn generate_reminder_data(
    resources: &[ClinicalResource],
    reference_time: DateTime<Utc>,
    config: &ReminderConfig,
    formatter: &dyn ReminderFormatter,
    reminder_time: Option<NaiveTime>,
) -> ReminderResult<Vec<ResourceReminderData>> {
    ReminderDataGenerator::with_reference_time(config, formatter, reference_time)?
        .reminder_data(resources, reminder_time)
}
