//! RFC 5545 style recurrence rules for the reminder delivery API.

use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::codes::DayCode;

/// `FREQ` part of a rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Weekly,
}

/// A single-slot recurrence: every day, or every given weekday, at a time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Set for weekly rules only.
    pub by_day: Option<DayCode>,
    /// Local wall-clock hour.
    pub hour: u32,
    pub minute: u32,
    pub interval: u32,
}

impl RecurrenceRule {
    /// Every day at `hour:minute`.
    pub fn daily(hour: u32, minute: u32) -> Self {
        Self {
            frequency: Frequency::Daily,
            by_day: None,
            hour,
            minute,
            interval: 1,
        }
    }

    /// Every `day` of the week at `hour:minute`.
    pub fn weekly(day: DayCode, hour: u32, minute: u32) -> Self {
        Self {
            frequency: Frequency::Weekly,
            by_day: Some(day),
            hour,
            minute,
            interval: 1,
        }
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frequency {
            Frequency::Daily => f.write_str("FREQ=DAILY;")?,
            Frequency::Weekly => f.write_str("FREQ=WEEKLY;")?,
        }
        if let Some(day) = self.by_day {
            write!(f, "BYDAY={};", day.rrule_code())?;
        }
        write!(
            f,
            "BYHOUR={};BYMINUTE={};BYSECOND=0;INTERVAL={}",
            self.hour, self.minute, self.interval
        )
    }
}

/// One weekly rule per day in `days`, or a single daily rule when empty.
pub fn recurrence_rules(hour: u32, minute: u32, days: &[DayCode]) -> Vec<RecurrenceRule> {
    if days.is_empty() {
        return vec![RecurrenceRule::daily(hour, minute)];
    }
    days.iter()
        .map(|day| RecurrenceRule::weekly(*day, hour, minute))
        .collect()
}

/// RRULE strings for one time of day, e.g.
/// `FREQ=WEEKLY;BYDAY=MO;BYHOUR=8;BYMINUTE=0;BYSECOND=0;INTERVAL=1`.
pub fn build_recurrence_rules(hour: u32, minute: u32, days: &[DayCode]) -> Vec<String> {
    recurrence_rules(hour, minute, days)
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Rules for every time in `times`, skipping duplicates.
pub fn rules_for_times(times: &[NaiveTime], days: &[DayCode]) -> Vec<String> {
    let mut rules: Vec<String> = Vec::new();
    for time in times {
        for rule in build_recurrence_rules(time.hour(), time.minute(), days) {
            if !rules.contains(&rule) {
                rules.push(rule);
            }
        }
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_days_yields_one_daily_rule() {
        let rules = build_recurrence_rules(8, 5, &[]);
        assert_eq!(
            rules,
            vec!["FREQ=DAILY;BYHOUR=8;BYMINUTE=5;BYSECOND=0;INTERVAL=1"]
        );
    }

    #[test]
    fn each_day_yields_a_weekly_rule() {
        let rules = recurrence_rules(20, 0, &[DayCode::Mon, DayCode::Wed]);
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(|rule| rule.frequency == Frequency::Weekly));
        assert_eq!(
            rules[1].to_string(),
            "FREQ=WEEKLY;BYDAY=WE;BYHOUR=20;BYMINUTE=0;BYSECOND=0;INTERVAL=1"
        );
    }

    #[test]
    fn repeated_times_collapse() {
        let eight = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let rules = rules_for_times(&[eight, eight], &[DayCode::Fri]);
        assert_eq!(rules.len(), 1);
    }
}
