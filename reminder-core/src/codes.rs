//! Symbolic timing codes: meal-relative event codes and weekday codes.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::ReminderError;

/// FHIR event-timing code plus two synthetic values.
///
/// Variant order is the rendering order: breakfast cluster, lunch cluster,
/// dinner cluster, generic meals, night, then the synthetic codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MealCode {
    #[serde(rename = "ACM")]
    BeforeBreakfast,
    #[serde(rename = "CM")]
    Breakfast,
    #[serde(rename = "PCM")]
    AfterBreakfast,
    #[serde(rename = "MORN")]
    Morning,
    #[serde(rename = "ACD")]
    BeforeLunch,
    #[serde(rename = "CD")]
    Lunch,
    #[serde(rename = "PCD")]
    AfterLunch,
    #[serde(rename = "AFT")]
    Afternoon,
    #[serde(rename = "ACV")]
    BeforeDinner,
    #[serde(rename = "CV")]
    Dinner,
    #[serde(rename = "PCV")]
    AfterDinner,
    #[serde(rename = "EVE")]
    Evening,
    #[serde(rename = "AC")]
    BeforeMeals,
    #[serde(rename = "C")]
    WithMeals,
    #[serde(rename = "PC")]
    AfterMeals,
    #[serde(rename = "NIGHT")]
    Night,
    /// A literal clock time rather than a meal slot.
    #[serde(rename = "EXACT")]
    Exact,
    /// Unscoped query covering the whole day.
    #[serde(rename = "ALL_DAY")]
    AllDay,
}

impl MealCode {
    /// Every code, in meal order.
    pub const ALL: [MealCode; 18] = [
        MealCode::BeforeBreakfast,
        MealCode::Breakfast,
        MealCode::AfterBreakfast,
        MealCode::Morning,
        MealCode::BeforeLunch,
        MealCode::Lunch,
        MealCode::AfterLunch,
        MealCode::Afternoon,
        MealCode::BeforeDinner,
        MealCode::Dinner,
        MealCode::AfterDinner,
        MealCode::Evening,
        MealCode::BeforeMeals,
        MealCode::WithMeals,
        MealCode::AfterMeals,
        MealCode::Night,
        MealCode::Exact,
        MealCode::AllDay,
    ];

    /// HL7 `EventTiming` code, e.g. `ACM`.
    pub fn as_code(&self) -> &'static str {
        match self {
            MealCode::BeforeBreakfast => "ACM",
            MealCode::Breakfast => "CM",
            MealCode::AfterBreakfast => "PCM",
            MealCode::Morning => "MORN",
            MealCode::BeforeLunch => "ACD",
            MealCode::Lunch => "CD",
            MealCode::AfterLunch => "PCD",
            MealCode::Afternoon => "AFT",
            MealCode::BeforeDinner => "ACV",
            MealCode::Dinner => "CV",
            MealCode::AfterDinner => "PCV",
            MealCode::Evening => "EVE",
            MealCode::BeforeMeals => "AC",
            MealCode::WithMeals => "C",
            MealCode::AfterMeals => "PC",
            MealCode::Night => "NIGHT",
            MealCode::Exact => "EXACT",
            MealCode::AllDay => "ALL_DAY",
        }
    }

    /// Family representative: "before lunch" and "after lunch" both relate to
    /// "lunch".
    pub fn relation(&self) -> MealCode {
        match self {
            MealCode::BeforeBreakfast
            | MealCode::Breakfast
            | MealCode::AfterBreakfast
            | MealCode::Morning => MealCode::Breakfast,
            MealCode::BeforeLunch | MealCode::Lunch | MealCode::AfterLunch | MealCode::Afternoon => {
                MealCode::Lunch
            }
            MealCode::BeforeDinner
            | MealCode::Dinner
            | MealCode::AfterDinner
            | MealCode::Evening => MealCode::Dinner,
            MealCode::BeforeMeals | MealCode::WithMeals | MealCode::AfterMeals => {
                MealCode::WithMeals
            }
            MealCode::Night => MealCode::Night,
            MealCode::Exact => MealCode::Exact,
            MealCode::AllDay => MealCode::AllDay,
        }
    }

    /// True for real event-timing codes, false for `EXACT` and `ALL_DAY`.
    pub fn is_symbolic(&self) -> bool {
        !matches!(self, MealCode::Exact | MealCode::AllDay)
    }

    /// Nearest related code among `available`: the exact code when present,
    /// otherwise the first code of the same family in meal order.
    pub fn suggest_related(&self, available: &[MealCode]) -> Option<MealCode> {
        if available.contains(self) {
            return Some(*self);
        }
        let mut candidates: Vec<MealCode> = available
            .iter()
            .copied()
            .filter(|code| code.relation() == self.relation())
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    }
}

impl fmt::Display for MealCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for MealCode {
    type Err = ReminderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        MealCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_code().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ReminderError::Parse(format!("unknown timing code {value:?}")))
    }
}

/// FHIR `days-of-week` code.
/// FHIR `days-of-week` code, Monday first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DayCode {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayCode {
    /// Lowercase FHIR code, e.g. `mon`.
    pub fn as_code(&self) -> &'static str {
        match self {
            DayCode::Mon => "mon",
            DayCode::Tue => "tue",
            DayCode::Wed => "wed",
            DayCode::Thu => "thu",
            DayCode::Fri => "fri",
            DayCode::Sat => "sat",
            DayCode::Sun => "sun",
        }
    }

    /// Two-letter weekday used by `BYDAY` in recurrence rules.
    pub fn rrule_code(&self) -> &'static str {
        match self {
            DayCode::Mon => "MO",
            DayCode::Tue => "TU",
            DayCode::Wed => "WE",
            DayCode::Thu => "TH",
            DayCode::Fri => "FR",
            DayCode::Sat => "SA",
            DayCode::Sun => "SU",
        }
    }

    /// The matching chrono weekday.
    pub fn weekday(&self) -> Weekday {
        match self {
            DayCode::Mon => Weekday::Mon,
            DayCode::Tue => Weekday::Tue,
            DayCode::Wed => Weekday::Wed,
            DayCode::Thu => Weekday::Thu,
            DayCode::Fri => Weekday::Fri,
            DayCode::Sat => Weekday::Sat,
            DayCode::Sun => Weekday::Sun,
        }
    }
}

impl From<Weekday> for DayCode {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayCode::Mon,
            Weekday::Tue => DayCode::Tue,
            Weekday::Wed => DayCode::Wed,
            Weekday::Thu => DayCode::Thu,
            Weekday::Fri => DayCode::Fri,
            Weekday::Sat => DayCode::Sat,
            Weekday::Sun => DayCode::Sun,
        }
    }
}

impl fmt::Display for DayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for DayCode {
    type Err = ReminderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mon" => Ok(DayCode::Mon),
            "tue" => Ok(DayCode::Tue),
            "wed" => Ok(DayCode::Wed),
            "thu" => Ok(DayCode::Thu),
            "fri" => Ok(DayCode::Fri),
            "sat" => Ok(DayCode::Sat),
            "sun" => Ok(DayCode::Sun),
            _ => Err(ReminderError::Parse(format!("unknown day of week {value:?}"))),
        }
    }
}
