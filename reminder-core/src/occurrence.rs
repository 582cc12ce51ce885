//! Forward search for the next days carrying service occurrences.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate};

use crate::codes::{DayCode, MealCode};
use crate::model::{OccurrencesPerDay, ServiceRequest};

/// Days scanned from `today`, inclusive.
const SEARCH_WINDOW_DAYS: u64 = 7;

/// Next days with occurrences, counting every meal code.
pub fn search_occurrences(requests: &[ServiceRequest], today: NaiveDate) -> Vec<OccurrencesPerDay> {
    search_occurrences_for(requests, today, MealCode::AllDay)
}

/// Next days with occurrences matching `filter`.
///
/// Today and tomorrow are answered together when both have occurrences.
/// Otherwise the rest of the week is scanned and the first day with more
/// than one distinct occurrence is returned on its own; single occurrences
/// further out are ignored.
pub fn search_occurrences_for(
    requests: &[ServiceRequest],
    today: NaiveDate,
    filter: MealCode,
) -> Vec<OccurrencesPerDay> {
    let immediate: Vec<OccurrencesPerDay> = (0..2)
        .filter_map(|offset| day_entry(requests, today, offset, filter))
        .filter(|entry| !entry.codes.is_empty())
        .collect();

    if immediate.len() >= 2 {
        return immediate;
    }

    (2..SEARCH_WINDOW_DAYS)
        .filter_map(|offset| day_entry(requests, today, offset, filter))
        .find(|entry| entry.codes.len() > 1)
        .map(|entry| vec![entry])
        .unwrap_or_default()
}

/// Deduplicated meal codes occurring on `date`, in meal order.
pub fn occurrences_on(requests: &[ServiceRequest], date: NaiveDate, filter: MealCode) -> Vec<MealCode> {
    let day = DayCode::from(date.weekday());
    let codes: BTreeSet<MealCode> = requests
        .iter()
        .flat_map(|request| request.occurrences.iter())
        .filter(|occurrence| occurrence.occurs_on(day))
        .flat_map(|occurrence| occurrence.meal_codes().iter().copied())
        .filter(|code| code.is_symbolic() && matches_filter(*code, filter))
        .collect();
    codes.into_iter().collect()
}

fn day_entry(
    requests: &[ServiceRequest],
    today: NaiveDate,
    offset: u64,
    filter: MealCode,
) -> Option<OccurrencesPerDay> {
    let date = today.checked_add_days(Days::new(offset))?;
    Some(OccurrencesPerDay {
        date,
        day: DayCode::from(date.weekday()),
        codes: occurrences_on(requests, date, filter),
    })
}

fn matches_filter(code: MealCode, filter: MealCode) -> bool {
    filter == MealCode::AllDay || code.relation() == filter.relation()
}
