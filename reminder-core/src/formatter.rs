//! Localized rendering of reminder text and occurrence answers.

use chrono::{NaiveDate, NaiveTime};

use crate::codes::{DayCode, MealCode};
use crate::model::{DailySlot, OccurrencesPerDay};

/// Locale-specific wording injected into the generator.
pub trait ReminderFormatter {
    fn meal_code_text(&self, code: MealCode) -> String;

    fn clock_text(&self, time: NaiveTime) -> String;

    fn weekday_text(&self, day: DayCode) -> String;

    /// "today", "tomorrow" or a weekday phrase for `date`.
    fn day_text(&self, date: NaiveDate, today: NaiveDate) -> String;

    fn join(&self, items: &[String]) -> String;

    fn medication_text(&self, value: &str, unit: &str, name: &str, times: &[DailySlot]) -> String;

    fn service_text(&self, action: &str, times: &[DailySlot]) -> String;

    fn no_occurrences_text(&self) -> String;

    fn slot_text(&self, slot: &DailySlot) -> String {
        match slot {
            DailySlot::Meal(code) => self.meal_code_text(*code),
            DailySlot::Clock(time) => self.clock_text(*time),
        }
    }

    fn times_text(&self, times: &[DailySlot]) -> String {
        let parts: Vec<String> = times.iter().map(|slot| self.slot_text(slot)).collect();
        self.join(&parts)
    }

    fn medication_ssml(&self, value: &str, unit: &str, name: &str, times: &[DailySlot]) -> String {
        speak(&self.medication_text(value, unit, name, times))
    }

    fn service_ssml(&self, action: &str, times: &[DailySlot]) -> String {
        speak(&self.service_text(action, times))
    }

    /// One sentence per day, meal codes in meal order.
    fn occurrences_text(&self, days: &[OccurrencesPerDay], today: NaiveDate) -> String {
        if days.is_empty() {
            return self.no_occurrences_text();
        }
        days.iter()
            .map(|entry| {
                let mut codes = entry.codes.clone();
                codes.sort();
                let parts: Vec<String> = codes
                    .into_iter()
                    .map(|code| self.meal_code_text(code))
                    .collect();
                format!(
                    "{}: {}.",
                    capitalize_first(&self.day_text(entry.date, today)),
                    self.join(&parts)
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Wording for `en` locales.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishFormatter;

impl ReminderFormatter for EnglishFormatter {
    fn meal_code_text(&self, code: MealCode) -> String {
        match code {
            MealCode::BeforeBreakfast => "before breakfast",
            MealCode::Breakfast => "with breakfast",
            MealCode::AfterBreakfast => "after breakfast",
            MealCode::Morning => "in the morning",
            MealCode::BeforeLunch => "before lunch",
            MealCode::Lunch => "with lunch",
            MealCode::AfterLunch => "after lunch",
            MealCode::Afternoon => "in the afternoon",
            MealCode::BeforeDinner => "before dinner",
            MealCode::Dinner => "with dinner",
            MealCode::AfterDinner => "after dinner",
            MealCode::Evening => "in the evening",
            MealCode::BeforeMeals => "before meals",
            MealCode::WithMeals => "with meals",
            MealCode::AfterMeals => "after meals",
            MealCode::Night => "at night",
            MealCode::Exact => "at the exact time",
            MealCode::AllDay => "during the day",
        }
        .to_string()
    }

    fn clock_text(&self, time: NaiveTime) -> String {
        format!("at {}", time.format("%H:%M"))
    }

    fn weekday_text(&self, day: DayCode) -> String {
        match day {
            DayCode::Mon => "Monday",
            DayCode::Tue => "Tuesday",
            DayCode::Wed => "Wednesday",
            DayCode::Thu => "Thursday",
            DayCode::Fri => "Friday",
            DayCode::Sat => "Saturday",
            DayCode::Sun => "Sunday",
        }
        .to_string()
    }

    fn day_text(&self, date: NaiveDate, today: NaiveDate) -> String {
        match (date - today).num_days() {
            0 => "today".to_string(),
            1 => "tomorrow".to_string(),
            _ => format!("on {}", self.weekday_text(weekday_of(date))),
        }
    }

    fn join(&self, items: &[String]) -> String {
        join_list(items, "and")
    }

    fn medication_text(&self, value: &str, unit: &str, name: &str, times: &[DailySlot]) -> String {
        let dose = format!("{value} {unit}");
        let dose = dose.trim();
        if dose.is_empty() {
            format!("Take {name} {}.", self.times_text(times))
        } else {
            format!("Take {dose} of {name} {}.", self.times_text(times))
        }
    }

    fn service_text(&self, action: &str, times: &[DailySlot]) -> String {
        sentence(&capitalize_first(action), &self.times_text(times))
    }

    fn no_occurrences_text(&self) -> String {
        "There is nothing scheduled for the next few days.".to_string()
    }
}

/// Wording for `es` locales.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanishFormatter;

impl ReminderFormatter for SpanishFormatter {
    fn meal_code_text(&self, code: MealCode) -> String {
        match code {
            MealCode::BeforeBreakfast => "antes del desayuno",
            MealCode::Breakfast => "con el desayuno",
            MealCode::AfterBreakfast => "después del desayuno",
            MealCode::Morning => "en la mañana",
            MealCode::BeforeLunch => "antes del almuerzo",
            MealCode::Lunch => "con el almuerzo",
            MealCode::AfterLunch => "después del almuerzo",
            MealCode::Afternoon => "en la tarde",
            MealCode::BeforeDinner => "antes de la cena",
            MealCode::Dinner => "con la cena",
            MealCode::AfterDinner => "después de la cena",
            MealCode::Evening => "al anochecer",
            MealCode::BeforeMeals => "antes de las comidas",
            MealCode::WithMeals => "con las comidas",
            MealCode::AfterMeals => "después de las comidas",
            MealCode::Night => "en la noche",
            MealCode::Exact => "a la hora exacta",
            MealCode::AllDay => "durante el día",
        }
        .to_string()
    }

    fn clock_text(&self, time: NaiveTime) -> String {
        format!("a las {}", time.format("%H:%M"))
    }

    fn weekday_text(&self, day: DayCode) -> String {
        match day {
            DayCode::Mon => "lunes",
            DayCode::Tue => "martes",
            DayCode::Wed => "miércoles",
            DayCode::Thu => "jueves",
            DayCode::Fri => "viernes",
            DayCode::Sat => "sábado",
            DayCode::Sun => "domingo",
        }
        .to_string()
    }

    fn day_text(&self, date: NaiveDate, today: NaiveDate) -> String {
        match (date - today).num_days() {
            0 => "hoy".to_string(),
            1 => "mañana".to_string(),
            _ => format!("el {}", self.weekday_text(weekday_of(date))),
        }
    }

    fn join(&self, items: &[String]) -> String {
        join_list(items, "y")
    }

    fn medication_text(&self, value: &str, unit: &str, name: &str, times: &[DailySlot]) -> String {
        let dose = format!("{value} {unit}");
        let dose = dose.trim();
        if dose.is_empty() {
            format!("Toma {name} {}.", self.times_text(times))
        } else {
            format!("Toma {dose} de {name} {}.", self.times_text(times))
        }
    }

    fn service_text(&self, action: &str, times: &[DailySlot]) -> String {
        sentence(&capitalize_first(action), &self.times_text(times))
    }

    fn no_occurrences_text(&self) -> String {
        "No hay nada programado para los próximos días.".to_string()
    }
}

/// Formatter for a locale tag; English when the language is not supported.
pub fn formatter_for_locale(locale: &str) -> Box<dyn ReminderFormatter> {
    let language = locale
        .split(|c: char| c == '-' || c == '_')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match language.as_str() {
        "es" => Box::new(SpanishFormatter),
        _ => Box::new(EnglishFormatter),
    }
}

/// Render a dose amount without trailing zeros.
pub fn format_dose_value(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else if (value * 10.0).fract().abs() < f64::EPSILON {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// "a", "a and b", "a, b and c".
pub fn join_list(items: &[String], conjunction: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} {conjunction} {last}", head.join(", ")),
    }
}

fn sentence(subject: &str, times: &str) -> String {
    if times.is_empty() {
        format!("{subject}.")
    } else {
        format!("{subject} {times}.")
    }
}

fn weekday_of(date: NaiveDate) -> DayCode {
    DayCode::from(chrono::Datelike::weekday(&date))
}

fn speak(text: &str) -> String {
    format!("<speak>{}</speak>", escape_xml(text))
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn capitalize_first(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn medication_text_lists_times_in_order() {
        let times = [
            DailySlot::Meal(MealCode::BeforeBreakfast),
            DailySlot::Meal(MealCode::AfterLunch),
            DailySlot::Meal(MealCode::Night),
        ];
        assert_eq!(
            EnglishFormatter.medication_text("1", "tablet", "Losartan", &times),
            "Take 1 tablet of Losartan before breakfast, after lunch and at night."
        );
        assert_eq!(
            SpanishFormatter.medication_text("1", "tableta", "Losartán", &times[..2]),
            "Toma 1 tableta de Losartán antes del desayuno y después del almuerzo."
        );
    }

    #[test]
    fn medication_text_without_dose() {
        let eight = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert_eq!(
            EnglishFormatter.medication_text("", "", "Vitamin D", &[DailySlot::Clock(eight)]),
            "Take Vitamin D at 08:00."
        );
    }

    #[test]
    fn ssml_is_escaped() {
        let ssml = EnglishFormatter.service_ssml("check <glucose> & log", &[]);
        assert_eq!(ssml, "<speak>Check &lt;glucose&gt; &amp; log.</speak>");
    }

    #[test]
    fn occurrences_use_relative_days() {
        // 2024-03-04 is a Monday.
        let days = vec![
            OccurrencesPerDay {
                date: date(4),
                day: DayCode::Mon,
                codes: vec![MealCode::AfterDinner, MealCode::BeforeBreakfast],
            },
            OccurrencesPerDay {
                date: date(5),
                day: DayCode::Tue,
                codes: vec![MealCode::Lunch],
            },
        ];
        assert_eq!(
            EnglishFormatter.occurrences_text(&days, date(4)),
            "Today: before breakfast and after dinner. Tomorrow: with lunch."
        );

        let later = vec![OccurrencesPerDay {
            date: date(7),
            day: DayCode::Thu,
            codes: vec![MealCode::Night, MealCode::Morning],
        }];
        assert_eq!(
            SpanishFormatter.occurrences_text(&later, date(4)),
            "El jueves: en la mañana y en la noche."
        );
    }

    #[test]
    fn empty_occurrences_use_fallback_sentence() {
        assert_eq!(
            SpanishFormatter.occurrences_text(&[], date(4)),
            SpanishFormatter.no_occurrences_text()
        );
    }

    #[test]
    fn locale_selects_language() {
        let formatter = formatter_for_locale("es-CO");
        assert_eq!(formatter.meal_code_text(MealCode::Dinner), "con la cena");
        let fallback = formatter_for_locale("pt-BR");
        assert_eq!(fallback.meal_code_text(MealCode::Dinner), "with dinner");
    }

    #[test]
    fn dose_values_drop_trailing_zeros() {
        assert_eq!(format_dose_value(2.0), "2");
        assert_eq!(format_dose_value(0.5), "0.5");
        assert_eq!(format_dose_value(1.25), "1.25");
    }
}
