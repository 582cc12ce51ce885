//! Framework-neutral WASM <-> JavaScript bridge for the reminder engine.

use chrono::{DateTime, NaiveTime, Utc};
use reminder_core::{
    formatter_for_locale, MealClock, MealCode, OccurrencesPerDay, ReminderConfig, ReminderError,
    SetupField,
};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize, Default)]
struct JsReminderOptions {
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    meal_clock: Option<MealClock>,
    /// RFC 3339 reference instant; the current time when absent.
    #[serde(default)]
    now: Option<String>,
    /// `HH:MM` anchor for every recurrence rule.
    #[serde(default)]
    reminder_time: Option<String>,
    /// Meal code restricting an occurrence search.
    #[serde(default)]
    filter: Option<String>,
}

impl JsReminderOptions {
    fn config(&self) -> ReminderConfig {
        let mut base = ReminderConfig::default();
        if let Some(timezone) = &self.timezone {
            base.timezone = timezone.clone();
        }
        if let Some(locale) = &self.locale {
            base.locale = locale.clone();
        }
        if let Some(meal_clock) = &self.meal_clock {
            base.meal_clock = meal_clock.clone();
        }
        base
    }

    fn now(&self) -> Result<DateTime<Utc>, JsValue> {
        match &self.now {
            Some(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|err| JsValue::from_str(&format!("Could not read now: {err}"))),
            None => Ok(Utc::now()),
        }
    }

    fn reminder_time(&self) -> Result<Option<NaiveTime>, JsValue> {
        self.reminder_time
            .as_deref()
            .map(|text| {
                NaiveTime::parse_from_str(text, "%H:%M")
                    .map_err(|err| JsValue::from_str(&format!("Could not read reminder_time: {err}")))
            })
            .transpose()
    }

    fn filter(&self) -> Result<MealCode, JsValue> {
        match &self.filter {
            Some(code) => code
                .parse::<MealCode>()
                .map_err(|err| JsValue::from_str(&format_reminder_error(err))),
            None => Ok(MealCode::AllDay),
        }
    }
}

#[derive(Serialize)]
struct JsOccurrenceAnswer {
    days: Vec<OccurrencesPerDay>,
    text: String,
}

#[derive(Serialize)]
struct JsPendingSetup {
    resource_id: String,
    missing: Vec<SetupField>,
}

#[wasm_bindgen]
pub fn generate_reminders(
    input_bundle: JsValue,
    options: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let bundle_value = read_bundle(input_bundle)?;
    let opts = read_options(options)?;

    let records = reminder_fhir::generate_reminders_value(
        &bundle_value,
        &opts.config(),
        opts.now()?,
        opts.reminder_time()?,
    )
    .map_err(|err| JsValue::from_str(&format_reminder_error(err)))?;

    to_value(&records)
        .map_err(|err| JsValue::from_str(&format!("Could not serialize reminders: {err}")))
}

#[wasm_bindgen]
pub fn search_occurrences(
    input_bundle: JsValue,
    options: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let bundle_value = read_bundle(input_bundle)?;
    let opts = read_options(options)?;
    let config = opts.config();
    let now = opts.now()?;

    let days = reminder_fhir::search_occurrences_value(&bundle_value, &config, now, opts.filter()?)
        .map_err(|err| JsValue::from_str(&format_reminder_error(err)))?;

    let today = config
        .tz()
        .map(|tz| now.with_timezone(&tz).date_naive())
        .map_err(|err| JsValue::from_str(&format_reminder_error(err)))?;
    let text = formatter_for_locale(&config.locale).occurrences_text(&days, today);

    to_value(&JsOccurrenceAnswer { days, text })
        .map_err(|err| JsValue::from_str(&format!("Could not serialize occurrences: {err}")))
}

#[wasm_bindgen]
pub fn pending_setup(input_bundle: JsValue) -> Result<JsValue, JsValue> {
    let bundle_value = read_bundle(input_bundle)?;

    let pending: Vec<JsPendingSetup> = reminder_fhir::pending_setup_value(&bundle_value)
        .map_err(|err| JsValue::from_str(&format_reminder_error(err)))?
        .into_iter()
        .map(|(resource_id, missing)| JsPendingSetup {
            resource_id,
            missing,
        })
        .collect();

    to_value(&pending)
        .map_err(|err| JsValue::from_str(&format!("Could not serialize pending setup: {err}")))
}

fn read_bundle(input_bundle: JsValue) -> Result<serde_json::Value, JsValue> {
    from_value::<serde_json::Value>(input_bundle)
        .map_err(|err| JsValue::from_str(&format!("Could not read JSON bundle: {err}")))
}

fn read_options(options: Option<JsValue>) -> Result<JsReminderOptions, JsValue> {
    match options {
        Some(js_opts) => from_value(js_opts)
            .map_err(|err| JsValue::from_str(&format!("Could not read options: {err}"))),
        None => Ok(JsReminderOptions::default()),
    }
}

fn format_reminder_error(err: ReminderError) -> String {
    format!("Reminder error: {err}")
}
