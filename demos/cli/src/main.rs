use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, NaiveTime, Utc};
use clap::Parser;
use reminder_core::{formatter_for_locale, MealCode, ReminderConfig};
use reminder_fhir::{generate_reminders_value, pending_setup_value, search_occurrences_value};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "reminder-cli",
    about = "Build medication and service reminders from a FHIR JSON bundle."
)]
struct Args {
    /// Path to the JSON bundle.
    #[arg(short, long)]
    input: PathBuf,

    /// JSON file overriding the default configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// IANA timezone of the patient.
    #[arg(long, env = "REMINDER_TIMEZONE")]
    timezone: Option<String>,

    /// Locale of the rendered text.
    #[arg(long, env = "REMINDER_LOCALE")]
    locale: Option<String>,

    /// Reference instant (RFC 3339); defaults to the current time.
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    /// Anchor every recurrence rule at this local time (HH:MM).
    #[arg(long, value_parser = parse_clock)]
    reminder_time: Option<NaiveTime>,

    /// Answer "when is my next occurrence" instead of building reminders.
    #[arg(long)]
    search: bool,

    /// Meal code restricting the occurrence search.
    #[arg(long, default_value = "ALL_DAY")]
    filter: String,
}

fn parse_clock(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|err| err.to_string())
}

fn load_config(args: &Args) -> anyhow::Result<ReminderConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read config {:?}", path))?;
            serde_json::from_str(&data).with_context(|| format!("Invalid config {:?}", path))?
        }
        None => ReminderConfig::default(),
    };
    if let Some(timezone) = &args.timezone {
        config.timezone = timezone.clone();
    }
    if let Some(locale) = &args.locale {
        config.locale = locale.clone();
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Could not read file {:?}", args.input))?;

    let config = load_config(&args)?;
    let now = args.now.unwrap_or_else(Utc::now);
    tracing::info!(timezone = %config.timezone, locale = %config.locale, %now, "loaded bundle");

    let bundle: serde_json::Value =
        serde_json::from_str(&data).context("Bundle is not valid JSON")?;

    let pending = pending_setup_value(&bundle)?;
    for (resource, missing) in &pending {
        tracing::warn!(%resource, ?missing, "resource needs setup before scheduling");
    }

    if args.search {
        let filter: MealCode = args.filter.parse()?;
        let days = search_occurrences_value(&bundle, &config, now, filter)?;
        let today = now.with_timezone(&config.tz()?).date_naive();
        println!("{}", serde_json::to_string_pretty(&days)?);
        println!("{}", formatter_for_locale(&config.locale).occurrences_text(&days, today));
        return Ok(());
    }

    if !pending.is_empty() {
        anyhow::bail!("{} resource(s) still need a start date or time", pending.len());
    }

    let records = generate_reminders_value(&bundle, &config, now, args.reminder_time)?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    tracing::info!(count = records.len(), "reminders generated");

    Ok(())
}
