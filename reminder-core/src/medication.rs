//! Reminder data for `MedicationRequest` dosage instructions.

use crate::formatter::format_dose_value;
use crate::generator::{GenerationContext, ResourceReminders};
use crate::model::{DosageInstruction, MedicationRequest, ResourceReminderData};
use crate::timing::{resolve_daily_times, resolve_window};
use crate::ReminderResult;

impl ResourceReminders for MedicationRequest {
    /// One record per dosage instruction; all daily times of an instruction
    /// share the record.
    fn reminder_data(&self, ctx: &GenerationContext<'_>) -> ReminderResult<Vec<ResourceReminderData>> {
        self.dosage_instructions
            .iter()
            .map(|dosage| self.dosage_reminder(dosage, ctx))
            .collect()
    }
}

impl MedicationRequest {
    fn dosage_reminder(
        &self,
        dosage: &DosageInstruction,
        ctx: &GenerationContext<'_>,
    ) -> ReminderResult<ResourceReminderData> {
        let timing = &dosage.timing;
        timing.ensure_schedulable(&self.id)?;

        let window = resolve_window(&timing.window, ctx.timezone, ctx.now)?;
        let times = resolve_daily_times(timing, ctx.timezone)?;

        let (value, unit) = match &dosage.dose {
            Some(dose) => (format_dose_value(dose.value), dose.unit.clone()),
            None => (String::new(), String::new()),
        };

        let text = ctx
            .formatter
            .medication_text(&value, &unit, &self.medication, &times);
        let ssml = ctx
            .formatter
            .medication_ssml(&value, &unit, &self.medication, &times);

        ctx.reminder_data(&self.id, text, ssml, times, &timing.day_of_week, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{DayCode, MealCode};
    use crate::formatter::SpanishFormatter;
    use crate::model::{Bounds, DailySchedule, Dose, Timing};
    use crate::timing::start_of_day;
    use crate::MealClock;
    use chrono::NaiveDate;
    use chrono_tz::America::Bogota;

    fn timing(codes: Vec<MealCode>, days: Vec<DayCode>) -> Timing {
        let mut timing = Timing::new(DailySchedule::When(codes));
        timing.window.bounds = Some(Bounds::Period {
            start: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        });
        timing.day_of_week = days;
        timing
    }

    #[test]
    fn one_record_per_dosage_instruction() {
        let request = MedicationRequest {
            id: "med-7".to_string(),
            medication: "Losartán".to_string(),
            dosage_instructions: vec![
                DosageInstruction {
                    text: None,
                    dose: Some(Dose {
                        value: 0.5,
                        unit: "tableta".to_string(),
                    }),
                    timing: timing(vec![MealCode::AfterDinner, MealCode::BeforeBreakfast], vec![]),
                },
                DosageInstruction {
                    text: None,
                    dose: None,
                    timing: timing(vec![MealCode::Night], vec![DayCode::Mon, DayCode::Thu]),
                },
            ],
        };
        let clock = MealClock::default();
        let ctx = GenerationContext {
            now: start_of_day(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), Bogota),
            timezone: Bogota,
            locale: "es-CO",
            formatter: &SpanishFormatter,
            meal_clock: &clock,
            reminder_time: None,
        };

        let data = request.reminder_data(&ctx).unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(
            data[0].text,
            "Toma 0.5 tableta de Losartán antes del desayuno y después de la cena."
        );
        assert_eq!(data[0].recurrence_rules.len(), 2);
        assert_eq!(data[1].text, "Toma Losartán en la noche.");
        assert_eq!(
            data[1].recurrence_rules,
            vec![
                "FREQ=WEEKLY;BYDAY=MO;BYHOUR=21;BYMINUTE=0;BYSECOND=0;INTERVAL=1",
                "FREQ=WEEKLY;BYDAY=TH;BYHOUR=21;BYMINUTE=0;BYSECOND=0;INTERVAL=1",
            ]
        );
    }
}
