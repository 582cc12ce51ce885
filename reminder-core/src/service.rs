//! Reminder data for `ServiceRequest` occurrences.

use crate::generator::{GenerationContext, ResourceReminders};
use crate::model::{ResourceReminderData, ServiceRequest};
use crate::timing::{resolve_daily_times, resolve_window};
use crate::ReminderResult;

impl ResourceReminders for ServiceRequest {
    /// One record per contained occurrence. The parent window bounds every
    /// occurrence, so it is resolved once.
    fn reminder_data(&self, ctx: &GenerationContext<'_>) -> ReminderResult<Vec<ResourceReminderData>> {
        self.window.ensure_schedulable(&self.id)?;
        let window = resolve_window(&self.window, ctx.timezone, ctx.now)?;

        let mut data = Vec::with_capacity(self.occurrences.len());
        for occurrence in &self.occurrences {
            occurrence.ensure_schedulable(&self.id)?;
            let times = resolve_daily_times(occurrence, ctx.timezone)?;
            let text = ctx.formatter.service_text(&self.action, &times);
            let ssml = ctx.formatter.service_ssml(&self.action, &times);
            data.push(ctx.reminder_data(
                &self.id,
                text,
                ssml,
                times,
                &occurrence.day_of_week,
                window,
            )?);
        }
        Ok(data)
    }
}
