//! Delivery-ready reminder records and the sink they are handed to.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::model::ResourceReminderData;

const LOCAL_INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Payload accepted by the reminder delivery API. Instants are local wall
/// times without offset; the timezone travels alongside.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReminderRecord {
    pub resource_id: String,
    pub recurrence_rules: Vec<String>,
    pub start: String,
    pub end: String,
    pub timezone: String,
    pub text: String,
    pub ssml: String,
    pub locale: String,
}

impl ReminderRecord {
    /// Render `data` with its instants as wall times in `tz`.
    pub fn from_data(data: &ResourceReminderData, tz: Tz) -> Self {
        Self {
            resource_id: data.resource_id.clone(),
            recurrence_rules: data.recurrence_rules.clone(),
            start: local_instant(data.start, tz),
            end: local_instant(data.end, tz),
            timezone: tz.name().to_string(),
            text: data.text.clone(),
            ssml: data.ssml.clone(),
            locale: data.locale.clone(),
        }
    }
}

fn local_instant(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .naive_local()
        .format(LOCAL_INSTANT_FORMAT)
        .to_string()
}

/// Failure reported by a `ReminderSink`.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("reminder rejected: {0}")]
    Rejected(String),
    #[error("delivery failed: {0}")]
    Transport(String),
}

/// Reminder delivery transport. Returns the id the transport assigned.
pub trait ReminderSink {
    fn deliver(&mut self, record: &ReminderRecord) -> Result<String, SinkError>;
}

/// Outcome of `deliver_all`.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// Ids returned by the sink, in record order.
    pub delivered: Vec<String>,
    /// Index of the failed record and the error it raised.
    pub failed: Vec<(usize, SinkError)>,
}

impl DeliveryReport {
    /// True when every record was delivered.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Hand every record to `sink`. A failed delivery is logged and recorded but
/// never stops the remaining records.
pub fn deliver_all<S: ReminderSink + ?Sized>(sink: &mut S, records: &[ReminderRecord]) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for (index, record) in records.iter().enumerate() {
        match sink.deliver(record) {
            Ok(id) => {
                tracing::debug!(resource = %record.resource_id, id = %id, "reminder delivered");
                report.delivered.push(id);
            }
            Err(err) => {
                tracing::warn!(resource = %record.resource_id, error = %err, "reminder delivery failed");
                report.failed.push((index, err));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FlakySink {
        calls: usize,
    }

    impl ReminderSink for FlakySink {
        fn deliver(&mut self, record: &ReminderRecord) -> Result<String, SinkError> {
            self.calls += 1;
            if record.text.is_empty() {
                Err(SinkError::Rejected("empty text".to_string()))
            } else {
                Ok(format!("alert-{}", self.calls))
            }
        }
    }

    fn record(text: &str) -> ReminderRecord {
        ReminderRecord {
            resource_id: "med-1".to_string(),
            recurrence_rules: vec!["FREQ=DAILY;BYHOUR=8;BYMINUTE=0;BYSECOND=0;INTERVAL=1".to_string()],
            start: "2024-05-06T00:00:00.000".to_string(),
            end: "2024-05-16T23:59:59.999".to_string(),
            timezone: "America/Bogota".to_string(),
            text: text.to_string(),
            ssml: format!("<speak>{text}</speak>"),
            locale: "en-US".to_string(),
        }
    }

    #[test]
    fn one_failure_does_not_block_the_rest() {
        let mut sink = FlakySink { calls: 0 };
        let records = vec![record("first"), record(""), record("third")];

        let report = deliver_all(&mut sink, &records);

        assert_eq!(sink.calls, 3);
        assert_eq!(report.delivered, vec!["alert-1", "alert-3"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, 1);
        assert!(!report.is_complete());
    }

    #[test]
    fn instants_render_in_local_time_without_offset() {
        let instant = Utc.with_ymd_and_hms(2024, 5, 6, 13, 30, 0).unwrap();
        assert_eq!(
            local_instant(instant, chrono_tz::America::Bogota),
            "2024-05-06T08:30:00.000"
        );
    }
}
