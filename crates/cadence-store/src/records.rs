//! Recurring job records and well-known parameter names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JobKey;

/// Job parameter holding the recurrence a job was originally scheduled with.
///
/// Written when a job is created or updated; survives suspension, which may
/// clear or alter the recurrence currently armed in the manager.
pub const ORIGINAL_RECURRENCE_PARAM: &str = "MT-OriginalCron";

/// The message a recurring job delivers each time it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPayload {
    /// Address the message is sent to.
    pub destination: String,
    /// Message type name understood by the consumer at `destination`.
    pub message_type: String,
    /// Serialized message body.
    #[serde(default)]
    pub body: serde_json::Value,
}

impl JobPayload {
    pub fn new(
        destination: impl Into<String>,
        message_type: impl Into<String>,
        body: serde_json::Value,
    ) -> Self {
        Self {
            destination: destination.into(),
            message_type: message_type.into(),
            body,
        }
    }
}

/// A recurring job as persisted in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringJobRecord {
    pub key: JobKey,
    pub job: JobPayload,
    /// Recurrence currently armed. `None` while the job is suspended.
    #[serde(default)]
    pub recurrence: Option<String>,
    #[serde(default)]
    pub next_execution: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_execution: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RecurringJobRecord {
    /// A freshly created record with no armed recurrence.
    pub fn new(key: JobKey, job: JobPayload) -> Self {
        Self {
            key,
            job,
            recurrence: None,
            next_execution: None,
            last_execution: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the manager currently has a next fire time for this job.
    pub fn is_armed(&self) -> bool {
        self.next_execution.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_record_is_unarmed() {
        let key = JobKey::new("report-job", "daily").unwrap();
        let record = RecurringJobRecord::new(
            key.clone(),
            JobPayload::new("queue:reports", "GenerateReport", json!({"format": "pdf"})),
        );

        assert_eq!(record.key, key);
        assert!(record.recurrence.is_none());
        assert!(!record.is_armed());
        assert!(record.last_execution.is_none());
    }

    #[test]
    fn test_record_deserializes_with_defaults() {
        let record: RecurringJobRecord = serde_json::from_value(json!({
            "key": {"scheduleId": "report-job", "scheduleGroup": "daily"},
            "job": {"destination": "queue:reports", "messageType": "GenerateReport"},
            "createdAt": "2026-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(record.key.schedule_id(), "report-job");
        assert_eq!(record.job.body, serde_json::Value::Null);
        assert!(record.recurrence.is_none());
        assert!(record.next_execution.is_none());
    }
}
