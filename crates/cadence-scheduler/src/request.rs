//! Inbound resume request messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cadence_store::{JobKey, KeyError};

/// Message kind under which resume requests are published.
pub const RESUME_MESSAGE_KIND: &str = "ResumeScheduledRecurringMessage";

/// A request to resume a suspended recurring job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRequest {
    pub schedule_id: String,
    pub schedule_group: String,
    /// When the request was issued. Only used for diagnostics.
    pub timestamp: DateTime<Utc>,
}

impl ResumeRequest {
    /// Create a request stamped with the current time.
    pub fn new(schedule_id: impl Into<String>, schedule_group: impl Into<String>) -> Self {
        Self {
            schedule_id: schedule_id.into(),
            schedule_group: schedule_group.into(),
            timestamp: Utc::now(),
        }
    }

    /// The key of the job this request targets.
    pub fn job_key(&self) -> Result<JobKey, KeyError> {
        JobKey::new(self.schedule_id.clone(), self.schedule_group.clone())
    }
}
