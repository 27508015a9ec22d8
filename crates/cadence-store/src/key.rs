//! Composite job keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::KeyError;

/// Identifies one recurring job by schedule id and schedule group.
///
/// The same key value is used for every store lookup and every manager
/// registration of that job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawJobKey")]
pub struct JobKey {
    schedule_id: String,
    schedule_group: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJobKey {
    schedule_id: String,
    schedule_group: String,
}

impl TryFrom<RawJobKey> for JobKey {
    type Error = KeyError;

    fn try_from(raw: RawJobKey) -> Result<Self, Self::Error> {
        JobKey::new(raw.schedule_id, raw.schedule_group)
    }
}

impl JobKey {
    /// Build a key, rejecting empty components.
    ///
    /// Components are kept exactly as given; whitespace is significant.
    pub fn new(
        schedule_id: impl Into<String>,
        schedule_group: impl Into<String>,
    ) -> Result<Self, KeyError> {
        let schedule_id = schedule_id.into();
        let schedule_group = schedule_group.into();

        if schedule_id.is_empty() {
            return Err(KeyError::EmptyScheduleId);
        }
        if schedule_group.is_empty() {
            return Err(KeyError::EmptyScheduleGroup { schedule_id });
        }

        Ok(Self {
            schedule_id,
            schedule_group,
        })
    }

    pub fn schedule_id(&self) -> &str {
        &self.schedule_id
    }

    pub fn schedule_group(&self) -> &str {
        &self.schedule_group
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.schedule_id, self.schedule_group)
    }
}
