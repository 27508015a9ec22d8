//! Recurring job manager.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use cadence_store::{JobKey, JobPayload, MemoryStore, RecurringJobRecord};

use crate::{ManagerError, Recurrence};

/// Owns the live set of registered recurring jobs.
#[async_trait]
pub trait RecurringJobManager: Send + Sync {
    /// Register `job` under `key`, replacing any existing registration.
    ///
    /// Calling this repeatedly with the same arguments leaves exactly one
    /// registration for `key`.
    async fn add_or_update(
        &self,
        key: &JobKey,
        job: &JobPayload,
        recurrence: Option<&str>,
    ) -> Result<(), ManagerError>;
}

#[async_trait]
impl<T: RecurringJobManager + ?Sized> RecurringJobManager for Arc<T> {
    async fn add_or_update(
        &self,
        key: &JobKey,
        job: &JobPayload,
        recurrence: Option<&str>,
    ) -> Result<(), ManagerError> {
        (**self).add_or_update(key, job, recurrence).await
    }
}

/// Cron-driven manager that keeps its registrations in a [`MemoryStore`].
pub struct CronJobManager {
    store: MemoryStore,
    write_lock: Mutex<()>,
}

impl CronJobManager {
    /// Create a manager writing to `store`.
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Next fire time of `recurrence` after `after`.
    ///
    /// Returns `Ok(None)` for an absent or blank recurrence.
    pub fn next_fire_after(
        recurrence: Option<&str>,
        after: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, ManagerError> {
        match recurrence {
            Some(expr) if !expr.trim().is_empty() => Ok(Recurrence::parse(expr)?.next_after(after)),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl RecurringJobManager for CronJobManager {
    #[tracing::instrument(skip(self, key, job), fields(key = %key))]
    async fn add_or_update(
        &self,
        key: &JobKey,
        job: &JobPayload,
        recurrence: Option<&str>,
    ) -> Result<(), ManagerError> {
        // Validate before touching the registration
        let next_execution = Self::next_fire_after(recurrence, Utc::now())?;

        let _guard = self.write_lock.lock().await;

        let mut record = match self.store.recurring_job(key).await {
            Some(existing) => existing,
            None => RecurringJobRecord::new(key.clone(), job.clone()),
        };
        record.job = job.clone();
        record.recurrence = recurrence.map(str::to_string);
        record.next_execution = next_execution;

        match record.next_execution {
            Some(next) => debug!(
                key = %key,
                recurrence = ?record.recurrence,
                next_execution = %next,
                "armed recurring job"
            ),
            None => info!(key = %key, "registered recurring job without a recurrence"),
        }

        self.store.insert_recurring_job(record).await;
        Ok(())
    }
}
