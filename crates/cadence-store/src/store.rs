//! Job store collaborator traits.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::{JobKey, RecurringJobRecord, StoreError};

/// A durable store of recurring job definitions and job parameters.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Acquire a scoped connection.
    ///
    /// The connection is released when the returned value is dropped.
    async fn connection(&self) -> Result<Box<dyn StoreConnection>, StoreError>;
}

/// Point-in-time read access to the store.
#[async_trait]
pub trait StoreConnection: Send + Sync {
    /// Fetch the recurring jobs matching any of `keys`.
    ///
    /// Keys without a record are simply absent from the result.
    async fn recurring_jobs(
        &self,
        keys: &BTreeSet<JobKey>,
    ) -> Result<Vec<RecurringJobRecord>, StoreError>;

    /// Read a named string parameter attached to `key`.
    async fn job_parameter(&self, key: &JobKey, name: &str) -> Result<Option<String>, StoreError>;

    /// Look up the single recurring job stored under `key`.
    ///
    /// More than one match means the store is inconsistent and is reported as
    /// an error rather than resolved by picking one.
    async fn find_recurring_job(
        &self,
        key: &JobKey,
    ) -> Result<Option<RecurringJobRecord>, StoreError> {
        let keys = BTreeSet::from([key.clone()]);
        let mut matches: Vec<_> = self
            .recurring_jobs(&keys)
            .await?
            .into_iter()
            .filter(|record| &record.key == key)
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            count => Err(StoreError::Inconsistent {
                key: key.clone(),
                count,
            }),
        }
    }
}

#[async_trait]
impl<T: JobStore + ?Sized> JobStore for std::sync::Arc<T> {
    async fn connection(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        (**self).connection().await
    }
}
