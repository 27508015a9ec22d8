//! In-memory job store.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{JobKey, JobStore, RecurringJobRecord, StoreConnection, StoreError};

/// On-disk snapshot layout.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    #[serde(default)]
    recurring_jobs: Vec<RecurringJobRecord>,
    #[serde(default)]
    parameters: Vec<SnapshotParameter>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotParameter {
    key: JobKey,
    name: String,
    value: String,
}

#[derive(Default)]
struct State {
    jobs: HashMap<JobKey, RecurringJobRecord>,
    parameters: HashMap<JobKey, HashMap<String, String>>,
}

struct Inner {
    state: RwLock<State>,
    available: AtomicBool,
    open: AtomicUsize,
    opened: AtomicUsize,
}

/// A job store held entirely in memory.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State::default()),
                available: AtomicBool::new(true),
                open: AtomicUsize::new(0),
                opened: AtomicUsize::new(0),
            }),
        }
    }

    /// Build a store from a JSON snapshot file.
    pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await?;
        let snapshot: Snapshot = serde_json::from_str(&contents)?;

        let store = Self::new();
        {
            let mut state = store.inner.state.write().await;
            for record in snapshot.recurring_jobs {
                let key = record.key.clone();
                if state.jobs.insert(key.clone(), record).is_some() {
                    warn!(key = %key, "duplicate recurring job in snapshot, keeping the last one");
                }
            }
            for parameter in snapshot.parameters {
                state
                    .parameters
                    .entry(parameter.key)
                    .or_default()
                    .insert(parameter.name, parameter.value);
            }
            info!(
                path = %path.display(),
                jobs = state.jobs.len(),
                "loaded job store snapshot"
            );
        }

        Ok(store)
    }

    /// Write the current contents to a JSON snapshot file.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let snapshot = {
            let state = self.inner.state.read().await;
            let mut recurring_jobs: Vec<_> = state.jobs.values().cloned().collect();
            recurring_jobs.sort_by(|a, b| a.key.cmp(&b.key));

            let mut parameters: Vec<_> = state
                .parameters
                .iter()
                .flat_map(|(key, params)| {
                    params.iter().map(move |(name, value)| SnapshotParameter {
                        key: key.clone(),
                        name: name.clone(),
                        value: value.clone(),
                    })
                })
                .collect();
            parameters.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.name.cmp(&b.name)));

            Snapshot {
                recurring_jobs,
                parameters,
            }
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(path, json).await?;
        debug!(path = %path.display(), "saved job store snapshot");
        Ok(())
    }

    /// Insert or replace a recurring job record.
    pub async fn insert_recurring_job(&self, record: RecurringJobRecord) {
        self.inner
            .state
            .write()
            .await
            .jobs
            .insert(record.key.clone(), record);
    }

    /// Remove a recurring job record and its parameters.
    pub async fn remove_recurring_job(&self, key: &JobKey) -> Option<RecurringJobRecord> {
        let mut state = self.inner.state.write().await;
        state.parameters.remove(key);
        state.jobs.remove(key)
    }

    /// Get a recurring job record by key.
    pub async fn recurring_job(&self, key: &JobKey) -> Option<RecurringJobRecord> {
        self.inner.state.read().await.jobs.get(key).cloned()
    }

    /// Number of recurring job records held.
    pub async fn recurring_job_count(&self) -> usize {
        self.inner.state.read().await.jobs.len()
    }

    /// Attach a named string parameter to a job key.
    pub async fn set_job_parameter(&self, key: &JobKey, name: &str, value: impl Into<String>) {
        self.inner
            .state
            .write()
            .await
            .parameters
            .entry(key.clone())
            .or_default()
            .insert(name.to_string(), value.into());
    }

    /// Read a named string parameter.
    pub async fn job_parameter(&self, key: &JobKey, name: &str) -> Option<String> {
        self.inner
            .state
            .read()
            .await
            .parameters
            .get(key)
            .and_then(|params| params.get(name))
            .cloned()
    }

    /// Make connection attempts fail (`false`) or succeed again (`true`).
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Connections currently held open.
    pub fn open_connections(&self) -> usize {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Connections handed out since the store was created.
    pub fn connections_opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn connection(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        if !self.inner.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store is marked unavailable".to_string(),
            ));
        }

        self.inner.open.fetch_add(1, Ordering::SeqCst);
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryConnection {
            inner: Arc::clone(&self.inner),
        }))
    }
}

/// A scoped connection to a [`MemoryStore`]. Released on drop.
struct MemoryConnection {
    inner: Arc<Inner>,
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.inner.open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn recurring_jobs(
        &self,
        keys: &BTreeSet<JobKey>,
    ) -> Result<Vec<RecurringJobRecord>, StoreError> {
        let state = self.inner.state.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| state.jobs.get(key).cloned())
            .collect())
    }

    async fn job_parameter(&self, key: &JobKey, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .inner
            .state
            .read()
            .await
            .parameters
            .get(key)
            .and_then(|params| params.get(name))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JobPayload, ORIGINAL_RECURRENCE_PARAM};
    use serde_json::json;

    fn key(id: &str) -> JobKey {
        JobKey::new(id, "daily").unwrap()
    }

    fn record(id: &str) -> RecurringJobRecord {
        RecurringJobRecord::new(
            key(id),
            JobPayload::new("queue:reports", "GenerateReport", json!({"id": id})),
        )
    }

    #[tokio::test]
    async fn test_recurring_jobs_returns_only_existing() {
        let store = MemoryStore::new();
        store.insert_recurring_job(record("a")).await;

        let conn = store.connection().await.unwrap();
        let keys = BTreeSet::from([key("a"), key("missing")]);
        let found = conn.recurring_jobs(&keys).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, key("a"));
    }

    #[tokio::test]
    async fn test_recurring_jobs_empty_is_ok() {
        let store = MemoryStore::new();
        let conn = store.connection().await.unwrap();
        let found = conn
            .recurring_jobs(&BTreeSet::from([key("missing")]))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_find_recurring_job() {
        let store = MemoryStore::new();
        store.insert_recurring_job(record("a")).await;

        let conn = store.connection().await.unwrap();
        assert!(conn.find_recurring_job(&key("a")).await.unwrap().is_some());
        assert!(conn.find_recurring_job(&key("b")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_job_parameters_are_per_key() {
        let store = MemoryStore::new();
        store
            .set_job_parameter(&key("a"), ORIGINAL_RECURRENCE_PARAM, "0 6 * * *")
            .await;

        let conn = store.connection().await.unwrap();
        assert_eq!(
            conn.job_parameter(&key("a"), ORIGINAL_RECURRENCE_PARAM)
                .await
                .unwrap()
                .as_deref(),
            Some("0 6 * * *")
        );
        assert_eq!(
            conn.job_parameter(&key("b"), ORIGINAL_RECURRENCE_PARAM)
                .await
                .unwrap(),
            None
        );
        assert_eq!(
            conn.job_parameter(&key("a"), "other").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_connection_released_on_drop() {
        let store = MemoryStore::new();
        {
            let _a = store.connection().await.unwrap();
            let _b = store.connection().await.unwrap();
            assert_eq!(store.open_connections(), 2);
        }
        assert_eq!(store.open_connections(), 0);
        assert_eq!(store.connections_opened(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_store_refuses_connections() {
        let store = MemoryStore::new();
        store.set_available(false);

        let result = store.connection().await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.open_connections(), 0);

        store.set_available(true);
        assert!(store.connection().await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_drops_parameters() {
        let store = MemoryStore::new();
        store.insert_recurring_job(record("a")).await;
        store
            .set_job_parameter(&key("a"), ORIGINAL_RECURRENCE_PARAM, "0 6 * * *")
            .await;

        assert!(store.remove_recurring_job(&key("a")).await.is_some());
        assert!(store.recurring_job(&key("a")).await.is_none());
        assert!(
            store
                .job_parameter(&key("a"), ORIGINAL_RECURRENCE_PARAM)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryStore::new();
        store.insert_recurring_job(record("a")).await;
        store
            .set_job_parameter(&key("a"), ORIGINAL_RECURRENCE_PARAM, "0 6 * * *")
            .await;
        store.save_snapshot(&path).await.unwrap();

        let loaded = MemoryStore::load_snapshot(&path).await.unwrap();
        assert_eq!(loaded.recurring_job_count().await, 1);
        assert_eq!(loaded.recurring_job(&key("a")).await, store.recurring_job(&key("a")).await);
        assert_eq!(
            loaded
                .job_parameter(&key("a"), ORIGINAL_RECURRENCE_PARAM)
                .await
                .as_deref(),
            Some("0 6 * * *")
        );
    }

    #[tokio::test]
    async fn test_load_snapshot_from_handwritten_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(
            &path,
            r#"{
                "recurringJobs": [{
                    "key": {"scheduleId": "report-job", "scheduleGroup": "daily"},
                    "job": {"destination": "queue:reports", "messageType": "GenerateReport"},
                    "createdAt": "2026-01-01T00:00:00Z"
                }],
                "parameters": [{
                    "key": {"scheduleId": "report-job", "scheduleGroup": "daily"},
                    "name": "MT-OriginalCron",
                    "value": "0 6 * * *"
                }]
            }"#,
        )
        .unwrap();

        let store = MemoryStore::load_snapshot(&path).await.unwrap();
        let key = JobKey::new("report-job", "daily").unwrap();
        assert!(store.recurring_job(&key).await.is_some());
        assert_eq!(
            store
                .job_parameter(&key, ORIGINAL_RECURRENCE_PARAM)
                .await
                .as_deref(),
            Some("0 6 * * *")
        );
    }

    #[tokio::test]
    async fn test_load_snapshot_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let result = MemoryStore::load_snapshot(&path).await;
        assert!(matches!(result, Err(StoreError::Json(_))));
    }

    #[tokio::test]
    async fn test_load_snapshot_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = MemoryStore::load_snapshot(dir.path().join("absent.json")).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
    }
}
