//! Error types for the job store.

use thiserror::Error;

use crate::JobKey;

/// Errors that can occur when building a job key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Schedule id was empty.
    #[error("schedule id must not be empty")]
    EmptyScheduleId,

    /// Schedule group was empty.
    #[error("schedule group must not be empty (schedule id: {schedule_id})")]
    EmptyScheduleGroup { schedule_id: String },
}

/// Errors that can occur when talking to the job store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not hand out a connection or serve a call.
    #[error("job store unavailable: {0}")]
    Unavailable(String),

    /// More than one record matched a single key.
    #[error("job store inconsistent: {count} recurring jobs match {key}")]
    Inconsistent { key: JobKey, count: usize },

    /// Snapshot file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
