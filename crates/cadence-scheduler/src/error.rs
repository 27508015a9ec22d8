//! Error types for the scheduler.

use cadence_store::{KeyError, StoreError};
use thiserror::Error;

/// Errors that can occur when registering a recurring job.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Recurrence expression could not be parsed.
    #[error("invalid recurrence expression '{expression}': {reason}")]
    InvalidRecurrence { expression: String, reason: String },

    /// Backing store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Manager refused the registration.
    #[error("registration rejected: {0}")]
    Rejected(String),
}

/// Errors surfaced by the resume handler.
///
/// A missing job is not an error; see [`crate::ResumeOutcome::SkippedNotFound`].
#[derive(Debug, Error)]
pub enum ResumeError {
    /// The request did not carry a usable schedule id/group.
    #[error("invalid resume request: {0}")]
    InvalidRequest(#[from] KeyError),

    /// Job store could not be reached or returned bad data.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Recurring job manager failed to re-register the job.
    #[error("manager error: {0}")]
    Manager(#[from] ManagerError),
}
