//! Diagnostics emitted while resuming jobs.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::ResumeRequest;

/// What a diagnostic event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// No recurring job exists for the requested key.
    JobNotFound,
    /// The job was re-registered with the manager.
    Resumed,
    /// The store returned more than one record for the key.
    StoreInconsistent,
}

/// A single diagnostic event about one resume request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeDiagnostic {
    pub kind: DiagnosticKind,
    pub schedule_id: String,
    pub schedule_group: String,
    pub timestamp: DateTime<Utc>,
    pub detail: Option<String>,
}

impl ResumeDiagnostic {
    pub fn new(kind: DiagnosticKind, request: &ResumeRequest) -> Self {
        Self {
            kind,
            schedule_id: request.schedule_id.clone(),
            schedule_group: request.schedule_group.clone(),
            timestamp: request.timestamp,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for ResumeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            DiagnosticKind::JobNotFound => "job not found, resume request",
            DiagnosticKind::Resumed => "resumed",
            DiagnosticKind::StoreInconsistent => "store inconsistent, resume request",
        };
        write!(
            f,
            "{}: {}/{} at {}",
            prefix,
            self.schedule_id,
            self.schedule_group,
            self.timestamp.to_rfc3339()
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Sink for resume diagnostics.
pub trait Diagnostics: Send + Sync {
    fn warn(&self, event: &ResumeDiagnostic);
    fn debug(&self, event: &ResumeDiagnostic);
    fn error(&self, event: &ResumeDiagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn warn(&self, event: &ResumeDiagnostic) {
        warn!(
            schedule_id = %event.schedule_id,
            schedule_group = %event.schedule_group,
            timestamp = %event.timestamp,
            detail = ?event.detail,
            "{}", event
        );
    }

    fn debug(&self, event: &ResumeDiagnostic) {
        debug!(
            schedule_id = %event.schedule_id,
            schedule_group = %event.schedule_group,
            timestamp = %event.timestamp,
            "{}", event
        );
    }

    fn error(&self, event: &ResumeDiagnostic) {
        error!(
            schedule_id = %event.schedule_id,
            schedule_group = %event.schedule_group,
            timestamp = %event.timestamp,
            detail = ?event.detail,
            "{}", event
        );
    }
}
