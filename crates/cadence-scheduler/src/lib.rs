//! Recurring job management for Cadence.
//!
//! This crate provides:
//! - The recurring job manager contract and a cron-driven implementation
//! - The resume handler, which re-arms suspended jobs with the recurrence
//!   they were originally scheduled with
//! - Resume request messages and the diagnostics sink they are reported to

mod diagnostics;
mod error;
mod manager;
mod recurrence;
mod request;
mod resume;

pub use diagnostics::{DiagnosticKind, Diagnostics, ResumeDiagnostic, TracingDiagnostics};
pub use error::{ManagerError, ResumeError};
pub use manager::{CronJobManager, RecurringJobManager};
pub use recurrence::Recurrence;
pub use request::{RESUME_MESSAGE_KIND, ResumeRequest};
pub use resume::{ResumeHandler, ResumeOutcome};
