//! Resuming suspended recurring jobs.

use std::sync::Arc;

use cadence_store::{JobStore, ORIGINAL_RECURRENCE_PARAM, StoreError};

use crate::{
    DiagnosticKind, Diagnostics, RecurringJobManager, ResumeDiagnostic, ResumeError,
    ResumeRequest, TracingDiagnostics,
};

/// How a resume request was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// The job was re-registered with the recurrence read from its parameters.
    Resumed { recurrence: Option<String> },
    /// No job exists for the requested key; nothing was changed.
    SkippedNotFound,
}

/// Re-arms suspended recurring jobs with their original recurrence.
///
/// Stateless between calls; one handler can serve concurrent requests.
pub struct ResumeHandler<S, M> {
    store: S,
    manager: M,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<S, M> ResumeHandler<S, M>
where
    S: JobStore,
    M: RecurringJobManager,
{
    /// Create a handler that reports diagnostics through `tracing`.
    pub fn new(store: S, manager: M) -> Self {
        Self {
            store,
            manager,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Replace the diagnostics sink.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Handle one resume request.
    ///
    /// A request for a job that no longer exists is logged and reported as
    /// [`ResumeOutcome::SkippedNotFound`]. Store and manager failures are
    /// returned unchanged so the transport can redeliver.
    #[tracing::instrument(
        skip(self, request),
        fields(schedule_id = %request.schedule_id, schedule_group = %request.schedule_group)
    )]
    pub async fn handle_resume(&self, request: &ResumeRequest) -> Result<ResumeOutcome, ResumeError> {
        let key = request.job_key()?;

        // The connection is dropped at the end of this block, before the
        // manager is called and on every early return.
        let (job, recurrence) = {
            let connection = self.store.connection().await?;

            let record = match connection.find_recurring_job(&key).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    self.diagnostics
                        .warn(&ResumeDiagnostic::new(DiagnosticKind::JobNotFound, request));
                    return Ok(ResumeOutcome::SkippedNotFound);
                }
                Err(e @ StoreError::Inconsistent { .. }) => {
                    self.diagnostics.error(
                        &ResumeDiagnostic::new(DiagnosticKind::StoreInconsistent, request)
                            .with_detail(e.to_string()),
                    );
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            };

            let recurrence = connection
                .job_parameter(&key, ORIGINAL_RECURRENCE_PARAM)
                .await?;

            (record.job, recurrence)
        };

        self.manager
            .add_or_update(&key, &job, recurrence.as_deref())
            .await?;

        self.diagnostics
            .debug(&ResumeDiagnostic::new(DiagnosticKind::Resumed, request));

        Ok(ResumeOutcome::Resumed { recurrence })
    }
}
