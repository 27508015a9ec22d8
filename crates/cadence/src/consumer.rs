//! Line-delimited JSON consumer for resume requests.

use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use cadence_scheduler::{
    RESUME_MESSAGE_KIND, RecurringJobManager, ResumeHandler, ResumeOutcome, ResumeRequest,
};
use cadence_store::JobStore;

/// One inbound line, either a bare request or a typed envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InboundMessage {
    Envelope {
        #[serde(rename = "messageType")]
        message_type: String,
        message: serde_json::Value,
    },
    Bare(ResumeRequest),
}

/// Consumer settings.
#[derive(Debug, Clone, Default)]
pub struct ConsumeOptions {
    /// Upper bound on handling a single message.
    pub timeout: Option<Duration>,
    /// Stop after the first failed message.
    pub fail_fast: bool,
}

/// Counts of how consumed messages were resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeSummary {
    pub resumed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub malformed: usize,
    pub ignored: usize,
}

/// Feed every request read from `reader` to `handler` until EOF or shutdown.
pub async fn consume<R, S, M>(
    reader: R,
    handler: &ResumeHandler<S, M>,
    options: &ConsumeOptions,
    mut shutdown_rx: watch::Receiver<bool>,
) -> ConsumeSummary
where
    R: AsyncBufRead + Unpin,
    S: JobStore,
    M: RecurringJobManager,
{
    let mut summary = ConsumeSummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;
    let mut watching = true;

    info!(message_kind = RESUME_MESSAGE_KIND, "consumer starting");

    loop {
        if *shutdown_rx.borrow() {
            info!("consumer shutting down");
            break;
        }

        let line = tokio::select! {
            changed = shutdown_rx.changed(), if watching => {
                match changed {
                    Ok(()) if *shutdown_rx.borrow() => info!("consumer received shutdown signal"),
                    Ok(()) => {}
                    // Sender gone; keep reading until EOF
                    Err(_) => watching = false,
                }
                continue;
            }
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "failed to read input");
                break;
            }
        };
        line_no += 1;

        if line.trim().is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<InboundMessage>(&line) {
            Ok(InboundMessage::Bare(request)) => request,
            Ok(InboundMessage::Envelope {
                message_type,
                message,
            }) => {
                if message_type != RESUME_MESSAGE_KIND {
                    debug!(line = line_no, message_type = %message_type, "ignoring message");
                    summary.ignored += 1;
                    continue;
                }
                match serde_json::from_value::<ResumeRequest>(message) {
                    Ok(request) => request,
                    Err(e) => {
                        warn!(line = line_no, error = %e, "malformed resume request");
                        summary.malformed += 1;
                        continue;
                    }
                }
            }
            Err(e) => {
                warn!(line = line_no, error = %e, "malformed message");
                summary.malformed += 1;
                continue;
            }
        };

        let result = match options.timeout {
            Some(limit) => tokio::time::timeout(limit, handler.handle_resume(&request))
                .await
                .ok(),
            None => Some(handler.handle_resume(&request).await),
        };

        match result {
            Some(Ok(ResumeOutcome::Resumed { recurrence })) => {
                info!(
                    schedule_id = %request.schedule_id,
                    schedule_group = %request.schedule_group,
                    recurrence = ?recurrence,
                    "resumed recurring job"
                );
                summary.resumed += 1;
            }
            Some(Ok(ResumeOutcome::SkippedNotFound)) => summary.skipped += 1,
            Some(Err(e)) => {
                error!(
                    schedule_id = %request.schedule_id,
                    schedule_group = %request.schedule_group,
                    error = %e,
                    "resume failed"
                );
                summary.failed += 1;
            }
            None => {
                error!(
                    schedule_id = %request.schedule_id,
                    schedule_group = %request.schedule_group,
                    "resume timed out"
                );
                summary.failed += 1;
            }
        }

        if options.fail_fast && summary.failed > 0 {
            warn!("stopping after failed message");
            break;
        }
    }

    info!(
        resumed = summary.resumed,
        skipped = summary.skipped,
        failed = summary.failed,
        malformed = summary.malformed,
        ignored = summary.ignored,
        "consumer finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use cadence_scheduler::{CronJobManager, ManagerError};
    use cadence_store::{
        JobKey, JobPayload, MemoryStore, ORIGINAL_RECURRENCE_PARAM, RecurringJobRecord,
    };
    use serde_json::json;

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        let key = JobKey::new("report-job", "daily").unwrap();
        store
            .insert_recurring_job(RecurringJobRecord::new(
                key.clone(),
                JobPayload::new("queue:reports", "GenerateReport", json!({})),
            ))
            .await;
        store
            .set_job_parameter(&key, ORIGINAL_RECURRENCE_PARAM, "0 6 * * *")
            .await;
        store
    }

    fn no_shutdown() -> watch::Receiver<bool> {
        let (_tx, rx) = watch::channel(false);
        rx
    }

    #[tokio::test]
    async fn test_consume_counts_outcomes() {
        let store = seeded_store().await;
        let handler = ResumeHandler::new(store.clone(), CronJobManager::new(store.clone()));
        let input = concat!(
            r#"{"scheduleId": "report-job", "scheduleGroup": "daily", "timestamp": "2026-03-01T07:00:00Z"}"#,
            "\n",
            r#"{"scheduleId": "gone", "scheduleGroup": "daily", "timestamp": "2026-03-01T07:00:00Z"}"#,
            "\n",
            "\n",
            "not json\n",
            r#"{"messageType": "ResumeScheduledRecurringMessage", "message": {"scheduleId": "report-job", "scheduleGroup": "daily", "timestamp": "2026-03-01T07:00:00Z"}}"#,
            "\n",
            r#"{"messageType": "PauseScheduledRecurringMessage", "message": {}}"#,
            "\n",
            r#"{"scheduleId": "", "scheduleGroup": "daily", "timestamp": "2026-03-01T07:00:00Z"}"#,
            "\n",
        );

        let summary = consume(
            input.as_bytes(),
            &handler,
            &ConsumeOptions::default(),
            no_shutdown(),
        )
        .await;

        assert_eq!(
            summary,
            ConsumeSummary {
                resumed: 2,
                skipped: 1,
                failed: 1,
                malformed: 1,
                ignored: 1,
            }
        );
        assert_eq!(store.recurring_job_count().await, 1);
        assert_eq!(store.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_fail_fast_stops_after_failure() {
        let store = seeded_store().await;
        store.set_available(false);
        let handler = ResumeHandler::new(store.clone(), CronJobManager::new(store.clone()));
        let line = r#"{"scheduleId": "report-job", "scheduleGroup": "daily", "timestamp": "2026-03-01T07:00:00Z"}"#;
        let input = format!("{}\n{}\n", line, line);

        let options = ConsumeOptions {
            timeout: None,
            fail_fast: true,
        };
        let summary = consume(input.as_bytes(), &handler, &options, no_shutdown()).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.resumed, 0);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        struct StalledManager;

        #[async_trait]
        impl RecurringJobManager for StalledManager {
            async fn add_or_update(
                &self,
                _key: &JobKey,
                _job: &JobPayload,
                _recurrence: Option<&str>,
            ) -> Result<(), ManagerError> {
                std::future::pending::<()>().await;
                Ok(())
            }
        }

        let store = seeded_store().await;
        let handler = ResumeHandler::new(store.clone(), Arc::new(StalledManager));
        let input = r#"{"scheduleId": "report-job", "scheduleGroup": "daily", "timestamp": "2026-03-01T07:00:00Z"}"#;

        let options = ConsumeOptions {
            timeout: Some(Duration::from_millis(20)),
            fail_fast: false,
        };
        let summary = consume(input.as_bytes(), &handler, &options, no_shutdown()).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(store.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_before_start_reads_nothing() {
        let store = seeded_store().await;
        let handler = ResumeHandler::new(store.clone(), CronJobManager::new(store.clone()));
        let (tx, rx) = watch::channel(true);
        let input = r#"{"scheduleId": "report-job", "scheduleGroup": "daily", "timestamp": "2026-03-01T07:00:00Z"}"#;

        let summary = consume(input.as_bytes(), &handler, &ConsumeOptions::default(), rx).await;
        drop(tx);

        assert_eq!(summary, ConsumeSummary::default());
        assert_eq!(store.connections_opened(), 0);
    }
}
