//! Cadence: recurring job resume service
//!
//! Main binary with subcommands:
//! - `resume`: resume a single suspended recurring job
//! - `consume`: resume jobs for every request read from a JSON lines stream

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::Result;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cadence_scheduler::{CronJobManager, ResumeHandler, ResumeOutcome, ResumeRequest};
use cadence_store::MemoryStore;

mod consumer;

use consumer::{ConsumeOptions, consume};

/// Parse boolean from environment variable, accepting common truthy values.
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Accepts "0", "false", "no", "off", "" (case-insensitive) as false.
fn parse_bool_env(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(format!(
            "invalid boolean value '{}', expected 1/true/yes/on or 0/false/no/off",
            s
        )),
    }
}

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Resume suspended recurring jobs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resume a single recurring job
    Resume {
        /// Job store snapshot file (changes are written back)
        #[arg(long, env = "CADENCE_SNAPSHOT")]
        snapshot: Option<PathBuf>,

        /// Schedule id of the job to resume
        #[arg(long)]
        schedule_id: String,

        /// Schedule group of the job to resume
        #[arg(long)]
        schedule_group: String,
    },

    /// Consume newline-delimited JSON resume requests
    Consume {
        /// Job store snapshot file (changes are written back)
        #[arg(long, env = "CADENCE_SNAPSHOT")]
        snapshot: Option<PathBuf>,

        /// Input file (defaults to stdin)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Per-message handling timeout in seconds
        #[arg(long, env = "CADENCE_TIMEOUT_SECS")]
        timeout_secs: Option<u64>,

        /// Stop consuming after the first failed message.
        #[arg(long, env = "CADENCE_FAIL_FAST", value_parser = parse_bool_env, default_value = "false")]
        fail_fast: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "cadence=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resume {
            snapshot,
            schedule_id,
            schedule_group,
        } => run_resume(snapshot.as_deref(), schedule_id, schedule_group).await,

        Commands::Consume {
            snapshot,
            input,
            timeout_secs,
            fail_fast,
        } => {
            let options = ConsumeOptions {
                timeout: timeout_secs.map(Duration::from_secs),
                fail_fast,
            };
            run_consume(snapshot.as_deref(), input.as_deref(), options).await
        }
    }
}

async fn open_store(snapshot: Option<&Path>) -> Result<MemoryStore> {
    match snapshot {
        Some(path) if path.exists() => MemoryStore::load_snapshot(path)
            .await
            .map_err(|e| miette::miette!("failed to load snapshot {}: {}", path.display(), e)),
        Some(path) => {
            info!(path = %path.display(), "snapshot does not exist yet, starting empty");
            Ok(MemoryStore::new())
        }
        None => Ok(MemoryStore::new()),
    }
}

async fn save_store(store: &MemoryStore, snapshot: Option<&Path>) -> Result<()> {
    if let Some(path) = snapshot {
        store
            .save_snapshot(path)
            .await
            .map_err(|e| miette::miette!("failed to save snapshot {}: {}", path.display(), e))?;
    }
    Ok(())
}

async fn run_resume(
    snapshot: Option<&Path>,
    schedule_id: String,
    schedule_group: String,
) -> Result<()> {
    let store = open_store(snapshot).await?;
    let handler = ResumeHandler::new(store.clone(), CronJobManager::new(store.clone()));

    let request = ResumeRequest::new(schedule_id, schedule_group);
    let outcome = handler
        .handle_resume(&request)
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    match outcome {
        ResumeOutcome::Resumed { recurrence } => {
            println!(
                "resumed {}/{} with recurrence {}",
                request.schedule_id,
                request.schedule_group,
                recurrence.as_deref().unwrap_or("<none>")
            );
            save_store(&store, snapshot).await?;
        }
        ResumeOutcome::SkippedNotFound => {
            println!(
                "no recurring job {}/{}, nothing to resume",
                request.schedule_id, request.schedule_group
            );
        }
    }

    Ok(())
}

async fn run_consume(
    snapshot: Option<&Path>,
    input: Option<&Path>,
    options: ConsumeOptions,
) -> Result<()> {
    let store = open_store(snapshot).await?;
    let handler = ResumeHandler::new(store.clone(), CronJobManager::new(store.clone()));

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Handle shutdown signals
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        let _ = shutdown_tx_clone.send(true);
    });

    let summary = match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| miette::miette!("failed to open {}: {}", path.display(), e))?;
            consume(BufReader::new(file), &handler, &options, shutdown_rx).await
        }
        None => consume(BufReader::new(tokio::io::stdin()), &handler, &options, shutdown_rx).await,
    };

    save_store(&store, snapshot).await?;

    println!(
        "resumed: {}, skipped: {}, failed: {}, malformed: {}, ignored: {}",
        summary.resumed, summary.skipped, summary.failed, summary.malformed, summary.ignored
    );

    if options.fail_fast && summary.failed > 0 {
        return Err(miette::miette!("stopped after a failed resume request"));
    }

    Ok(())
}
