//! Polling loops around the engines.
//!
//! Each flow runs bounded passes until a shutdown signal arrives, sleeping
//! through the poll interval when no work was found and backing off after an
//! aborted pass. Shutdown is checked between passes; an in-flight pass runs
//! to completion so its claims are finalized or released, never abandoned.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;

use sheetpipe_core::WorkerConfig;

use crate::import::ImportEngine;
use crate::process::ProcessEngine;

/// Listen for ctrl-c / SIGINT and flip the returned receiver to true.
pub fn spawn_shutdown_listener() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                let _ = tx.send(true);
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for shutdown signal");
            }
        }
        // Keep the sender alive so receivers never observe a closed channel.
        std::future::pending::<()>().await;
    });
    rx
}

pub async fn run_import_flow(engine: ImportEngine, config: &WorkerConfig) -> Result<()> {
    let mut shutdown = spawn_shutdown_listener();
    tracing::info!(
        batch_size = config.import_batch_size,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Import worker started"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        if let Err(err) = engine.recover_stale(config.stale_claim_grace).await {
            tracing::error!(error = %err, "Stale upload claim recovery failed");
        }

        let wait = match engine.run_pass().await {
            Ok(summary) if summary.is_empty() => {
                tracing::debug!("No pending uploads, waiting");
                Some(config.poll_interval)
            }
            Ok(summary) => {
                tracing::info!(
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    skipped = summary.skipped,
                    "Import pass complete"
                );
                None
            }
            Err(err) => {
                tracing::error!(error = %format!("{:#}", err), "Import pass failed");
                Some(config.retry_backoff)
            }
        };

        if let Some(wait) = wait {
            idle(wait, &mut shutdown).await;
        }
    }

    tracing::info!("Import worker stopped");
    Ok(())
}

pub async fn run_process_flow(engine: ProcessEngine, config: &WorkerConfig) -> Result<()> {
    let mut shutdown = spawn_shutdown_listener();
    tracing::info!(
        batch_size = config.process_batch_size,
        poll_interval_secs = config.poll_interval.as_secs(),
        "Process worker started"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        if let Err(err) = engine.recover_stale(config.stale_claim_grace).await {
            tracing::error!(error = %err, "Stale row claim recovery failed");
        }

        let wait = match engine.run_pass().await {
            Ok(summary) if summary.is_empty() => {
                tracing::debug!("No pending rows, waiting");
                Some(config.poll_interval)
            }
            Ok(summary) => {
                tracing::info!(
                    succeeded = summary.succeeded,
                    duplicate = summary.duplicate,
                    failed = summary.failed,
                    skipped = summary.skipped,
                    "Process pass complete"
                );
                None
            }
            Err(err) => {
                tracing::error!(error = %format!("{:#}", err), "Process pass failed");
                Some(config.retry_backoff)
            }
        };

        if let Some(wait) = wait {
            idle(wait, &mut shutdown).await;
        }
    }

    tracing::info!("Process worker stopped");
    Ok(())
}

async fn idle(wait: Duration, shutdown: &mut watch::Receiver<bool>) {
    tokio::select! {
        _ = tokio::time::sleep(wait) => {}
        _ = shutdown.changed() => {}
    }
}
