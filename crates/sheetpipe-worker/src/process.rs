//! Process flow: claim pending rows, reject duplicates, dispatch to the
//! type-matched processor, persist the result.
//!
//! Duplicates are recorded as errors with message "duplicate", never
//! silently dropped or silently accepted. Transform failures are
//! recorded on the row; infrastructure failures (store or cache
//! unreachable) abort the pass after releasing the remaining claims.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use sheetpipe_cache::{content_fingerprint, DuplicateCache};
use sheetpipe_core::models::{ProcessPassSummary, SheetRow};
use sheetpipe_core::store::{RowStore, UploadStore};
use sheetpipe_processors::ProcessorRegistry;

enum ProcessOutcome {
    Processed,
    Duplicate,
    Failed,
    Skipped,
}

pub struct ProcessEngine {
    rows: Arc<dyn RowStore>,
    uploads: Arc<dyn UploadStore>,
    cache: Arc<dyn DuplicateCache>,
    registry: Arc<ProcessorRegistry>,
    batch_size: i64,
    duplicate_ttl: Duration,
}

impl ProcessEngine {
    pub fn new(
        rows: Arc<dyn RowStore>,
        uploads: Arc<dyn UploadStore>,
        cache: Arc<dyn DuplicateCache>,
        registry: Arc<ProcessorRegistry>,
        batch_size: i64,
        duplicate_ttl: Duration,
    ) -> Self {
        Self {
            rows,
            uploads,
            cache,
            registry,
            batch_size,
            duplicate_ttl,
        }
    }

    /// Run one bounded process pass over pending rows.
    #[tracing::instrument(skip(self))]
    pub async fn run_pass(&self) -> Result<ProcessPassSummary> {
        let claimed = self
            .rows
            .claim_pending(self.batch_size)
            .await
            .context("Failed to claim pending rows")?;

        let mut summary = ProcessPassSummary::default();
        // Parent file_type values, memoized for the pass.
        let mut file_types: HashMap<i64, String> = HashMap::new();

        for (idx, row) in claimed.iter().enumerate() {
            match self.process_one(row, &mut file_types).await {
                Ok(ProcessOutcome::Processed) => summary.succeeded += 1,
                Ok(ProcessOutcome::Duplicate) => summary.duplicate += 1,
                Ok(ProcessOutcome::Failed) => summary.failed += 1,
                Ok(ProcessOutcome::Skipped) => summary.skipped += 1,
                Err(err) => {
                    let unfinished: Vec<i64> = claimed[idx..].iter().map(|r| r.id).collect();
                    if let Err(release_err) = self.rows.release_claims(&unfinished).await {
                        tracing::warn!(
                            error = %release_err,
                            count = unfinished.len(),
                            "Failed to release row claims after aborted pass"
                        );
                    }
                    return Err(err.context("Process pass aborted"));
                }
            }
        }

        Ok(summary)
    }

    /// Return rows whose claim outlived `older_than` to pending.
    pub async fn recover_stale(&self, older_than: Duration) -> Result<u64> {
        self.rows
            .release_stale(older_than)
            .await
            .context("Failed to release stale row claims")
    }

    #[tracing::instrument(skip(self, row, file_types), fields(row_id = row.id))]
    async fn process_one(
        &self,
        row: &SheetRow,
        file_types: &mut HashMap<i64, String>,
    ) -> Result<ProcessOutcome> {
        let Some(row_map) = row.row_data.as_object() else {
            return self
                .record_failure(row.id, "row_data is not a JSON object")
                .await;
        };

        // The fingerprint is derived from content only, so identical content
        // from different rows or uploads collides.
        let key = content_fingerprint(&row.row_data);

        let seen = self
            .cache
            .exists(&key)
            .await
            .context("Failed to query duplicate cache")?;

        if seen {
            tracing::info!(row_id = row.id, "Duplicate row content, rejecting");
            return match self.rows.mark_error(row.id, "duplicate").await {
                Ok(true) => Ok(ProcessOutcome::Duplicate),
                Ok(false) => Ok(ProcessOutcome::Skipped),
                Err(err) => Err(anyhow::Error::new(err).context("Failed to record duplicate row")),
            };
        }

        self.cache
            .set(&key, self.duplicate_ttl)
            .await
            .context("Failed to write duplicate cache")?;

        let file_type = match file_types.get(&row.upload_id) {
            Some(file_type) => file_type.clone(),
            None => {
                let upload = self
                    .uploads
                    .get(row.upload_id)
                    .await
                    .context("Failed to fetch parent upload")?;
                let Some(upload) = upload else {
                    // Only reachable when a delete raced the claim; the row
                    // is about to be cascade-deleted with its parent.
                    tracing::warn!(
                        row_id = row.id,
                        upload_id = row.upload_id,
                        "Parent upload gone"
                    );
                    return self.record_failure(row.id, "parent upload missing").await;
                };
                file_types.insert(row.upload_id, upload.file_type.clone());
                upload.file_type
            }
        };

        let processor = self.registry.resolve(&file_type);

        match processor.process_row(row_map) {
            Ok(output) => {
                let output = serde_json::Value::Object(output);
                match self.rows.mark_processed(row.id, &output).await {
                    Ok(true) => Ok(ProcessOutcome::Processed),
                    Ok(false) => Ok(ProcessOutcome::Skipped),
                    Err(err) => {
                        Err(anyhow::Error::new(err).context("Failed to persist processed row"))
                    }
                }
            }
            Err(err) => {
                // The dedup entry written above is kept: the content counts
                // as seen even though this row failed downstream.
                tracing::warn!(
                    row_id = row.id,
                    processor = processor.name(),
                    error = %err,
                    "Row transform failed"
                );
                self.record_failure(row.id, &err.to_string()).await
            }
        }
    }

    async fn record_failure(&self, row_id: i64, message: &str) -> Result<ProcessOutcome> {
        match self.rows.mark_error(row_id, message).await {
            Ok(true) => Ok(ProcessOutcome::Failed),
            Ok(false) => Ok(ProcessOutcome::Skipped),
            Err(err) => Err(anyhow::Error::new(err).context("Failed to record row error")),
        }
    }
}
