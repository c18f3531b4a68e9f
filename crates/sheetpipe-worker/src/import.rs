//! Import flow: claim pending uploads, parse their source files, persist the
//! extracted rows.
//!
//! Per-item failures (unreachable or unreadable source, insertion failure)
//! are recorded on the upload and the pass continues. An infrastructure
//! failure aborts the pass after releasing the remaining claims, so a later
//! pass can retry them.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use sheetpipe_core::models::{ImportPassSummary, NewRow, Upload};
use sheetpipe_core::store::{StoreError, UploadStore};
use sheetpipe_parser::{parse_workbook, FileFetcher, ParsedSheet};

enum ImportOutcome {
    Imported,
    Failed,
    Skipped,
}

pub struct ImportEngine {
    uploads: Arc<dyn UploadStore>,
    fetcher: FileFetcher,
    batch_size: i64,
}

impl ImportEngine {
    pub fn new(uploads: Arc<dyn UploadStore>, fetcher: FileFetcher, batch_size: i64) -> Self {
        Self {
            uploads,
            fetcher,
            batch_size,
        }
    }

    /// Run one bounded import pass over pending uploads.
    #[tracing::instrument(skip(self))]
    pub async fn run_pass(&self) -> Result<ImportPassSummary> {
        let claimed = self
            .uploads
            .claim_pending(self.batch_size)
            .await
            .context("Failed to claim pending uploads")?;

        let mut summary = ImportPassSummary::default();

        for (idx, upload) in claimed.iter().enumerate() {
            match self.import_one(upload).await {
                Ok(ImportOutcome::Imported) => summary.succeeded += 1,
                Ok(ImportOutcome::Failed) => summary.failed += 1,
                Ok(ImportOutcome::Skipped) => summary.skipped += 1,
                Err(err) => {
                    let unfinished: Vec<i64> = claimed[idx..].iter().map(|u| u.id).collect();
                    if let Err(release_err) = self.uploads.release_claims(&unfinished).await {
                        tracing::warn!(
                            error = %release_err,
                            count = unfinished.len(),
                            "Failed to release upload claims after aborted pass"
                        );
                    }
                    return Err(err.context("Import pass aborted"));
                }
            }
        }

        Ok(summary)
    }

    /// Return uploads whose claim outlived `older_than` to pending.
    pub async fn recover_stale(&self, older_than: Duration) -> Result<u64> {
        self.uploads
            .release_stale(older_than)
            .await
            .context("Failed to release stale upload claims")
    }

    #[tracing::instrument(skip(self, upload), fields(upload_id = upload.id))]
    async fn import_one(&self, upload: &Upload) -> Result<ImportOutcome> {
        let fetched = match self.fetcher.fetch(&upload.file_path).await {
            Ok(fetched) => fetched,
            Err(err) => return self.record_failure(upload.id, &err.to_string()).await,
        };

        // calamine and csv are synchronous readers.
        let path = fetched.path().to_path_buf();
        let parsed = tokio::task::spawn_blocking(move || parse_workbook(&path))
            .await
            .context("Workbook parser task panicked")?;

        let sheets = match parsed {
            Ok(sheets) => sheets,
            Err(err) => return self.record_failure(upload.id, &err.to_string()).await,
        };

        let rows = flatten_rows(&sheets);

        match self.uploads.insert_rows_and_finalize(upload.id, &rows).await {
            Ok(_) => Ok(ImportOutcome::Imported),
            Err(StoreError::Conflict) => {
                tracing::warn!(upload_id = upload.id, "Lost claim while finalizing upload");
                Ok(ImportOutcome::Skipped)
            }
            Err(StoreError::Backend(err)) => {
                // The transaction rolled back; no rows exist for this upload.
                self.record_failure(upload.id, &format!("row insertion failed: {}", err))
                    .await
            }
        }
    }

    /// Record a per-item failure on the upload. A store failure while
    /// recording aborts the pass instead; nothing can be persisted.
    async fn record_failure(&self, upload_id: i64, message: &str) -> Result<ImportOutcome> {
        match self.uploads.mark_error(upload_id, message).await {
            Ok(true) => Ok(ImportOutcome::Failed),
            Ok(false) => Ok(ImportOutcome::Skipped),
            Err(err) => Err(anyhow::Error::new(err).context("Failed to record upload error")),
        }
    }
}

fn flatten_rows(sheets: &[ParsedSheet]) -> Vec<NewRow> {
    sheets
        .iter()
        .flat_map(|sheet| {
            sheet.rows.iter().map(|row| NewRow {
                sheet_name: sheet.name.clone(),
                row_index: row.row_index,
                row_data: serde_json::Value::Object(row.values.clone()),
            })
        })
        .collect()
}
