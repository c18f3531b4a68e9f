//! Record store contract
//!
//! These traits define the minimal interface the engines need from the
//! record store, allowing in-memory fakes in tests without a database.
//! Claims are the sole concurrency-control point: `claim_pending` must be
//! atomic with respect to concurrent pass instances, and every finalizing
//! update is conditional on the claim marker still being held.

use async_trait::async_trait;
use std::time::Duration;

use crate::models::{NewRow, SheetRow, Upload};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Lost a race to claim or finalize a work item. Not a failure; the
    /// caller skips the item.
    #[error("work item was claimed or finalized by another pass")]
    Conflict,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Store operations over uploads (`files` table).
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Enqueue a new upload with status pending.
    async fn create(&self, file_path: &str, file_type: &str) -> Result<Upload, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<Upload>, StoreError>;

    /// Atomically claim up to `limit` pending uploads (pending -> importing),
    /// ordered by id ascending.
    async fn claim_pending(&self, limit: i64) -> Result<Vec<Upload>, StoreError>;

    /// Insert all extracted rows and finalize the upload (importing ->
    /// imported, total_rows = inserted count) in a single transaction.
    /// Any insertion error or count mismatch rolls back every row; partial
    /// imports cannot exist. Returns the inserted count.
    async fn insert_rows_and_finalize(
        &self,
        upload_id: i64,
        rows: &[NewRow],
    ) -> Result<u64, StoreError>;

    /// Record a failure (importing -> error). Returns false when the claim
    /// was no longer held.
    async fn mark_error(&self, id: i64, message: &str) -> Result<bool, StoreError>;

    /// Return claimed-but-unfinalized uploads to pending (importing ->
    /// pending). Used when a pass aborts mid-batch.
    async fn release_claims(&self, ids: &[i64]) -> Result<u64, StoreError>;

    /// Return uploads whose claim outlived `older_than` to pending, so a
    /// crashed pass never leaves permanently-claimed items.
    async fn release_stale(&self, older_than: Duration) -> Result<u64, StoreError>;
}

/// Store operations over extracted rows (`excel_data` table).
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Atomically claim up to `limit` pending rows (pending -> processing),
    /// ordered by id ascending.
    async fn claim_pending(&self, limit: i64) -> Result<Vec<SheetRow>, StoreError>;

    /// Persist the processor output (processing -> processed). Returns false
    /// when the claim was no longer held.
    async fn mark_processed(
        &self,
        id: i64,
        row_data: &serde_json::Value,
    ) -> Result<bool, StoreError>;

    /// Record a failure or duplicate disposition (processing -> error).
    /// Returns false when the claim was no longer held.
    async fn mark_error(&self, id: i64, message: &str) -> Result<bool, StoreError>;

    /// Return claimed-but-unfinalized rows to pending (processing ->
    /// pending). Used when a pass aborts mid-batch.
    async fn release_claims(&self, ids: &[i64]) -> Result<u64, StoreError>;

    /// Return rows whose claim outlived `older_than` to pending.
    async fn release_stale(&self, older_than: Duration) -> Result<u64, StoreError>;
}
