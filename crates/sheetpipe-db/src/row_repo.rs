use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use std::time::Duration;

use sheetpipe_core::models::SheetRow;
use sheetpipe_core::store::{RowStore, StoreError};

/// Postgres-backed store for extracted rows (`excel_data` table).
#[derive(Clone)]
pub struct RowRepository {
    pool: PgPool,
}

impl RowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RowStore for RowRepository {
    #[tracing::instrument(skip(self))]
    async fn claim_pending(&self, limit: i64) -> Result<Vec<SheetRow>, StoreError> {
        let mut claimed: Vec<SheetRow> = sqlx::query_as::<Postgres, SheetRow>(
            r#"
            UPDATE excel_data
            SET status = 'processing',
                updated_at = NOW()
            WHERE id IN (
                SELECT id FROM excel_data
                WHERE status = 'pending'
                ORDER BY id
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, upload_id, sheet_name, row_index, row_data, status,
                      error_message, created_at, updated_at
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to claim pending rows")?;

        claimed.sort_by_key(|r| r.id);

        if !claimed.is_empty() {
            tracing::debug!(count = claimed.len(), "Claimed pending rows");
        }

        Ok(claimed)
    }

    #[tracing::instrument(skip(self, row_data))]
    async fn mark_processed(
        &self,
        id: i64,
        row_data: &serde_json::Value,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE excel_data
            SET status = 'processed',
                row_data = $2,
                error_message = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(row_data)
        .execute(&self.pool)
        .await
        .context("Failed to mark row processed")?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self, message))]
    async fn mark_error(&self, id: i64, message: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE excel_data
            SET status = 'error',
                error_message = $2,
                updated_at = NOW()
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(id)
        .bind(message)
        .execute(&self.pool)
        .await
        .context("Failed to mark row error")?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn release_claims(&self, ids: &[i64]) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE excel_data
            SET status = 'pending',
                updated_at = NOW()
            WHERE id = ANY($1) AND status = 'processing'
            "#,
        )
        .bind(ids)
        .execute(&self.pool)
        .await
        .context("Failed to release row claims")?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self))]
    async fn release_stale(&self, older_than: Duration) -> Result<u64, StoreError> {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(older_than)
                .context("Stale-claim grace period out of range")?;

        let result = sqlx::query(
            r#"
            UPDATE excel_data
            SET status = 'pending',
                updated_at = NOW()
            WHERE status = 'processing' AND updated_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .context("Failed to release stale row claims")?;

        let released = result.rows_affected();
        if released > 0 {
            tracing::warn!(released, "Returned stale row claims to pending");
        }

        Ok(released)
    }
}
