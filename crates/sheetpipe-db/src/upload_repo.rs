use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use std::time::Duration;

use sheetpipe_core::models::{NewRow, Upload};
use sheetpipe_core::store::{StoreError, UploadStore};

/// Postgres-backed store for uploads (`files` table).
#[derive(Clone)]
pub struct UploadRepository {
    pool: PgPool,
}

impl UploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadStore for UploadRepository {
    #[tracing::instrument(skip(self))]
    async fn create(&self, file_path: &str, file_type: &str) -> Result<Upload, StoreError> {
        let upload: Upload = sqlx::query_as::<Postgres, Upload>(
            r#"
            INSERT INTO files (file_path, file_type, status)
            VALUES ($1, $2, 'pending')
            RETURNING id, file_path, file_type, status, total_rows, error_message,
                      created_at, updated_at
            "#,
        )
        .bind(file_path)
        .bind(file_type)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert upload")?;

        tracing::info!(
            upload_id = upload.id,
            file_type = %upload.file_type,
            "Upload enqueued"
        );

        Ok(upload)
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: i64) -> Result<Option<Upload>, StoreError> {
        let upload: Option<Upload> = sqlx::query_as::<Postgres, Upload>(
            r#"
            SELECT id, file_path, file_type, status, total_rows, error_message,
                   created_at, updated_at
            FROM files
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch upload")?;

        Ok(upload)
    }

    /// Claims are taken with `FOR UPDATE SKIP LOCKED` so concurrent pass
    /// instances partition the pending set instead of blocking or
    /// double-claiming.
    #[tracing::instrument(skip(self))]
    async fn claim_pending(&self, limit: i64) -> Result<Vec<Upload>, StoreError> {
        let mut claimed: Vec<Upload> = sqlx::query_as::<Postgres, Upload>(
            r#"
            UPDATE files
            SET status = 'importing',
                updated_at = NOW()
            WHERE id IN (
                SELECT id FROM files
                WHERE status = 'pending'
                ORDER BY id
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, file_path, file_type, status, total_rows, error_message,
                      created_at, updated_at
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to claim pending uploads")?;

        // RETURNING carries no ordering guarantee.
        claimed.sort_by_key(|u| u.id);

        if !claimed.is_empty() {
            tracing::debug!(count = claimed.len(), "Claimed pending uploads");
        }

        Ok(claimed)
    }

    #[tracing::instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn insert_rows_and_finalize(
        &self,
        upload_id: i64,
        rows: &[NewRow],
    ) -> Result<u64, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin import transaction")?;

        let mut inserted: u64 = 0;
        for row in rows {
            let result = sqlx::query(
                r#"
                INSERT INTO excel_data (upload_id, sheet_name, row_index, row_data, status)
                VALUES ($1, $2, $3, $4, 'pending')
                "#,
            )
            .bind(upload_id)
            .bind(&row.sheet_name)
            .bind(row.row_index)
            .bind(&row.row_data)
            .execute(&mut *tx)
            .await
            .context("Failed to insert extracted row")?;

            inserted += result.rows_affected();
        }

        if inserted != rows.len() as u64 {
            tx.rollback()
                .await
                .context("Failed to roll back import transaction")?;
            return Err(StoreError::Backend(anyhow::anyhow!(
                "inserted {} of {} rows for upload {}",
                inserted,
                rows.len(),
                upload_id
            )));
        }

        // Conditional on the claim marker: if another pass finalized this
        // upload the whole transaction is discarded, rows included.
        let finalized = sqlx::query(
            r#"
            UPDATE files
            SET status = 'imported',
                total_rows = $2,
                error_message = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'importing'
            "#,
        )
        .bind(upload_id)
        .bind(inserted as i64)
        .execute(&mut *tx)
        .await
        .context("Failed to finalize upload")?;

        if finalized.rows_affected() == 0 {
            tx.rollback()
                .await
                .context("Failed to roll back import transaction")?;
            return Err(StoreError::Conflict);
        }

        tx.commit()
            .await
            .context("Failed to commit import transaction")?;

        tracing::info!(upload_id, rows = inserted, "Upload imported");

        Ok(inserted)
    }

    #[tracing::instrument(skip(self, message))]
    async fn mark_error(&self, id: i64, message: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE files
            SET status = 'error',
                error_message = $2,
                updated_at = NOW()
            WHERE id = $1 AND status = 'importing'
            "#,
        )
        .bind(id)
        .bind(message)
        .execute(&self.pool)
        .await
        .context("Failed to mark upload error")?;

        let applied = result.rows_affected() > 0;
        if applied {
            tracing::warn!(upload_id = id, error_message = message, "Upload failed");
        }

        Ok(applied)
    }

    #[tracing::instrument(skip(self))]
    async fn release_claims(&self, ids: &[i64]) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE files
            SET status = 'pending',
                updated_at = NOW()
            WHERE id = ANY($1) AND status = 'importing'
            "#,
        )
        .bind(ids)
        .execute(&self.pool)
        .await
        .context("Failed to release upload claims")?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self))]
    async fn release_stale(&self, older_than: Duration) -> Result<u64, StoreError> {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(older_than)
                .context("Stale-claim grace period out of range")?;

        let result = sqlx::query(
            r#"
            UPDATE files
            SET status = 'pending',
                updated_at = NOW()
            WHERE status = 'importing' AND updated_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .context("Failed to release stale upload claims")?;

        let released = result.rows_affected();
        if released > 0 {
            tracing::warn!(released, "Returned stale upload claims to pending");
        }

        Ok(released)
    }
}
