//! In-memory record store for engine tests.
//!
//! Implements both store traits behind a single mutex, so claims are atomic
//! across concurrent passes the same way the SQL claims are, and
//! `insert_rows_and_finalize` is all-or-nothing like the real transaction.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use sheetpipe_core::models::{NewRow, RowStatus, SheetRow, Upload, UploadStatus};
use sheetpipe_core::store::{RowStore, StoreError, UploadStore};

#[derive(Default)]
struct State {
    uploads: BTreeMap<i64, Upload>,
    rows: BTreeMap<i64, SheetRow>,
    next_upload_id: i64,
    next_row_id: i64,
    fail_insert: bool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `insert_rows_and_finalize` fail without persisting
    /// anything, like a rolled-back transaction.
    pub fn fail_next_insert(&self) {
        self.state.lock().unwrap().fail_insert = true;
    }

    pub fn upload(&self, id: i64) -> Option<Upload> {
        self.state.lock().unwrap().uploads.get(&id).cloned()
    }

    pub fn row(&self, id: i64) -> Option<SheetRow> {
        self.state.lock().unwrap().rows.get(&id).cloned()
    }

    pub fn rows_for_upload(&self, upload_id: i64) -> Vec<SheetRow> {
        self.state
            .lock()
            .unwrap()
            .rows
            .values()
            .filter(|r| r.upload_id == upload_id)
            .cloned()
            .collect()
    }

    pub fn all_rows(&self) -> Vec<SheetRow> {
        self.state.lock().unwrap().rows.values().cloned().collect()
    }

    /// Seed a pending row directly, as if an import pass created it.
    pub fn seed_row(&self, upload_id: i64, row_data: serde_json::Value) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_row_id += 1;
        let id = state.next_row_id;
        let now = Utc::now();
        state.rows.insert(
            id,
            SheetRow {
                id,
                upload_id,
                sheet_name: "Sheet1".to_string(),
                row_index: id,
                row_data,
                status: RowStatus::Pending,
                error_message: None,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }
}

#[async_trait]
impl UploadStore for MemoryStore {
    async fn create(&self, file_path: &str, file_type: &str) -> Result<Upload, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.next_upload_id += 1;
        let id = state.next_upload_id;
        let now = Utc::now();
        let upload = Upload {
            id,
            file_path: file_path.to_string(),
            file_type: file_type.to_string(),
            status: UploadStatus::Pending,
            total_rows: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        state.uploads.insert(id, upload.clone());
        Ok(upload)
    }

    async fn get(&self, id: i64) -> Result<Option<Upload>, StoreError> {
        Ok(self.state.lock().unwrap().uploads.get(&id).cloned())
    }

    async fn claim_pending(&self, limit: i64) -> Result<Vec<Upload>, StoreError> {
        let mut state = self.state.lock().unwrap();
        let ids: Vec<i64> = state
            .uploads
            .values()
            .filter(|u| u.status == UploadStatus::Pending)
            .take(limit as usize)
            .map(|u| u.id)
            .collect();

        let now = Utc::now();
        let mut claimed = Vec::new();
        for id in ids {
            let upload = state.uploads.get_mut(&id).unwrap();
            upload.status = UploadStatus::Importing;
            upload.updated_at = now;
            claimed.push(upload.clone());
        }
        Ok(claimed)
    }

    async fn insert_rows_and_finalize(
        &self,
        upload_id: i64,
        rows: &[NewRow],
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock().unwrap();

        if state.fail_insert {
            state.fail_insert = false;
            return Err(StoreError::Backend(anyhow::anyhow!(
                "simulated insertion failure"
            )));
        }

        match state.uploads.get(&upload_id) {
            Some(u) if u.status == UploadStatus::Importing => {}
            _ => return Err(StoreError::Conflict),
        }

        let now = Utc::now();
        for row in rows {
            state.next_row_id += 1;
            let id = state.next_row_id;
            state.rows.insert(
                id,
                SheetRow {
                    id,
                    upload_id,
                    sheet_name: row.sheet_name.clone(),
                    row_index: row.row_index,
                    row_data: row.row_data.clone(),
                    status: RowStatus::Pending,
                    error_message: None,
                    created_at: now,
                    updated_at: now,
                },
            );
        }

        let upload = state.uploads.get_mut(&upload_id).unwrap();
        upload.status = UploadStatus::Imported;
        upload.total_rows = Some(rows.len() as i64);
        upload.error_message = None;
        upload.updated_at = now;

        Ok(rows.len() as u64)
    }

    async fn mark_error(&self, id: i64, message: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        match state.uploads.get_mut(&id) {
            Some(u) if u.status == UploadStatus::Importing => {
                u.status = UploadStatus::Error;
                u.error_message = Some(message.to_string());
                u.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_claims(&self, ids: &[i64]) -> Result<u64, StoreError> {
        let mut state = self.state.lock().unwrap();
        let mut released = 0;
        for id in ids {
            if let Some(u) = state.uploads.get_mut(id) {
                if u.status == UploadStatus::Importing {
                    u.status = UploadStatus::Pending;
                    u.updated_at = Utc::now();
                    released += 1;
                }
            }
        }
        Ok(released)
    }

    async fn release_stale(&self, older_than: Duration) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap();
        let mut state = self.state.lock().unwrap();
        let mut released = 0;
        for u in state.uploads.values_mut() {
            if u.status == UploadStatus::Importing && u.updated_at < cutoff {
                u.status = UploadStatus::Pending;
                released += 1;
            }
        }
        Ok(released)
    }
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn claim_pending(&self, limit: i64) -> Result<Vec<SheetRow>, StoreError> {
        let mut state = self.state.lock().unwrap();
        let ids: Vec<i64> = state
            .rows
            .values()
            .filter(|r| r.status == RowStatus::Pending)
            .take(limit as usize)
            .map(|r| r.id)
            .collect();

        let now = Utc::now();
        let mut claimed = Vec::new();
        for id in ids {
            let row = state.rows.get_mut(&id).unwrap();
            row.status = RowStatus::Processing;
            row.updated_at = now;
            claimed.push(row.clone());
        }
        Ok(claimed)
    }

    async fn mark_processed(
        &self,
        id: i64,
        row_data: &serde_json::Value,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        match state.rows.get_mut(&id) {
            Some(r) if r.status == RowStatus::Processing => {
                r.status = RowStatus::Processed;
                r.row_data = row_data.clone();
                r.error_message = None;
                r.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_error(&self, id: i64, message: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        match state.rows.get_mut(&id) {
            Some(r) if r.status == RowStatus::Processing => {
                r.status = RowStatus::Error;
                r.error_message = Some(message.to_string());
                r.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_claims(&self, ids: &[i64]) -> Result<u64, StoreError> {
        let mut state = self.state.lock().unwrap();
        let mut released = 0;
        for id in ids {
            if let Some(r) = state.rows.get_mut(id) {
                if r.status == RowStatus::Processing {
                    r.status = RowStatus::Pending;
                    r.updated_at = Utc::now();
                    released += 1;
                }
            }
        }
        Ok(released)
    }

    async fn release_stale(&self, older_than: Duration) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - chrono::Duration::from_std(older_than).unwrap();
        let mut state = self.state.lock().unwrap();
        let mut released = 0;
        for r in state.rows.values_mut() {
            if r.status == RowStatus::Processing && r.updated_at < cutoff {
                r.status = RowStatus::Pending;
                released += 1;
            }
        }
        Ok(released)
    }
}
