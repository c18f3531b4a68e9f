use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Lifecycle of an upload. `Importing` is the claim marker held by an import
/// pass; externally meaningful transitions are `Pending` -> `Imported` or
/// `Pending` -> `Error`, at most once, never reverted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "upload_status", rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Importing,
    Imported,
    Error,
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStatus::Pending => write!(f, "pending"),
            UploadStatus::Importing => write!(f, "importing"),
            UploadStatus::Imported => write!(f, "imported"),
            UploadStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for UploadStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UploadStatus::Pending),
            "importing" => Ok(UploadStatus::Importing),
            "imported" => Ok(UploadStatus::Imported),
            "error" => Ok(UploadStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid upload status: {}", s)),
        }
    }
}

/// One tracked source file and its import lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Upload {
    pub id: i64,
    /// URL or filesystem path; immutable after creation.
    pub file_path: String,
    /// Dispatch discriminator consumed by the process flow. The import flow
    /// carries it but never interprets it.
    pub file_type: String,
    pub status: UploadStatus,
    pub total_rows: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Upload {
    pub fn is_claimed(&self) -> bool {
        self.status == UploadStatus::Importing
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, UploadStatus::Imported | UploadStatus::Error)
    }
}
