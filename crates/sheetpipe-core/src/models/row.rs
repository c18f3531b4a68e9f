use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Lifecycle of an extracted row. `Processing` is the claim marker held by a
/// process pass; the row transitions exactly once to `Processed` or `Error`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "row_status", rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Pending,
    Processing,
    Processed,
    Error,
}

impl Display for RowStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RowStatus::Pending => write!(f, "pending"),
            RowStatus::Processing => write!(f, "processing"),
            RowStatus::Processed => write!(f, "processed"),
            RowStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for RowStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RowStatus::Pending),
            "processing" => Ok(RowStatus::Processing),
            "processed" => Ok(RowStatus::Processed),
            "error" => Ok(RowStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid row status: {}", s)),
        }
    }
}

/// One extracted spreadsheet record and its processing lifecycle.
///
/// `row_data` is an ordered header -> value mapping with dynamically typed
/// values (string/number/bool/null); the header set varies per file and
/// sheet, so there is no static schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SheetRow {
    pub id: i64,
    pub upload_id: i64,
    pub sheet_name: String,
    /// 1-based within the sheet, header row excluded.
    pub row_index: i64,
    pub row_data: serde_json::Value,
    pub status: RowStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SheetRow {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RowStatus::Processed | RowStatus::Error)
    }
}

/// A row produced by the parse capability, ready for insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRow {
    pub sheet_name: String,
    pub row_index: i64,
    pub row_data: serde_json::Value,
}
