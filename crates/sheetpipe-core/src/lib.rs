pub mod config;
pub mod models;
pub mod store;

pub use config::WorkerConfig;
pub use models::{
    ImportPassSummary, NewRow, ProcessPassSummary, RowStatus, SheetRow, Upload, UploadStatus,
};
pub use store::{RowStore, StoreError, UploadStore};
