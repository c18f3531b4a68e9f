mod pass;
mod row;
mod upload;

pub use pass::{ImportPassSummary, ProcessPassSummary};
pub use row::{NewRow, RowStatus, SheetRow};
pub use upload::{Upload, UploadStatus};
