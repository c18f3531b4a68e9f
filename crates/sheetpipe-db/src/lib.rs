mod row_repo;
mod upload_repo;

pub use row_repo::RowRepository;
pub use upload_repo::UploadRepository;
