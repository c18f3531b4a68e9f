#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("unsupported file format: {0:?}")]
    UnsupportedFormat(String),

    #[error("failed to read workbook: {0}")]
    Workbook(String),

    #[error("no usable rows in workbook")]
    Empty,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
