//! Source file fetching.
//!
//! An upload's `file_path` may be an HTTP(S) URL or a local filesystem path.
//! URLs are downloaded into a scratch directory under a temp name that keeps
//! the source extension (the parser dispatches on it); the temp file is
//! removed when the [`FetchedFile`] is dropped. Local paths are used in
//! place.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ParseError;

pub struct FileFetcher {
    client: reqwest::Client,
    temp_dir: PathBuf,
}

/// A readable local copy of an upload's source file. Downloaded files are
/// deleted on drop.
pub struct FetchedFile {
    path: PathBuf,
    _temp: Option<tempfile::NamedTempFile>,
}

impl FetchedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileFetcher {
    pub fn new(temp_dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self, anyhow::Error> {
        let temp_dir = temp_dir.into();
        std::fs::create_dir_all(&temp_dir)?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, temp_dir })
    }

    /// Resolve `source` to a local file, downloading it first when it is a
    /// URL. An unreachable URL or missing local path is a [`ParseError`].
    pub async fn fetch(&self, source: &str) -> Result<FetchedFile, ParseError> {
        if is_url(source) {
            self.download(source).await
        } else {
            let path = PathBuf::from(source);
            if !path.exists() {
                return Err(ParseError::FileNotFound(source.to_string()));
            }
            Ok(FetchedFile { path, _temp: None })
        }
    }

    async fn download(&self, url: &str) -> Result<FetchedFile, ParseError> {
        tracing::debug!(url, "Downloading source file");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ParseError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let bytes = response.bytes().await.map_err(|e| ParseError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut temp = tempfile::Builder::new()
            .suffix(&format!(".{}", url_extension(url)))
            .tempfile_in(&self.temp_dir)?;

        std::io::Write::write_all(temp.as_file_mut(), &bytes)?;

        tracing::debug!(url, bytes = bytes.len(), path = %temp.path().display(), "Source file downloaded");

        Ok(FetchedFile {
            path: temp.path().to_path_buf(),
            _temp: Some(temp),
        })
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Extension of the last URL path segment, query string excluded. Defaults
/// to xlsx when the URL carries none.
fn url_extension(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let last_segment = without_query.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_lowercase(),
        _ => "xlsx".to_string(),
    }
}
