//! Downloads confirmed PDFs into the scratch directory so the bundled
//! viewer can open them from a local file.

use std::io::Write;
use std::path::{Path, PathBuf};

use super::fetch::{build_client, ClientSettings, FetchError};
use crate::platform::storage::create_unique_file;

/// Error during a PDF download
#[derive(Debug)]
pub struct DownloadError {
    pub message: String,
}

impl std::fmt::Display for DownloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF download failed: {}", self.message)
    }
}

impl std::error::Error for DownloadError {}

impl From<FetchError> for DownloadError {
    fn from(e: FetchError) -> Self {
        DownloadError { message: e.message }
    }
}

pub struct PdfCache {
    client: reqwest::blocking::Client,
    cache_dir: PathBuf,
}

impl PdfCache {
    pub fn new(cache_dir: impl Into<PathBuf>, settings: &ClientSettings) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(settings)?,
            cache_dir: cache_dir.into(),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Stream `url` into a fresh `temp_<timestamp>.pdf` file.
    ///
    /// A partially written file is removed before the error is returned.
    pub fn download(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(FetchError::from)?;

        let (path, mut file) = std::fs::create_dir_all(&self.cache_dir)
            .and_then(|_| create_unique_file(&self.cache_dir, "temp_", ".pdf"))
            .map_err(|e| DownloadError {
                message: format!("cannot create scratch file: {}", e),
            })?;

        let written = response
            .copy_to(&mut file)
            .map_err(|e| e.to_string())
            .and_then(|n| file.flush().map(|_| n).map_err(|e| e.to_string()));

        match written {
            Ok(bytes) => {
                log::debug!("Cached PDF {} ({} bytes) at {}", url, bytes, path.display());
                Ok(path)
            }
            Err(message) => {
                drop(file);
                if let Err(e) = std::fs::remove_file(&path) {
                    log::warn!("Could not remove partial PDF {}: {}", path.display(), e);
                }
                Err(DownloadError { message })
            }
        }
    }
}
