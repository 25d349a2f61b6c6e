use reqwest::StatusCode;
use std::path::PathBuf;

// Custom error type for download operations
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(String),

    #[error("Server returned status code {0}")]
    StatusCode(StatusCode),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Empty download: server returned no bytes for {}", .0.display())]
    EmptyDownload(PathBuf),

    #[error("Catalog fetch failed after {attempts} attempts: {reason}")]
    CatalogExhausted { attempts: u32, reason: String },
}

impl DownloadError {
    /// True for failures a later batch run may succeed on (timeouts,
    /// connection resets, 5xx). 4xx and local I/O errors are not transient.
    pub fn is_transient(&self) -> bool {
        match self {
            DownloadError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            DownloadError::StatusCode(code) => code.is_server_error(),
            _ => false,
        }
    }
}
