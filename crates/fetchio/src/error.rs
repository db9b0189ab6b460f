use reqwest::StatusCode;

// Custom error type for cache and download operations
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Expected URL scheme 'http', 'https' or 'file' but was '{0}'")]
    UnsupportedScheme(String),

    #[error("Server returned status code {0}")]
    StatusCode(StatusCode),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid proxy configuration: {0}")]
    Proxy(String),

    #[error("Download cancelled")]
    Cancelled,
}
