//! # Requests
//!
//! What a source collaborator hands the cache: a URL plus whatever headers
//! the origin requires (referer, cookies, user agent). The cache is
//! agnostic to both beyond passing them to the HTTP layer.

use std::path::PathBuf;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::FetchError;

/// One resource request. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    pub url: String,
    pub headers: HeaderMap,
}

impl RequestSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Replace all headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Add a single header. Invalid names or values are silently skipped.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.headers.insert(name, value);
        }
        self
    }
}

/// Where a request resolves to: the network, or a file already on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    /// An `http`/`https` URL to be fetched and cached.
    Remote(Url),
    /// A `file` URL pointing at a local resource; nothing to download.
    Local(PathBuf),
}

/// Classify a URL by scheme.
///
/// Anything that is not `http`, `https` or `file` is a contract violation
/// by the source collaborator and fails hard.
pub(crate) fn classify(url: &str) -> Result<Target, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(Target::Remote(parsed)),
        "file" => {
            let path = parsed
                .to_file_path()
                .map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
            Ok(Target::Local(path))
        }
        other => Err(FetchError::UnsupportedScheme(other.to_string())),
    }
}
