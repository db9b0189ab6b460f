//! # Builder for CacheConfig
//!
//! This module provides a builder pattern implementation for creating and
//! customizing CacheConfig instances with a fluent API.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use fetchio_engine::CacheConfig;
//!
//! let config = CacheConfig::builder()
//!     .with_cache_dir("/var/cache/fetchio")
//!     .with_size_limit(200 * 1024 * 1024)
//!     .with_download_workers(8)
//!     .with_connect_timeout(Duration::from_secs(15))
//!     .with_header("Referer", "https://example.com/")
//!     .build();
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::CacheConfig;

/// Builder for creating CacheConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct CacheConfigBuilder {
    /// Internal config being built
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
        }
    }

    /// Set the cache directory
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    /// Set the cache size limit in bytes
    pub fn with_size_limit(mut self, limit: u64) -> Self {
        self.config.size_limit = limit;
        self
    }

    /// Set the number of concurrent download workers (minimum 1)
    pub fn with_download_workers(mut self, workers: usize) -> Self {
        self.config.download_workers = workers.max(1);
        self
    }

    /// Set the overall timeout for an entire HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set whether to follow redirects
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Set all HTTP headers, replacing any existing headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.config.headers = headers;
        self
    }

    /// Set the proxy URL
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    /// Build the CacheConfig instance
    pub fn build(self) -> CacheConfig {
        self.config
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_DOWNLOAD_WORKERS, DEFAULT_SIZE_LIMIT};
    use std::time::Duration;

    #[test]
    fn test_builder_defaults() {
        let config = CacheConfigBuilder::new().build();
        assert_eq!(config.size_limit, DEFAULT_SIZE_LIMIT);
        assert_eq!(config.download_workers, DEFAULT_DOWNLOAD_WORKERS);
        assert_eq!(config.timeout, Duration::ZERO);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.follow_redirects);
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_builder_customization() {
        let config = CacheConfigBuilder::new()
            .with_cache_dir("/tmp/images")
            .with_size_limit(1024)
            .with_download_workers(2)
            .with_timeout(Duration::from_secs(60))
            .with_follow_redirects(false)
            .with_user_agent("CustomUserAgent/1.0")
            .with_header("X-Custom-Header", "CustomValue")
            .with_proxy("http://proxy.example.com:8080")
            .build();

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/images"));
        assert_eq!(config.size_limit, 1024);
        assert_eq!(config.download_workers, 2);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(!config.follow_redirects);
        assert_eq!(config.user_agent, "CustomUserAgent/1.0");
        assert_eq!(
            config.proxy.as_deref(),
            Some("http://proxy.example.com:8080")
        );

        // Verify custom header
        let header_value = config.headers.get("X-Custom-Header").unwrap();
        assert_eq!(header_value.to_str().unwrap(), "CustomValue");
    }

    #[test]
    fn test_worker_count_is_never_zero() {
        let config = CacheConfigBuilder::new().with_download_workers(0).build();
        assert_eq!(config.download_workers, 1);
    }
}
