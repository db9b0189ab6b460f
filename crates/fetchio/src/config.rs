use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Default cache size limit: 100 MiB.
pub const DEFAULT_SIZE_LIMIT: u64 = 100 * 1024 * 1024;

/// Default number of concurrent download workers.
pub const DEFAULT_DOWNLOAD_WORKERS: usize = 4;

/// Configurable options for the resource cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding cached files
    pub cache_dir: PathBuf,

    /// Total cache size above which cleanup starts evicting inactive files
    pub size_limit: u64,

    /// Maximum number of downloads running at once
    pub download_workers: usize,

    /// Overall timeout for an entire HTTP request (zero disables it)
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// HTTP headers sent with every request
    pub headers: HeaderMap,

    /// Proxy server URL (optional); `socks5://` URLs are supported
    pub proxy: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("fetchio-cache"),
            size_limit: DEFAULT_SIZE_LIMIT,
            download_workers: DEFAULT_DOWNLOAD_WORKERS,
            // Whole-transfer timeouts punish large downloads, so only the
            // connection phase is bounded by default
            timeout: Duration::ZERO,
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: CacheConfig::get_default_headers(),
            proxy: None,
        }
    }
}

impl CacheConfig {
    pub fn builder() -> crate::builder::CacheConfigBuilder {
        crate::builder::CacheConfigBuilder::new()
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );

        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        default_headers
    }
}
