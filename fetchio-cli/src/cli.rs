use clap::Parser;
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    version,
    about = "Content-addressed download cache for remote resources",
    long_about = "Fetches remote resources into a content-addressed disk cache.\n\
                  \n\
                  Each URL is downloaded at most once: repeated fetches are served from\n\
                  the cache, concurrent fetches of the same URL share a single download,\n\
                  and the cache is trimmed back to its size limit on demand without ever\n\
                  touching files from the current run."
)]
pub struct CliArgs {
    /// URL(s) to fetch into the cache
    #[arg(
        required_unless_present_any = ["cleanup", "clear"],
        help = "URL(s) to fetch (http, https, or file paths as file:// URLs)"
    )]
    pub input: Vec<String>,

    /// Directory the cache lives in
    #[arg(
        short = 'o',
        long,
        help = "Directory where cached files are stored (default: a per-user temp directory)"
    )]
    pub cache_dir: Option<PathBuf>,

    /// Cache size limit with optional unit (B, KB, MB, GB, TB)
    /// Examples: "500MB", "4GB"
    #[arg(
        short = 's',
        long,
        default_value = "100MB",
        help = "Size limit the cleanup pass trims the cache back to, with optional unit (B, KB, MB, GB, TB). Examples: \"500MB\", \"4GB\"."
    )]
    pub size_limit: String,

    /// Number of concurrent download workers
    #[arg(
        short = 'w',
        long,
        default_value = "4",
        help = "Maximum number of downloads running at the same time"
    )]
    pub workers: usize,

    /// Custom HTTP headers for download requests
    #[arg(
        long = "header",
        short = 'H',
        help = "Add custom HTTP header to requests (can be used multiple times). Format: 'Name: Value'",
        value_name = "HEADER"
    )]
    pub headers: Vec<String>,

    /// Referer header for download requests
    #[arg(long, help = "Referer header to send with every request")]
    pub referer: Option<String>,

    /// User agent for download requests
    #[arg(long, help = "User-Agent header to send instead of the built-in one")]
    pub user_agent: Option<String>,

    /// Proxy URL (e.g., "http://proxy.example.com:8080")
    #[arg(
        long,
        help = "Proxy server URL for downloads (e.g., \"http://proxy.example.com:8080\" or \"socks5://host:1080\")"
    )]
    pub proxy: Option<String>,

    /// Overall timeout in seconds
    #[arg(
        long,
        default_value = "0",
        help = "Overall timeout in seconds for each download. Use 0 for unlimited."
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    /// Re-download even when already cached
    #[arg(
        short = 'f',
        long,
        help = "Ignore cached copies and download the resources again"
    )]
    pub force: bool,

    /// Trim the cache back to the size limit
    #[arg(
        long,
        help = "Run a cleanup pass after the downloads (or on its own with no URLs). Files fetched by this run are kept."
    )]
    pub cleanup: bool,

    /// Delete everything in the cache
    #[arg(long, help = "Cancel nothing, keep nothing: wipe the cache directory")]
    pub clear: bool,

    /// Show progress bars for downloads
    #[arg(
        short = 'P',
        long = "progress",
        default_value = "false",
        help = "Show a live progress bar per download"
    )]
    pub show_progress: bool,

    /// Print the cleanup summary as JSON
    #[arg(long, help = "Print cleanup statistics as JSON on stdout")]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,
}
