use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use fetchio_engine::{CacheConfig, Progress, ProgressStream, RequestSpec, ResourceCache};
use futures::future::join_all;
use indicatif::{MultiProgress, ProgressBar};
use reqwest::header::{HeaderValue, REFERER};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli;
mod error;
mod utils;

use cli::CliArgs;
use error::AppError;
use utils::progress::{BAR_SCALE, ProgressManager, permille};
use utils::{format_bytes, parse_headers, parse_size};

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    // Parse command-line arguments
    let args = CliArgs::parse();

    // Setup logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    if args.workers == 0 {
        return Err(AppError::InvalidInput(
            "at least one download worker is required".to_string(),
        ));
    }

    // Cache size limit in bytes
    let size_limit = parse_size(&args.size_limit)?;

    let config = build_config(&args, size_limit);
    info!(
        cache_dir = %config.cache_dir.display(),
        size_limit = %format_bytes(size_limit),
        workers = config.download_workers,
        "Cache configured"
    );

    let cache = Arc::new(ResourceCache::new(config)?);

    // A wipe runs before any fetch so the run starts from a clean slate
    if args.clear {
        cache.clear().await?;
        info!("Cache cleared");
    }

    if !args.input.is_empty() {
        fetch_all(&cache, &args).await?;
    }

    if args.cleanup {
        let stats = cache.cleanup().await;
        if args.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).expect("cleanup stats are serializable")
            );
        } else {
            info!(
                removed_files = stats.removed_files,
                removed = %format_bytes(stats.removed_bytes),
                retained_files = stats.retained_files,
                retained = %format_bytes(stats.retained_bytes),
                "Cleanup finished"
            );
        }
    }

    Ok(())
}

/// Assemble the engine configuration from command-line arguments.
fn build_config(args: &CliArgs, size_limit: u64) -> CacheConfig {
    let mut builder = CacheConfig::builder()
        .with_size_limit(size_limit)
        .with_download_workers(args.workers)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_connect_timeout(Duration::from_secs(args.connect_timeout));

    if let Some(dir) = &args.cache_dir {
        builder = builder.with_cache_dir(dir);
    }
    if let Some(user_agent) = &args.user_agent {
        builder = builder.with_user_agent(user_agent);
    }
    if let Some(proxy) = &args.proxy {
        builder = builder.with_proxy(proxy);
    }

    builder.build()
}

/// Fetch every URL into the cache, driving one progress bar per download.
async fn fetch_all(cache: &Arc<ResourceCache>, args: &CliArgs) -> Result<(), AppError> {
    let mut headers = parse_headers(&args.headers);
    if let Some(referer) = &args.referer {
        match HeaderValue::from_str(referer) {
            Ok(value) => {
                headers.insert(REFERER, value);
            }
            Err(_) => warn!("Ignoring invalid referer value '{referer}'"),
        }
    }

    let urls = &args.input;
    info!(count = urls.len(), force = args.force, "Starting downloads");

    let loaded = if args.force {
        let mut out = Vec::with_capacity(urls.len());
        for url in urls {
            let spec = RequestSpec::new(url).with_headers(headers.clone());
            out.push(cache.load_forced(spec).await?);
        }
        out
    } else {
        cache.load_batch(urls, |batch| *batch = headers).await?
    };

    let multi = MultiProgress::new();
    let progress = if args.show_progress {
        ProgressManager::new(multi)
    } else {
        ProgressManager::new_disabled(multi)
    };

    let mut watchers = Vec::with_capacity(loaded.len());
    for (url, (stream, path)) in urls.iter().zip(loaded) {
        let bar = progress.add_download(url);
        watchers.push(tokio::spawn(watch_download(url.clone(), stream, path, bar)));
    }

    let total = watchers.len();
    let mut fetched = Vec::new();
    let mut failed = 0usize;
    for outcome in join_all(watchers).await {
        match outcome {
            Ok(Some(path)) => fetched.push(path),
            Ok(None) => failed += 1,
            Err(e) => {
                error!(error = %e, "Progress watcher panicked");
                failed += 1;
            }
        }
    }

    for path in &fetched {
        println!("{}", path.display());
    }

    if failed > 0 {
        return Err(AppError::DownloadsFailed { failed, total });
    }
    Ok(())
}

/// Follow one download to its terminal value.
///
/// Returns the cached file path on success, `None` on failure.
async fn watch_download(
    url: String,
    mut stream: ProgressStream,
    path: PathBuf,
    bar: Option<ProgressBar>,
) -> Option<PathBuf> {
    loop {
        match stream.current() {
            Progress::Done => {
                if let Some(bar) = &bar {
                    bar.set_position(BAR_SCALE);
                    bar.finish_with_message(format!("Fetched {url}"));
                }
                debug!(url = %url, path = %path.display(), "Download ready");
                return Some(path);
            }
            Progress::Failed => {
                if let Some(bar) = &bar {
                    bar.abandon_with_message(format!("Failed {url}"));
                }
                error!(url = %url, "Download failed");
                return None;
            }
            Progress::Fraction(fraction) => {
                if let Some(bar) = &bar {
                    bar.set_position(permille(fraction));
                }
                if stream.changed().await.is_none() && !stream.is_terminal() {
                    if let Some(bar) = &bar {
                        bar.abandon_with_message(format!("Lost {url}"));
                    }
                    error!(url = %url, "Download ended without a terminal value");
                    return None;
                }
            }
        }
    }
}
