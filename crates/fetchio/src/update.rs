//! # Update Packages
//!
//! Single-shot downloads for application update packages. Unlike the
//! resource cache, destinations are keyed by package name and version
//! rather than by URL digest, and starting a download replaces whatever
//! file a previous attempt left behind.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cache::key::url_extension;
use crate::config::CacheConfig;
use crate::error::FetchError;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::progress::{self, Progress, ProgressStream};
use crate::request::RequestSpec;
use crate::transfer;

/// An update package to fetch.
#[derive(Debug, Clone)]
pub struct UpdatePackage {
    /// Application or channel name; the first half of the file name.
    pub name: String,
    /// Version identifier; the second half of the file name.
    pub version: String,
    /// Where to download the package from.
    pub url: String,
}

impl UpdatePackage {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            url: url.into(),
        }
    }
}

/// Handle on a running update download.
#[derive(Debug)]
pub struct UpdateHandle {
    pub progress: ProgressStream,
    pub path: PathBuf,
    cancel: CancellationToken,
}

impl UpdateHandle {
    /// Stop the download; the partial file is removed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the download to settle.
    pub async fn wait(&self) -> Progress {
        let mut stream = self.progress.clone();
        stream.wait_terminal().await
    }
}

/// Downloads update packages into a directory of versioned files.
pub struct UpdateDownloader {
    dir: PathBuf,
    fetcher: Arc<dyn Fetcher>,
}

impl UpdateDownloader {
    pub fn new(dir: impl Into<PathBuf>, config: &CacheConfig) -> Result<Self, FetchError> {
        Ok(Self::with_fetcher(dir, Arc::new(HttpFetcher::new(config)?)))
    }

    pub fn with_fetcher(dir: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            dir: dir.into(),
            fetcher,
        }
    }

    /// Destination file for a package: `<name>-<version>`, keeping the
    /// URL's extension when it has a usable one.
    pub fn package_path(&self, package: &UpdatePackage) -> PathBuf {
        let mut file_name = format!("{}-{}", package.name, package.version);
        if let Some(ext) = url_extension(&package.url) {
            file_name.push('.');
            file_name.push_str(ext);
        }
        self.dir.join(file_name)
    }

    /// Start downloading a package.
    ///
    /// Returns immediately with a handle; any existing file for this name
    /// and version is removed first, and the fresh package appears at the
    /// handle's path only once it is fully downloaded.
    pub async fn download(&self, package: UpdatePackage) -> Result<UpdateHandle, FetchError> {
        let path = self.package_path(&package);
        fs::create_dir_all(&self.dir).await?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        info!(name = %package.name, version = %package.version, "Starting update download");

        let (sender, stream) = progress::channel();
        let cancel = CancellationToken::new();
        let fetcher = Arc::clone(&self.fetcher);
        let spec = RequestSpec::new(package.url);
        // Dotted versions rule out with_extension; append the suffix raw.
        let mut work = path.clone().into_os_string();
        work.push(".part");
        let work = PathBuf::from(work);
        let dest = path.clone();
        let token = cancel.clone();
        tokio::spawn(async move {
            transfer::run(fetcher, spec, work, dest, sender, token).await;
        });

        Ok(UpdateHandle {
            progress: stream,
            path,
            cancel,
        })
    }
}
