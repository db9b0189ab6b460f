//! # Resource Cache
//!
//! The coordination layer tying the pieces together: one [`ResourceCache`]
//! owns the store, the active set, the in-flight job table and the worker
//! pool, and exposes the load/free/clear lifecycle consumers drive.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use tokio::io;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::cache::{ActiveSet, CacheKey, CacheStore, CleanupStats, eviction};
use crate::config::CacheConfig;
use crate::error::FetchError;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::progress::{self, Progress, ProgressSender, ProgressStream};
use crate::request::{RequestSpec, Target, classify};
use crate::transfer;

/// Bookkeeping for one in-flight download.
struct JobEntry {
    id: u64,
    progress: ProgressStream,
    cancel: CancellationToken,
}

/// The pieces a freshly-registered job hands to its transfer task.
struct PendingJob {
    id: u64,
    sender: ProgressSender,
    cancel: CancellationToken,
}

/// A content-addressed disk cache for resources fetched over HTTP.
///
/// Concurrent loads of the same URL coalesce onto a single download, at
/// most [`CacheConfig::download_workers`] transfers run at once, and every
/// URL loaded since the last [`free`](Self::free) or
/// [`clear`](Self::clear) is protected from eviction.
pub struct ResourceCache {
    config: CacheConfig,
    store: CacheStore,
    active: ActiveSet,
    jobs: Arc<Mutex<HashMap<String, JobEntry>>>,
    fetcher: Arc<dyn Fetcher>,
    workers: Arc<Semaphore>,
    next_job_id: AtomicU64,
}

impl ResourceCache {
    /// Create a cache backed by an HTTP client built from `config`.
    pub fn new(config: CacheConfig) -> Result<Self, FetchError> {
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Create a cache over a caller-provided byte source.
    pub fn with_fetcher(config: CacheConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let store = CacheStore::new(config.cache_dir.clone());
        let workers = Arc::new(Semaphore::new(config.download_workers.max(1)));
        Self {
            config,
            store,
            active: ActiveSet::new(),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            fetcher,
            workers,
            next_job_id: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// The cache file path a remote URL resolves to, whether or not it has
    /// been downloaded yet.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.store.entry_path(&CacheKey::for_url(url))
    }

    /// Whether the resource is already on disk.
    pub async fn is_cached(&self, url: &str) -> bool {
        self.store.exists(&CacheKey::for_url(url)).await
    }

    /// Downloads currently registered, running or queued.
    pub fn pending_jobs(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Resolve a resource to a local path, downloading it if necessary.
    ///
    /// Returns immediately with a progress stream and the destination path.
    /// A cache hit (and any `file://` URL) yields an already-terminal
    /// stream; a miss either attaches to the in-flight download for that
    /// URL or starts a fresh one. The URL is marked in use either way.
    #[instrument(skip_all, fields(url = %spec.url), level = "debug")]
    pub async fn load(&self, spec: RequestSpec) -> Result<(ProgressStream, PathBuf), FetchError> {
        match classify(&spec.url)? {
            Target::Local(path) => {
                debug!("Local resource, nothing to fetch");
                Ok((progress::completed(), path))
            }
            Target::Remote(_) => self.load_remote(spec, false).await,
        }
    }

    /// Re-fetch a resource even when it is already cached.
    ///
    /// Any in-flight download for the URL is cancelled and drained before
    /// the stale file is removed, so the fresh transfer never races the
    /// old one for the destination.
    #[instrument(skip_all, fields(url = %spec.url), level = "debug")]
    pub async fn load_forced(
        &self,
        spec: RequestSpec,
    ) -> Result<(ProgressStream, PathBuf), FetchError> {
        match classify(&spec.url)? {
            Target::Local(path) => Ok((progress::completed(), path)),
            Target::Remote(_) => {
                let previous = self.jobs.lock().remove(&spec.url);
                if let Some(entry) = previous {
                    entry.cancel.cancel();
                    let mut stream = entry.progress;
                    stream.wait_terminal().await;
                }
                self.store.delete(&CacheKey::for_url(&spec.url)).await?;
                self.load_remote(spec, true).await
            }
        }
    }

    /// Load a whole batch of URLs with one shared header set.
    ///
    /// The batch is validated up front: any unsupported scheme fails the
    /// call before a single download starts. Results come back in input
    /// order.
    pub async fn load_batch<S, F>(
        &self,
        urls: &[S],
        build_headers: F,
    ) -> Result<Vec<(ProgressStream, PathBuf)>, FetchError>
    where
        S: AsRef<str>,
        F: FnOnce(&mut HeaderMap),
    {
        for url in urls {
            classify(url.as_ref())?;
        }

        let mut headers = HeaderMap::new();
        build_headers(&mut headers);

        let mut loaded = Vec::with_capacity(urls.len());
        for url in urls {
            let spec = RequestSpec::new(url.as_ref()).with_headers(headers.clone());
            loaded.push(self.load(spec).await?);
        }
        Ok(loaded)
    }

    /// Release resources this consumer no longer displays.
    ///
    /// In-flight downloads are cancelled and unregistered immediately, and
    /// the URLs lose their eviction protection. Already-downloaded files
    /// stay on disk until a cleanup pass decides otherwise, so a later
    /// load can still hit them. A load issued right after sees a plain
    /// miss, never the cancelled transfer's leftovers.
    pub fn free<S: AsRef<str>>(&self, urls: &[S]) {
        let mut cancelled = 0usize;
        {
            let mut jobs = self.jobs.lock();
            for url in urls {
                if let Some(entry) = jobs.remove(url.as_ref()) {
                    entry.cancel.cancel();
                    cancelled += 1;
                }
            }
        }
        for url in urls {
            self.active.remove(&CacheKey::for_url(url.as_ref()));
        }
        if cancelled > 0 {
            debug!(count = cancelled, "Cancelled in-flight downloads");
        }
    }

    /// Cancel everything and wipe the cache directory.
    ///
    /// Waits for every cancelled writer to settle before deleting, so no
    /// task recreates a file behind the sweep.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> io::Result<()> {
        let drained: Vec<JobEntry> = {
            let mut jobs = self.jobs.lock();
            jobs.drain().map(|(_, entry)| entry).collect()
        };
        for entry in &drained {
            entry.cancel.cancel();
        }
        for entry in drained {
            let mut stream = entry.progress;
            stream.wait_terminal().await;
        }

        self.active.clear();
        self.store.clear().await?;
        info!("Cache cleared");
        Ok(())
    }

    /// Run one eviction pass against the configured size limit.
    pub async fn cleanup(&self) -> CleanupStats {
        eviction::cleanup(&self.store, &self.active, self.config.size_limit).await
    }

    /// Run [`cleanup`](Self::cleanup) forever at a fixed interval.
    pub fn start_maintenance(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        info!(interval = ?interval, "Starting cache maintenance task");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.cleanup().await;
            }
        })
    }

    async fn load_remote(
        &self,
        spec: RequestSpec,
        force: bool,
    ) -> Result<(ProgressStream, PathBuf), FetchError> {
        let key = CacheKey::for_url(&spec.url);
        let path = self.store.entry_path(&key);

        // In use from the moment it is requested, hit or miss.
        self.active.insert(&key);

        if !force {
            // A live job outranks the disk: downloads stage under a .part
            // name, so the entry check can only see completed files, but a
            // forced re-fetch may have deleted the entry this URL would
            // otherwise hit.
            if let Some(stream) = self.live_stream(&spec.url) {
                debug!("Attaching to in-flight download");
                return Ok((stream, path));
            }
            if self.store.exists(&key).await {
                debug!("Cache hit");
                return Ok((progress::completed(), path));
            }
        }

        self.store.ensure_initialized().await?;

        // Check and register under one lock so a URL never has two live
        // downloads.
        let (stream, job) = {
            let mut jobs = self.jobs.lock();
            if let Some(entry) = jobs.get(&spec.url) {
                if !entry.progress.is_terminal() {
                    debug!("Attaching to in-flight download");
                    return Ok((entry.progress.clone(), path));
                }
                // Settled job whose task has not unregistered yet; a fresh
                // entry simply replaces it.
            }

            let id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
            let (sender, stream) = progress::channel();
            let cancel = CancellationToken::new();
            jobs.insert(
                spec.url.clone(),
                JobEntry {
                    id,
                    progress: stream.clone(),
                    cancel: cancel.clone(),
                },
            );
            (stream, PendingJob { id, sender, cancel })
        };

        self.spawn_transfer(spec, &key, path.clone(), job);
        Ok((stream, path))
    }

    /// The progress stream of an unfinished download for this URL, if any.
    fn live_stream(&self, url: &str) -> Option<ProgressStream> {
        let jobs = self.jobs.lock();
        jobs.get(url)
            .filter(|entry| !entry.progress.is_terminal())
            .map(|entry| entry.progress.clone())
    }

    fn spawn_transfer(&self, spec: RequestSpec, key: &CacheKey, dest: PathBuf, job: PendingJob) {
        let fetcher = Arc::clone(&self.fetcher);
        let workers = Arc::clone(&self.workers);
        let jobs = Arc::clone(&self.jobs);
        let url = spec.url.clone();
        let PendingJob { id, sender, cancel } = job;
        // A per-job staging name keeps this transfer's bytes away from the
        // entry path and from any newer download of the same URL.
        let work = self.store.partial_path(key, id);

        tokio::spawn(async move {
            // The worker slot is held for the whole transfer. A
            // cancellation that lands while still queued must not start
            // the request at all.
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&workers).acquire_owned() => permit.ok(),
            };

            match permit {
                Some(_permit) => transfer::run(fetcher, spec, work, dest, sender, cancel).await,
                None => {
                    debug!(url = %url, "Download cancelled before it started");
                    sender.send(Progress::Failed);
                }
            }

            // Unregister, unless free() or a forced reload already
            // replaced this entry with a newer job.
            let mut jobs = jobs.lock();
            if jobs.get(&url).is_some_and(|entry| entry.id == id) {
                jobs.remove(&url);
            }
        });
    }
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("dir", &self.store.dir())
            .field("size_limit", &self.config.size_limit)
            .field("pending_jobs", &self.pending_jobs())
            .finish()
    }
}
