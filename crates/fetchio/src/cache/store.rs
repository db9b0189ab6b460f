//! # Cache Store
//!
//! Directory-scoped file storage for cache entries. There is no manifest or
//! metadata file: a file's presence under the cache directory is the only
//! record of a cached entry, and the directory listing is authoritative.
//! Downloads in progress sit alongside the entries under reserved `.part`
//! staging names, so an entry path never holds half-written bytes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::io;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::key::CacheKey;

/// Suffix marking the staging file of an in-progress download.
const PARTIAL_SUFFIX: &str = ".part";

/// On-disk store mapping cache keys to files under one directory.
///
/// The directory is created lazily on first write. All removal operations
/// are best-effort: a file that is already gone is not an error.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    init: Arc<OnceCell<()>>,
}

impl CacheStore {
    /// Create a store rooted at the given directory.
    ///
    /// The directory itself is not touched until the first write.
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            init: Arc::new(OnceCell::new()),
        }
    }

    /// The directory this store owns.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The path an entry for this key lives at (whether or not it exists).
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.as_str())
    }

    /// The staging path a transfer writes to before its entry is committed.
    ///
    /// The id keeps generations of the same key apart, so a cancelled
    /// writer only ever deletes its own leftovers.
    pub(crate) fn partial_path(&self, key: &CacheKey, id: u64) -> PathBuf {
        self.dir.join(format!("{}.{id}{PARTIAL_SUFFIX}", key.as_str()))
    }

    /// The entry name a staging file belongs to, or `None` for the name of
    /// a regular entry.
    pub(crate) fn partial_owner(name: &str) -> Option<&str> {
        let stem = name.strip_suffix(PARTIAL_SUFFIX)?;
        let (owner, id) = stem.rsplit_once('.')?;
        (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then_some(owner)
    }

    /// Create the cache directory once, before the first write.
    ///
    /// Concurrent first-use callers all wait for the one creation to
    /// finish; a failed attempt is retried by the next caller.
    pub(crate) async fn ensure_initialized(&self) -> io::Result<()> {
        self.init
            .get_or_try_init(|| async {
                debug!(dir = ?self.dir, "Creating cache directory");
                fs::create_dir_all(&self.dir).await
            })
            .await?;
        Ok(())
    }

    /// Whether a fully-written entry exists for this key.
    pub async fn exists(&self, key: &CacheKey) -> bool {
        matches!(fs::try_exists(self.entry_path(key)).await, Ok(true))
    }

    /// All entry file names and sizes, best-effort.
    ///
    /// Entries that vanish or fail to stat mid-walk are skipped; a missing
    /// directory yields an empty listing.
    pub(crate) async fn entries(&self) -> Vec<(String, u64)> {
        let mut out = Vec::new();

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(_) => return out,
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            out.push((name, metadata.len()));
        }

        out
    }

    /// Total size in bytes of all entries, best-effort.
    pub async fn total_size(&self) -> u64 {
        self.entries().await.iter().map(|(_, len)| len).sum()
    }

    /// Remove the entry for a key. Missing files are not an error.
    pub async fn delete(&self, key: &CacheKey) -> io::Result<()> {
        self.delete_name(key.as_str()).await
    }

    pub(crate) async fn delete_name(&self, name: &str) -> io::Result<()> {
        let path = self.dir.join(name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to remove cache file");
                Err(e)
            }
        }
    }

    /// Remove every entry in the cache directory.
    pub async fn clear(&self) -> io::Result<()> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                warn!(dir = ?self.dir, error = %e, "Failed to read cache directory");
                return Err(e);
            }
        };

        let mut removed = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Err(e) = fs::remove_file(&path).await {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = ?path, error = %e, "Failed to remove cache file");
                }
            } else {
                removed += 1;
            }
        }

        debug!(count = removed, "Cleared cache entries");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CacheStore {
        CacheStore::new(dir.path().join("cache"))
    }

    #[test]
    fn entry_path_joins_directory_and_key() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let key = CacheKey::for_url("https://example.com/a.png");

        let path = store.entry_path(&key);
        assert_eq!(path, dir.path().join("cache").join(key.as_str()));
    }

    #[tokio::test]
    async fn missing_directory_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let key = CacheKey::for_url("https://example.com/a.png");

        assert!(!store.exists(&key).await);
        assert_eq!(store.total_size().await, 0);
        // Deleting something that never existed is fine
        store.delete(&key).await.unwrap();
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn initialization_creates_the_directory_once() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(!store.dir().exists());
        store.ensure_initialized().await.unwrap();
        assert!(store.dir().is_dir());
        store.ensure_initialized().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_first_use_never_writes_before_the_directory_exists() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        // Every task must be able to write as soon as its init call
        // returns, including the ones that lost the race to create.
        let mut tasks = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.ensure_initialized().await.unwrap();
                fs::write(store.dir().join(format!("entry-{i}")), b"x")
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.entries().await.len(), 8);
    }

    #[test]
    fn staging_names_resolve_to_their_entry() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let key = CacheKey::for_url("https://example.com/a.png");

        let partial = store.partial_path(&key, 7);
        let name = partial.file_name().unwrap().to_str().unwrap();
        assert_eq!(CacheStore::partial_owner(name), Some(key.as_str()));

        // Regular entries never parse as staging files, even when the URL
        // extension happens to be "part".
        assert_eq!(CacheStore::partial_owner(key.as_str()), None);
        assert_eq!(CacheStore::partial_owner("0a1b2c.part"), None);
        assert_eq!(CacheStore::partial_owner("0a1b2c..part"), None);
    }

    #[tokio::test]
    async fn size_and_delete_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.ensure_initialized().await.unwrap();

        let a = CacheKey::for_url("https://example.com/a.png");
        let b = CacheKey::for_url("https://example.com/b.png");
        fs::write(store.entry_path(&a), vec![0u8; 100]).await.unwrap();
        fs::write(store.entry_path(&b), vec![0u8; 50]).await.unwrap();

        assert!(store.exists(&a).await);
        assert_eq!(store.total_size().await, 150);

        store.delete(&a).await.unwrap();
        assert!(!store.exists(&a).await);
        assert_eq!(store.total_size().await, 50);
    }

    #[tokio::test]
    async fn clear_removes_all_entries() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.ensure_initialized().await.unwrap();

        for url in ["https://e.com/1.png", "https://e.com/2.png"] {
            let key = CacheKey::for_url(url);
            fs::write(store.entry_path(&key), b"data").await.unwrap();
        }

        store.clear().await.unwrap();
        assert_eq!(store.total_size().await, 0);
        assert!(store.entries().await.is_empty());
    }
}
