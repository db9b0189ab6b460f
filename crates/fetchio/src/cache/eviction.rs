//! # Eviction
//!
//! Size-pressure cleanup for the cache directory. When the total size
//! exceeds the configured limit, every file not in the active set is
//! deleted. There is no LRU or usage-frequency ordering; the active set is
//! the sole protection mechanism, which keeps the sweep simple and safe to
//! run opportunistically.

use serde::Serialize;
use tracing::{debug, info};

use super::active::ActiveSet;
use super::store::CacheStore;

/// Summary of one cleanup sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
    pub removed_files: usize,
    pub removed_bytes: u64,
    pub retained_files: usize,
    pub retained_bytes: u64,
}

/// Delete inactive cache files if the store is over its size limit.
///
/// A store at or under the limit is left untouched. Staging files are
/// judged by the entry they belong to: a live download's staging file
/// survives, orphans from crashed runs go with the rest. Individual
/// delete failures are ignored; the sweep always runs to completion.
pub async fn cleanup(store: &CacheStore, active: &ActiveSet, size_limit: u64) -> CleanupStats {
    let entries = store.entries().await;
    let total: u64 = entries.iter().map(|(_, len)| len).sum();

    let mut stats = CleanupStats::default();

    if total <= size_limit {
        stats.retained_files = entries.len();
        stats.retained_bytes = total;
        debug!(
            total_bytes = total,
            size_limit, "Cache within size limit, nothing to evict"
        );
        return stats;
    }

    for (name, len) in entries {
        let protected = match CacheStore::partial_owner(&name) {
            Some(owner) => active.contains_name(owner),
            None => active.contains_name(&name),
        };
        if protected {
            stats.retained_files += 1;
            stats.retained_bytes += len;
            continue;
        }

        if store.delete_name(&name).await.is_ok() {
            stats.removed_files += 1;
            stats.removed_bytes += len;
        } else {
            // Still on disk as far as we know
            stats.retained_files += 1;
            stats.retained_bytes += len;
        }
    }

    info!(
        removed_files = stats.removed_files,
        removed_bytes = stats.removed_bytes,
        retained_files = stats.retained_files,
        retained_bytes = stats.retained_bytes,
        "Cache cleanup finished"
    );

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::CacheKey;
    use tempfile::TempDir;
    use tokio::fs;

    async fn put_entry(store: &CacheStore, url: &str, size: usize) -> CacheKey {
        let key = CacheKey::for_url(url);
        fs::write(store.entry_path(&key), vec![0u8; size])
            .await
            .unwrap();
        key
    }

    #[tokio::test]
    async fn under_limit_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().to_path_buf());
        store.ensure_initialized().await.unwrap();
        let active = ActiveSet::new();

        let key = put_entry(&store, "https://e.com/a.png", 100).await;

        let stats = cleanup(&store, &active, 1000).await;
        assert_eq!(stats.removed_files, 0);
        assert_eq!(stats.retained_files, 1);
        assert_eq!(stats.retained_bytes, 100);
        assert!(store.exists(&key).await);
    }

    #[tokio::test]
    async fn over_limit_removes_only_inactive_files() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().to_path_buf());
        store.ensure_initialized().await.unwrap();
        let active = ActiveSet::new();

        let protected = put_entry(&store, "https://e.com/a.png", 300).await;
        let doomed_one = put_entry(&store, "https://e.com/b.png", 300).await;
        let doomed_two = put_entry(&store, "https://e.com/c.png", 300).await;
        active.insert(&protected);

        let stats = cleanup(&store, &active, 500).await;

        assert!(store.exists(&protected).await);
        assert!(!store.exists(&doomed_one).await);
        assert!(!store.exists(&doomed_two).await);
        assert_eq!(stats.removed_files, 2);
        assert_eq!(stats.removed_bytes, 600);
        assert_eq!(stats.retained_files, 1);
        assert_eq!(stats.retained_bytes, 300);
    }

    #[tokio::test]
    async fn staging_files_follow_their_entry_protection() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().to_path_buf());
        store.ensure_initialized().await.unwrap();
        let active = ActiveSet::new();

        let live = CacheKey::for_url("https://e.com/live.png");
        active.insert(&live);
        let live_partial = store.partial_path(&live, 3);
        fs::write(&live_partial, vec![0u8; 300]).await.unwrap();

        let stale = CacheKey::for_url("https://e.com/stale.png");
        let stale_partial = store.partial_path(&stale, 9);
        fs::write(&stale_partial, vec![0u8; 300]).await.unwrap();

        let stats = cleanup(&store, &active, 100).await;

        assert!(live_partial.exists());
        assert!(!stale_partial.exists());
        assert_eq!(stats.removed_files, 1);
        assert_eq!(stats.retained_files, 1);
    }

    #[tokio::test]
    async fn fully_active_cache_loses_nothing_even_over_limit() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path().to_path_buf());
        store.ensure_initialized().await.unwrap();
        let active = ActiveSet::new();

        let a = put_entry(&store, "https://e.com/a.png", 400).await;
        let b = put_entry(&store, "https://e.com/b.png", 400).await;
        active.insert(&a);
        active.insert(&b);

        let stats = cleanup(&store, &active, 100).await;
        assert_eq!(stats.removed_files, 0);
        assert!(store.exists(&a).await);
        assert!(store.exists(&b).await);
    }
}
