//! # Active Set
//!
//! Tracks which cache entries are currently in use by a live consumer.
//! Entries in the set are exempt from eviction; the set is the only
//! protection a cached file has while it is being displayed or read.

use std::collections::HashSet;

use parking_lot::Mutex;

use super::key::CacheKey;

/// A concurrent set of in-use cache keys.
///
/// `insert` and `remove` are idempotent; there is no reference counting.
/// The set grows on every load (hit or miss) and shrinks when the caller
/// frees the URL, so it reflects "currently needed", not "ever requested".
#[derive(Debug, Default)]
pub struct ActiveSet {
    inner: Mutex<HashSet<String>>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a key as in use. Returns `false` if it was already marked.
    pub fn insert(&self, key: &CacheKey) -> bool {
        self.inner.lock().insert(key.as_str().to_owned())
    }

    /// Unmark a key. Returns `false` if it was not marked.
    pub fn remove(&self, key: &CacheKey) -> bool {
        self.inner.lock().remove(key.as_str())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().contains(key.as_str())
    }

    /// Check by raw file name, for callers walking the cache directory.
    pub(crate) fn contains_name(&self, name: &str) -> bool {
        self.inner.lock().contains(name)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove_are_idempotent() {
        let set = ActiveSet::new();
        let key = CacheKey::for_url("https://example.com/a.png");

        assert!(set.insert(&key));
        assert!(!set.insert(&key));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&key));

        assert!(set.remove(&key));
        assert!(!set.remove(&key));
        assert!(set.is_empty());
    }

    #[test]
    fn lookup_by_file_name() {
        let set = ActiveSet::new();
        let key = CacheKey::for_url("https://example.com/a.png");
        set.insert(&key);

        assert!(set.contains_name(key.as_str()));
        assert!(!set.contains_name("someotherfile.png"));
    }

    #[test]
    fn clear_empties_the_set() {
        let set = ActiveSet::new();
        set.insert(&CacheKey::for_url("https://example.com/a.png"));
        set.insert(&CacheKey::for_url("https://example.com/b.png"));

        set.clear();
        assert!(set.is_empty());
    }
}
