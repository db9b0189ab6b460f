//! # Cache Keys
//!
//! Content-addressed naming: every URL maps to a deterministic, filesystem
//! safe file name derived from its digest.

use sha2::{Digest, Sha256};

const MAX_EXTENSION_LEN: usize = 8;

/// A deterministic cache file name for a URL.
///
/// The name is the SHA-256 digest of the URL as lowercase hex, with the
/// URL's trailing extension appended when it has one. The same URL always
/// produces the same key; different URLs produce different keys (digest
/// collisions are treated as negligible).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a URL.
    ///
    /// The URL is hashed as opaque bytes, so malformed URLs still produce a
    /// usable key.
    pub fn for_url(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let hash = hasher.finalize();

        let mut name = format!("{hash:x}");
        if let Some(ext) = url_extension(url) {
            name.push('.');
            name.push_str(ext);
        }

        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The trailing extension of a URL, if it has a usable one.
///
/// Takes the text after the last `.` and accepts it only when it is short
/// and purely alphanumeric; anything else (query strings, path separators,
/// no dot at all) yields no extension rather than an invalid file name.
pub(crate) fn url_extension(url: &str) -> Option<&str> {
    let (_, ext) = url.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}
