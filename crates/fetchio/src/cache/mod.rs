//! # Cache
//!
//! The on-disk half of the engine: content-addressed keys, the
//! directory-scoped file store, the in-use set protecting entries from
//! eviction, and the size-pressure cleanup sweep.

pub mod active;
pub mod eviction;
pub mod key;
pub mod store;

pub use active::ActiveSet;
pub use eviction::{CleanupStats, cleanup};
pub use key::CacheKey;
pub use store::CacheStore;
