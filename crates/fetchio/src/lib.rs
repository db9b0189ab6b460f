//! # Fetchio
//!
//! A content-addressed disk cache for resources fetched over HTTP, built
//! for consumers that display many remote images at once and occasionally
//! pull down an application update package.
//!
//! ## Features
//!
//! - **Request coalescing**: concurrent loads of one URL share a single download
//! - **Progress streams**: per-URL watch channels that keep only the latest value
//! - **Bounded workers**: at most a configured number of transfers run at once
//! - **Protected eviction**: size-limited cleanup that never touches files in use
//! - **Lifecycle**: `free` releases resources, `clear` resets the whole cache
//! - **Update packages**: single-shot downloads keyed by name and version
//!
//! ## Example
//!
//! ```no_run
//! use fetchio_engine::{CacheConfig, Progress, RequestSpec, ResourceCache};
//!
//! # async fn demo() -> Result<(), fetchio_engine::FetchError> {
//! let cache = ResourceCache::new(CacheConfig::default())?;
//!
//! let (mut progress, path) = cache
//!     .load(RequestSpec::new("https://cdn.example.com/pic.png"))
//!     .await?;
//!
//! if progress.wait_terminal().await == Progress::Done {
//!     println!("cached at {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod manager;
pub mod progress;
pub mod request;
mod transfer;
pub mod update;

pub use builder::CacheConfigBuilder;
pub use cache::{ActiveSet, CacheKey, CacheStore, CleanupStats};
pub use config::CacheConfig;
pub use error::FetchError;
pub use fetcher::{FetchBody, Fetcher, HttpFetcher, create_client};
pub use manager::ResourceCache;
pub use progress::{Progress, ProgressStream};
pub use request::RequestSpec;
pub use update::{UpdateDownloader, UpdateHandle, UpdatePackage};
