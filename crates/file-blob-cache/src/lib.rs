//! File-based blob store for cached images
//!
//! Stores binary blobs on disk under a versioned namespace directory, keyed by
//! the SHA-256 of the source identifier. Bumping the namespace orphans every
//! blob written under the previous one.

mod cache;
mod error;
mod types;

pub use cache::BlobCache;
pub use error::{BlobCacheError, Result};
pub use types::{Blob, CacheEntry, CacheStats};
