//! Scrapbook image cache
//!
//! Resolves remote image URLs to in-process handles, fetching each URL at
//! most once no matter how many callers ask for it concurrently. Fetched
//! bytes are kept in memory for the session and, when a durable store is
//! available, on disk across restarts.

pub mod binding;
pub mod config;
pub mod coordinator;
pub mod durable;
pub mod error;
pub mod fetch;
pub mod handle;
pub mod in_flight;
mod preload;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

pub use binding::{BindingState, ImageBinding};
pub use config::{
    ImageCacheConfig, PreloadOptions, DEFAULT_LOADING_TIMEOUT, DURABLE_NAMESPACE,
};
pub use coordinator::ImageCache;
pub use durable::{DurableStats, DurableStore, DurableTier};
pub use error::{ImageCacheError, Result};
pub use fetch::ImageFetcher;
pub use handle::LocalHandle;
pub use types::{CacheStats, ImageRef};
