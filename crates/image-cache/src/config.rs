//! Cache configuration

use std::path::PathBuf;
use std::time::Duration;

/// Namespace directory for durable blobs. Changing it orphans everything
/// written under the old name.
pub const DURABLE_NAMESPACE: &str = "scrapbook-images-v1";

/// How long a binding shows a loading state unless configured otherwise
pub const DEFAULT_LOADING_TIMEOUT: Duration = Duration::from_millis(7000);

/// How many images to dispatch per preload group, and how long to wait
/// between group dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadOptions {
    pub batch_size: usize,
    pub delay: Duration,
}

impl Default for PreloadOptions {
    fn default() -> Self {
        Self {
            batch_size: 5,
            delay: Duration::from_millis(100),
        }
    }
}

/// Configuration for the image cache
#[derive(Debug, Clone)]
pub struct ImageCacheConfig {
    /// Root of the durable store; `None` runs memory-only
    pub cache_dir: Option<PathBuf>,
    pub preload: PreloadOptions,
    /// How long a binding shows a loading state before giving up on it
    pub loading_timeout: Duration,
    pub fetch_timeout: Duration,
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: Some(PathBuf::from("./cache/images")),
            preload: PreloadOptions::default(),
            loading_timeout: DEFAULT_LOADING_TIMEOUT,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl ImageCacheConfig {
    /// Load configuration from the environment, falling back to defaults for
    /// anything unset or unparseable
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let durable_enabled = lookup("IMAGE_CACHE_DURABLE")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "off" | "false" | "0"))
            .unwrap_or(true);

        let cache_dir = if durable_enabled {
            lookup("IMAGE_CACHE_DIR")
                .map(PathBuf::from)
                .or(defaults.cache_dir)
        } else {
            None
        };

        let batch_size = lookup("IMAGE_CACHE_BATCH_SIZE")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.preload.batch_size);

        let delay = lookup("IMAGE_CACHE_BATCH_DELAY_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.preload.delay);

        let loading_timeout = lookup("IMAGE_CACHE_LOADING_TIMEOUT_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.loading_timeout);

        let fetch_timeout = lookup("IMAGE_CACHE_FETCH_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.fetch_timeout);

        Self {
            cache_dir,
            preload: PreloadOptions { batch_size, delay },
            loading_timeout,
            fetch_timeout,
        }
    }
}
