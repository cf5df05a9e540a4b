//! Reactive binding of one image slot to the cache
//!
//! A UI element owns an [`ImageBinding`], calls [`ImageBinding::bind`] whenever
//! its source URL changes, and renders from [`ImageBinding::state`] or a
//! receiver from [`ImageBinding::subscribe`].

use crate::coordinator::ImageCache;
use crate::types::ImageRef;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// What a bound image slot should render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingState {
    pub source: Option<String>,
    /// `None` when unbound, otherwise the handle or the remote URL
    pub image: Option<ImageRef>,
    pub is_loading: bool,
    pub is_cached: bool,
}

pub struct ImageBinding {
    cache: ImageCache,
    loading_timeout: Duration,
    state: Arc<watch::Sender<BindingState>>,
    generation: Arc<AtomicU64>,
    watcher: Option<JoinHandle<()>>,
}

impl ImageBinding {
    /// `loading_timeout` caps how long `is_loading` stays set; the fill itself
    /// keeps running past it
    pub fn new(cache: ImageCache, loading_timeout: Duration) -> Self {
        let (state, _) = watch::channel(BindingState::default());
        Self {
            cache,
            loading_timeout,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            watcher: None,
        }
    }

    /// A binding using the cache's configured loading cap
    pub fn for_cache(cache: ImageCache) -> Self {
        let loading_timeout = cache.loading_timeout();
        Self::new(cache, loading_timeout)
    }

    pub fn state(&self) -> BindingState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BindingState> {
        self.state.subscribe()
    }

    /// Point the binding at a new source; empty or `None` unbinds
    ///
    /// Rebinding the current source does nothing. A cached source is
    /// reported synchronously; otherwise the state goes to loading and a
    /// watcher publishes the result when the fill settles. Results for a
    /// source that is no longer bound are discarded.
    pub fn bind(&mut self, source: Option<&str>) {
        let source = source.filter(|s| !s.is_empty());
        if self.state.borrow().source.as_deref() == source {
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }

        let Some(url) = source else {
            self.state.send_replace(BindingState::default());
            return;
        };

        if self.cache.is_resolved(url) {
            self.state.send_replace(BindingState {
                source: Some(url.to_string()),
                image: Some(self.cache.peek(url)),
                is_loading: false,
                is_cached: true,
            });
            return;
        }

        self.state.send_replace(BindingState {
            source: Some(url.to_string()),
            image: Some(ImageRef::Remote(url.to_string())),
            is_loading: true,
            is_cached: false,
        });

        let cache = self.cache.clone();
        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);
        let loading_timeout = self.loading_timeout;
        let url = url.to_string();

        self.watcher = Some(tokio::spawn(async move {
            let resolving = cache.resolve(&url);
            tokio::pin!(resolving);

            let image = match tokio::time::timeout(loading_timeout, &mut resolving).await {
                Ok(image) => image,
                Err(_) => {
                    debug!(url = %url, "Image still loading, clearing loading state");
                    publish(&state, &current, generation, |s| s.is_loading = false);
                    resolving.await
                }
            };

            let is_cached = cache.is_resolved(&url);
            publish(&state, &current, generation, |s| {
                s.image = Some(image);
                s.is_loading = false;
                s.is_cached = is_cached;
            });
        }));
    }
}

impl Drop for ImageBinding {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

/// Apply `update` only if the binding is still on generation `expected`
fn publish(
    state: &watch::Sender<BindingState>,
    current: &AtomicU64,
    expected: u64,
    update: impl FnOnce(&mut BindingState),
) {
    state.send_if_modified(|s| {
        if current.load(Ordering::SeqCst) != expected {
            return false;
        }
        update(s);
        true
    });
}
