//! Deduplication of concurrent cache fills

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::trace;

/// A fill operation any number of callers can await
pub type SharedFill<T> = Shared<BoxFuture<'static, T>>;

struct Pending<T: Clone> {
    id: u64,
    fill: SharedFill<T>,
}

/// Map from key to the fill currently running for it
///
/// Each fill is spawned onto the runtime when registered, so it runs to
/// completion even if every caller stops waiting. A fill removes its own
/// entry once it settles.
pub struct InFlightTracker<T: Clone> {
    pending: Mutex<HashMap<String, Pending<T>>>,
    next_id: AtomicU64,
}

impl<T> InFlightTracker<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, Pending<T>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Join the fill running for `key`, or start one with `factory`
    ///
    /// `factory` is only called when no fill is registered for `key`. Must be
    /// called from within a Tokio runtime.
    pub fn get_or_create<F, Fut>(self: &Arc<Self>, key: &str, factory: F) -> SharedFill<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let fill = {
            let mut pending = self.pending();
            if let Some(existing) = pending.get(key) {
                trace!(key = %key, "Joining in-flight fill");
                return existing.fill.clone();
            }

            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let tracker: Weak<Self> = Arc::downgrade(self);
            let owned_key = key.to_string();
            let operation = factory();

            let fill = async move {
                let output = operation.await;
                if let Some(tracker) = tracker.upgrade() {
                    tracker.settle(&owned_key, id);
                }
                output
            }
            .boxed()
            .shared();

            pending.insert(
                key.to_string(),
                Pending {
                    id,
                    fill: fill.clone(),
                },
            );
            fill
        };

        tokio::spawn(fill.clone());
        fill
    }

    /// Remove the entry for `key` if it still belongs to fill `id`
    fn settle(&self, key: &str, id: u64) {
        let mut pending = self.pending();
        if pending.get(key).is_some_and(|p| p.id == id) {
            pending.remove(key);
            trace!(key = %key, "In-flight fill settled");
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pending().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }

    /// Forget every registered fill; running fills still complete. Returns the
    /// number of entries removed.
    pub fn clear(&self) -> usize {
        let mut pending = self.pending();
        let count = pending.len();
        pending.clear();
        count
    }
}

impl<T> Default for InFlightTracker<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
