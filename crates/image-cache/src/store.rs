//! In-memory map from source URL to local handle

use crate::handle::{LocalHandle, HANDLE_SCHEME};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Owns every handle issued for the current session
///
/// The store is the arena the handles are released from: `release_all`
/// frees the bytes of each handle it holds, including clones still held by
/// consumers, and starts a new epoch. Inserts tagged with an older epoch are
/// refused.
pub struct HandleStore {
    entries: Mutex<HashMap<String, LocalHandle>>,
    session: String,
    next_id: AtomicU64,
    /// Only written while `entries` is locked
    epoch: AtomicU64,
}

impl HandleStore {
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            session: session.into(),
            next_id: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, LocalHandle>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a new handle with a fresh session-scoped URI. The handle is not
    /// stored until passed to [`HandleStore::insert`].
    pub fn mint(&self, source: &str, content_type: String, data: Vec<u8>) -> LocalHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let uri = format!("{}{}/{}", HANDLE_SCHEME, self.session, id);
        LocalHandle::new(uri, source, content_type, Arc::from(data))
    }

    /// Current epoch; pass it back to [`HandleStore::insert`]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Store a handle minted during `epoch`. An existing handle for the
    /// source is kept and returned instead, so issued handles are never
    /// replaced. A handle from a previous epoch is returned without being
    /// stored.
    pub fn insert(&self, source: &str, handle: LocalHandle, epoch: u64) -> LocalHandle {
        let mut entries = self.entries();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return handle;
        }
        entries.entry(source.to_string()).or_insert(handle).clone()
    }

    pub fn get(&self, source: &str) -> Option<LocalHandle> {
        self.entries().get(source).cloned()
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries().contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Release and forget every stored handle; returns how many were released
    pub fn release_all(&self) -> usize {
        let drained: Vec<LocalHandle> = {
            let mut entries = self.entries();
            self.epoch.fetch_add(1, Ordering::SeqCst);
            entries.drain().map(|(_, h)| h).collect()
        };
        drained.iter().filter(|h| h.release()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://img.example/plan.png";

    #[test]
    fn test_mint_assigns_unique_uris() {
        let store = HandleStore::new("test");
        let a = store.mint(URL, "image/png".to_string(), b"a".to_vec());
        let b = store.mint(URL, "image/png".to_string(), b"b".to_vec());

        assert!(a.uri().starts_with("blob:test/"));
        assert_ne!(a.uri(), b.uri());
        assert!(store.is_empty());
    }

    #[test]
    fn test_insert_and_get() {
        let store = HandleStore::new("test");
        let handle = store.mint(URL, "image/png".to_string(), b"a".to_vec());

        let stored = store.insert(URL, handle.clone(), store.epoch());
        assert_eq!(stored, handle);
        assert!(store.contains(URL));
        assert_eq!(store.get(URL), Some(handle));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_keeps_existing_handle() {
        let store = HandleStore::new("test");
        let first = store.mint(URL, "image/png".to_string(), b"a".to_vec());
        let second = store.mint(URL, "image/png".to_string(), b"b".to_vec());

        store.insert(URL, first.clone(), 0);
        let kept = store.insert(URL, second, 0);
        assert_eq!(kept, first);
        assert_eq!(store.get(URL), Some(first));
    }

    #[test]
    fn test_release_all() {
        let store = HandleStore::new("test");
        let a = store.insert(URL, store.mint(URL, "image/png".to_string(), b"a".to_vec()), 0);
        let other = "https://img.example/other.png";
        let b = store.insert(other, store.mint(other, "image/png".to_string(), b"b".to_vec()), 0);

        assert_eq!(store.release_all(), 2);
        assert!(store.is_empty());
        assert!(a.is_released());
        assert!(b.is_released());
        assert!(!store.contains(URL));
        assert_eq!(store.epoch(), 1);
    }

    #[test]
    fn test_insert_from_stale_epoch_is_refused() {
        let store = HandleStore::new("test");
        let stale_epoch = store.epoch();
        store.release_all();

        let handle = store.mint(URL, "image/png".to_string(), b"a".to_vec());
        let returned = store.insert(URL, handle.clone(), stale_epoch);
        assert_eq!(returned, handle);
        assert!(!store.contains(URL));
        assert!(!handle.is_released());
    }
}
