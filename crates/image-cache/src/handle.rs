//! Session-scoped local handles to image bytes

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// URI scheme prefix of every handle, mirroring browser object URLs
pub const HANDLE_SCHEME: &str = "blob:";

struct HandleInner {
    uri: String,
    source: String,
    content_type: String,
    data: RwLock<Option<Arc<[u8]>>>,
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        trace!(uri = %self.uri, source = %self.source, "Dropped local handle");
    }
}

/// An in-process reference to fetched image bytes
///
/// Clones share the same underlying bytes. The bytes live until [`release`]
/// is called (by the owning store on clear) or the last clone is dropped,
/// whichever comes first. A released handle keeps its URI but no longer
/// yields data.
///
/// [`release`]: LocalHandle::release
#[derive(Clone)]
pub struct LocalHandle {
    inner: Arc<HandleInner>,
}

impl LocalHandle {
    pub(crate) fn new(uri: String, source: &str, content_type: String, data: Arc<[u8]>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                uri,
                source: source.to_string(),
                content_type,
                data: RwLock::new(Some(data)),
            }),
        }
    }

    /// Session-scoped identifier, e.g. `blob:scrapbook/3`
    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    /// The remote URL this handle was filled from
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    pub fn content_type(&self) -> &str {
        &self.inner.content_type
    }

    /// The image bytes, or `None` once released
    pub fn bytes(&self) -> Option<Arc<[u8]>> {
        self.inner
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_released(&self) -> bool {
        self.inner
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Free the bytes for every clone of this handle. Returns false if it was
    /// already released.
    pub(crate) fn release(&self) -> bool {
        let released = self
            .inner
            .data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            trace!(uri = %self.inner.uri, "Released local handle");
        }
        released.is_some()
    }
}

impl PartialEq for LocalHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.uri == other.inner.uri
    }
}

impl Eq for LocalHandle {}

impl fmt::Debug for LocalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalHandle")
            .field("uri", &self.inner.uri)
            .field("source", &self.inner.source)
            .field("content_type", &self.inner.content_type)
            .field("released", &self.is_released())
            .finish()
    }
}
