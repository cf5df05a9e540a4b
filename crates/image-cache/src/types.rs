//! Core types for the image cache

use crate::handle::LocalHandle;
use serde::Serialize;
use std::fmt;

/// What `resolve` hands back
///
/// Either a local handle to cached bytes, or the URL it was given, unchanged, when
/// there was nothing to resolve or every tier failed. Callers that need to
/// detect failure compare [`ImageRef::as_str`] against the URL they passed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Local(LocalHandle),
    Remote(String),
}

impl ImageRef {
    /// The handle URI, or the remote URL
    pub fn as_str(&self) -> &str {
        match self {
            ImageRef::Local(handle) => handle.uri(),
            ImageRef::Remote(url) => url,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ImageRef::Local(_))
    }

    pub fn handle(&self) -> Option<&LocalHandle> {
        match self {
            ImageRef::Local(handle) => Some(handle),
            ImageRef::Remote(_) => None,
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub memory_cached: usize,
    pub loading: usize,
}
