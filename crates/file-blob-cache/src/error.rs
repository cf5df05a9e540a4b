//! Error types for the blob store

use std::fmt;

#[derive(Debug)]
pub enum BlobCacheError {
    Io(Box<std::io::Error>),
    Serialization(String),
}

impl fmt::Display for BlobCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobCacheError::Io(err) => write!(f, "IO error: {}", err),
            BlobCacheError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for BlobCacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlobCacheError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BlobCacheError {
    fn from(err: std::io::Error) -> Self {
        BlobCacheError::Io(Box::new(err))
    }
}

impl From<serde_json::Error> for BlobCacheError {
    fn from(err: serde_json::Error) -> Self {
        BlobCacheError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BlobCacheError>;
