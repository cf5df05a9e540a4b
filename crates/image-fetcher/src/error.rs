//! Error types for the image fetcher

use std::fmt;

#[derive(Debug)]
pub enum FetchError {
    Http(Box<reqwest::Error>),
    Status(u16),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(err) => write!(f, "HTTP error: {}", err),
            FetchError::Status(code) => write!(f, "Server returned status {}", code),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
