//! Remote image fetching
//!
//! Issues plain GET requests for image URLs without cookies or credentials
//! and hands back the raw body together with its content type.

pub mod error;
pub mod fetcher;

pub use error::{FetchError, Result};
pub use fetcher::{FetchedImage, HttpFetcher};
