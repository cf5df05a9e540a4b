//! Network tier seam

use async_trait::async_trait;
use image_fetcher::{FetchError, FetchedImage, HttpFetcher};

/// Anything that can fetch a remote image by URL
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError>;
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        HttpFetcher::fetch(self, url).await
    }
}
