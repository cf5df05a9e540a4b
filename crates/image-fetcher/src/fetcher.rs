//! HTTP client for fetching remote images

use crate::error::{FetchError, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = "scrapbook-image-cache/0.1";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Body and content type of a successfully fetched image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// HTTP client for fetching images from arbitrary hosts
///
/// The client keeps no cookie store and never attaches credentials, so every
/// request is an anonymous cross-origin GET.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new fetcher with default settings (30 second timeout)
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new fetcher with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Fetch an image; any non-2xx status is an error
    pub async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        debug!(url = %url, "Fetching image");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "image/*")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, url = %url, "Failed to fetch image");
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let data = response.bytes().await?.to_vec();

        debug!(
            url = %url,
            size = data.len(),
            content_type = %content_type,
            "Fetched image"
        );

        Ok(FetchedImage { data, content_type })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}
