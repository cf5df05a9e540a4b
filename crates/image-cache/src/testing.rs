//! Test doubles for the network and durable tiers

use crate::durable::{DurableResult, DurableStore};
use crate::fetch::ImageFetcher;
use async_trait::async_trait;
use file_blob_cache::Blob;
use image_fetcher::{FetchError, FetchedImage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Fetcher that serves `url` bytes back as the body and counts calls
#[derive(Default)]
pub struct MockFetcher {
    delay: Duration,
    fail_status: Option<u16>,
    log: Mutex<Vec<(String, Instant)>>,
}

impl MockFetcher {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|(u, _)| u == url).count()
    }

    pub fn call_log(&self) -> Vec<(String, Instant)> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        self.log.lock().unwrap().push((url.to_string(), Instant::now()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.fail_status {
            Some(status) => Err(FetchError::Status(status)),
            None => Ok(FetchedImage {
                data: url.as_bytes().to_vec(),
                content_type: "image/png".to_string(),
            }),
        }
    }
}

/// In-memory durable store with call counters
#[derive(Default)]
pub struct MemoryStore {
    put_delay: Duration,
    blobs: Mutex<HashMap<String, Blob>>,
    gets: AtomicUsize,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryStore {
    /// Writes sleep for `delay` before landing
    pub fn with_put_delay(mut self, delay: Duration) -> Self {
        self.put_delay = delay;
        self
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> DurableResult<Option<Blob>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.blobs.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, blob: &Blob) -> DurableResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if !self.put_delay.is_zero() {
            tokio::time::sleep(self.put_delay).await;
        }
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), blob.clone());
        Ok(())
    }

    async fn delete_all(&self) -> DurableResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.blobs.lock().unwrap().clear();
        Ok(())
    }
}

/// Durable store whose every operation fails
#[derive(Default)]
pub struct FailingStore {
    calls: AtomicUsize,
}

impl FailingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurableStore for FailingStore {
    async fn get(&self, _key: &str) -> DurableResult<Option<Blob>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err("storage unavailable".into())
    }

    async fn put(&self, _key: &str, _blob: &Blob) -> DurableResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err("quota exceeded".into())
    }

    async fn delete_all(&self) -> DurableResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err("storage unavailable".into())
    }
}
