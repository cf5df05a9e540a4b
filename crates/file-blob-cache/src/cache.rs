//! Namespaced file-based blob storage

use crate::error::Result;
use crate::types::{Blob, CacheEntry, CacheStats};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, info, warn};

const BLOB_EXTENSION: &str = "bin";
const META_EXTENSION: &str = "json";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A blob store rooted at `<root>/<namespace>`
///
/// Nothing is held in memory besides hit/miss counters, so a fresh instance
/// pointed at the same directory sees everything a previous one wrote.
pub struct BlobCache {
    /// Namespace directory holding every blob and its metadata sidecar
    dir: PathBuf,
    /// Cache hit counter
    hits: AtomicU64,
    /// Cache miss counter
    misses: AtomicU64,
    /// Suffix source for temp files so concurrent writers never collide
    tmp_seq: AtomicU64,
}

impl BlobCache {
    /// Create a new blob store under `root/namespace`
    pub fn new(root: impl Into<PathBuf>, namespace: &str) -> Self {
        Self {
            dir: root.into().join(namespace),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            tmp_seq: AtomicU64::new(0),
        }
    }

    /// Ensure the namespace directory exists
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        info!(cache_dir = ?self.dir, "Blob cache initialized");
        Ok(())
    }

    /// Directory this store reads and writes
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Generate a file-safe key from a source identifier
    pub fn cache_key(source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, BLOB_EXTENSION))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, META_EXTENSION))
    }

    /// Get a blob by source identifier
    pub async fn get(&self, source: &str) -> Result<Option<Blob>> {
        let key = Self::cache_key(source);

        let data = match fs::read(self.blob_path(&key)).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Blob cache miss");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let content_type = match self.read_entry(&key).await {
            Some(entry) => entry.content_type,
            None => DEFAULT_CONTENT_TYPE.to_string(),
        };

        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, size = data.len(), "Blob cache hit");
        Ok(Some(Blob { data, content_type }))
    }

    async fn read_entry(&self, key: &str) -> Option<CacheEntry> {
        let raw = fs::read(self.meta_path(key)).await.ok()?;
        match serde_json::from_slice(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key = %key, error = %e, "Unreadable blob metadata, using default content type");
                None
            }
        }
    }

    /// Store a blob, replacing any previous blob for the same source
    pub async fn put(&self, source: &str, blob: &Blob) -> Result<()> {
        let key = Self::cache_key(source);

        // delete_all removes the directory; recreate it lazily
        fs::create_dir_all(&self.dir).await?;

        let entry = CacheEntry {
            source: source.to_string(),
            content_type: blob.content_type.clone(),
            size: blob.data.len() as u64,
            created_at: Utc::now(),
        };
        let meta = serde_json::to_vec(&entry)?;

        self.write_atomic(&self.blob_path(&key), &blob.data).await?;
        self.write_atomic(&self.meta_path(&key), &meta).await?;

        debug!(key = %key, size = entry.size, "Stored blob");
        Ok(())
    }

    /// Write to a temp file then rename over the target
    async fn write_atomic(&self, target: &Path, contents: &[u8]) -> Result<()> {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = target.as_os_str().to_owned();
        tmp_name.push(format!(".{}.{}.tmp", std::process::id(), seq));
        let tmp = PathBuf::from(tmp_name);

        if let Err(e) = fs::write(&tmp, contents).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Delete every blob in this namespace
    pub async fn delete_all(&self) -> Result<()> {
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                info!(cache_dir = ?self.dir, "Deleted blob cache namespace");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Get current store statistics
    pub async fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ..Default::default()
        };

        let Ok(mut dir) = fs::read_dir(&self.dir).await else {
            return stats;
        };

        while let Ok(Some(item)) = dir.next_entry().await {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(BLOB_EXTENSION) {
                continue;
            }
            if let Ok(meta) = item.metadata().await {
                stats.entries += 1;
                stats.total_size += meta.len();
            }
        }

        stats
    }
}
