//! image-cache-warm - pre-populate the scrapbook image cache
//!
//! Fetches a list of image URLs through the cache so they land in the
//! durable store ahead of the first page load.

use clap::Parser;
use image_cache::{CacheStats, DurableStats, ImageCache, ImageCacheConfig, ImageCacheError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "image-cache-warm",
    about = "Warm the scrapbook image cache for a list of URLs"
)]
struct Args {
    /// Image URLs to warm
    urls: Vec<String>,

    /// Read additional URLs from a file, one per line
    #[arg(long)]
    file: Option<PathBuf>,

    /// Images dispatched per group
    #[arg(long)]
    batch_size: Option<usize>,

    /// Milliseconds between group dispatches
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Clear the memory and durable tiers before warming
    #[arg(long)]
    clear: bool,

    /// Skip the durable tier
    #[arg(long)]
    no_durable: bool,
}

#[derive(Debug, Serialize)]
struct Summary {
    requested: usize,
    cached: usize,
    fallback: usize,
    durable: bool,
    stats: CacheStats,
    durable_stats: Option<DurableStats>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive("image_cache=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    };

    let args = Args::parse();
    let config = load_config(&args);
    info!("Cache dir: {:?}", config.cache_dir);
    info!(
        "Batch size: {}, delay: {} ms",
        config.preload.batch_size,
        config.preload.delay.as_millis()
    );

    let urls = collect_urls(&args).await?;
    if urls.is_empty() {
        return Err(ImageCacheError::Config("no URLs given".to_string()));
    }

    let cache = ImageCache::open(&config).await;
    if args.clear {
        cache.clear_all().await;
    }

    info!("Warming {} images", urls.len());
    if let Err(e) = cache.preload(urls.iter().cloned()).await {
        warn!(error = %e, "Preload dispatcher stopped early");
    }

    let cached = urls.iter().filter(|url| cache.is_resolved(url)).count();
    let summary = Summary {
        requested: urls.len(),
        cached,
        fallback: urls.len() - cached,
        durable: cache.durable_available(),
        stats: cache.stats(),
        durable_stats: cache.durable_stats().await,
    };
    info!(
        cached = summary.cached,
        fallback = summary.fallback,
        "Warm-up complete"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn load_config(args: &Args) -> ImageCacheConfig {
    let mut config = ImageCacheConfig::from_env();

    if args.no_durable {
        config.cache_dir = None;
    }
    if let Some(batch_size) = args.batch_size {
        config.preload.batch_size = batch_size;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.preload.delay = Duration::from_millis(delay_ms);
    }

    config
}

/// Positional URLs followed by file URLs, trimmed, blank lines and `#`
/// comments skipped, duplicates dropped
async fn collect_urls(args: &Args) -> Result<Vec<String>> {
    let mut urls = args.urls.clone();

    if let Some(path) = &args.file {
        let contents = tokio::fs::read_to_string(path).await?;
        urls.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }

    let mut seen = HashSet::new();
    urls.retain(|url| !url.is_empty() && seen.insert(url.clone()));
    Ok(urls)
}
