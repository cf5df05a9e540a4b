//! Background warming of many images at a fixed cadence

use crate::config::PreloadOptions;
use crate::coordinator::ImageCache;
use futures::future::join_all;
use std::collections::HashSet;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

impl ImageCache {
    /// Warm `urls` in the background using this cache's preload defaults
    pub fn preload<I, S>(&self, urls: I) -> JoinHandle<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preload_with(urls, self.preload_options)
    }

    /// Warm `urls` in the background in groups of `options.batch_size`
    ///
    /// Duplicates, empty URLs and URLs already in memory are skipped. Each
    /// group is dispatched without waiting for its resolves to finish, and
    /// the next group goes out no sooner than `options.delay` after the
    /// previous one was dispatched. Nothing is reported back; the returned
    /// handle completes once every dispatched resolve has settled, and may be
    /// dropped without cancelling anything.
    pub fn preload_with<I, S>(&self, urls: I, options: PreloadOptions) -> JoinHandle<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let pending: Vec<String> = urls
            .into_iter()
            .map(Into::into)
            .filter(|url| !url.is_empty() && !self.is_resolved(url))
            .filter(|url| seen.insert(url.clone()))
            .collect();

        let cache = self.clone();
        tokio::spawn(async move {
            if pending.is_empty() {
                return;
            }

            let batch_size = options.batch_size.max(1);
            let mut ticker = if options.delay.is_zero() {
                None
            } else {
                let mut ticker = interval(options.delay);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                Some(ticker)
            };

            debug!(
                count = pending.len(),
                batch_size,
                delay_ms = options.delay.as_millis() as u64,
                "Preloading images"
            );

            let mut resolves = Vec::with_capacity(pending.len());
            for (index, group) in pending.chunks(batch_size).enumerate() {
                // First tick completes immediately
                if let Some(ticker) = ticker.as_mut() {
                    ticker.tick().await;
                }

                debug!(group = index, size = group.len(), "Dispatching preload group");
                for url in group {
                    let cache = cache.clone();
                    let url = url.clone();
                    resolves.push(tokio::spawn(async move {
                        cache.resolve(&url).await;
                    }));
                }
            }

            join_all(resolves).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durable::DurableTier;
    use crate::testing::MockFetcher;
    use std::sync::Arc;
    use std::time::Duration;

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://img.example/{i}.png")).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_groups_dispatch_at_fixed_cadence() {
        let fetcher = Arc::new(MockFetcher::ok().with_delay(Duration::from_millis(500)));
        let cache = ImageCache::new(fetcher.clone(), DurableTier::disabled());

        let dispatcher = cache.preload_with(
            urls(20),
            PreloadOptions {
                batch_size: 5,
                delay: Duration::from_millis(100),
            },
        );
        dispatcher.await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let log = fetcher.call_log();
        assert_eq!(log.len(), 20);

        let start = log[0].1;
        let mut group_starts = Vec::new();
        for (group, chunk) in log.chunks(5).enumerate() {
            // Each group holds exactly the next five URLs, in order
            for (offset, (url, _)) in chunk.iter().enumerate() {
                assert_eq!(url, &format!("https://img.example/{}.png", group * 5 + offset));
            }
            let first = chunk[0].1;
            assert!(chunk.iter().all(|(_, at)| *at == first));
            group_starts.push(first);
        }

        assert_eq!(group_starts.len(), 4);
        for pair in group_starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
        // Dispatch is not gated on the 500ms fetches completing
        assert!(group_starts[3] - start < Duration::from_millis(500));
        assert_eq!(cache.stats().memory_cached, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_duplicates_empty_and_resolved() {
        let fetcher = Arc::new(MockFetcher::ok());
        let cache = ImageCache::new(fetcher.clone(), DurableTier::disabled());

        cache.resolve("https://img.example/warm.png").await;

        cache
            .preload(vec![
                "https://img.example/a.png",
                "",
                "https://img.example/a.png",
                "https://img.example/warm.png",
                "https://img.example/b.png",
            ])
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(fetcher.calls_for("https://img.example/a.png"), 1);
        assert_eq!(fetcher.calls_for("https://img.example/warm.png"), 1);
        assert_eq!(fetcher.calls_for("https://img.example/b.png"), 1);
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_swallowed() {
        let fetcher = Arc::new(MockFetcher::failing(404));
        let cache = ImageCache::new(fetcher.clone(), DurableTier::disabled());

        cache.preload(urls(7)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(fetcher.calls(), 7);
        assert_eq!(cache.stats().memory_cached, 0);
        assert_eq!(cache.stats().loading, 0);
    }

    #[tokio::test]
    async fn test_zero_batch_size_and_delay() {
        let fetcher = Arc::new(MockFetcher::ok());
        let cache = ImageCache::new(fetcher.clone(), DurableTier::disabled());

        cache
            .preload_with(
                urls(3),
                PreloadOptions {
                    batch_size: 0,
                    delay: Duration::ZERO,
                },
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(fetcher.calls(), 3);
        assert_eq!(cache.stats().memory_cached, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatcher_completes_after_every_resolve() {
        let fetcher = Arc::new(MockFetcher::ok().with_delay(Duration::from_millis(300)));
        let cache = ImageCache::new(fetcher.clone(), DurableTier::disabled());

        cache.preload(urls(12)).await.unwrap();

        assert_eq!(fetcher.calls(), 12);
        assert_eq!(cache.stats().loading, 0);
        assert_eq!(cache.stats().memory_cached, 12);
    }

    #[tokio::test]
    async fn test_dispatcher_can_be_dropped() {
        let fetcher = Arc::new(MockFetcher::ok());
        let cache = ImageCache::new(fetcher.clone(), DurableTier::disabled());

        drop(cache.preload(urls(2)));
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(cache.stats().memory_cached, 2);
    }
}
