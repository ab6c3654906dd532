use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};

use crate::error::{AppError, Result};
use crate::models::Article;
use crate::services::Scraper;

/// Scrapes every url with at most `limit` requests in flight, yielding
/// results in completion order.
///
/// Each scrape runs on its own task, so a panicking scraper only costs that
/// one url.
pub fn scrape_unordered(
    scraper: Arc<dyn Scraper>,
    urls: Vec<String>,
    limit: usize,
) -> impl Stream<Item = (String, Result<Option<Article>>)> {
    stream::iter(urls)
        .map(move |url| {
            let scraper = Arc::clone(&scraper);
            async move {
                let task_url = url.clone();
                let handle = tokio::spawn(async move { scraper.scrape(&task_url).await });
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(AppError::Task(e.to_string())),
                };
                (url, result)
            }
        })
        .buffer_unordered(limit.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    #[derive(Default)]
    struct SlowScraper {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Scraper for SlowScraper {
        async fn scrape(&self, url: &str) -> Result<Option<Article>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.ends_with("/boom") {
                panic!("scraper blew up");
            }
            Ok(None)
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("http://site{i}.test")).collect()
    }

    #[tokio::test]
    async fn never_exceeds_the_limit() {
        let scraper = Arc::new(SlowScraper::default());
        let results: Vec<_> = scrape_unordered(scraper.clone(), urls(12), 3)
            .collect()
            .await;

        assert_eq!(results.len(), 12);
        let peak = scraper.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency was {peak}");
        assert!(peak > 1, "scrapes never overlapped");
    }

    #[tokio::test]
    async fn panicking_scrape_is_reported_per_url() {
        let scraper = Arc::new(SlowScraper::default());
        let mut input = urls(2);
        input.push("http://bad.test/boom".to_string());

        let results: Vec<_> = scrape_unordered(scraper, input, 10).collect().await;

        assert_eq!(results.len(), 3);
        for (url, result) in results {
            if url.ends_with("/boom") {
                assert!(matches!(result, Err(AppError::Task(_))));
            } else {
                assert!(matches!(result, Ok(None)));
            }
        }
    }

    #[tokio::test]
    async fn zero_limit_still_makes_progress() {
        let scraper = Arc::new(SlowScraper::default());
        let results: Vec<_> = scrape_unordered(scraper, urls(2), 0).collect().await;
        assert_eq!(results.len(), 2);
    }
}
