mod content_fetcher;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Article;

pub use content_fetcher::ContentFetcher;

/// Turns a url into an [`Article`].
///
/// `Ok(None)` means the page was fetched but had nothing worth keeping.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<Option<Article>>;
}
