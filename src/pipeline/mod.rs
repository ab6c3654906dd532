mod pool;

use std::collections::HashSet;
use std::path::Path;
use std::pin::pin;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::ingest::CsvTable;
use crate::models::{Article, NewLabel, TrainingData};
use crate::services::{ContentFetcher, Scraper};

/// Result of storing a single article.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted,
    /// The url was already stored; nothing was written.
    AlreadyExists,
    Failed(AppError),
}

/// Owns the store and moves urls from CSV files through scraping into it.
pub struct Pipeline {
    repository: Repository,
    scraper: Arc<dyn Scraper>,
    max_concurrent_fetches: usize,
}

impl Pipeline {
    pub async fn open(
        db_path: &str,
        scraper: Arc<dyn Scraper>,
        max_concurrent_fetches: usize,
    ) -> Result<Self> {
        let repository = Repository::new(db_path).await?;
        Ok(Self {
            repository,
            scraper,
            max_concurrent_fetches,
        })
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        let fetcher = ContentFetcher::new(config)?;
        Self::open(
            &config.db_path,
            Arc::new(fetcher),
            config.max_concurrent_fetches,
        )
        .await
    }

    /// Stores one article. Store errors are logged and returned as
    /// [`InsertOutcome::Failed`] rather than propagated.
    pub async fn insert_article(&self, article: Article) -> InsertOutcome {
        let url = article.url.clone();
        match self.repository.insert_article(article).await {
            Ok(true) => {
                debug!(%url, "Stored article");
                InsertOutcome::Inserted
            }
            Ok(false) => {
                warn!(%url, "URL already exists in article table, skipping");
                InsertOutcome::AlreadyExists
            }
            Err(e) => {
                error!(%url, error = %e, "Failed to store article");
                InsertOutcome::Failed(e)
            }
        }
    }

    /// Scrapes and stores every url in `url_column` that is not stored yet.
    ///
    /// Failures for individual urls are logged and skipped; only reading the
    /// csv or the existing urls can fail the call.
    pub async fn process_urls(&self, csv_path: &Path, url_column: &str) -> Result<()> {
        let table = CsvTable::read(csv_path)?;
        if table.is_empty() {
            warn!(path = %csv_path.display(), "CSV has no rows");
        }
        let urls = table.column(url_column)?;
        let existing = self.repository.article_urls().await?;
        let pending = unseen(urls, &existing);

        info!(
            rows = table.len(),
            pending = pending.len(),
            path = %csv_path.display(),
            "Processing urls"
        );
        if pending.is_empty() {
            return Ok(());
        }

        let mut results = pin!(pool::scrape_unordered(
            Arc::clone(&self.scraper),
            pending,
            self.max_concurrent_fetches,
        ));

        let mut stored = 0usize;
        while let Some((url, result)) = results.next().await {
            match result {
                Ok(Some(article)) => {
                    info!(%url, title = %article.title, "Scraped article");
                    if let InsertOutcome::Inserted = self.insert_article(article).await {
                        stored += 1;
                    }
                }
                Ok(None) => debug!(%url, "No article content"),
                Err(e) => error!(%url, error = %e, "Scrape failed"),
            }
        }

        info!(stored, "Finished processing urls");
        Ok(())
    }

    /// Stores url/category pairs for urls without a label, in one transaction.
    pub async fn process_labeled_data(
        &self,
        csv_path: &Path,
        url_column: &str,
        label_column: &str,
    ) -> Result<()> {
        let table = CsvTable::read(csv_path)?;
        let urls = table.column(url_column)?;
        let categories = table.column(label_column)?;

        let mut seen = self.repository.label_urls().await?;
        let labels: Vec<NewLabel> = urls
            .into_iter()
            .zip(categories)
            .filter(|(url, _)| !url.is_empty() && seen.insert(url.clone()))
            .map(|(url, category)| NewLabel { url, category })
            .collect();

        if labels.is_empty() {
            info!(path = %csv_path.display(), "No new labels");
            return Ok(());
        }

        let inserted = self.repository.insert_labels(labels).await?;
        info!(inserted, path = %csv_path.display(), "Stored labels");
        Ok(())
    }

    /// Content and category for every url present in both tables.
    pub async fn training_data(&self) -> Result<TrainingData> {
        self.repository.training_data().await
    }

    pub async fn article_count(&self) -> Result<i64> {
        self.repository.article_count().await
    }

    pub async fn label_count(&self) -> Result<i64> {
        self.repository.label_count().await
    }
}

/// Non-blank urls not in `existing`, first occurrence only, input order kept.
fn unseen(urls: Vec<String>, existing: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| !url.is_empty() && !existing.contains(url) && seen.insert(url.clone()))
        .collect()
}
