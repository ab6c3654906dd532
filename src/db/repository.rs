use std::collections::HashSet;

use rusqlite::params;
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::{Article, NewLabel, TrainingData};

use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let unavailable = |source: tokio_rusqlite::Error| AppError::StorageUnavailable {
            path: db_path.to_string(),
            source,
        };

        let conn = Connection::open(db_path).await.map_err(unavailable)?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(unavailable)?;

        Ok(Self { conn })
    }

    // Article operations

    /// Returns `false` without writing when the url is already stored.
    pub async fn insert_article(&self, article: Article) -> Result<bool> {
        let inserted = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "INSERT INTO Articles (title, url, author, datetime, domain, content, content_type)
                     SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
                     WHERE NOT EXISTS (SELECT 1 FROM Articles WHERE url = ?2)",
                    params![
                        article.title,
                        article.url,
                        article.authors_string(),
                        article.pub_date_string(),
                        article.domain,
                        article.content,
                        article.content_type,
                    ],
                )?;
                Ok(changed > 0)
            })
            .await?;
        Ok(inserted)
    }

    pub async fn article_urls(&self) -> Result<HashSet<String>> {
        self.urls_in("SELECT url FROM Articles").await
    }

    pub async fn article_count(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM Articles").await
    }

    // Label operations

    pub async fn label_urls(&self) -> Result<HashSet<String>> {
        self.urls_in("SELECT url FROM Labels").await
    }

    /// Inserts every label in a single transaction.
    pub async fn insert_labels(&self, labels: Vec<NewLabel>) -> Result<usize> {
        let inserted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt =
                        tx.prepare("INSERT INTO Labels (url, category) VALUES (?1, ?2)")?;
                    for label in &labels {
                        stmt.execute(params![label.url, label.category])?;
                    }
                }
                tx.commit()?;
                Ok(labels.len())
            })
            .await?;
        Ok(inserted)
    }

    pub async fn label_count(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM Labels").await
    }

    // Training data

    pub async fn training_data(&self) -> Result<TrainingData> {
        let data = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT Articles.content, Labels.category
                     FROM Articles INNER JOIN Labels ON Articles.url = Labels.url",
                )?;
                let mut rows = stmt.query([])?;
                let mut data = TrainingData::default();
                while let Some(row) = rows.next()? {
                    let content: Option<String> = row.get(0)?;
                    let category: Option<String> = row.get(1)?;
                    data.push(content.unwrap_or_default(), category.unwrap_or_default());
                }
                Ok(data)
            })
            .await?;
        Ok(data)
    }

    async fn urls_in(&self, sql: &'static str) -> Result<HashSet<String>> {
        let urls = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(sql)?;
                let urls = stmt
                    .query_map([], |row| row.get::<_, Option<String>>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(urls.into_iter().flatten().collect::<HashSet<_>>())
            })
            .await?;
        Ok(urls)
    }

    async fn count(&self, sql: &'static str) -> Result<i64> {
        let count = self
            .conn
            .call(move |conn| Ok(conn.query_row(sql, [], |row| row.get::<_, i64>(0))?))
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn article(url: &str, content: &str) -> Article {
        Article {
            title: format!("Title for {url}"),
            url: url.to_string(),
            authors: vec!["Reporter".to_string()],
            published_at: None,
            domain: "a.test".to_string(),
            content: content.to_string(),
            content_type: "text/html".to_string(),
        }
    }

    fn label(url: &str, category: &str) -> NewLabel {
        NewLabel {
            url: url.to_string(),
            category: category.to_string(),
        }
    }

    async fn repo(dir: &TempDir) -> Repository {
        let path = dir.path().join("store.db");
        Repository::new(path.to_str().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.db");
        let path = path.to_str().unwrap();

        let first = Repository::new(path).await.unwrap();
        assert!(first.insert_article(article("http://a.test", "x")).await.unwrap());
        drop(first);

        let reopened = Repository::new(path).await.unwrap();
        assert_eq!(reopened.article_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unwritable_path_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("store.db");
        let err = Repository::new(path.to_str().unwrap()).await.err().unwrap();
        assert!(matches!(err, AppError::StorageUnavailable { .. }));
    }

    #[tokio::test]
    async fn store_with_repeated_urls_still_opens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.db");
        {
            let conn = rusqlite::Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE Articles (title TEXT, url TEXT, author TEXT, datetime TEXT,
                                        domain TEXT, content TEXT, content_type TEXT);
                 INSERT INTO Articles (url, content) VALUES ('http://a.test', 'one');
                 INSERT INTO Articles (url, content) VALUES ('http://a.test', 'two');",
            )
            .unwrap();
        }

        let repo = Repository::new(path.to_str().unwrap()).await.unwrap();
        assert_eq!(repo.article_count().await.unwrap(), 2);
        assert!(!repo.insert_article(article("http://a.test", "three")).await.unwrap());
        assert!(repo.insert_article(article("http://b.test", "x")).await.unwrap());
        assert_eq!(repo.article_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn duplicate_url_is_reported_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir).await;

        assert!(repo.insert_article(article("http://a.test", "first")).await.unwrap());
        assert!(!repo.insert_article(article("http://a.test", "second")).await.unwrap());

        assert_eq!(repo.article_count().await.unwrap(), 1);
        repo.insert_labels(vec![label("http://a.test", "flood")])
            .await
            .unwrap();
        let data = repo.training_data().await.unwrap();
        assert_eq!(data.contents, vec!["first".to_string()]);
    }

    #[tokio::test]
    async fn join_keeps_content_and_label_aligned() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir).await;

        for (url, content) in [
            ("http://a.test", "content a"),
            ("http://b.test", "content b"),
            ("http://c.test", "content c"),
        ] {
            repo.insert_article(article(url, content)).await.unwrap();
        }
        repo.insert_labels(vec![
            label("http://c.test", "label c"),
            label("http://a.test", "label a"),
            label("http://orphan.test", "label orphan"),
        ])
        .await
        .unwrap();

        let data = repo.training_data().await.unwrap();
        assert_eq!(data.len(), 2);
        for (content, label) in data.pairs() {
            assert_eq!(content.replace("content", "label"), label);
        }
    }

    #[tokio::test]
    async fn url_sets_reflect_each_table() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir).await;

        repo.insert_article(article("http://a.test", "x")).await.unwrap();
        repo.insert_labels(vec![label("http://b.test", "drought")])
            .await
            .unwrap();

        let articles = repo.article_urls().await.unwrap();
        let labels = repo.label_urls().await.unwrap();
        assert!(articles.contains("http://a.test") && !articles.contains("http://b.test"));
        assert!(labels.contains("http://b.test") && !labels.contains("http://a.test"));
        assert_eq!(repo.label_count().await.unwrap(), 1);
    }
}
