use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{parse_datetime, Article};

use super::Scraper;

const HTML_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

const DATE_SOURCES: &[(&str, &str)] = &[
    (r#"meta[property="article:published_time"]"#, "content"),
    (r#"meta[itemprop="datePublished"]"#, "content"),
    (r#"meta[name="pubdate"]"#, "content"),
    (r#"meta[name="date"]"#, "content"),
    ("time[datetime]", "datetime"),
];

pub struct ContentFetcher {
    client: Client,
}

impl ContentFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Scraper for ContentFetcher {
    async fn scrape(&self, url: &str) -> Result<Option<Article>> {
        let parsed = Url::parse(url).map_err(|_| AppError::InvalidUrl(url.to_string()))?;

        let response = self.client.get(parsed).send().await?;

        if !response.status().is_success() {
            return Err(AppError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        // Servers that omit the header are almost always serving HTML
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(media_type)
            .unwrap_or_else(|| "text/html".to_string());

        let body = response.text().await?;

        Ok(extract_article(url, &body, &content_type))
    }
}

/// Strips parameters such as `charset` from a Content-Type value.
fn media_type(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Builds an [`Article`] from a fetched body, or `None` when there is no
/// usable text.
///
/// `url` is stored exactly as given so later dedup checks match the input.
pub fn extract_article(url: &str, body: &str, content_type: &str) -> Option<Article> {
    let domain = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();

    if content_type == "text/plain" {
        let content = clean_lines(body);
        if content.is_empty() {
            return None;
        }
        return Some(Article {
            title: String::new(),
            url: url.to_string(),
            authors: Vec::new(),
            published_at: None,
            domain,
            content,
            content_type: content_type.to_string(),
        });
    }

    if !HTML_TYPES.contains(&content_type) {
        tracing::debug!(%url, content_type, "Unsupported content type");
        return None;
    }

    let document = Html::parse_document(body);

    let content = extract_content(&document, body);
    if content.is_empty() {
        tracing::debug!(%url, "No readable content");
        return None;
    }

    Some(Article {
        title: extract_title(&document),
        url: url.to_string(),
        authors: extract_authors(&document),
        published_at: extract_published(&document),
        domain,
        content,
        content_type: content_type.to_string(),
    })
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_lines(text: &str) -> String {
    text.lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn attr_values(document: &Html, css: &str, attr: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(collapse_whitespace)
        .filter(|v| !v.is_empty())
        .collect()
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn extract_title(document: &Html) -> String {
    attr_values(document, r#"meta[property="og:title"]"#, "content")
        .into_iter()
        .next()
        .or_else(|| first_text(document, "title"))
        .or_else(|| first_text(document, "h1"))
        .unwrap_or_default()
}

fn extract_authors(document: &Html) -> Vec<String> {
    let mut candidates = attr_values(document, r#"meta[name="author"]"#, "content");
    candidates.extend(
        attr_values(document, r#"meta[property="article:author"]"#, "content")
            .into_iter()
            // Facebook profile links, not names
            .filter(|v| !v.starts_with("http")),
    );
    if let Some(sel) = selector(r#"[rel="author"]"#) {
        candidates.extend(document.select(&sel).map(element_text));
    }

    let mut authors: Vec<String> = Vec::new();
    for name in candidates {
        if !name.is_empty() && !authors.contains(&name) {
            authors.push(name);
        }
    }
    authors
}

fn extract_published(document: &Html) -> Option<chrono::DateTime<chrono::Utc>> {
    DATE_SOURCES.iter().find_map(|(css, attr)| {
        attr_values(document, css, attr)
            .iter()
            .find_map(|v| parse_datetime(v))
    })
}

fn extract_content(document: &Html, body: &str) -> String {
    for css in ["article p", "p"] {
        let Some(sel) = selector(css) else {
            continue;
        };
        let paragraphs: Vec<String> = document
            .select(&sel)
            .map(element_text)
            .filter(|p| !p.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            return paragraphs.join("\n\n");
        }
    }

    // No <p> structure at all, fall back to a plain-text rendering
    match html2text::from_read(body.as_bytes(), 80) {
        Ok(text) => clean_lines(&text),
        Err(e) => {
            tracing::debug!("Failed to convert HTML to text: {}", e);
            String::new()
        }
    }
}
