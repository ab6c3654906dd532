use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Format used for the `datetime` column of the Articles table.
pub const PUB_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub authors: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub domain: String,
    pub content: String,
    pub content_type: String,
}

impl Article {
    /// Authors joined into the single delimited string stored in `author`.
    pub fn authors_string(&self) -> String {
        self.authors.join(",")
    }

    /// Empty when the publication date is unknown.
    pub fn pub_date_string(&self) -> String {
        self.published_at
            .map(|dt| dt.format(PUB_DATE_FORMAT).to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLabel {
    pub url: String,
    pub category: String,
}

/// Parallel feature/label sequences; `contents[i]` and `labels[i]` come from
/// the same joined row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingData {
    pub contents: Vec<String>,
    pub labels: Vec<String>,
}

impl TrainingData {
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.contents
            .iter()
            .zip(self.labels.iter())
            .map(|(c, l)| (c.as_str(), l.as_str()))
    }

    pub(crate) fn push(&mut self, content: String, label: String) {
        self.contents.push(content);
        self.labels.push(label);
    }
}

pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Stored format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, PUB_DATE_FORMAT) {
        return Some(naive.and_utc());
    }
    // Bare dates show up in a lot of <meta> tags
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}
