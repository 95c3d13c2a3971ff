use chrono::{DateTime, TimeZone, Utc};

/// A row of the `news` table, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub row_id: i64,
    pub article_id: String,
    pub feed_id: String,
    pub author: Option<String>,
    pub title: String,
    /// Milliseconds since the epoch; 0 means the date is unknown.
    pub published_at: i64,
    pub content: String,
    pub url: Option<String>,
    pub saved_at: i64,
}

/// A row of the `my_news` table, written only on first ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticleState {
    pub row_id: i64,
    pub article_id: String,
    pub feed_id: String,
    pub is_read: bool,
    pub is_bookmarked: bool,
}

impl NewArticleState {
    pub fn unread(row_id: i64, article_id: &str, feed_id: &str) -> Self {
        Self {
            row_id,
            article_id: article_id.to_string(),
            feed_id: feed_id.to_string(),
            is_read: false,
            is_bookmarked: false,
        }
    }
}

/// An article joined with its read/bookmark overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    pub row_id: i64,
    pub article_id: String,
    pub feed_id: String,
    pub author: Option<String>,
    pub title: String,
    pub published_at: i64,
    pub content: String,
    pub url: Option<String>,
    pub saved_at: i64,
    pub is_read: bool,
    pub is_bookmarked: bool,
}

impl NewsItem {
    /// Publication date, or `None` when the feed did not carry one.
    pub fn published(&self) -> Option<DateTime<Utc>> {
        if self.published_at == 0 {
            return None;
        }
        Utc.timestamp_millis_opt(self.published_at).single()
    }
}
