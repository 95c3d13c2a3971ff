use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::cli::{Command, USAGE};
use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::feed::{FeedCandidate, FeedFetcher, FeedResolver, Transport};
use crate::ingest::Pipeline;
use crate::models::{FeedSource, IngestStatus, NewsItem};
use crate::registry::FeedRegistry;

/// Outcome of refreshing one feed.
pub struct RefreshResult {
    pub feed: FeedSource,
    pub result: Result<IngestStatus>,
}

pub struct App<T = FeedFetcher> {
    config: Config,
    pub registry: Arc<Mutex<FeedRegistry>>,
    pub repository: Arc<Repository>,
    pipeline: Pipeline<T>,
    cancel: CancelToken,
}

impl App<FeedFetcher> {
    pub async fn new(config: &Config) -> Result<Self> {
        Self::with_transport(config, FeedFetcher::new()?).await
    }
}

impl<T: Transport> App<T> {
    pub async fn with_transport(config: &Config, transport: T) -> Result<Self> {
        let repository = Arc::new(Repository::new(&config.db_path).await?);
        let registry = Arc::new(Mutex::new(FeedRegistry::load(&config.feeds_path)?));
        let pipeline = Pipeline::new(transport, repository.clone(), registry.clone());

        Ok(Self {
            config: config.clone(),
            registry,
            repository,
            pipeline,
            cancel: CancelToken::new(),
        })
    }

    /// Token shared by every refresh this app starts.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Refresh every feed, or only the one at `position`.
    ///
    /// Feeds are fetched concurrently up to `max_concurrent_fetches`. A
    /// failing feed never stops the others. Results come back in registry
    /// order.
    pub async fn refresh_feeds(&self, position: Option<usize>) -> Result<Vec<RefreshResult>> {
        let feeds = match position {
            Some(pos) => vec![self.feed_at(pos).await?],
            None => self.registry.lock().await.feeds().to_vec(),
        };

        let mut results: Vec<RefreshResult> = stream::iter(feeds)
            .map(|feed| async move {
                let result = self.pipeline.run(&feed, &self.cancel).await;
                if let Err(e) = &result {
                    debug!("Failed to refresh {}: {}", feed.url, e);
                }
                RefreshResult { feed, result }
            })
            .buffer_unordered(self.config.max_concurrent_fetches.max(1))
            .collect()
            .await;

        results.sort_by_key(|r| r.feed.position);
        Ok(results)
    }

    /// Run one command and return what should be shown to the user.
    pub async fn execute(&self, command: Command) -> Result<String> {
        match command {
            Command::Help => Ok(USAGE.to_string()),
            Command::List => self.list().await,
            Command::Discover(url) => {
                let candidates = FeedResolver::new(self.pipeline.transport())
                    .discover(&url)
                    .await?;
                Ok(format_candidates(&candidates))
            }
            Command::Add { title, url } => {
                let feed = self.registry.lock().await.add(&title, &url)?;
                Ok(format!("added {}. {}", feed.position, feed.title))
            }
            Command::Remove(pos) => {
                let feed = self.registry.lock().await.remove(pos)?;
                Ok(format!("removed {}", feed.title))
            }
            Command::Swap(a, b) => {
                self.registry.lock().await.swap(a, b)?;
                self.list().await
            }
            Command::SetUrl { title, url } => {
                if self.registry.lock().await.update_url(&title, &url)? {
                    Ok(format!("{} now points at {}", title, url))
                } else {
                    Err(AppError::Registry(format!("no feed titled '{}'", title)))
                }
            }
            Command::Refresh(pos) => {
                let results = self.refresh_feeds(pos).await?;
                Ok(format_refresh(&results))
            }
            Command::News(pos) => {
                let items = match pos {
                    Some(pos) => {
                        let feed = self.feed_at(pos).await?;
                        self.repository.news_for_feed(feed.feed_id()).await?
                    }
                    None => self.repository.all_news().await?,
                };
                Ok(format_news(&items))
            }
            Command::MarkRead {
                position,
                article_id,
                read,
            } => {
                let feed = self.feed_at(position).await?;
                let found = self
                    .repository
                    .mark_read(&article_id, feed.feed_id(), read)
                    .await?;
                Ok(flag_message(found, &article_id, &feed, if read { "read" } else { "unread" }))
            }
            Command::Bookmark {
                position,
                article_id,
                bookmarked,
            } => {
                let feed = self.feed_at(position).await?;
                let found = self
                    .repository
                    .set_bookmarked(&article_id, feed.feed_id(), bookmarked)
                    .await?;
                let state = if bookmarked { "bookmarked" } else { "unbookmarked" };
                Ok(flag_message(found, &article_id, &feed, state))
            }
            Command::Bookmarks => {
                let items = self.repository.bookmarks().await?;
                Ok(format_news(&items))
            }
            Command::Cleanup => {
                let cutoff = Utc::now().timestamp_millis() - self.config.retention_ms();
                let report = self.repository.cleanup(cutoff).await?;
                Ok(format!(
                    "removed {} articles ({} read states)",
                    report.articles_removed, report.states_removed
                ))
            }
        }
    }

    async fn list(&self) -> Result<String> {
        let registry = self.registry.lock().await;
        if registry.is_empty() {
            return Ok("no feeds configured".to_string());
        }

        let mut out = String::new();
        for feed in registry.feeds() {
            let _ = writeln!(out, "{}. {} <{}>", feed.position, feed.title, feed.url);
        }
        Ok(out)
    }

    async fn feed_at(&self, position: usize) -> Result<FeedSource> {
        self.registry
            .lock()
            .await
            .get(position)
            .cloned()
            .ok_or_else(|| AppError::Registry(format!("no feed at position {}", position)))
    }
}

fn format_refresh(results: &[RefreshResult]) -> String {
    let mut out = String::new();
    for r in results {
        match &r.result {
            Ok(IngestStatus::Completed(report)) => {
                let _ = writeln!(
                    out,
                    "{}: {} entries, {} new",
                    r.feed.title, report.entries, report.states_created
                );
            }
            Ok(IngestStatus::Cancelled) => {
                let _ = writeln!(out, "{}: cancelled", r.feed.title);
            }
            Err(e) => {
                warn!("refresh of {} failed: {}", r.feed.title, e);
                let _ = writeln!(out, "could not refresh {}", r.feed.title);
            }
        }
    }
    out
}

fn format_candidates(candidates: &[FeedCandidate]) -> String {
    let mut out = String::new();
    for candidate in candidates {
        let title = candidate.title.as_deref().unwrap_or("untitled");
        match &candidate.media_type {
            Some(media_type) => {
                let _ = writeln!(out, "{} <{}> ({})", title, candidate.url, media_type);
            }
            None => {
                let _ = writeln!(out, "{} <{}>", title, candidate.url);
            }
        }
    }
    out
}

fn format_news(items: &[NewsItem]) -> String {
    if items.is_empty() {
        return "no articles".to_string();
    }

    let mut out = String::new();
    for item in items {
        let read = if item.is_read { ' ' } else { '*' };
        let bookmark = if item.is_bookmarked { 'B' } else { ' ' };
        let date = item
            .published()
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown date".to_string());
        let _ = writeln!(
            out,
            "{}{} {} [{}] {}  ({})",
            read, bookmark, date, item.feed_id, item.title, item.article_id
        );
    }
    out
}

fn flag_message(found: bool, article_id: &str, feed: &FeedSource, state: &str) -> String {
    if found {
        format!("{} marked {}", article_id, state)
    } else {
        format!("no article {} in {}", article_id, feed.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IngestReport;

    fn feed(position: usize, title: &str) -> FeedSource {
        FeedSource {
            position,
            title: title.to_string(),
            url: format!("https://{}.example.com", position),
        }
    }

    #[test]
    fn test_refresh_failure_message_is_generic() {
        let results = vec![
            RefreshResult {
                feed: feed(1, "Tech"),
                result: Ok(IngestStatus::Completed(IngestReport {
                    entries: 3,
                    articles_written: 3,
                    states_created: 1,
                })),
            },
            RefreshResult {
                feed: feed(2, "Sports"),
                result: Err(AppError::Parse("unexpected end of input".to_string())),
            },
            RefreshResult {
                feed: feed(3, "World"),
                result: Ok(IngestStatus::Cancelled),
            },
        ];

        let out = format_refresh(&results);
        assert_eq!(
            out,
            "Tech: 3 entries, 1 new\ncould not refresh Sports\nWorld: cancelled\n"
        );
        assert!(!out.contains("unexpected"));
    }

    #[test]
    fn test_format_news_flags() {
        let item = NewsItem {
            row_id: 1,
            article_id: "guid-1".to_string(),
            feed_id: "Tech".to_string(),
            author: None,
            title: "Hello".to_string(),
            published_at: 0,
            content: String::new(),
            url: None,
            saved_at: 0,
            is_read: false,
            is_bookmarked: true,
        };
        assert_eq!(format_news(&[item]), "*B unknown date [Tech] Hello  (guid-1)\n");
        assert_eq!(format_news(&[]), "no articles");
    }
}
