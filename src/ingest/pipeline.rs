use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::feed::{parse_document, FeedResolver, Transport};
use crate::models::{FeedSource, IngestReport, IngestStatus};
use crate::registry::FeedRegistry;

use super::reconciler::build_batch;

/// Fetch, resolve, parse and store one feed.
pub struct Pipeline<T> {
    transport: T,
    repository: Arc<Repository>,
    registry: Arc<Mutex<FeedRegistry>>,
}

impl<T: Transport> Pipeline<T> {
    pub fn new(transport: T, repository: Arc<Repository>, registry: Arc<Mutex<FeedRegistry>>) -> Self {
        Self {
            transport,
            repository,
            registry,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run the pipeline for `feed`.
    ///
    /// Any stage failing fails the whole run. A cancelled run is not an
    /// error: it reports [`IngestStatus::Cancelled`] and writes nothing.
    pub async fn run(&self, feed: &FeedSource, cancel: &CancelToken) -> Result<IngestStatus> {
        match self.ingest(feed, cancel).await {
            Ok(report) => Ok(IngestStatus::Completed(report)),
            Err(AppError::Cancelled) => {
                debug!("refresh of {} cancelled", feed.title);
                Ok(IngestStatus::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    async fn ingest(&self, feed: &FeedSource, cancel: &CancelToken) -> Result<IngestReport> {
        let resolution = FeedResolver::new(&self.transport)
            .resolve(&feed.url, cancel)
            .await?;

        if let Some(url) = &resolution.corrected_url {
            self.remember_url(feed, url).await;
        }

        let entries = parse_document(&resolution.document)?;
        let batch = build_batch(feed.feed_id(), entries, Utc::now().timestamp_millis());
        let entries = batch.articles.len();

        cancel.check()?;

        // Articles first: an overlay never exists without its article.
        let articles_written = self.repository.replace_articles(batch.articles).await?;
        let states_created = self.repository.insert_states(batch.states).await?;

        info!(
            "{}: {} entries, {} articles written, {} new",
            feed.title, entries, articles_written, states_created
        );

        Ok(IngestReport {
            entries,
            articles_written,
            states_created,
        })
    }

    async fn remember_url(&self, feed: &FeedSource, url: &str) {
        let mut registry = self.registry.lock().await;
        match registry.update_url(&feed.title, url) {
            Ok(true) => info!("{}: feed URL corrected to {}", feed.title, url),
            Ok(false) => debug!("{} is no longer registered", feed.title),
            Err(e) => warn!("{}: could not store corrected URL: {}", feed.title, e),
        }
    }
}
