//! The ordered list of configured feeds.
//!
//! Stored as `feed_1 = "<url> <title>"` ... `feed_20` in a TOML file. The URL
//! comes first and the title is everything after the first space, so URLs
//! may never contain a space. Every mutation is written back immediately.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::models::FeedSource;

pub const MAX_FEEDS: usize = 20;

const KEY_PREFIX: &str = "feed_";

#[derive(Debug)]
pub struct FeedRegistry {
    path: PathBuf,
    feeds: Vec<FeedSource>,
}

impl FeedRegistry {
    /// Load the registry stored at `path`; a missing file is an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut registry = Self {
            path,
            feeds: Vec::new(),
        };

        if !registry.path.exists() {
            debug!("no feed list at {:?}", registry.path);
            return Ok(registry);
        }

        let content = std::fs::read_to_string(&registry.path)?;
        let table: toml::Table = toml::from_str(&content)?;

        for k in 1..=MAX_FEEDS {
            let Some(value) = table.get(&format!("{}{}", KEY_PREFIX, k)) else {
                continue;
            };
            match value.as_str().and_then(|v| v.split_once(' ')) {
                Some((url, title)) => registry.feeds.push(FeedSource {
                    position: registry.feeds.len() + 1,
                    title: title.to_string(),
                    url: url.to_string(),
                }),
                None => warn!("ignoring malformed feed entry {}{}", KEY_PREFIX, k),
            }
        }

        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn can_add(&self) -> bool {
        self.feeds.len() < MAX_FEEDS
    }

    pub fn feeds(&self) -> &[FeedSource] {
        &self.feeds
    }

    pub fn get(&self, position: usize) -> Option<&FeedSource> {
        position.checked_sub(1).and_then(|i| self.feeds.get(i))
    }

    /// Case-insensitive title lookup.
    pub fn find(&self, title: &str) -> Option<&FeedSource> {
        self.feeds
            .iter()
            .find(|feed| feed.title.to_lowercase() == title.to_lowercase())
    }

    pub fn add(&mut self, title: &str, url: &str) -> Result<FeedSource> {
        let title = title.trim();
        let url = url.trim();

        if !self.can_add() {
            return Err(AppError::Registry(format!(
                "cannot add more than {} feeds",
                MAX_FEEDS
            )));
        }
        if title.is_empty() {
            return Err(AppError::Registry("feed title is empty".to_string()));
        }
        if self.find(title).is_some() {
            return Err(AppError::Registry(format!("feed '{}' already exists", title)));
        }
        validate_url(url)?;

        let feed = FeedSource {
            position: self.feeds.len() + 1,
            title: title.to_string(),
            url: url.to_string(),
        };
        self.feeds.push(feed.clone());
        self.save()?;
        Ok(feed)
    }

    /// Remove the feed at `position`; every following feed moves up one.
    pub fn remove(&mut self, position: usize) -> Result<FeedSource> {
        self.check_position(position)?;
        let removed = self.feeds.remove(position - 1);
        self.renumber();
        self.save()?;
        Ok(removed)
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_position(a)?;
        self.check_position(b)?;
        self.feeds.swap(a - 1, b - 1);
        self.renumber();
        self.save()
    }

    /// Point the feed titled `title` at a new URL. Titles never change.
    ///
    /// Returns `false` when no feed has that title.
    pub fn update_url(&mut self, title: &str, url: &str) -> Result<bool> {
        validate_url(url)?;
        let title = title.to_lowercase();
        let Some(feed) = self
            .feeds
            .iter_mut()
            .find(|feed| feed.title.to_lowercase() == title)
        else {
            return Ok(false);
        };
        feed.url = url.to_string();
        self.save()?;
        Ok(true)
    }

    pub fn save(&self) -> Result<()> {
        let mut table = toml::Table::new();
        for feed in &self.feeds {
            table.insert(
                format!("{}{}", KEY_PREFIX, feed.position),
                toml::Value::String(format!("{} {}", feed.url, feed.title)),
            );
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string(&table)?)?;
        Ok(())
    }

    fn check_position(&self, position: usize) -> Result<()> {
        if position == 0 || position > self.feeds.len() {
            return Err(AppError::Registry(format!("no feed at position {}", position)));
        }
        Ok(())
    }

    fn renumber(&mut self) {
        for (i, feed) in self.feeds.iter_mut().enumerate() {
            feed.position = i + 1;
        }
    }
}

fn validate_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(AppError::Registry("feed URL is empty".to_string()));
    }
    if url.contains(char::is_whitespace) {
        return Err(AppError::Registry(format!(
            "feed URL must not contain spaces: {}",
            url
        )));
    }
    Ok(())
}
