/// A user-configured syndication source.
///
/// `position` is the 1-based ordinal in the registry. The title doubles as
/// the feed id stored alongside every article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub position: usize,
    pub title: String,
    pub url: String,
}

impl FeedSource {
    pub fn feed_id(&self) -> &str {
        &self.title
    }
}
