//! Turns parsed entries into rows for the `news` and `my_news` tables.

use crate::feed::{normalize_content, RawEntry};
use crate::models::{NewArticle, NewArticleState};

/// Link type marking a link as the entry's permanent identifier.
const GUID_LINK_TYPE: &str = "guid";

/// Rows to write for one feed run.
#[derive(Debug, Default)]
pub struct Batch {
    pub articles: Vec<NewArticle>,
    pub states: Vec<NewArticleState>,
}

/// The identifier an entry is stored under.
///
/// Falls back from the entry's URI to its first `guid`-typed link, then to
/// its first link. Empty only when the entry has none of these.
pub fn derive_article_id(entry: &RawEntry) -> String {
    if let Some(uri) = entry.uri.as_deref().filter(|uri| !uri.is_empty()) {
        return uri.to_string();
    }

    entry
        .links
        .iter()
        .find(|link| {
            link.media_type
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(GUID_LINK_TYPE))
        })
        .or_else(|| entry.links.first())
        .map(|link| link.href.clone())
        .unwrap_or_default()
}

/// Row id shared by an article and its overlay.
///
/// This is Java's `String.hashCode` of `article_id` followed by `feed_id`,
/// widened to `i64`. Stored rows depend on it: changing the hash orphans
/// every row already in the database.
pub fn row_id(article_id: &str, feed_id: &str) -> i64 {
    let mut key = String::with_capacity(article_id.len() + feed_id.len());
    key.push_str(article_id);
    key.push_str(feed_id);
    i64::from(java_string_hash(&key))
}

/// `s[0]*31^(n-1) + ... + s[n-1]` over UTF-16 code units, wrapping at 32 bits.
pub fn java_string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Build the article rows and first-time overlay rows for `entries`.
pub fn build_batch(feed_id: &str, entries: Vec<RawEntry>, saved_at: i64) -> Batch {
    let mut batch = Batch {
        articles: Vec::with_capacity(entries.len()),
        states: Vec::with_capacity(entries.len()),
    };

    for entry in entries {
        let article_id = derive_article_id(&entry);
        let row_id = row_id(&article_id, feed_id);

        let title = entry
            .title
            .as_deref()
            .map(|t| html_escape::decode_html_entities(t.trim()).into_owned())
            .unwrap_or_default();

        batch
            .states
            .push(NewArticleState::unread(row_id, &article_id, feed_id));
        batch.articles.push(NewArticle {
            row_id,
            article_id,
            feed_id: feed_id.to_string(),
            author: entry.author,
            title,
            published_at: entry.published_at.unwrap_or(0),
            content: normalize_content(&entry.contents),
            url: entry.links.first().map(|link| link.href.clone()),
            saved_at,
        });
    }

    batch
}
