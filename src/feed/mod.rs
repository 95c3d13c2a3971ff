mod fetcher;
mod normalizer;
mod parser;
mod resolver;

pub use fetcher::{Document, FeedFetcher, Transport};
pub use normalizer::{normalize_content, normalize_fragment, PARAGRAPH_BREAK};
pub use parser::{feed_title, parse_document, RawEntry, RawLink};
pub use resolver::{
    discover_feed_link, feed_candidates, resolve_href, FeedCandidate, FeedResolver, Resolution,
};
