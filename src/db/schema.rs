// Row ids are derived from the article id and feed id (see
// `ingest::reconciler::row_id`), so both tables share the same key space.
pub const SCHEMA: &str = r#"
-- news table: shared article content, overwritten on every ingestion
CREATE TABLE IF NOT EXISTS news (
    row_id INTEGER PRIMARY KEY,
    article_id TEXT NOT NULL,
    feed_id TEXT NOT NULL,
    author TEXT,
    title TEXT NOT NULL,
    published_at INTEGER NOT NULL DEFAULT 0,
    content TEXT NOT NULL DEFAULT '',
    url TEXT,
    saved_at INTEGER NOT NULL,
    UNIQUE(article_id, feed_id)
);

CREATE INDEX IF NOT EXISTS idx_news_article_id ON news(article_id);
CREATE INDEX IF NOT EXISTS idx_news_published_at ON news(published_at DESC);
CREATE INDEX IF NOT EXISTS idx_news_feed_id ON news(feed_id);

-- my_news table: per-user read/bookmark overlay
CREATE TABLE IF NOT EXISTS my_news (
    row_id INTEGER PRIMARY KEY,
    article_id TEXT NOT NULL,
    feed_id TEXT NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0,
    is_bookmarked INTEGER NOT NULL DEFAULT 0,
    UNIQUE(article_id, feed_id)
);

CREATE INDEX IF NOT EXISTS idx_my_news_article_id ON my_news(article_id);
CREATE INDEX IF NOT EXISTS idx_my_news_feed_id ON my_news(feed_id);
CREATE INDEX IF NOT EXISTS idx_my_news_is_read ON my_news(is_read);
CREATE INDEX IF NOT EXISTS idx_my_news_is_bookmarked ON my_news(is_bookmarked);
"#;
