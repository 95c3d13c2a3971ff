use rusqlite::{params, Row};
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{CleanupReport, NewArticle, NewArticleState, NewsItem};

use super::schema::SCHEMA;

const NEWS_ITEM_COLUMNS: &str = r#"n.row_id, n.article_id, n.feed_id, n.author, n.title, n.published_at,
       n.content, n.url, n.saved_at, m.is_read, m.is_bookmarked
FROM news n
JOIN my_news m ON m.article_id = n.article_id AND m.feed_id = n.feed_id"#;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Ingestion writes

    /// Replace every article of the batch in one transaction.
    ///
    /// Rows sharing a row id are fully overwritten. Returns the number of
    /// rows written; on error nothing from the batch is kept.
    pub async fn replace_articles(&self, articles: Vec<NewArticle>) -> Result<usize> {
        if articles.is_empty() {
            return Ok(0);
        }

        let total = articles.len();
        let written = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut written = 0;
                {
                    let mut stmt = tx.prepare_cached(
                        r#"INSERT OR REPLACE INTO news
                           (row_id, article_id, feed_id, author, title, published_at, content, url, saved_at)
                           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
                    )?;
                    for article in &articles {
                        written += stmt.execute(params![
                            article.row_id,
                            article.article_id,
                            article.feed_id,
                            article.author,
                            article.title,
                            article.published_at,
                            article.content,
                            article.url,
                            article.saved_at,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(written)
            })
            .await?;

        info!("news: replaced {} of {} rows", written, total);
        Ok(written)
    }

    /// Insert read/bookmark overlays, leaving existing rows untouched.
    ///
    /// Returns the number of rows actually created.
    pub async fn insert_states(&self, states: Vec<NewArticleState>) -> Result<usize> {
        if states.is_empty() {
            return Ok(0);
        }

        let total = states.len();
        let created = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut created = 0;
                {
                    let mut stmt = tx.prepare_cached(
                        r#"INSERT OR IGNORE INTO my_news
                           (row_id, article_id, feed_id, is_read, is_bookmarked)
                           VALUES (?1, ?2, ?3, ?4, ?5)"#,
                    )?;
                    for state in &states {
                        created += stmt.execute(params![
                            state.row_id,
                            state.article_id,
                            state.feed_id,
                            state.is_read,
                            state.is_bookmarked,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(created)
            })
            .await?;

        info!("my_news: inserted {} new of {} rows", created, total);
        Ok(created)
    }

    // Read paths

    pub async fn news_for_feed(&self, feed_id: &str) -> Result<Vec<NewsItem>> {
        let feed_id = feed_id.to_string();
        let items = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {NEWS_ITEM_COLUMNS}
                     WHERE n.feed_id = ?1
                     ORDER BY n.published_at DESC, n.saved_at DESC"
                ))?;
                let items = stmt
                    .query_map(params![feed_id], news_item_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?;
        Ok(items)
    }

    pub async fn all_news(&self) -> Result<Vec<NewsItem>> {
        let items = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {NEWS_ITEM_COLUMNS}
                     ORDER BY n.published_at DESC, n.saved_at DESC"
                ))?;
                let items = stmt
                    .query_map([], news_item_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?;
        Ok(items)
    }

    pub async fn bookmarks(&self) -> Result<Vec<NewsItem>> {
        let items = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {NEWS_ITEM_COLUMNS}
                     WHERE m.is_bookmarked = 1
                     ORDER BY n.published_at DESC, n.saved_at DESC"
                ))?;
                let items = stmt
                    .query_map([], news_item_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await?;
        Ok(items)
    }

    // Overlay updates

    pub async fn mark_read(&self, article_id: &str, feed_id: &str, is_read: bool) -> Result<bool> {
        let article_id = article_id.to_string();
        let feed_id = feed_id.to_string();
        let updated = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    "UPDATE my_news SET is_read = ?1 WHERE article_id = ?2 AND feed_id = ?3",
                    params![is_read, article_id, feed_id],
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(updated)
    }

    pub async fn set_bookmarked(
        &self,
        article_id: &str,
        feed_id: &str,
        is_bookmarked: bool,
    ) -> Result<bool> {
        let article_id = article_id.to_string();
        let feed_id = feed_id.to_string();
        let updated = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    "UPDATE my_news SET is_bookmarked = ?1 WHERE article_id = ?2 AND feed_id = ?3",
                    params![is_bookmarked, article_id, feed_id],
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(updated)
    }

    // Retention

    /// Purge expired, unbookmarked overlays and then every orphaned article.
    ///
    /// Both deletes run in one transaction. The overlay delete must come
    /// first: bookmarked overlays keep their article alive through the
    /// orphan check.
    pub async fn cleanup(&self, cutoff_ms: i64) -> Result<CleanupReport> {
        let report = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let states_removed = tx.execute(
                    r#"DELETE FROM my_news
                       WHERE is_bookmarked <> 1
                         AND EXISTS (
                             SELECT 1 FROM news n
                             WHERE n.article_id = my_news.article_id
                               AND n.feed_id = my_news.feed_id
                               AND n.saved_at < ?1
                         )"#,
                    params![cutoff_ms],
                )?;
                let articles_removed = tx.execute(
                    r#"DELETE FROM news
                       WHERE NOT EXISTS (
                           SELECT 1 FROM my_news m
                           WHERE m.article_id = news.article_id
                             AND m.feed_id = news.feed_id
                       )"#,
                    [],
                )?;
                tx.commit()?;
                Ok(CleanupReport {
                    states_removed,
                    articles_removed,
                })
            })
            .await?;

        info!(
            "cleanup: removed {} overlays and {} articles",
            report.states_removed, report.articles_removed
        );
        Ok(report)
    }

    pub async fn count_articles(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM news").await
    }

    pub async fn count_states(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM my_news").await
    }

    async fn count(&self, sql: &'static str) -> Result<usize> {
        let count = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        debug!("{} -> {}", sql, count);
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn news_item_from_row(row: &Row) -> rusqlite::Result<NewsItem> {
    Ok(NewsItem {
        row_id: row.get(0)?,
        article_id: row.get(1)?,
        feed_id: row.get(2)?,
        author: row.get(3)?,
        title: row.get(4)?,
        published_at: row.get(5)?,
        content: row.get(6)?,
        url: row.get(7)?,
        saved_at: row.get(8)?,
        is_read: row.get::<_, i64>(9)? != 0,
        is_bookmarked: row.get::<_, i64>(10)? != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: i64 = 60 * 60 * 1000;

    async fn open_repo(dir: &tempfile::TempDir) -> Repository {
        let path = dir.path().join("test.db");
        Repository::new(path.to_str().unwrap()).await.unwrap()
    }

    fn article(row_id: i64, article_id: &str, title: &str, saved_at: i64) -> NewArticle {
        NewArticle {
            row_id,
            article_id: article_id.to_string(),
            feed_id: "Tech".to_string(),
            author: Some("Ann".to_string()),
            title: title.to_string(),
            published_at: saved_at,
            content: "<p>body</p>".to_string(),
            url: Some(format!("https://example.com/{}", article_id)),
            saved_at,
        }
    }

    async fn seed(repo: &Repository, row_id: i64, article_id: &str, saved_at: i64) {
        repo.replace_articles(vec![article(row_id, article_id, "title", saved_at)])
            .await
            .unwrap();
        repo.insert_states(vec![NewArticleState::unread(row_id, article_id, "Tech")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_replace_overwrites_same_row() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;

        let written = repo
            .replace_articles(vec![article(1, "a", "old", 10)])
            .await
            .unwrap();
        assert_eq!(written, 1);
        let written = repo
            .replace_articles(vec![article(1, "a", "new", 20)])
            .await
            .unwrap();
        assert_eq!(written, 1);
        repo.insert_states(vec![NewArticleState::unread(1, "a", "Tech")])
            .await
            .unwrap();

        assert_eq!(repo.count_articles().await.unwrap(), 1);
        let items = repo.news_for_feed("Tech").await.unwrap();
        assert_eq!(items[0].title, "new");
        assert_eq!(items[0].saved_at, 20);
    }

    #[tokio::test]
    async fn test_insert_states_ignores_existing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;
        seed(&repo, 1, "a", 10).await;

        assert!(repo.mark_read("a", "Tech", true).await.unwrap());
        assert!(repo.set_bookmarked("a", "Tech", true).await.unwrap());

        let created = repo
            .insert_states(vec![
                NewArticleState::unread(1, "a", "Tech"),
                NewArticleState::unread(2, "b", "Tech"),
            ])
            .await
            .unwrap();
        assert_eq!(created, 1);

        let items = repo.news_for_feed("Tech").await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_read);
        assert!(items[0].is_bookmarked);
    }

    #[tokio::test]
    async fn test_empty_batches_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;
        assert_eq!(repo.replace_articles(Vec::new()).await.unwrap(), 0);
        assert_eq!(repo.insert_states(Vec::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_missing_overlay_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;
        assert!(!repo.mark_read("nope", "Tech", true).await.unwrap());
        assert!(!repo.set_bookmarked("nope", "Tech", true).await.unwrap());
    }

    #[tokio::test]
    async fn test_join_orders_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;
        seed(&repo, 1, "older", 100).await;
        seed(&repo, 2, "newer", 200).await;

        let items = repo.all_news().await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.article_id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "older"]);
        assert!(repo.news_for_feed("Other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_removes_expired_unbookmarked() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;
        let now = 100 * HOUR_MS;
        seed(&repo, 1, "expired", now - 25 * HOUR_MS).await;
        seed(&repo, 2, "fresh", now - HOUR_MS).await;

        let report = repo.cleanup(now - 24 * HOUR_MS).await.unwrap();
        assert_eq!(report.states_removed, 1);
        assert_eq!(report.articles_removed, 1);

        let items = repo.all_news().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].article_id, "fresh");
    }

    #[tokio::test]
    async fn test_cleanup_keeps_bookmarked_article() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;
        let now = 100 * HOUR_MS;
        seed(&repo, 1, "kept", now - 48 * HOUR_MS).await;
        repo.set_bookmarked("kept", "Tech", true).await.unwrap();

        let report = repo.cleanup(now - 24 * HOUR_MS).await.unwrap();
        assert_eq!(report, CleanupReport::default());

        let bookmarks = repo.bookmarks().await.unwrap();
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks[0].article_id, "kept");
    }

    #[tokio::test]
    async fn test_cleanup_removes_orphaned_articles() {
        let dir = tempfile::tempdir().unwrap();
        let repo = open_repo(&dir).await;
        repo.replace_articles(vec![article(7, "orphan", "t", 1_000)])
            .await
            .unwrap();

        let report = repo.cleanup(0).await.unwrap();
        assert_eq!(report.states_removed, 0);
        assert_eq!(report.articles_removed, 1);
        assert_eq!(repo.count_articles().await.unwrap(), 0);
    }
}
