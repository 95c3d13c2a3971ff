mod article;
mod feed;
mod report;

pub use article::{NewArticle, NewArticleState, NewsItem};
pub use feed::FeedSource;
pub use report::{CleanupReport, IngestReport, IngestStatus};
