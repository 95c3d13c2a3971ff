use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Connection or read failure while talking to a feed server.
    #[error("network error: {0}")]
    Network(String),

    /// No usable feed URL could be found.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// The feed parser rejected the document.
    #[error("parse error: {0}")]
    Parse(String),

    /// A transactional write or read against the store failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid operation on the feed registry.
    #[error("registry error: {0}")]
    Registry(String),

    /// Bad command line.
    #[error("{0}")]
    Usage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<feed_rs::parser::ParseFeedError> for AppError {
    fn from(e: feed_rs::parser::ParseFeedError) -> Self {
        AppError::Parse(e.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}

impl From<tokio_rusqlite::Error> for AppError {
    fn from(e: tokio_rusqlite::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(e: toml::de::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(e: toml::ser::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
