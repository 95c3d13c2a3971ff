pub mod app;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod models;
pub mod registry;

pub use app::App;
pub use cancel::CancelToken;
pub use config::Config;
pub use error::{AppError, Result};
