mod pipeline;
mod reconciler;

pub use pipeline::Pipeline;
pub use reconciler::{build_batch, derive_article_id, java_string_hash, row_id, Batch};
