//! Orchestration-level error type. Only failures that end the run surface here;
//! per-record problems are counted, not returned.

use thiserror::Error;

use super::source::SourceError;
use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Summary output error: {0}")]
    Summary(String),
}
