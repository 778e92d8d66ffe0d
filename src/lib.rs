pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;

pub use config::{ImportConfig, SourceConfig};
pub use pipeline::{run, ImportSummary, PipelineError};
