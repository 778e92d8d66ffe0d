//! Source adapters: where raw OOREP rows come from.
//!
//! Two interchangeable strategies sit behind [`SourceAdapter`]:
//! ```text
//! DumpFileSource   (pg_dump text file, single streaming pass)
//! RelationalSource (live Postgres, four read queries)
//!          │
//!          ▼
//!    Extraction { RawDataset, ScanStats }
//! ```
//! Both parse into typed [`RawRecord`](crate::models::RawRecord)s immediately;
//! nothing downstream sees untyped tuples.

pub mod dump;
pub mod relational;
pub mod retry;

pub use dump::{DumpFileSource, DumpScanner};
pub use relational::{PgSourceConfig, RelationalSource};
pub use retry::RetryPolicy;

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::RawDataset;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dump file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Source database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Source configuration error: {0}")]
    Config(String),

    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// The four OOREP tables the import consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTable {
    Chapter,
    Remedy,
    Rubric,
    RubricRemedy,
}

impl SourceTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chapter => "chapter",
            Self::Remedy => "remedy",
            Self::Rubric => "rubric",
            Self::RubricRemedy => "rubricremedy",
        }
    }

    /// Match an unqualified table name from a `COPY` header.
    pub fn from_table_name(name: &str) -> Option<Self> {
        match name {
            "chapter" => Some(Self::Chapter),
            "remedy" => Some(Self::Remedy),
            "rubric" => Some(Self::Rubric),
            "rubricremedy" => Some(Self::RubricRemedy),
            _ => None,
        }
    }
}

/// Counters gathered while reading a source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub lines_read: u64,
    pub blocks_seen: usize,
    pub ignored_blocks: usize,
    pub unterminated_blocks: usize,
    pub rows: BTreeMap<SourceTable, usize>,
    pub malformed: BTreeMap<SourceTable, usize>,
}

impl ScanStats {
    pub fn rows_for(&self, table: SourceTable) -> usize {
        self.rows.get(&table).copied().unwrap_or(0)
    }

    pub fn malformed_for(&self, table: SourceTable) -> usize {
        self.malformed.get(&table).copied().unwrap_or(0)
    }

    pub fn malformed_total(&self) -> usize {
        self.malformed.values().sum()
    }
}

/// Output of one extraction.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub data: RawDataset,
    pub stats: ScanStats,
}

/// One extraction strategy. Any error returned here is fatal to the run.
#[async_trait]
pub trait SourceAdapter: Send {
    async fn extract(&mut self) -> Result<Extraction, SourceError>;

    /// Human-readable origin, for logs and the summary.
    fn source_name(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_round_trip() {
        for table in [
            SourceTable::Chapter,
            SourceTable::Remedy,
            SourceTable::Rubric,
            SourceTable::RubricRemedy,
        ] {
            assert_eq!(SourceTable::from_table_name(table.as_str()), Some(table));
        }
        assert_eq!(SourceTable::from_table_name("rubric_remedy"), None);
        assert_eq!(SourceTable::from_table_name("Chapter"), None);
    }

    #[test]
    fn trait_is_object_safe() {
        fn _assert_source(_: &dyn SourceAdapter) {}
    }
}
