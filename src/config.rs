use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::error::PipelineError;
use crate::pipeline::loader::LoadSettings;
use crate::pipeline::source::{PgSourceConfig, RetryPolicy, SourceError};

/// Application-level constants
pub const APP_NAME: &str = "oorep-import";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ENV_DUMP_FILE: &str = "OOREP_DUMP_FILE";
pub const ENV_DATABASE_PATH: &str = "KB_DATABASE_PATH";

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Tracing filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "oorep_import=info"
}

/// `-v` raises the crate to debug, `-vv` to trace.
pub fn log_filter_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => default_log_filter(),
        1 => "oorep_import=debug",
        _ => "oorep_import=trace",
    }
}

/// Knowledge-base location when neither flag nor environment names one:
/// `<data_dir>/clinic/knowledge_base.db`.
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clinic")
        .join("knowledge_base.db")
}

/// Where the raw OOREP rows come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    DumpFile(PathBuf),
    Relational(PgSourceConfig),
}

impl SourceConfig {
    /// A non-empty dump path selects file mode; otherwise the relational
    /// source is configured from `lookup`.
    pub fn select(
        dump_file: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SourceError> {
        match dump_file.filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => Ok(Self::DumpFile(path.to_path_buf())),
            None => Ok(Self::Relational(PgSourceConfig::from_lookup(lookup)?)),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::DumpFile(_) => "file",
            Self::Relational(_) => "relational",
        }
    }
}

/// Everything one import run needs.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub source: SourceConfig,
    pub database_path: PathBuf,
    pub load: LoadSettings,
    pub retry: RetryPolicy,
    pub busy_timeout: Duration,
    pub dry_run: bool,
    pub summary_json: Option<PathBuf>,
}

impl ImportConfig {
    pub fn new(source: SourceConfig) -> Self {
        Self {
            source,
            database_path: default_database_path(),
            load: LoadSettings::default(),
            retry: RetryPolicy::default(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            dry_run: false,
            summary_json: None,
        }
    }

    /// Reject settings no run can work with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.load.entity_batch_size == 0 || self.load.mapping_batch_size == 0 {
            return Err(PipelineError::Config("batch sizes must be at least 1".into()));
        }
        if !self.dry_run && self.database_path.as_os_str().is_empty() {
            return Err(PipelineError::Config("database path is empty".into()));
        }
        Ok(())
    }
}
