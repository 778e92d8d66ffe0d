//! oorep-import: load the OOREP repertory into the clinic knowledge base.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use oorep_import::config::{self, ImportConfig, SourceConfig, ENV_DATABASE_PATH, ENV_DUMP_FILE};
use oorep_import::pipeline;

#[derive(Parser)]
#[command(name = "oorep-import")]
#[command(about = "Import the OOREP homeopathic repertory into the knowledge base")]
#[command(version)]
struct Cli {
    /// pg_dump text file to import; relational mode (OOREP_PG_*) when absent
    #[arg(short = 'f', long, env = ENV_DUMP_FILE)]
    dump_file: Option<PathBuf>,

    /// Knowledge-base SQLite file
    #[arg(short, long, env = ENV_DATABASE_PATH)]
    database: Option<PathBuf>,

    /// Rubric/remedy records per transaction
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    batch_size: u64,

    /// Mapping records per batched upsert
    #[arg(long, default_value_t = 5000, value_parser = clap::value_parser!(u64).range(1..))]
    mapping_batch_size: u64,

    /// Extract and transform only; report counts without writing
    #[arg(long)]
    dry_run: bool,

    /// Also write the final summary as JSON to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let filter = if verbose > 0 {
        EnvFilter::new(config::log_filter_for_verbosity(verbose))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_config(cli: Cli) -> Result<ImportConfig> {
    let source = SourceConfig::select(cli.dump_file.as_deref(), |key| std::env::var(key).ok())
        .context("cannot determine import source")?;

    let mut config = ImportConfig::new(source);
    if let Some(path) = cli.database {
        config.database_path = path;
    }
    config.load.entity_batch_size = usize::try_from(cli.batch_size)?;
    config.load.mapping_batch_size = usize::try_from(cli.mapping_batch_size)?;
    config.dry_run = cli.dry_run;
    config.summary_json = cli.summary_json;
    Ok(config)
}

async fn try_main(cli: Cli) -> Result<()> {
    let config = build_config(cli)?;
    let summary = pipeline::run(&config).await.context("import failed")?;

    if summary.total_failed() > 0 {
        tracing::warn!(failed = summary.total_failed(), "Some records failed to load");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);

    match try_main(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = format!("{e:#}");
            tracing::error!(error = %message, "OOREP import aborted");
            ExitCode::FAILURE
        }
    }
}
