use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use fuel_market_etl::{
    init_logging, EtlResult, EtlRunner, Extractor, FactTableStore, ParquetFactStore,
    PipelineConfig, SqliteFactStore, TransformPipeline,
};

/// Build the monthly fuel-market fact table.
#[derive(Debug, Parser)]
#[command(name = "fuel-etl", version, about = "Fuel market ETL: extract, reconcile, load")]
struct Cli {
    /// Env file to load instead of `.env` in the working directory.
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// SQLite database path (overrides DB_PATH).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Destination table (overrides DB_TABLE).
    #[arg(long)]
    table: Option<String>,

    /// Write `<table>.parquet` into this directory instead of SQLite.
    #[arg(long)]
    parquet_dir: Option<PathBuf>,

    /// Transform only; skip loading.
    #[arg(long)]
    dry_run: bool,

    /// Default log level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(code = err.exit_code(), "{err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> EtlResult<()> {
    let mut config = match &cli.env_file {
        Some(path) => PipelineConfig::from_env_file(path)?,
        None => PipelineConfig::from_env()?,
    };
    if let Some(path) = cli.db_path {
        config.database_path = path;
    }
    if let Some(table) = cli.table {
        config.table_name = table;
    }

    let pipeline = TransformPipeline::default();
    let runner = if cli.dry_run {
        EtlRunner::dry_run(pipeline)
    } else {
        let store: Box<dyn FactTableStore> = match &cli.parquet_dir {
            Some(dir) => Box::new(ParquetFactStore::new(dir)),
            None => Box::new(SqliteFactStore::new(&config.database_path)?),
        };
        EtlRunner::new(pipeline, store, &config.table_name)
    };

    let extractor = Extractor::new(config)?;
    let summary = runner.run(&extractor)?;

    info!(
        rows = summary.fact_rows,
        columns = summary.fact_columns,
        loaded = ?summary.rows_loaded,
        "pipeline finished"
    );
    Ok(())
}
