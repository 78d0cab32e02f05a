//! Snow Today ingester.
//!
//! Ingests the daily upstream drop for one data source into a staging
//! directory and, on a full successful run, swaps it into the live location
//! the web application serves. Also validates individual JSON files and
//! prints the embedded schemas.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use ingestion::TaskId;
use schema::SchemaId;
use snow_common::DataSource;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Ingest Snow Today data for the web application")]
struct Args {
    /// Log level
    #[arg(
        short = 'l',
        long,
        global = true,
        default_value = "debug",
        value_parser = PossibleValuesParser::new(LOG_LEVELS)
    )]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// YAML configuration file (default: read from the environment)
    #[arg(short, long, global = true, env = "INGEST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print an embedded JSON Schema
    ShowSchema {
        #[arg(value_parser = PossibleValuesParser::new(SchemaId::names()))]
        schema: String,
    },

    /// Validate a JSON file against the schema its filename matches
    ValidateJson { file: PathBuf },

    /// List the tasks of each data source, in execution order
    ListTasks {
        #[arg(value_parser = PossibleValuesParser::new(runnable_names()))]
        source: Option<String>,
    },

    /// Ingest a data source
    Ingest(IngestArgs),
}

#[derive(ClapArgs, Debug)]
struct IngestArgs {
    /// Stage the output without publishing it
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    source: SourceCommand,
}

/// Each source accepts only its own task names. No names means every task.
#[derive(Subcommand, Debug)]
enum SourceCommand {
    /// Ingest snow surface properties (rasters, regions, plots, legends)
    SnowSurfaceProperties {
        #[arg(value_parser = PossibleValuesParser::new(TaskId::names_for(DataSource::SnowSurfaceProperties)))]
        tasks: Vec<String>,
    },

    /// Ingest snow-water-equivalent station points
    SnowWaterEquivalent {
        #[arg(value_parser = PossibleValuesParser::new(TaskId::names_for(DataSource::SnowWaterEquivalent)))]
        tasks: Vec<String>,
    },
}

impl SourceCommand {
    fn source(&self) -> DataSource {
        match self {
            Self::SnowSurfaceProperties { .. } => DataSource::SnowSurfaceProperties,
            Self::SnowWaterEquivalent { .. } => DataSource::SnowWaterEquivalent,
        }
    }

    fn tasks(&self) -> &[String] {
        match self {
            Self::SnowSurfaceProperties { tasks } | Self::SnowWaterEquivalent { tasks } => tasks,
        }
    }
}

fn runnable_names() -> Vec<&'static str> {
    DataSource::runnable().iter().map(DataSource::as_str).collect()
}

fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if let Err(e) = init_tracing(&args.log_level, args.log_format) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = commands::run(args).await {
        error!(error = %e, "Command failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_ingest_parses_tasks_for_source() {
        let args = Args::try_parse_from([
            "ingester",
            "ingest",
            "--dry-run",
            "snow-surface-properties",
            "cogs",
            "plot-json",
        ])
        .unwrap();

        let Command::Ingest(ingest) = args.command else {
            panic!("expected ingest");
        };
        assert!(ingest.dry_run);
        assert_eq!(ingest.source.source(), DataSource::SnowSurfaceProperties);
        assert_eq!(ingest.source.tasks(), ["cogs", "plot-json"]);
    }

    #[test]
    fn test_ingest_rejects_other_source_task() {
        let result =
            Args::try_parse_from(["ingester", "ingest", "snow-water-equivalent", "cogs"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let args = Args::try_parse_from([
            "ingester",
            "show-schema",
            "swePoints",
            "--log-level",
            "warn",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.log_level, "warn");
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_schema_rejected() {
        assert!(Args::try_parse_from(["ingester", "show-schema", "zarr"]).is_err());
    }
}
