//! Subcommand implementations.

use std::path::Path;

use anyhow::{Context, Result};
use ingestion::{IngestConfig, Orchestrator, RunOutcome, TaskCatalog, TaskId};
use schema::{FileValidation, SchemaId, SchemaRegistry};
use snow_common::DataSource;
use tracing::{debug, info};

use crate::{Args, Command, IngestArgs};

pub async fn run(args: Args) -> Result<()> {
    match args.command {
        Command::ShowSchema { schema } => show_schema(&schema),
        Command::ValidateJson { file } => validate_json(&file),
        Command::ListTasks { source } => {
            let config = load_config(args.config.as_deref())?;
            list_tasks(&config, source.as_deref())
        }
        Command::Ingest(ingest_args) => {
            let config = load_config(args.config.as_deref())?;
            ingest(&config, ingest_args).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<IngestConfig> {
    let config = match path {
        Some(path) => IngestConfig::from_yaml(path)?,
        None => IngestConfig::from_env()?,
    };
    debug!(?config, "Loaded configuration");
    Ok(config)
}

fn show_schema(name: &str) -> Result<()> {
    let id: SchemaId = name.parse()?;
    let registry = SchemaRegistry::builtin()?;
    println!("{}", registry.schema_json(id)?);
    Ok(())
}

fn validate_json(file: &Path) -> Result<()> {
    let registry = SchemaRegistry::builtin()?;
    match registry.validate_file(file)? {
        FileValidation::Valid(id) => info!(file = %file.display(), schema = %id, "Valid"),
        FileValidation::Skipped => {}
    }
    Ok(())
}

fn list_tasks(config: &IngestConfig, source: Option<&str>) -> Result<()> {
    let catalog = TaskCatalog::new(config)?;
    let sources: Vec<DataSource> = match source {
        Some(name) => vec![name.parse()?],
        None => DataSource::runnable().to_vec(),
    };

    for source in sources {
        println!("{source}:");
        for class in catalog.tasks_for(source) {
            println!("  {:<16} {}", class.id.as_str(), class.description);
        }
    }
    Ok(())
}

async fn ingest(config: &IngestConfig, args: IngestArgs) -> Result<()> {
    let source = args.source.source();
    let tasks = args
        .source
        .tasks()
        .iter()
        .map(|name| name.parse::<TaskId>())
        .collect::<Result<Vec<_>, _>>()?;

    let catalog = TaskCatalog::new(config)?;
    let orchestrator = Orchestrator::new(config, catalog);
    let outcome = orchestrator
        .run_ingest(source, &tasks, args.dry_run)
        .await
        .with_context(|| format!("Ingest of {source} failed"))?;

    match outcome {
        RunOutcome::Published(report) => {
            info!(source = %source, %report, "Ingest complete");
        }
        RunOutcome::Staged { staging, reason } => {
            info!(
                source = %source,
                staging = %staging.display(),
                %reason,
                "Ingest staged only"
            );
        }
    }
    Ok(())
}
