//! Ingest orchestration: run selected tasks into a fresh staging directory,
//! then decide whether to publish it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use snow_common::DataSource;
use tracing::{info, instrument, warn, Span};
use uuid::Uuid;

use crate::catalog::{OutputDataClass, TaskCatalog, TaskId};
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::lock::RunLock;
use crate::publish::{publish, PublishReport};

/// Why a run's staging directory was not published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedReason {
    DryRun,
    /// Only some of the source's tasks were selected.
    Partial,
}

impl fmt::Display for StagedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DryRun => f.write_str("dry run"),
            Self::Partial => f.write_str("partial run"),
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Published(PublishReport),
    Staged { staging: PathBuf, reason: StagedReason },
}

/// Runs ingests for one deployment.
pub struct Orchestrator {
    config: IngestConfig,
    catalog: TaskCatalog,
}

impl Orchestrator {
    pub fn new(config: &IngestConfig, catalog: TaskCatalog) -> Self {
        Self {
            config: config.clone(),
            catalog,
        }
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest `source` into a staging directory and publish it.
    ///
    /// `tasks` selects a subset of the source's tasks (empty for all). Tasks
    /// run sequentially in catalog order and the first failure aborts the
    /// run, leaving the live directory untouched and the staging directory
    /// on disk for inspection. Dry runs and partial runs never publish.
    #[instrument(skip(self, tasks), fields(source = %source, run_id = tracing::field::Empty))]
    pub async fn run_ingest(
        &self,
        source: DataSource,
        tasks: &[TaskId],
        dry_run: bool,
    ) -> Result<RunOutcome> {
        let source = source.require_runnable()?;
        let selected = self.catalog.select(source, tasks)?;
        let partial = selected.len() < self.catalog.tasks_for(source).len();

        let run_id = Uuid::new_v4();
        Span::current().record("run_id", tracing::field::display(run_id));

        let wip = self.config.wip_dir();
        std::fs::create_dir_all(&wip).map_err(|e| IngestError::Staging {
            path: wip.clone(),
            source: e,
        })?;
        let _lock = RunLock::acquire(&wip, source, run_id)?;

        let today = snow_common::today();
        let staging = create_staging(&wip, today)?;
        info!(
            staging = %staging.display(),
            tasks = selected.len(),
            dry_run,
            "Starting ingest"
        );

        for class in &selected {
            self.run_task(class, &staging, source).await?;
        }

        let reason = if dry_run {
            Some(StagedReason::DryRun)
        } else if partial {
            Some(StagedReason::Partial)
        } else {
            None
        };
        if let Some(reason) = reason {
            info!(staging = %staging.display(), %reason, "Ingested to staging directory; not publishing");
            warn!("Publishing to production requires a full, non-dry run");
            return Ok(RunOutcome::Staged { staging, reason });
        }

        let report = publish(
            &staging,
            &self.config.live_dir(source),
            &self.config.backup_root(),
            source,
            today,
        )?;
        Ok(RunOutcome::Published(report))
    }

    async fn run_task(&self, class: &OutputDataClass, staging: &Path, source: DataSource) -> Result<()> {
        let task = &class.task;
        let to = staging.join(&task.destination);
        info!(
            task = %class.id,
            description = class.description,
            from = %task.input,
            to = %to.display(),
            "Executing task"
        );
        let started = Instant::now();

        let apply = task.transform.apply(&task.input, &to);
        let result = match self.config.task_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, apply).await.map_err(|_| {
                IngestError::TaskTimedOut {
                    task: class.id,
                    data_source: source,
                    timeout,
                }
            })?,
            None => apply.await,
        };
        result.map_err(|error| IngestError::TaskFailed {
            task: class.id,
            data_source: source,
            error,
        })?;

        info!(
            task = %class.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Completed task"
        );
        Ok(())
    }
}

/// Create `wip/<today>_<random>` and make it world-readable.
fn create_staging(wip: &Path, today: NaiveDate) -> Result<PathBuf> {
    let staging = tempfile::Builder::new()
        .prefix(&format!("{}_", today.format("%Y-%m-%d")))
        .tempdir_in(wip)
        .map_err(|source| IngestError::Staging {
            path: wip.to_path_buf(),
            source,
        })?
        .keep();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&staging, std::fs::Permissions::from_mode(0o755)).map_err(
            |source| IngestError::Staging {
                path: staging.clone(),
                source,
            },
        )?;
    }

    Ok(staging)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_name_and_mode() {
        let dir = tempfile::tempdir().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let first = create_staging(dir.path(), today).unwrap();
        let second = create_staging(dir.path(), today).unwrap();

        assert_ne!(first, second);
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("2024-01-15_"), "{name}");
        assert!(first.is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&first).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[tokio::test]
    async fn test_common_is_not_runnable() {
        let dir = tempfile::tempdir().unwrap();
        let config = IngestConfig::new(dir.path());
        let orchestrator = Orchestrator::new(&config, TaskCatalog::new(&config).unwrap());

        let err = orchestrator
            .run_ingest(DataSource::Common, &[], false)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Common(_)));
        assert!(!config.wip_dir().exists());
    }
}
