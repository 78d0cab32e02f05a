//! The declarative catalog of output data classes.
//!
//! Each class pairs an input location, a transform, a destination inside the
//! staging directory, and the schemas its outputs satisfy. The catalog order
//! is the execution order.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use schema::{SchemaId, SchemaRegistry};
use snow_common::DataSource;
use transforms::{
    CloudOptimize, PlotJson, RegionLegends, RegionMetadata, RegionShapes, SweLegends, SwePoints,
    TaskInput, Transform, ValidateAndCopyJson,
};

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};

/// Identifier of an ingest task, as used on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskId {
    Colormaps,
    Variables,
    Legends,
    RegionMetadata,
    RegionShapes,
    Cogs,
    PlotJson,
    SweVariables,
    SweLegends,
    SwePointJson,
}

impl TaskId {
    /// Every task, in catalog order.
    pub const ALL: [TaskId; 10] = [
        Self::Colormaps,
        Self::Variables,
        Self::Legends,
        Self::RegionMetadata,
        Self::RegionShapes,
        Self::Cogs,
        Self::PlotJson,
        Self::SweVariables,
        Self::SweLegends,
        Self::SwePointJson,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Colormaps => "colormaps",
            Self::Variables => "variables",
            Self::Legends => "legends",
            Self::RegionMetadata => "region-metadata",
            Self::RegionShapes => "region-shapes",
            Self::Cogs => "cogs",
            Self::PlotJson => "plot-json",
            Self::SweVariables => "swe-variables",
            Self::SweLegends => "swe-legends",
            Self::SwePointJson => "swe-point-json",
        }
    }

    pub fn data_source(&self) -> DataSource {
        match self {
            Self::Colormaps => DataSource::Common,
            Self::Variables
            | Self::Legends
            | Self::RegionMetadata
            | Self::RegionShapes
            | Self::Cogs
            | Self::PlotJson => DataSource::SnowSurfaceProperties,
            Self::SweVariables | Self::SweLegends | Self::SwePointJson => {
                DataSource::SnowWaterEquivalent
            }
        }
    }

    /// Names of the tasks run by an ingest of `source`, in catalog order.
    pub fn names_for(source: DataSource) -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|id| id.data_source().applies_to(source))
            .map(TaskId::as_str)
            .collect()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskId {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| IngestError::UnknownTask(s.to_string()))
    }
}

/// How to produce one output: read `input`, run `transform`, write to
/// `destination` relative to the staging directory.
#[derive(Clone)]
pub struct IngestTask {
    pub input: TaskInput,
    pub destination: PathBuf,
    pub transform: Arc<dyn Transform>,
}

impl fmt::Debug for IngestTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestTask")
            .field("input", &self.input)
            .field("destination", &self.destination)
            .field("transform", &self.transform.name())
            .finish()
    }
}

/// A class of output data the web application consumes.
#[derive(Debug, Clone)]
pub struct OutputDataClass {
    pub id: TaskId,
    pub description: &'static str,
    pub data_source: DataSource,
    pub task: IngestTask,
    /// Schemas the outputs of this class are validated against.
    pub schemas: Vec<SchemaId>,
}

/// Every output data class, in execution order.
#[derive(Debug, Clone)]
pub struct TaskCatalog {
    classes: Vec<OutputDataClass>,
}

impl TaskCatalog {
    /// Build the catalog with the embedded schemas.
    pub fn new(config: &IngestConfig) -> Result<Self> {
        let registry = Arc::new(SchemaRegistry::builtin()?);
        Self::with_registry(config, registry)
    }

    pub fn with_registry(config: &IngestConfig, registry: Arc<SchemaRegistry>) -> Result<Self> {
        let ssp_incoming = config.incoming_for(DataSource::SnowSurfaceProperties);
        let swe_incoming = config.incoming_for(DataSource::SnowWaterEquivalent);

        let class = |id: TaskId,
                     description: &'static str,
                     input: TaskInput,
                     destination: &str,
                     transform: Arc<dyn Transform>,
                     schemas: &[SchemaId]| OutputDataClass {
            id,
            description,
            data_source: id.data_source(),
            task: IngestTask {
                input,
                destination: PathBuf::from(destination),
                transform,
            },
            schemas: schemas.to_vec(),
        };

        let classes = vec![
            // Reference data is re-ingested every run so the live tree never
            // drifts from what's under version control.
            class(
                TaskId::Colormaps,
                "Ingest metadata: version-controlled colormaps JSON",
                TaskInput::path(config.colormaps_file()),
                "colormaps.json",
                Arc::new(ValidateAndCopyJson::new(registry.clone(), SchemaId::ColormapsIndex)),
                &[SchemaId::ColormapsIndex],
            ),
            class(
                TaskId::Variables,
                "Ingest metadata: version-controlled surface-properties variables JSON",
                TaskInput::path(config.ssp_variables_file()),
                "variables.json",
                Arc::new(ValidateAndCopyJson::new(registry.clone(), SchemaId::VariablesIndex)),
                &[SchemaId::VariablesIndex],
            ),
            class(
                TaskId::Legends,
                "Generate legends: one SVG per super-region and variable",
                TaskInput::named([
                    ("regions", ssp_incoming.join("regions").join("root.json")),
                    ("variables", config.ssp_variables_file()),
                    ("colormaps", config.colormaps_file()),
                ]),
                "legends",
                Arc::new(RegionLegends),
                &[],
            ),
            class(
                TaskId::RegionMetadata,
                "Ingest metadata: super-region, sub-region, collection, and hierarchy JSON",
                TaskInput::path(ssp_incoming.join("regions")),
                "regions",
                Arc::new(RegionMetadata::new(registry.clone())),
                &SchemaId::REGION_METADATA,
            ),
            class(
                TaskId::RegionShapes,
                "Ingest data: region shapes GeoJSON",
                TaskInput::path(ssp_incoming.join("shapes")),
                "regions/shapes",
                Arc::new(RegionShapes),
                &[],
            ),
            class(
                TaskId::Cogs,
                "Ingest data: Cloud-Optimized GeoTIFFs",
                TaskInput::path(ssp_incoming.join("cogs")),
                "regions/cogs",
                Arc::new(CloudOptimize::new(config.raster_tool.clone())),
                &[],
            ),
            class(
                TaskId::PlotJson,
                "Ingest data: per-region and variable plot JSON",
                TaskInput::path(ssp_incoming.join("plots")),
                "plots",
                Arc::new(PlotJson::new(registry.clone())),
                &[SchemaId::Plots],
            ),
            class(
                TaskId::SweVariables,
                "Ingest metadata: version-controlled snow-water-equivalent variables JSON",
                TaskInput::path(config.swe_variables_file()),
                "variables.json",
                Arc::new(ValidateAndCopyJson::new(registry.clone(), SchemaId::VariablesIndex)),
                &[SchemaId::VariablesIndex],
            ),
            class(
                TaskId::SweLegends,
                "Generate legends: one SVG per snow-water-equivalent variable",
                TaskInput::named([
                    ("variables", config.swe_variables_file()),
                    ("colormaps", config.colormaps_file()),
                ]),
                "legends",
                Arc::new(SweLegends),
                &[],
            ),
            class(
                TaskId::SwePointJson,
                "Ingest data: snow-water-equivalent station points JSON",
                TaskInput::path(swe_incoming.join("points")),
                "points",
                Arc::new(SwePoints::new(registry)),
                &[SchemaId::SwePoints],
            ),
        ];

        let catalog = Self { classes };
        catalog.check_destinations()?;
        Ok(catalog)
    }

    /// Each source's tasks must write to distinct destinations.
    fn check_destinations(&self) -> Result<()> {
        for source in DataSource::runnable() {
            let tasks = self.tasks_for(source);
            for (i, first) in tasks.iter().enumerate() {
                for second in &tasks[i + 1..] {
                    if same_destination(&first.task.destination, &second.task.destination) {
                        return Err(IngestError::DuplicateDestination {
                            data_source: source,
                            destination: first.task.destination.clone(),
                            first: first.id,
                            second: second.id,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn classes(&self) -> &[OutputDataClass] {
        &self.classes
    }

    pub fn get(&self, id: TaskId) -> Option<&OutputDataClass> {
        self.classes.iter().find(|class| class.id == id)
    }

    /// Common tasks plus those of `source`, in catalog order.
    pub fn tasks_for(&self, source: DataSource) -> Vec<&OutputDataClass> {
        self.classes
            .iter()
            .filter(|class| class.data_source.applies_to(source))
            .collect()
    }

    /// The requested tasks of `source`, in catalog order.
    ///
    /// An empty request selects every task. Nothing touches the filesystem
    /// here, so a bad request fails before any run starts.
    pub fn select(&self, source: DataSource, requested: &[TaskId]) -> Result<Vec<&OutputDataClass>> {
        let available = self.tasks_for(source);
        if requested.is_empty() {
            return Ok(available);
        }

        let requested: BTreeSet<TaskId> = requested.iter().copied().collect();
        for task in &requested {
            if !available.iter().any(|class| class.id == *task) {
                return Err(IngestError::TaskNotInSource {
                    task: *task,
                    data_source: source,
                    valid: TaskId::names_for(source),
                });
            }
        }

        Ok(available
            .into_iter()
            .filter(|class| requested.contains(&class.id))
            .collect())
    }
}

fn same_destination(a: &Path, b: &Path) -> bool {
    a.components().eq(b.components())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TaskCatalog {
        TaskCatalog::new(&IngestConfig::new("/storage").with_data_dir("/repo/data")).unwrap()
    }

    fn ids(classes: &[&OutputDataClass]) -> Vec<TaskId> {
        classes.iter().map(|class| class.id).collect()
    }

    #[test]
    fn test_task_names_round_trip() {
        for id in TaskId::ALL {
            assert_eq!(id.as_str().parse::<TaskId>().unwrap(), id);
        }
        assert!(matches!("zarr".parse::<TaskId>(), Err(IngestError::UnknownTask(_))));
    }

    #[test]
    fn test_catalog_order_matches_task_order() {
        let catalog = catalog();
        let order: Vec<TaskId> = catalog.classes().iter().map(|c| c.id).collect();
        assert_eq!(order, TaskId::ALL);
    }

    #[test]
    fn test_tasks_for_includes_common() {
        let catalog = catalog();
        assert_eq!(
            ids(&catalog.tasks_for(DataSource::SnowWaterEquivalent)),
            [
                TaskId::Colormaps,
                TaskId::SweVariables,
                TaskId::SweLegends,
                TaskId::SwePointJson
            ]
        );
        assert_eq!(catalog.tasks_for(DataSource::SnowSurfaceProperties).len(), 7);
        assert_eq!(
            TaskId::names_for(DataSource::SnowWaterEquivalent),
            ["colormaps", "swe-variables", "swe-legends", "swe-point-json"]
        );
    }

    #[test]
    fn test_select_preserves_catalog_order() {
        let catalog = catalog();
        let selected = catalog
            .select(
                DataSource::SnowSurfaceProperties,
                &[TaskId::PlotJson, TaskId::Colormaps, TaskId::Cogs, TaskId::PlotJson],
            )
            .unwrap();
        assert_eq!(ids(&selected), [TaskId::Colormaps, TaskId::Cogs, TaskId::PlotJson]);
    }

    #[test]
    fn test_select_empty_means_all() {
        let catalog = catalog();
        let selected = catalog.select(DataSource::SnowSurfaceProperties, &[]).unwrap();
        assert_eq!(selected.len(), 7);
    }

    #[test]
    fn test_select_rejects_other_source() {
        let err = catalog()
            .select(DataSource::SnowWaterEquivalent, &[TaskId::Cogs])
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::TaskNotInSource { task: TaskId::Cogs, data_source: DataSource::SnowWaterEquivalent, .. }
        ));
        assert!(err.to_string().contains("swe-point-json"));
    }

    #[test]
    fn test_inputs_follow_config() {
        let catalog = catalog();
        let cogs = catalog.get(TaskId::Cogs).unwrap();
        assert_eq!(
            cogs.task.input,
            TaskInput::path("/storage/incoming/snow-surface-properties/cogs")
        );
        assert_eq!(cogs.task.destination, PathBuf::from("regions/cogs"));

        let legends = catalog.get(TaskId::SweLegends).unwrap();
        assert_eq!(
            legends.task.input.get("colormaps").unwrap(),
            Path::new("/repo/data/colormaps.json")
        );
    }

    #[test]
    fn test_same_destination_ignores_trailing_separator() {
        assert!(same_destination(Path::new("legends"), Path::new("legends/")));
        assert!(!same_destination(Path::new("regions"), Path::new("regions/shapes")));
    }
}
