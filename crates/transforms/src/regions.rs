//! Region metadata and region shape transforms.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use schema::{SchemaId, SchemaRegistry};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

use crate::error::{Result, TransformError};
use crate::files::{ensure_dir, ensure_parent, file_name, read_json, write_json};
use crate::transform::{TaskInput, Transform};

/// Validate and copy the region metadata drop.
///
/// Each top-level file is matched to one of the region schemas by filename.
/// Unrecognized files are skipped with a warning. All recognized files are
/// validated before any is written.
pub struct RegionMetadata {
    registry: Arc<SchemaRegistry>,
}

impl RegionMetadata {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Transform for RegionMetadata {
    fn name(&self) -> &'static str {
        "region-metadata"
    }

    #[instrument(skip(self, input))]
    async fn apply(&self, input: &TaskInput, to: &Path) -> Result<()> {
        let from = input.single()?;
        let entries = std::fs::read_dir(from).map_err(|e| TransformError::io("list", from, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| TransformError::io("list", from, e))?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut validated: Vec<(PathBuf, Value)> = Vec::new();
        for file in &files {
            let name = file_name(file);
            let Some(entry) = self
                .registry
                .match_filename_among(&name, &SchemaId::REGION_METADATA)?
            else {
                warn!(file = %name, "Not a recognized filename pattern; ignoring");
                continue;
            };

            debug!(file = %name, schema = %entry.id(), "Validating");
            let value = read_json(file).await?;
            if let Err(e) = entry.validate(&value, &name) {
                error!(file = %name, error = %e, "Failed validation");
                return Err(e.into());
            }
            info!(file = %name, "Validated");
            validated.push((to.join(&name), value));
        }

        if validated.is_empty() {
            return Err(TransformError::NoInputs {
                path: from.to_path_buf(),
                pattern: "region metadata JSON".to_string(),
            });
        }

        ensure_dir(to).await?;
        for (output, value) in &validated {
            write_json(output, value).await?;
            info!(to = %output.display(), "Wrote region metadata");
        }
        Ok(())
    }
}

/// Copy the region shapes tree, repairing known GeoJSON malformations.
///
/// Nested directories are preserved. Non-GeoJSON files are copied verbatim.
pub struct RegionShapes;

#[async_trait]
impl Transform for RegionShapes {
    fn name(&self) -> &'static str {
        "region-shapes"
    }

    #[instrument(skip(self, input))]
    async fn apply(&self, input: &TaskInput, to: &Path) -> Result<()> {
        let from = input.single()?;

        let mut files = Vec::new();
        for entry in WalkDir::new(from).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(from).to_path_buf();
                TransformError::io("walk", path, e.into())
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        if files.is_empty() {
            return Err(TransformError::NoInputs {
                path: from.to_path_buf(),
                pattern: "**/*".to_string(),
            });
        }

        ensure_dir(to).await?;
        let mut repaired = 0usize;
        for file in &files {
            let relative = file
                .strip_prefix(from)
                .map_err(|e| TransformError::unexpected(file, e.to_string()))?;
            let output = to.join(relative);

            if file.extension().is_some_and(|ext| ext == "geojson") {
                let value = read_json(file).await?;
                let (fixed, changed) = fix_geojson(value, file)?;
                if changed {
                    warn!(
                        file = %file.display(),
                        "'features' is not a list; repaired a known malformation"
                    );
                    repaired += 1;
                }
                write_json(&output, &fixed).await?;
            } else {
                ensure_parent(&output).await?;
                tokio::fs::copy(file, &output)
                    .await
                    .map_err(|e| TransformError::io("copy", file, e))?;
            }
            debug!(to = %output.display(), "Wrote shape file");
        }

        info!(count = files.len(), repaired, to = %to.display(), "Region shapes ingested");
        Ok(())
    }
}

/// Repair a GeoJSON document whose `features` member is not a list.
///
/// Two malformations are known:
///
/// * `features` and its `geometry` are both singular: wrap the feature in a
///   one-element list.
/// * `features` is singular but `geometry` is a list: emit one feature per
///   geometry, adding one level of nesting to each geometry's coordinates.
///
/// Returns the document and whether it was changed.
pub fn fix_geojson(mut geojson: Value, path: &Path) -> Result<(Value, bool)> {
    let Some(features) = geojson.get("features") else {
        return Err(TransformError::unexpected(path, "GeoJSON has no 'features' member"));
    };
    if features.is_array() {
        return Ok((geojson, false));
    }

    let fixed_features = match features {
        Value::Object(feature) => match feature.get("geometry") {
            Some(Value::Object(_)) => Value::Array(vec![features.clone()]),
            Some(Value::Array(geometries)) => {
                let mut fixed = Vec::with_capacity(geometries.len());
                for geometry in geometries {
                    let mut geometry = geometry.clone();
                    let Some(coordinates) = geometry.get_mut("coordinates") else {
                        return Err(TransformError::unexpected(
                            path,
                            "geometry in 'features.geometry' has no 'coordinates'",
                        ));
                    };
                    *coordinates = Value::Array(vec![coordinates.take()]);
                    fixed.push(json!({"type": "Feature", "geometry": geometry}));
                }
                Value::Array(fixed)
            }
            _ => {
                return Err(TransformError::unexpected(
                    path,
                    "singular 'features' has no usable 'geometry'",
                ))
            }
        },
        _ => {
            return Err(TransformError::unexpected(
                path,
                "'features' must be a list or an object",
            ))
        }
    };

    geojson["features"] = fixed_features;
    Ok((geojson, true))
}
