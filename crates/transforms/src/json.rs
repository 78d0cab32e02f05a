//! Validate-and-copy transforms for JSON payloads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use schema::{SchemaId, SchemaRegistry};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::error::Result;
use crate::files::{ensure_dir, file_name, read_json, require_files, write_json};
use crate::transform::{TaskInput, Transform};

/// Copy one JSON file after validating it against a schema.
///
/// Used for version-controlled reference data (colormaps, variables), which
/// is re-ingested every run so the live tree never drifts from the repo.
pub struct ValidateAndCopyJson {
    registry: Arc<SchemaRegistry>,
    schema: SchemaId,
}

impl ValidateAndCopyJson {
    pub fn new(registry: Arc<SchemaRegistry>, schema: SchemaId) -> Self {
        Self { registry, schema }
    }
}

#[async_trait]
impl Transform for ValidateAndCopyJson {
    fn name(&self) -> &'static str {
        "validate-and-copy-json"
    }

    #[instrument(skip(self, input), fields(schema = %self.schema))]
    async fn apply(&self, input: &TaskInput, to: &Path) -> Result<()> {
        let from = input.single()?;
        let value = read_json(from).await?;

        self.registry
            .validate(self.schema, &value, &file_name(from))?;
        info!(file = %file_name(from), "Validated");

        write_json(to, &value).await?;
        debug!(to = %to.display(), "Wrote JSON");
        Ok(())
    }
}

/// Ingest a directory of per-region/variable plot JSON.
///
/// Every file is validated before any is written, so a single bad payload
/// leaves the destination empty.
pub struct PlotJson {
    registry: Arc<SchemaRegistry>,
}

impl PlotJson {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Transform for PlotJson {
    fn name(&self) -> &'static str {
        "plot-json"
    }

    #[instrument(skip(self, input))]
    async fn apply(&self, input: &TaskInput, to: &Path) -> Result<()> {
        let from = input.single()?;
        let files = require_files(from, "json")?;
        info!(count = files.len(), from = %from.display(), "Ingesting plot JSON");

        let plots = self.registry.get(SchemaId::Plots)?;
        let mut validated: Vec<(PathBuf, Value)> = Vec::with_capacity(files.len());
        for file in &files {
            let name = file_name(file);
            if !plots.matches(&name) {
                warn!(file = %name, "Plot filename is not of the form '{{regionId}}_{{variableId}}.json'");
            }

            let value = read_json(file).await?;
            if let Err(e) = plots.validate(&value, &name) {
                error!(file = %name, error = %e, "Failed validation");
                return Err(e.into());
            }
            validated.push((to.join(&name), value));
        }

        ensure_dir(to).await?;
        for (output, value) in &validated {
            write_json(output, value).await?;
            debug!(to = %output.display(), "Wrote plot JSON");
        }

        info!(count = validated.len(), to = %to.display(), "Plot JSON ingested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> Arc<SchemaRegistry> {
        Arc::new(SchemaRegistry::builtin().unwrap())
    }

    #[tokio::test]
    async fn test_copy_rejects_invalid_payload() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("colormaps.json");
        std::fs::write(&from, json!({"1": {"name": "x"}}).to_string()).unwrap();
        let to = dir.path().join("out").join("colormaps.json");

        let transform = ValidateAndCopyJson::new(registry(), SchemaId::ColormapsIndex);
        let err = transform
            .apply(&TaskInput::path(&from), &to)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("colors"), "{err}");
        assert!(!to.exists());
    }

    #[tokio::test]
    async fn test_copy_writes_compact_json() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("colormaps.json");
        std::fs::write(
            &from,
            "{\n  \"1\": {\n    \"name\": \"mono\",\n    \"colors\": [[0, 0, 0]]\n  }\n}\n",
        )
        .unwrap();
        let to = dir.path().join("nested").join("colormaps.json");

        ValidateAndCopyJson::new(registry(), SchemaId::ColormapsIndex)
            .apply(&TaskInput::path(&from), &to)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&to).unwrap();
        assert!(!written.contains('\n'));
        let value: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value, json!({"1": {"name": "mono", "colors": [[0, 0, 0]]}}));
    }

    #[tokio::test]
    async fn test_plot_json_rejects_named_input() {
        let input = TaskInput::named([("plots", "/nowhere")]);
        let err = PlotJson::new(registry())
            .apply(&input, Path::new("/tmp/unused"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::TransformError::ExpectedSinglePath(_)));
    }
}
