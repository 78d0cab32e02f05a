//! Compiled schemas with their filename patterns.

use std::path::Path;

use jsonschema::Validator;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, SchemaError};
use crate::id::SchemaId;

/// A compiled schema and the filename pattern that selects it.
pub struct SchemaEntry {
    id: SchemaId,
    pattern: Regex,
    document: Value,
    validator: Validator,
}

impl SchemaEntry {
    fn compile(id: SchemaId, pattern: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(id.document())
            .map_err(|source| SchemaError::MalformedSchema { id, source })?;
        let validator = jsonschema::validator_for(&document).map_err(|e| {
            SchemaError::InvalidSchema {
                id,
                message: e.to_string(),
            }
        })?;
        let pattern =
            Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern { id, source })?;

        Ok(Self {
            id,
            pattern,
            document,
            validator,
        })
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn matches(&self, filename: &str) -> bool {
        self.pattern.is_match(filename)
    }

    /// Validate `instance`, collecting every violation.
    ///
    /// `subject` names the document in the error (usually a filename).
    pub fn validate(&self, instance: &Value, subject: &str) -> Result<()> {
        let violations: Vec<String> = self
            .validator
            .iter_errors(instance)
            .map(|e| format!("{} (at '{}')", e, e.instance_path))
            .collect();

        if violations.is_empty() {
            debug!(schema = %self.id, subject, "Validated");
            Ok(())
        } else {
            Err(SchemaError::Invalid {
                subject: subject.to_string(),
                id: self.id,
                violations,
            })
        }
    }
}

impl std::fmt::Debug for SchemaEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaEntry")
            .field("id", &self.id)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

/// Outcome of validating a single file by filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileValidation {
    /// The file matched a schema and is valid against it.
    Valid(SchemaId),
    /// No schema pattern matched the filename.
    Skipped,
}

/// All registered schemas, in registration order.
#[derive(Debug)]
pub struct SchemaRegistry {
    entries: Vec<SchemaEntry>,
}

impl SchemaRegistry {
    /// Every built-in schema with its default filename pattern.
    pub fn builtin() -> Result<Self> {
        Self::new(SchemaId::ALL.map(|id| (id, id.default_pattern())))
    }

    /// Build a registry from explicit `(schema, filename pattern)` pairs.
    pub fn new<'a>(specs: impl IntoIterator<Item = (SchemaId, &'a str)>) -> Result<Self> {
        let entries = specs
            .into_iter()
            .map(|(id, pattern)| SchemaEntry::compile(id, pattern))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn get(&self, id: SchemaId) -> Result<&SchemaEntry> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .ok_or(SchemaError::NotRegistered(id))
    }

    /// The schema document, pretty-printed.
    pub fn schema_json(&self, id: SchemaId) -> Result<String> {
        let entry = self.get(id)?;
        serde_json::to_string_pretty(entry.document())
            .map_err(|source| SchemaError::MalformedSchema { id, source })
    }

    pub fn validate(&self, id: SchemaId, instance: &Value, subject: &str) -> Result<()> {
        self.get(id)?.validate(instance, subject)
    }

    /// Find the schema whose pattern matches `filename`.
    pub fn match_filename(&self, filename: &str) -> Result<Option<&SchemaEntry>> {
        Self::unique_match(filename, self.entries.iter())
    }

    /// Like [`match_filename`](Self::match_filename), considering only `ids`.
    pub fn match_filename_among(
        &self,
        filename: &str,
        ids: &[SchemaId],
    ) -> Result<Option<&SchemaEntry>> {
        Self::unique_match(
            filename,
            self.entries.iter().filter(|entry| ids.contains(&entry.id)),
        )
    }

    fn unique_match<'a>(
        filename: &str,
        candidates: impl Iterator<Item = &'a SchemaEntry>,
    ) -> Result<Option<&'a SchemaEntry>> {
        let matched: Vec<&SchemaEntry> = candidates.filter(|e| e.matches(filename)).collect();

        match matched.as_slice() {
            [] => Ok(None),
            [entry] => {
                debug!(filename, schema = %entry.id, "Found matching schema");
                Ok(Some(entry))
            }
            _ => Err(SchemaError::AmbiguousMatch {
                filename: filename.to_string(),
                candidates: matched.iter().map(|e| e.id).collect(),
            }),
        }
    }

    /// Validate a JSON file against the schema selected by its filename.
    pub fn validate_file(&self, path: &Path) -> Result<FileValidation> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(entry) = self.match_filename(&filename)? else {
            warn!(file = %path.display(), "No schema matches this filename; skipping");
            return Ok(FileValidation::Skipped);
        };

        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let instance: Value = serde_json::from_str(&text).map_err(|source| SchemaError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        entry.validate(&instance, &filename)?;
        Ok(FileValidation::Valid(entry.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical_filename(id: SchemaId) -> &'static str {
        match id {
            SchemaId::ColormapsIndex => "colormaps.json",
            SchemaId::VariablesIndex => "variables.json",
            SchemaId::SuperRegionsIndex => "root.json",
            SchemaId::SubRegionsIndex => "26000.json",
            SchemaId::SubRegionCollectionsIndex => "collections.json",
            SchemaId::SubRegionsHierarchy => "26000_hierarchy.json",
            SchemaId::SwePoints => "swe.json",
            SchemaId::Plots => "26000_01.json",
        }
    }

    fn valid_plot() -> Value {
        json!({
            "metadata": {"minYear": 2001, "maxYear": 2011},
            "data": {
                "dayOfWaterYear": [1, 2],
                "date": ["2023-10-01", "2023-10-02"],
                "yearToDate": [0.5, null],
                "min": [0.0, 0.0],
                "max": [1.0, 1.5],
                "median": [0.3, 0.4],
                "prc25": [0.1, 0.2],
                "prc75": [0.6, 0.7]
            }
        })
    }

    #[test]
    fn test_builtin_compiles() {
        let registry = SchemaRegistry::builtin().unwrap();
        assert_eq!(registry.entries().len(), SchemaId::ALL.len());
    }

    #[test]
    fn test_builtin_patterns_are_disjoint() {
        let registry = SchemaRegistry::builtin().unwrap();
        for id in SchemaId::ALL {
            let entry = registry
                .match_filename(canonical_filename(id))
                .unwrap()
                .unwrap();
            assert_eq!(entry.id(), id);
        }
    }

    #[test]
    fn test_unmatched_filename() {
        let registry = SchemaRegistry::builtin().unwrap();
        assert!(registry.match_filename("README.md").unwrap().is_none());
        assert!(registry.match_filename("xroot.json").unwrap().is_none());
    }

    #[test]
    fn test_ambiguous_match_is_error() {
        let registry = SchemaRegistry::new([
            (SchemaId::SubRegionsIndex, r"^\d+\.json$"),
            (SchemaId::Plots, r"^\d+.*\.json$"),
        ])
        .unwrap();

        let err = registry.match_filename("123.json").unwrap_err();
        match err {
            SchemaError::AmbiguousMatch { candidates, .. } => {
                assert_eq!(candidates, vec![SchemaId::SubRegionsIndex, SchemaId::Plots]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_match_among_restricts_candidates() {
        let registry = SchemaRegistry::builtin().unwrap();
        let found = registry
            .match_filename_among("swe.json", &SchemaId::REGION_METADATA)
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_plot_missing_median_rejected() {
        let registry = SchemaRegistry::builtin().unwrap();
        let mut plot = valid_plot();
        registry.validate(SchemaId::Plots, &plot, "26000_01.json").unwrap();

        plot["data"].as_object_mut().unwrap().remove("median");
        let err = registry
            .validate(SchemaId::Plots, &plot, "26000_01.json")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("median"), "{message}");
        assert!(message.contains("26000_01.json"), "{message}");
    }

    #[test]
    fn test_hierarchy_recursion() {
        let registry = SchemaRegistry::builtin().unwrap();
        let hierarchy = json!({
            "collections": {
                "huc2": {
                    "regions": {
                        "10": {
                            "collections": {
                                "huc4": {"regions": {"1001": {"collections": null}}}
                            }
                        }
                    }
                }
            }
        });
        registry
            .validate(SchemaId::SubRegionsHierarchy, &hierarchy, "26000_hierarchy.json")
            .unwrap();

        let broken = json!({"collections": {"huc2": {"regions": {"10": {"collections": 5}}}}});
        assert!(registry
            .validate(SchemaId::SubRegionsHierarchy, &broken, "26000_hierarchy.json")
            .is_err());
    }

    #[test]
    fn test_validate_file() {
        let registry = SchemaRegistry::builtin().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let plot_path = dir.path().join("26000_01.json");
        std::fs::write(&plot_path, valid_plot().to_string()).unwrap();
        assert_eq!(
            registry.validate_file(&plot_path).unwrap(),
            FileValidation::Valid(SchemaId::Plots)
        );

        let other = dir.path().join("notes.json");
        std::fs::write(&other, "{}").unwrap();
        assert_eq!(registry.validate_file(&other).unwrap(), FileValidation::Skipped);

        let bad = dir.path().join("colormaps.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(matches!(
            registry.validate_file(&bad),
            Err(SchemaError::Json { .. })
        ));
    }

    #[test]
    fn test_schema_json_is_pretty() {
        let registry = SchemaRegistry::builtin().unwrap();
        let text = registry.schema_json(SchemaId::SwePoints).unwrap();
        assert!(text.contains("\n  \"title\": \"SwePayload\""));
    }
}
