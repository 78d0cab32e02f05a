//! Ingest configuration.
//!
//! Built once at startup, either from the process environment or from a YAML
//! file with `${VAR}` / `${VAR:-default}` substitution, and passed by
//! reference to the catalog and orchestrator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snow_common::DataSource;
use tracing::warn;

use crate::error::{IngestError, Result};

pub const DEFAULT_STORAGE_DIR: &str = "./storage";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_RASTER_TOOL: &str = "gdal_translate";

/// Paths and tunables for an ingest.
///
/// Only `storage_dir` is required; everything else has a default or is
/// derived from it:
///
/// ```text
/// $STORAGE_DIR/incoming/<source>/...   upstream drop zone
/// $STORAGE_DIR/wip/                    staging directories and run locks
/// $STORAGE_DIR/live/<source>/          served to the web application
/// $STORAGE_DIR/backup/<source>/        previous live directories
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    pub storage_dir: PathBuf,

    #[serde(default)]
    pub incoming_dir: Option<PathBuf>,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_raster_tool")]
    pub raster_tool: String,

    #[serde(default)]
    pub task_timeout_secs: Option<u64>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_raster_tool() -> String {
    DEFAULT_RASTER_TOOL.to_string()
}

impl IngestConfig {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            incoming_dir: None,
            data_dir: default_data_dir(),
            raster_tool: default_raster_tool(),
            task_timeout_secs: None,
        }
    }

    pub fn with_incoming_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.incoming_dir = Some(dir.into());
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_raster_tool(mut self, program: impl Into<String>) -> Self {
        self.raster_tool = program.into();
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Read the configuration from process environment variables.
    ///
    /// * `STORAGE_DIR` (default `./storage`, with a warning)
    /// * `INCOMING_DIR` (default `$STORAGE_DIR/incoming`)
    /// * `SNOW_TODAY_DATA_DIR` (default `./data`)
    /// * `GDAL_TRANSLATE` (default `gdal_translate`)
    /// * `INGEST_TASK_TIMEOUT_SECS` (default: no timeout)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`IngestConfig::from_env`], with variables supplied by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let storage_dir = match var("STORAGE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                warn!(
                    default = DEFAULT_STORAGE_DIR,
                    "STORAGE_DIR not set; using the default"
                );
                PathBuf::from(DEFAULT_STORAGE_DIR)
            }
        };

        let mut config = Self::new(storage_dir);
        config.incoming_dir = var("INCOMING_DIR").map(PathBuf::from);
        if let Some(dir) = var("SNOW_TODAY_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(program) = var("GDAL_TRANSLATE") {
            config.raster_tool = program;
        }
        if let Some(secs) = var("INGEST_TASK_TIMEOUT_SECS") {
            let secs = secs.trim().parse::<u64>().map_err(|e| {
                IngestError::InvalidConfig(format!(
                    "INGEST_TASK_TIMEOUT_SECS must be a whole number of seconds, got '{secs}': {e}"
                ))
            })?;
            config.task_timeout_secs = Some(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load the configuration from a YAML file, substituting `${VAR}` and
    /// `${VAR:-default}` from the process environment.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_yaml_with_lookup(path, |key| std::env::var(key).ok())
    }

    /// Like [`IngestConfig::from_yaml`], with variables supplied by `lookup`.
    pub fn from_yaml_with_lookup(
        path: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| IngestError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let expanded = substitute_vars(&content, lookup)?;

        let config: Self =
            serde_yaml::from_str(&expanded).map_err(|source| IngestError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values an ingest can't run with.
    pub fn validate(&self) -> Result<()> {
        if self.storage_dir.as_os_str().is_empty() {
            return Err(IngestError::InvalidConfig(
                "storage_dir cannot be empty".to_string(),
            ));
        }
        if self.raster_tool.trim().is_empty() {
            return Err(IngestError::InvalidConfig(
                "raster_tool cannot be empty".to_string(),
            ));
        }
        if self.task_timeout_secs == Some(0) {
            return Err(IngestError::InvalidConfig(
                "task_timeout_secs must be greater than 0".to_string(),
            ));
        }
        self.check_same_volume()
    }

    /// Staging directories are renamed into the live root, which is only
    /// atomic on one filesystem.
    #[cfg(unix)]
    fn check_same_volume(&self) -> Result<()> {
        use std::os::unix::fs::MetadataExt;

        let wip = self.wip_dir();
        let live = self.live_root();
        if let (Ok(wip_meta), Ok(live_meta)) = (std::fs::metadata(&wip), std::fs::metadata(&live)) {
            if wip_meta.dev() != live_meta.dev() {
                return Err(IngestError::InvalidConfig(format!(
                    "WIP directory '{}' and live directory '{}' must be on the same volume",
                    wip.display(),
                    live.display()
                )));
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn check_same_volume(&self) -> Result<()> {
        Ok(())
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_secs.map(Duration::from_secs)
    }

    pub fn incoming_dir(&self) -> PathBuf {
        self.incoming_dir
            .clone()
            .unwrap_or_else(|| self.storage_dir.join("incoming"))
    }

    /// Upstream drop zone for one source.
    pub fn incoming_for(&self, source: DataSource) -> PathBuf {
        self.incoming_dir().join(source.as_str())
    }

    pub fn wip_dir(&self) -> PathBuf {
        self.storage_dir.join("wip")
    }

    pub fn live_root(&self) -> PathBuf {
        self.storage_dir.join("live")
    }

    pub fn live_dir(&self, source: DataSource) -> PathBuf {
        self.live_root().join(source.as_str())
    }

    pub fn backup_root(&self) -> PathBuf {
        self.storage_dir.join("backup")
    }

    pub fn colormaps_file(&self) -> PathBuf {
        self.data_dir.join("colormaps.json")
    }

    pub fn ssp_variables_file(&self) -> PathBuf {
        self.data_dir.join("ssp_variables.json")
    }

    pub fn swe_variables_file(&self) -> PathBuf {
        self.data_dir.join("swe_variables.json")
    }
}

/// Substitute `${VAR}` and `${VAR:-default}` references in configuration text.
///
/// A variable set to the empty string counts as unset. `$$` is a literal `$`,
/// and a `$` not followed by `{` is kept as is. Every unset variable without
/// a default is named in a single error.
fn substitute_vars(content: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    let mut out = String::with_capacity(content.len());
    let mut missing: Vec<String> = Vec::new();
    let mut rest = content;

    while let Some(start) = rest.find('$') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }
        let Some(body) = after.strip_prefix('{') else {
            out.push('$');
            rest = after;
            continue;
        };

        let end = body.find('}').ok_or_else(|| {
            IngestError::InvalidConfig(format!(
                "Unclosed variable reference '${{{}'",
                body.lines().next().unwrap_or_default()
            ))
        })?;
        let expr = &body[..end];
        let (name, default) = match expr.split_once(":-") {
            Some((name, default)) => (name.trim(), Some(default)),
            None => (expr.trim(), None),
        };
        if !is_var_name(name) {
            return Err(IngestError::InvalidConfig(format!(
                "Invalid variable name '{name}' in '${{{expr}}}'"
            )));
        }

        match (lookup(name).filter(|value| !value.is_empty()), default) {
            (Some(value), _) => out.push_str(&value),
            (None, Some(default)) => out.push_str(default),
            (None, None) => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
            }
        }
        rest = &body[end + 1..];
    }
    out.push_str(rest);

    if !missing.is_empty() {
        return Err(IngestError::InvalidConfig(format!(
            "Configuration refers to unset variables: {}",
            missing.join(", ")
        )));
    }
    Ok(out)
}

fn is_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = IngestConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.storage_dir, PathBuf::from(DEFAULT_STORAGE_DIR));
        assert_eq!(config.incoming_dir(), PathBuf::from("./storage/incoming"));
        assert_eq!(config.raster_tool, "gdal_translate");
        assert_eq!(config.task_timeout(), None);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = IngestConfig::from_lookup(lookup(&[
            ("STORAGE_DIR", "/share/snow"),
            ("INCOMING_DIR", "/share/incoming"),
            ("SNOW_TODAY_DATA_DIR", "/repo/data"),
            ("GDAL_TRANSLATE", "/opt/gdal/bin/gdal_translate"),
            ("INGEST_TASK_TIMEOUT_SECS", "600"),
        ]))
        .unwrap();

        assert_eq!(
            config.incoming_for(DataSource::SnowWaterEquivalent),
            PathBuf::from("/share/incoming/snow-water-equivalent")
        );
        assert_eq!(
            config.live_dir(DataSource::SnowSurfaceProperties),
            PathBuf::from("/share/snow/live/snow-surface-properties")
        );
        assert_eq!(config.backup_root(), PathBuf::from("/share/snow/backup"));
        assert_eq!(config.colormaps_file(), PathBuf::from("/repo/data/colormaps.json"));
        assert_eq!(config.task_timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_bad_timeout_rejected() {
        let err = IngestConfig::from_lookup(lookup(&[("INGEST_TASK_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidConfig(_)));

        let err = IngestConfig::from_lookup(lookup(&[("INGEST_TASK_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
    }

    #[test]
    fn test_from_yaml_with_substitution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ingest.yaml");
        std::fs::write(
            &path,
            "storage_dir: ${SNOW_STORAGE}\n\
             raster_tool: ${GDAL_TRANSLATE:-gdal_translate}\n\
             task_timeout_secs: 30\n",
        )
        .unwrap();

        let config =
            IngestConfig::from_yaml_with_lookup(&path, lookup(&[("SNOW_STORAGE", "/env/storage")]))
                .unwrap();
        assert_eq!(config.storage_dir, PathBuf::from("/env/storage"));
        assert_eq!(config.raster_tool, "gdal_translate");
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.task_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_from_yaml_unknown_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ingest.yaml");
        std::fs::write(&path, "storage_dir: /s\ndatabase: postgres\n").unwrap();

        let err = IngestConfig::from_yaml(&path).unwrap_err();
        assert!(matches!(err, IngestError::ConfigParse { .. }));
    }

    #[test]
    fn test_substitute_vars() {
        let vars = lookup(&[("STORAGE", "/share/snow"), ("EMPTY", "")]);
        assert_eq!(
            substitute_vars("dir: ${STORAGE}/live", &vars).unwrap(),
            "dir: /share/snow/live"
        );
        assert_eq!(substitute_vars("${ EMPTY :-fallback}", &vars).unwrap(), "fallback");
        assert_eq!(substitute_vars("${MISSING:-}", &vars).unwrap(), "");
        assert_eq!(substitute_vars("cost: $$5 or $5", &vars).unwrap(), "cost: $5 or $5");
    }

    #[test]
    fn test_substitute_vars_reports_every_unset_variable() {
        let err = substitute_vars("${A}/${B}/${A}/${C:-c}", lookup(&[])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: Configuration refers to unset variables: A, B"
        );
    }

    #[test]
    fn test_substitute_vars_rejects_malformed_references() {
        assert!(substitute_vars("storage_dir: ${UNCLOSED\n", lookup(&[])).is_err());
        assert!(substitute_vars("${not-a-name}", lookup(&[])).is_err());
        assert!(substitute_vars("${}", lookup(&[])).is_err());
    }
}
