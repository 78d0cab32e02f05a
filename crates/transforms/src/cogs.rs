//! Conversion of raw GeoTIFFs to Cloud-Optimized GeoTIFFs.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::error::{Result, TransformError};
use crate::files::{ensure_dir, file_name, require_files};
use crate::transform::{TaskInput, Transform};

/// Creation options passed to the raster tool for every conversion.
pub const COG_OPTIONS: [&str; 6] = [
    "-of",
    "COG",
    "-co",
    "OVERVIEW_RESAMPLING=NEAREST",
    "-co",
    "COMPRESS=LZW",
];

/// Convert every `*.tif` in a directory with an external raster tool.
///
/// Output files keep their input names.
pub struct CloudOptimize {
    program: String,
}

impl CloudOptimize {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        if tokio::fs::try_exists(output).await.unwrap_or(false) {
            tokio::fs::remove_file(output)
                .await
                .map_err(|e| TransformError::io("remove", output, e))?;
        }

        let result = Command::new(&self.program)
            .arg(input)
            .arg(output)
            .args(COG_OPTIONS)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TransformError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(TransformError::Subprocess {
                program: self.program.clone(),
                input: input.to_path_buf(),
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        if !output.is_file() {
            return Err(TransformError::unexpected(
                output,
                format!("'{}' reported success but wrote no output", self.program),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Transform for CloudOptimize {
    fn name(&self) -> &'static str {
        "cloud-optimize"
    }

    #[instrument(skip(self, input), fields(program = %self.program))]
    async fn apply(&self, input: &TaskInput, to: &Path) -> Result<()> {
        let from = input.single()?;
        let files = require_files(from, "tif")?;
        ensure_dir(to).await?;

        info!(count = files.len(), from = %from.display(), "Cloud-optimizing GeoTIFFs");
        for file in &files {
            let output: PathBuf = to.join(file_name(file));
            self.convert(file, &output).await?;
            debug!(to = %output.display(), "Wrote COG");
        }

        info!(count = files.len(), to = %to.display(), "GeoTIFFs cloud-optimized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = CloudOptimize::new("true")
            .apply(&TaskInput::path(dir.path()), &dir.path().join("out"))
            .await
            .unwrap_err();

        assert!(matches!(err, TransformError::NoInputs { .. }));
        assert!(err.to_string().starts_with("Aborting"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.tif"), b"tif").unwrap();

        let err = CloudOptimize::new("/nonexistent/gdal_translate")
            .apply(&TaskInput::path(dir.path()), &dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_program_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.tif"), b"tif").unwrap();

        let err = CloudOptimize::new("false")
            .apply(&TaskInput::path(dir.path()), &dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::Subprocess { .. }));
    }
}
