//! A temporary storage tree laid out like a deployment.
//!
//! ```text
//! <root>/
//!   data/                                  reference JSON
//!   storage/
//!     incoming/snow-surface-properties/{regions,shapes,cogs,plots}
//!     incoming/snow-water-equivalent/points
//!     wip/  live/  backup/                 created by the ingest
//!   bin/fake_gdal_translate                stand-in raster tool
//! ```

use std::path::{Path, PathBuf};

use serde_json::Value;
use walkdir::WalkDir;

use crate::fixtures;
use crate::paths::temp_test_dir_with_prefix;

pub const SSP_INCOMING: &str = "snow-surface-properties";
pub const SWE_INCOMING: &str = "snow-water-equivalent";

/// A populated temporary deployment, removed on drop.
pub struct TestStorage {
    root: tempfile::TempDir,
}

impl TestStorage {
    /// An empty tree with only the reference data written.
    pub fn new() -> Self {
        let storage = Self {
            root: temp_test_dir_with_prefix("snow_ingest_"),
        };
        std::fs::create_dir_all(storage.storage_dir()).expect("Failed to create storage dir");
        storage.write_json(storage.data_dir().join("colormaps.json"), &fixtures::colormaps());
        storage.write_json(
            storage.data_dir().join("ssp_variables.json"),
            &fixtures::ssp_variables(),
        );
        storage.write_json(
            storage.data_dir().join("swe_variables.json"),
            &fixtures::swe_variables(),
        );
        storage
    }

    /// A tree with valid incoming data for both sources.
    pub fn populated() -> Self {
        let storage = Self::new();
        storage.populate_ssp();
        storage.populate_swe();
        storage
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root().join("data")
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.root().join("storage")
    }

    pub fn incoming_dir(&self) -> PathBuf {
        self.storage_dir().join("incoming")
    }

    pub fn ssp_incoming(&self, kind: &str) -> PathBuf {
        self.incoming_dir().join(SSP_INCOMING).join(kind)
    }

    pub fn swe_incoming(&self) -> PathBuf {
        self.incoming_dir().join(SWE_INCOMING).join("points")
    }

    pub fn wip_dir(&self) -> PathBuf {
        self.storage_dir().join("wip")
    }

    pub fn live_dir(&self, source: &str) -> PathBuf {
        self.storage_dir().join("live").join(source)
    }

    pub fn backup_root(&self) -> PathBuf {
        self.storage_dir().join("backup")
    }

    /// Write valid region metadata, shapes, GeoTIFFs, and plots.
    pub fn populate_ssp(&self) {
        let region = fixtures::SUPER_REGION_ID;
        let regions = self.ssp_incoming("regions");
        self.write_json(regions.join("root.json"), &fixtures::super_regions());
        self.write_json(regions.join(format!("{region}.json")), &fixtures::sub_regions());
        self.write_json(regions.join("collections.json"), &fixtures::collections());
        self.write_json(
            regions.join(format!("{region}_hierarchy.json")),
            &fixtures::hierarchy(),
        );

        let shapes = self.ssp_incoming("shapes");
        self.write_json(shapes.join(format!("{region}.geojson")), &fixtures::shape());
        self.write_json(shapes.join("26001").join("26001.geojson"), &fixtures::malformed_shape());

        let cogs = self.ssp_incoming("cogs");
        self.write_text(cogs.join(format!("{region}_1.tif")), "raster one");
        self.write_text(cogs.join(format!("{region}_3.tif")), "raster three");

        let plots = self.ssp_incoming("plots");
        self.write_json(plots.join(format!("{region}_1.json")), &fixtures::plot());
        self.write_json(plots.join(format!("{region}_3.json")), &fixtures::plot());
    }

    /// Write a valid station CSV.
    pub fn populate_swe(&self) {
        self.write_text(self.swe_incoming().join("swe.txt"), &fixtures::swe_csv());
    }

    pub fn write_json(&self, path: impl AsRef<Path>, value: &Value) {
        let text = serde_json::to_string_pretty(value).expect("Failed to serialize fixture");
        self.write_text(path, &text);
    }

    pub fn write_text(&self, path: impl AsRef<Path>, text: &str) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        std::fs::write(path, text).expect("Failed to write fixture");
    }

    /// Remove every file in an incoming directory, keeping the directory.
    pub fn clear(&self, dir: impl AsRef<Path>) {
        let dir = dir.as_ref();
        std::fs::remove_dir_all(dir).expect("Failed to clear fixture directory");
        std::fs::create_dir_all(dir).expect("Failed to recreate fixture directory");
    }

    /// Write an executable that copies its first argument to its second,
    /// standing in for the raster tool.
    #[cfg(unix)]
    pub fn fake_raster_tool(&self) -> PathBuf {
        self.script("fake_gdal_translate", "#!/bin/sh\ncp \"$1\" \"$2\"\n")
    }

    /// Write an executable that always fails with a message on stderr.
    #[cfg(unix)]
    pub fn failing_raster_tool(&self) -> PathBuf {
        self.script(
            "failing_gdal_translate",
            "#!/bin/sh\necho \"ERROR 4: not a raster\" >&2\nexit 1\n",
        )
    }

    /// Write an executable that sleeps well past any test timeout.
    #[cfg(unix)]
    pub fn hanging_raster_tool(&self) -> PathBuf {
        self.script("hanging_gdal_translate", "#!/bin/sh\nsleep 30\n")
    }

    #[cfg(unix)]
    fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.root().join("bin").join(name);
        self.write_text(&path, body);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to make script executable");
        path
    }

    /// Every file under `dir`, relative to it, sorted. Empty if `dir` is missing.
    pub fn list_tree(dir: impl AsRef<Path>) -> Vec<String> {
        let dir = dir.as_ref();
        let mut files: Vec<String> = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| !entry.file_type().is_dir())
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(dir)
                    .ok()
                    .map(|relative| relative.to_string_lossy().into_owned())
            })
            .collect();
        files.sort();
        files
    }
}

impl Default for TestStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_populated_layout() {
        let storage = TestStorage::populated();
        let files = TestStorage::list_tree(storage.incoming_dir());
        assert!(files.contains(&"snow-surface-properties/regions/root.json".to_string()));
        assert!(files.contains(&"snow-surface-properties/shapes/26001/26001.geojson".to_string()));
        assert!(files.contains(&"snow-water-equivalent/points/swe.txt".to_string()));
        assert!(storage.data_dir().join("colormaps.json").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_fake_raster_tool_copies() {
        let storage = TestStorage::new();
        let tool = storage.fake_raster_tool();
        let input = storage.root().join("in.tif");
        let output = storage.root().join("out.tif");
        std::fs::write(&input, "pixels").unwrap();

        let status = std::process::Command::new(&tool)
            .arg(&input)
            .arg(&output)
            .arg("-of")
            .arg("COG")
            .status()
            .unwrap();
        assert!(status.success());
        assert_eq!(std::fs::read_to_string(output).unwrap(), "pixels");
    }
}
