//! Promotion of a staging directory to the live location.
//!
//! The previous live directory is renamed into a dated backup, then the
//! staging directory is renamed into place. Both are directory renames on
//! one volume, so the live path is never half-populated; it is briefly
//! absent between the two renames.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use snow_common::DataSource;
use tracing::{error, info, instrument};

use crate::error::PublishError;

/// Where a publish left things.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub live: PathBuf,
    /// `None` on the first publish of a source.
    pub backup: Option<PathBuf>,
}

impl fmt::Display for PublishReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "live: {}; backup: ", self.live.display())?;
        match &self.backup {
            Some(backup) => write!(f, "{}", backup.display()),
            None => f.write_str("none"),
        }
    }
}

/// `<backup_root>/<source>/bkp-<today>`, suffixed `_1`, `_2`, ... until unused.
pub fn unique_backup_path(backup_root: &Path, source: DataSource, today: NaiveDate) -> PathBuf {
    let base = format!("bkp-{}", today.format("%Y-%m-%d"));
    let dir = backup_root.join(source.as_str());

    let mut candidate = dir.join(&base);
    let mut suffix = 0u32;
    while candidate.exists() {
        suffix += 1;
        candidate = dir.join(format!("{base}_{suffix}"));
    }
    candidate
}

/// Replace `live` with `staging`, backing up the previous live directory.
///
/// Nothing is rolled back on failure. If the second rename fails, the error
/// names the backup so an operator can restore it.
#[instrument(skip_all, fields(source = %source, staging = %staging.display()))]
pub fn publish(
    staging: &Path,
    live: &Path,
    backup_root: &Path,
    source: DataSource,
    today: NaiveDate,
) -> Result<PublishReport, PublishError> {
    let backup = if live.exists() {
        if !live.is_dir() {
            return Err(PublishError::LiveNotDirectory(live.to_path_buf()));
        }

        let backup = unique_backup_path(backup_root, source, today);
        create_parent(&backup)?;
        std::fs::rename(live, &backup).map_err(|source| PublishError::Backup {
            live: live.to_path_buf(),
            backup: backup.clone(),
            source,
        })?;
        info!(from = %live.display(), to = %backup.display(), "Backed up live directory");
        Some(backup)
    } else {
        create_parent(live)?;
        None
    };

    if let Err(source) = std::fs::rename(staging, live) {
        let err = PublishError::PromotionFailed {
            staging: staging.to_path_buf(),
            live: live.to_path_buf(),
            backup,
            source,
        };
        error!(error = %err, "Publish failed mid-swap; manual recovery required");
        return Err(err);
    }

    let report = PublishReport {
        live: live.to_path_buf(),
        backup,
    };
    info!(%report, "Published");
    Ok(report)
}

fn create_parent(path: &Path) -> Result<(), PublishError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| PublishError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: DataSource = DataSource::SnowSurfaceProperties;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn stage(root: &Path, name: &str, marker: &str) -> PathBuf {
        let staging = root.join("wip").join(name);
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("marker"), marker).unwrap();
        staging
    }

    #[test]
    fn test_unique_backup_path_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_backup_path(dir.path(), SOURCE, today());
        assert_eq!(
            first,
            dir.path().join("snow-surface-properties").join("bkp-2024-01-15")
        );

        std::fs::create_dir_all(&first).unwrap();
        let second = unique_backup_path(dir.path(), SOURCE, today());
        assert!(second.ends_with("bkp-2024-01-15_1"));

        std::fs::create_dir_all(&second).unwrap();
        let third = unique_backup_path(dir.path(), SOURCE, today());
        assert!(third.ends_with("bkp-2024-01-15_2"));
    }

    #[test]
    fn test_first_publish_has_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let staging = stage(dir.path(), "a", "one");
        let live = dir.path().join("live").join(SOURCE.as_str());

        let report = publish(&staging, &live, &dir.path().join("backup"), SOURCE, today()).unwrap();

        assert_eq!(report.backup, None);
        assert!(report.to_string().ends_with("backup: none"));
        assert_eq!(std::fs::read_to_string(live.join("marker")).unwrap(), "one");
        assert!(!staging.exists());
    }

    #[test]
    fn test_same_day_republish_keeps_every_backup() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("live").join(SOURCE.as_str());
        let backup_root = dir.path().join("backup");

        for (name, marker) in [("a", "one"), ("b", "two"), ("c", "three")] {
            let staging = stage(dir.path(), name, marker);
            publish(&staging, &live, &backup_root, SOURCE, today()).unwrap();
        }

        let backups = backup_root.join(SOURCE.as_str());
        assert_eq!(
            std::fs::read_to_string(backups.join("bkp-2024-01-15").join("marker")).unwrap(),
            "one"
        );
        assert_eq!(
            std::fs::read_to_string(backups.join("bkp-2024-01-15_1").join("marker")).unwrap(),
            "two"
        );
        assert_eq!(std::fs::read_to_string(live.join("marker")).unwrap(), "three");
    }

    #[test]
    fn test_promotion_failure_reports_backup() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("live").join(SOURCE.as_str());
        let backup_root = dir.path().join("backup");
        publish(&stage(dir.path(), "a", "one"), &live, &backup_root, SOURCE, today()).unwrap();

        let missing = dir.path().join("wip").join("vanished");
        let err = publish(&missing, &live, &backup_root, SOURCE, today()).unwrap_err();

        let PublishError::PromotionFailed { backup: Some(backup), .. } = &err else {
            panic!("unexpected error: {err}");
        };
        assert!(!live.exists());
        assert_eq!(std::fs::read_to_string(backup.join("marker")).unwrap(), "one");
        assert!(err.to_string().contains("restore it manually"));
    }

    #[test]
    fn test_live_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("live");
        std::fs::write(&live, "not a dir").unwrap();
        let staging = stage(dir.path(), "a", "one");

        let err = publish(&staging, &live, &dir.path().join("backup"), SOURCE, today()).unwrap_err();
        assert!(matches!(err, PublishError::LiveNotDirectory(_)));
        assert!(staging.exists());
    }
}
