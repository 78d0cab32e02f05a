//! Per-source run lock.
//!
//! Two runs of the same source would race on the live/backup swap. The lock
//! is a file in the WIP directory created exclusively; it is removed when the
//! guard drops, whether the run succeeded or not.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use snow_common::DataSource;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{IngestError, Result};

#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Take the lock for `source`, failing if another run holds it.
    pub fn acquire(wip_dir: &Path, source: DataSource, run_id: Uuid) -> Result<Self> {
        let path = Self::path_for(wip_dir, source);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(IngestError::LockHeld {
                    data_source: source,
                    path,
                });
            }
            Err(source) => {
                return Err(IngestError::Lock {
                    action: "create",
                    path,
                    source,
                });
            }
        };

        // From here on the guard owns the file, so a failed write still removes it.
        let lock = Self { path };
        writeln!(
            file,
            "run_id={run_id}\npid={}\nstarted={}",
            std::process::id(),
            chrono::Local::now().to_rfc3339()
        )
        .map_err(|source| IngestError::Lock {
            action: "write",
            path: lock.path.clone(),
            source,
        })?;

        debug!(path = %lock.path.display(), "Acquired run lock");
        Ok(lock)
    }

    pub fn path_for(wip_dir: &Path, source: DataSource) -> PathBuf {
        wip_dir.join(format!(".lock-{}", source.as_str()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Released run lock"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove run lock"),
        }
    }
}
