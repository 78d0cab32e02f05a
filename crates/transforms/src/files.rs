//! Filesystem helpers shared by transforms.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Result, TransformError};

/// Regular files directly inside `dir` with the given extension, sorted.
pub(crate) fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| TransformError::io("list", dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| TransformError::io("list", dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Like [`list_files`], but fails when nothing is found.
pub(crate) fn require_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let files = list_files(dir, extension)?;
    if files.is_empty() {
        return Err(TransformError::NoInputs {
            path: dir.to_path_buf(),
            pattern: format!("*.{extension}"),
        });
    }
    Ok(files)
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) async fn read_json(path: &Path) -> Result<Value> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TransformError::io("read", path, e))?;
    serde_json::from_str(&text).map_err(|source| TransformError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| TransformError::io("create directory", dir, e))
}

pub(crate) async fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent).await,
        _ => Ok(()),
    }
}

/// Write `value` as compact JSON, creating parent directories.
pub(crate) async fn write_json(path: &Path, value: &Value) -> Result<()> {
    let text = serde_json::to_string(value).map_err(|source| TransformError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    write_text(path, &text).await
}

pub(crate) async fn write_text(path: &Path, text: &str) -> Result<()> {
    ensure_parent(path).await?;
    tokio::fs::write(path, text)
        .await
        .map_err(|e| TransformError::io("write", path, e))
}
