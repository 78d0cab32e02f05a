//! The transform capability and its input shapes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Result, TransformError};

/// Where a transform reads from.
///
/// Most transforms read a single file or directory. Those that combine several
/// sources (e.g. legends need regions, variables, and colormaps) take the
/// sources by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskInput {
    Path(PathBuf),
    Named(BTreeMap<String, PathBuf>),
}

impl TaskInput {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn named<K, P>(pairs: impl IntoIterator<Item = (K, P)>) -> Self
    where
        K: Into<String>,
        P: Into<PathBuf>,
    {
        Self::Named(
            pairs
                .into_iter()
                .map(|(k, p)| (k.into(), p.into()))
                .collect(),
        )
    }

    /// The single input path.
    pub fn single(&self) -> Result<&Path> {
        match self {
            Self::Path(path) => Ok(path),
            Self::Named(paths) => Err(TransformError::ExpectedSinglePath(
                paths.keys().cloned().collect(),
            )),
        }
    }

    /// The input path registered under `key`.
    pub fn get(&self, key: &str) -> Result<&Path> {
        match self {
            Self::Named(paths) => paths
                .get(key)
                .map(PathBuf::as_path)
                .ok_or_else(|| TransformError::MissingNamedInput(key.to_string())),
            Self::Path(path) => Err(TransformError::ExpectedNamedInputs(path.clone())),
        }
    }

    /// Every path this input refers to.
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            Self::Path(path) => vec![path.as_path()],
            Self::Named(paths) => paths.values().map(PathBuf::as_path).collect(),
        }
    }
}

impl fmt::Display for TaskInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Named(paths) => {
                let parts: Vec<String> = paths
                    .iter()
                    .map(|(k, p)| format!("{}={}", k, p.display()))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

/// A conversion from one upstream representation to one output.
///
/// Implementations must create any missing destination directories, fail
/// rather than skip on malformed or missing input, and be safe to re-run.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Read from `input` and write the result at `to`.
    async fn apply(&self, input: &TaskInput, to: &Path) -> Result<()>;
}
