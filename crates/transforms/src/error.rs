//! Error types for the transforms crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while transforming inputs.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Failed to {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize output for '{path}': {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Schema(#[from] schema::SchemaError),

    #[error("Aborting: no inputs found at '{path}' matching '{pattern}'")]
    NoInputs { path: PathBuf, pattern: String },

    #[error("Expected {expected} input file(s) in '{path}' matching '{pattern}'. Got {}: {files:?}", .files.len())]
    UnexpectedInputCount {
        path: PathBuf,
        pattern: String,
        expected: usize,
        files: Vec<PathBuf>,
    },

    #[error("Found no header row in '{path}'. Expected \"{header}\"")]
    MissingHeader { path: PathBuf, header: String },

    #[error("Found multiple header rows in '{path}' on lines: {lines:?}")]
    DuplicateHeader { path: PathBuf, lines: Vec<usize> },

    #[error("Failed to parse CSV in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid value {value:?} for column '{column}' in '{path}' (data row {row})")]
    InvalidField {
        path: PathBuf,
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("Failed to read metadata above the header in '{path}': {message}")]
    Preamble { path: PathBuf, message: String },

    #[error("Unexpected input in '{path}': {message}")]
    UnexpectedInput { path: PathBuf, message: String },

    #[error("Missing named input '{0}'")]
    MissingNamedInput(String),

    #[error("Expected a single input path, got named inputs {0:?}")]
    ExpectedSinglePath(Vec<String>),

    #[error("Expected named inputs, got a single path '{0}'")]
    ExpectedNamedInputs(PathBuf),

    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status} converting '{input}': {stderr}")]
    Subprocess {
        program: String,
        input: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

impl TransformError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unexpected(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::UnexpectedInput {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;
