//! Error types for the schema crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::id::SchemaId;

/// Errors that can occur while loading schemas or validating documents.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Embedded schema '{id}' failed to compile: {message}")]
    InvalidSchema { id: SchemaId, message: String },

    #[error("Embedded schema '{id}' is not valid JSON: {source}")]
    MalformedSchema {
        id: SchemaId,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid filename pattern for '{id}': {source}")]
    InvalidPattern {
        id: SchemaId,
        #[source]
        source: regex::Error,
    },

    #[error("Unknown schema: {0}")]
    UnknownSchema(String),

    #[error("Schema '{0}' is not registered")]
    NotRegistered(SchemaId),

    #[error("'{subject}' failed validation against '{id}': {}", .violations.join("; "))]
    Invalid {
        subject: String,
        id: SchemaId,
        violations: Vec<String>,
    },

    #[error("'{filename}' matches more than one schema: {candidates:?}")]
    AmbiguousMatch {
        filename: String,
        candidates: Vec<SchemaId>,
    },

    #[error("Failed to read '{path}': {source}")]
    Io {
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
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
