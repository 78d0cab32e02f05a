//! Schema registry for Snow Today output data.
//!
//! Every validatable class of output JSON has an embedded JSON Schema and an
//! anchored filename pattern. The pattern decides which schema applies when a
//! directory holding many kinds of files is validated.
//!
//! A filename matching no pattern is skipped with a warning. A filename
//! matching more than one pattern is an error; the registry never picks a
//! winner.

pub mod error;
mod id;
mod registry;

pub use error::{Result, SchemaError};
pub use id::SchemaId;
pub use registry::{FileValidation, SchemaEntry, SchemaRegistry};
