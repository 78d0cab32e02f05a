//! Snow Today ingestion library.
//!
//! Turns upstream drops into the directory tree the web application serves.
//!
//! # Architecture
//!
//! - [`TaskCatalog`]: the output data classes of each data source, in
//!   execution order
//! - [`Orchestrator`]: runs a selection of tasks into a staging directory
//!   under a per-source lock, failing fast
//! - [`publish`]: swaps a complete staging directory into the live location,
//!   keeping the previous one as a dated backup
//!
//! Partial and dry runs stop after staging, so the live directory only ever
//! changes to the output of a complete, successful run.

pub mod catalog;
pub mod config;
pub mod error;
mod lock;
mod orchestrator;
mod publish;

// Re-exports
pub use catalog::{IngestTask, OutputDataClass, TaskCatalog, TaskId};
pub use config::IngestConfig;
pub use error::{IngestError, PublishError, Result};
pub use lock::RunLock;
pub use orchestrator::{Orchestrator, RunOutcome, StagedReason};
pub use publish::{publish, unique_backup_path, PublishReport};
