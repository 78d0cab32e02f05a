//! Common types shared by the Snow Today ingest crates.

pub mod data_source;
pub mod error;
pub mod time;

pub use data_source::DataSource;
pub use error::{CommonError, CommonResult};
pub use time::today;
