//! Shared test utilities for the snow-today-ingest workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Workspace and temporary directory helpers
//! - Valid and malformed incoming-data fixtures
//! - A temporary storage tree laid out like a production deployment
//! - A stand-in for the external raster tool
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, TestStorage};
//! ```

pub mod fixtures;
pub mod paths;
pub mod storage;

// Re-export commonly used items at the crate root
pub use paths::*;
pub use storage::*;

/// Macro to skip a test if a program is not on `PATH`.
///
/// # Usage
///
/// ```ignore
/// use test_utils::require_program;
///
/// #[tokio::test]
/// async fn test_real_conversion() {
///     let program = require_program!("gdal_translate");
///     // Test code using program...
/// }
/// ```
///
/// If the program is not found, the test prints a skip message and returns early.
#[macro_export]
macro_rules! require_program {
    ($name:expr) => {{
        match $crate::find_program($name) {
            Some(path) => path,
            None => {
                eprintln!("SKIPPED: Program '{}' not found on PATH.", $name);
                return;
            }
        }
    }};
}

/// Macro asserting that a file holds the given JSON value.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_json_file_eq;
///
/// assert_json_file_eq!(live.join("swe.json"), serde_json::json!({"data": []}));
/// ```
#[macro_export]
macro_rules! assert_json_file_eq {
    ($path:expr, $expected:expr) => {{
        let path_ref = &$path;
        let path: &::std::path::Path = ::std::convert::AsRef::as_ref(path_ref);
        let text = ::std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));
        let actual: ::serde_json::Value = ::serde_json::from_str(&text)
            .unwrap_or_else(|e| panic!("{} is not JSON: {}", path.display(), e));
        assert_eq!(actual, $expected, "unexpected contents of {}", path.display());
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_json_file_eq_passes() {
        let dir = temp_test_dir();
        let path = dir.path().join("a.json");
        std::fs::write(&path, r#"{"b": 1, "a": [true]}"#).unwrap();
        assert_json_file_eq!(path, serde_json::json!({"a": [true], "b": 1}));
    }

    #[test]
    #[should_panic(expected = "unexpected contents")]
    fn test_assert_json_file_eq_fails() {
        let dir = temp_test_dir();
        let path = dir.path().join("a.json");
        std::fs::write(&path, "[]").unwrap();
        assert_json_file_eq!(path, serde_json::json!({}));
    }
}
