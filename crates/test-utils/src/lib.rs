//! Shared test utilities for the WCS gateway workspace.
//!
//! This crate provides common testing infrastructure:
//! - Fixtures describing one reference coverage as DMR, catalog and request documents
//! - Temporary directory and fixture file helpers
//!
//! It deliberately depends on no workspace crate, so every crate can use it
//! as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! ```ignore
//! use test_utils::{fixtures, temp_test_dir};
//! ```

pub mod fixtures;
pub mod paths;

pub use paths::*;

/// Macro asserting that a `Result` is an `Err` whose `Display` output contains
/// the given text.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_err_contains;
///
/// assert_err_contains!(parse("x"), "unexpected");
/// ```
#[macro_export]
macro_rules! assert_err_contains {
    ($result:expr, $needle:expr) => {{
        match $result {
            Ok(_) => panic!("expected an error containing {:?}, got Ok", $needle),
            Err(err) => {
                let message = err.to_string();
                if !message.contains($needle) {
                    panic!(
                        "assertion failed: error does not contain {:?}\n  error: {}",
                        $needle, message
                    );
                }
            }
        }
    }};
}
