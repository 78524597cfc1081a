//! Path utilities for test data and scratch directories.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// Determined from the test-utils manifest directory, which lives at
/// `crates/test-utils`.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Creates a temporary directory, removed when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Creates a temporary directory with a specific prefix.
pub fn temp_test_dir_with_prefix(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temporary test directory")
}

/// Writes `contents` to `dir/name` and returns the path.
pub fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents)
        .unwrap_or_else(|e| panic!("Failed to write fixture {:?}: {}", path, e));
    path
}
