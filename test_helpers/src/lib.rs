//! Test helpers for astroframe
//!
//! Synthetic frames and a shared artifact directory for the workspace's
//! tests. Frames are plain ndarray arrays so this crate stays independent of
//! the library under test.

use ndarray::Array2;
use once_cell::sync::Lazy;
use std::env;
use std::path::{Path, PathBuf};

/// Error type for test helper operations
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("Failed to find project root: {0}")]
    ProjectRootNotFound(String),
}

/// Returns the workspace root, the first ancestor whose Cargo.toml declares `[workspace]`.
pub fn find_project_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::ProjectRootNotFound(format!("Failed to get current directory: {e}"))
    })?;

    loop {
        let cargo_toml = current_dir.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml).map_err(|e| {
                TestHelperError::ProjectRootNotFound(format!("Failed to read Cargo.toml: {e}"))
            })?;
            if content.contains("[workspace]") {
                return Ok(current_dir);
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Err(TestHelperError::ProjectRootNotFound(
        "Workspace root not found".to_string(),
    ))
}

static PROJECT_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_project_root().expect("Failed to find project root directory"));

/// Directory for frames written by tests for manual inspection, created on demand.
pub fn get_output_dir() -> PathBuf {
    let output_dir = PROJECT_ROOT.join("test_output");
    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir).expect("Failed to create output directory");
    }
    output_dir
}

/// Path of `path` inside [`get_output_dir`]
pub fn get_output_path<P: AsRef<Path>>(path: P) -> PathBuf {
    get_output_dir().join(path)
}

/// Normalized `(height, width)` frame rising linearly from 0 at the top-left
/// to 1 at the bottom-right.
pub fn gradient_frame(width: usize, height: usize) -> Array2<f64> {
    let span = (width + height).saturating_sub(2).max(1) as f64;
    Array2::from_shape_fn((height, width), |(y, x)| (x + y) as f64 / span)
}

/// Normalized frame filled with `value`
pub fn constant_frame(width: usize, height: usize, value: f64) -> Array2<f64> {
    Array2::from_elem((height, width), value)
}

/// 16-bit frame whose sample at `(x, y)` is `f(x, y)`
pub fn u16_frame<F>(width: usize, height: usize, f: F) -> Array2<u16>
where
    F: Fn(usize, usize) -> u16,
{
    Array2::from_shape_fn((height, width), |(y, x)| f(x, y))
}
