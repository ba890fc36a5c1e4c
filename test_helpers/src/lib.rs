//! Shared test utilities for the dome trajectory workspace.
//!
//! Locates the workspace root so tests can load the checked-in
//! configuration sets under `config/`, and provides angle assertions that
//! understand azimuth wrap-around.
//!
//! ```rust
//! use test_helpers::{assert_angles_almost_equal, project_config_path};
//!
//! assert!(project_config_path("default").exists());
//! assert_angles_almost_equal(359.95, -0.05, 1e-9);
//! ```

use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;

use trajectory::angle_diff;

/// Errors from test infrastructure setup.
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    /// Project root directory could not be located or accessed.
    ///
    /// Usually means the tests are running outside the workspace.
    #[error("Failed to find project root: {0}")]
    ProjectRootNotFound(String),
}

/// Locate the workspace root.
///
/// Walks up from the current directory until it finds a Cargo.toml that
/// contains a `[workspace]` section.
pub fn find_project_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::ProjectRootNotFound(format!("Failed to get current directory: {}", e))
    })?;

    loop {
        let cargo_toml = current_dir.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml).map_err(|e| {
                TestHelperError::ProjectRootNotFound(format!("Failed to read Cargo.toml: {}", e))
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

/// Directory of checked-in configuration sets (`<root>/config`).
pub fn project_config_dir() -> PathBuf {
    PROJECT_ROOT.join("config")
}

/// Path of a checked-in configuration set by name.
pub fn project_config_path(name: &str) -> PathBuf {
    project_config_dir().join(format!("{name}.json"))
}

/// Assert two azimuths agree within `tolerance` degrees, modulo 360.
#[track_caller]
pub fn assert_angles_almost_equal(actual: f64, expected: f64, tolerance: f64) {
    let diff = angle_diff(actual, expected);
    assert!(
        diff.abs() <= tolerance,
        "angles differ: actual {actual} deg, expected {expected} deg \
         (diff {diff} deg, tolerance {tolerance} deg)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_root_exists() {
        let root = find_project_root().expect("Failed to find project root");
        assert!(root.exists());
        assert!(root.join("Cargo.toml").exists());
        assert!(root.join("trajectory").exists());
    }

    #[test]
    fn test_config_dir() {
        assert!(project_config_dir().is_dir());
        assert!(project_config_path("sample").ends_with("config/sample.json"));
    }

    #[test]
    fn test_angles_almost_equal() {
        assert_angles_almost_equal(10.0, 10.05, 0.1);
        assert_angles_almost_equal(0.0, 360.0, 0.0);
        assert_angles_almost_equal(5.21, 365.21, 1e-9);
    }

    #[test]
    #[should_panic(expected = "angles differ")]
    fn test_angles_not_equal() {
        assert_angles_almost_equal(10.0, 190.0, 1.0);
    }
}
