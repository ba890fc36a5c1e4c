//! Configuration storage for dome trajectory settings.
//!
//! Provides centralized storage for named configuration sets ("default",
//! "sample", ...). All config is stored in ~/.dome_config/ by default, one
//! `<name>.json` file per set.

use std::path::{Path, PathBuf};

use log::info;

use crate::trajectory_config::{ConfigLoadError, TrajectoryConfig};

/// Name of the configuration set used when none is requested.
pub const DEFAULT_CONFIG_NAME: &str = "default";

/// Configuration storage manager for dome trajectory settings.
///
/// Manages loading and saving of named configuration files
/// from a centralized directory (defaults to ~/.dome_config/).
#[derive(Debug, Clone)]
pub struct ConfigStorage {
    /// Root directory for all configuration (e.g., ~/.dome_config)
    root_path: PathBuf,
}

impl ConfigStorage {
    /// Create a new config storage with default path (~/.dome_config)
    pub fn new() -> std::io::Result<Self> {
        let home = std::env::var("HOME")
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::NotFound, "HOME not set"))?;
        let root_path = PathBuf::from(home).join(".dome_config");
        Ok(Self { root_path })
    }

    /// Create a new config storage with custom root path
    pub fn with_path(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Get the root configuration path
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Generate filename for a named configuration set.
    ///
    /// Names must be non-empty and free of path separators.
    fn config_filename(&self, name: &str) -> Result<PathBuf, ConfigLoadError> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(ConfigLoadError::InvalidName(name.to_string()));
        }
        Ok(self.root_path.join(format!("{name}.json")))
    }

    /// Load a named configuration set.
    ///
    /// Missing files are reported as [`ConfigLoadError::NotFound`] so callers
    /// can tell them apart from malformed or invalid ones.
    pub fn load(&self, name: &str) -> Result<TrajectoryConfig, ConfigLoadError> {
        let path = self.config_filename(name)?;

        if !path.exists() {
            return Err(ConfigLoadError::NotFound(name.to_string()));
        }

        info!("Loading configuration {name:?} from {}", path.display());
        TrajectoryConfig::load_from_file(&path)
    }

    /// Load a named configuration set, falling back to built-in defaults
    /// when the "default" set has never been saved.
    pub fn load_or_default(&self, name: &str) -> Result<TrajectoryConfig, ConfigLoadError> {
        match self.load(name) {
            Err(ConfigLoadError::NotFound(_)) if name == DEFAULT_CONFIG_NAME => {
                info!("No saved {name:?} configuration; using built-in defaults");
                Ok(TrajectoryConfig::default())
            }
            other => other,
        }
    }

    /// Save a named configuration set.
    ///
    /// Creates the config directory if it doesn't exist.
    /// Returns the path where the configuration was saved.
    pub fn save(&self, name: &str, config: &TrajectoryConfig) -> Result<PathBuf, ConfigLoadError> {
        let path = self.config_filename(name)?;
        std::fs::create_dir_all(&self.root_path).map_err(|source| ConfigLoadError::Io {
            path: self.root_path.display().to_string(),
            source,
        })?;

        config.save_to_file(&path)?;
        Ok(path)
    }

    /// List all configuration sets available in storage, sorted by name.
    pub fn list(&self) -> std::io::Result<Vec<String>> {
        if !self.root_path.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root_path)? {
            let path = entry?.path();

            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();

        Ok(names)
    }

    /// Delete a named configuration set.
    ///
    /// Returns Ok(true) if the file was deleted, Ok(false) if it didn't exist.
    pub fn delete(&self, name: &str) -> Result<bool, ConfigLoadError> {
        let path = self.config_filename(name)?;

        if !path.exists() {
            return Ok(false);
        }

        std::fs::remove_file(&path).map_err(|source| ConfigLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(true)
    }
}

impl Default for ConfigStorage {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::with_path(PathBuf::from(".dome_config")))
    }
}
