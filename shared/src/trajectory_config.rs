//! Dome trajectory configuration file format.
//!
//! A configuration file is a JSON document; every field is optional:
//!
//! ```json
//! {
//!   "algorithm_name": "simple",
//!   "simple": { "max_delta_azimuth_deg": 3.5 },
//!   "vignetting": { "partial_deg": 6.0, "full_deg": 12.0 },
//!   "command_tolerance_deg": 0.1,
//!   "command_timeout_s": 60.0
//! }
//! ```
//!
//! Values are validated while loading, so a [`TrajectoryConfig`] that exists
//! is always usable to build a controller.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trajectory::{
    AlgorithmConfig, AlgorithmKind, ConfigError, TrajectoryController, VignettingThresholds,
    DEFAULT_COMMAND_TOLERANCE_DEG,
};

/// Errors loading or validating a configuration file.
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ConfigError),

    #[error("Configuration {0:?} not found")]
    NotFound(String),

    #[error("Invalid configuration name {0:?}")]
    InvalidName(String),
}

/// Complete, validated dome trajectory configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryConfig {
    /// Selected following algorithm
    pub algorithm: AlgorithmKind,
    /// Parameters for the "simple" algorithm
    pub simple: AlgorithmConfig,
    /// Vignetting classification thresholds
    pub vignetting: VignettingThresholds,
    /// Distance from the target at which a stopped dome counts as arrived (deg)
    pub command_tolerance_deg: f64,
    /// Age after which an outstanding move is reported as stale; None disables the watchdog
    pub command_timeout: Option<Duration>,
}

/// On-disk representation, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default = "default_algorithm_name")]
    algorithm_name: String,
    #[serde(default)]
    simple: AlgorithmConfig,
    #[serde(default)]
    vignetting: VignettingThresholds,
    #[serde(default = "default_tolerance")]
    command_tolerance_deg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    command_timeout_s: Option<f64>,
}

fn default_algorithm_name() -> String {
    AlgorithmKind::default().name().to_string()
}

fn default_tolerance() -> f64 {
    DEFAULT_COMMAND_TOLERANCE_DEG
}

impl TryFrom<ConfigFile> for TrajectoryConfig {
    type Error = ConfigError;

    fn try_from(file: ConfigFile) -> Result<Self, Self::Error> {
        let algorithm = file.algorithm_name.parse()?;

        if !file.command_tolerance_deg.is_finite() || file.command_tolerance_deg < 0.0 {
            return Err(ConfigError::InvalidTolerance(file.command_tolerance_deg));
        }

        let command_timeout = match file.command_timeout_s {
            None => None,
            Some(secs) if secs.is_finite() && secs > 0.0 => Some(
                Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidTimeout(secs))?,
            ),
            Some(secs) => return Err(ConfigError::InvalidTimeout(secs)),
        };

        Ok(Self {
            algorithm,
            simple: file.simple,
            vignetting: file.vignetting,
            command_tolerance_deg: file.command_tolerance_deg,
            command_timeout,
        })
    }
}

impl From<&TrajectoryConfig> for ConfigFile {
    fn from(config: &TrajectoryConfig) -> Self {
        Self {
            algorithm_name: config.algorithm.name().to_string(),
            simple: config.simple,
            vignetting: config.vignetting,
            command_tolerance_deg: config.command_tolerance_deg,
            command_timeout_s: config.command_timeout.map(|d| d.as_secs_f64()),
        }
    }
}

impl TrajectoryConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigLoadError> {
        let file: ConfigFile = serde_json::from_str(json)?;
        Ok(Self::try_from(file)?)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigLoadError> {
        Ok(serde_json::to_string_pretty(&ConfigFile::from(self))?)
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigLoadError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigLoadError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| ConfigLoadError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// JSON rendering of the selected algorithm's parameters.
    pub fn algorithm_config_json(&self) -> String {
        match self.algorithm {
            AlgorithmKind::Simple => {
                serde_json::to_string(&self.simple).unwrap_or_else(|_| "{}".to_string())
            }
        }
    }

    /// Build a controller for this configuration, with following disabled.
    pub fn build_controller(&self) -> TrajectoryController {
        TrajectoryController::new(
            self.algorithm.build(),
            self.simple,
            self.vignetting,
            self.command_tolerance_deg,
        )
    }
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmKind::default(),
            simple: AlgorithmConfig::default(),
            vignetting: VignettingThresholds::default(),
            command_tolerance_deg: DEFAULT_COMMAND_TOLERANCE_DEG,
            command_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = TrajectoryConfig::from_json("{}").unwrap();
        assert_eq!(config, TrajectoryConfig::default());
        assert_eq!(config.simple.max_delta_azimuth_deg(), 5.0);
        assert_eq!(config.algorithm, AlgorithmKind::Simple);
        assert!(config.command_timeout.is_none());
    }

    #[test]
    fn test_all_specified() {
        let config = TrajectoryConfig::from_json(
            r#"{
                "algorithm_name": "simple",
                "simple": {"max_delta_azimuth_deg": 3.5},
                "vignetting": {"partial_deg": 1.0, "full_deg": 5.0},
                "command_tolerance_deg": 0.25,
                "command_timeout_s": 30
            }"#,
        )
        .unwrap();
        assert_eq!(config.simple.max_delta_azimuth_deg(), 3.5);
        assert_eq!(config.vignetting.partial_deg(), 1.0);
        assert_eq!(config.vignetting.full_deg(), 5.0);
        assert_eq!(config.command_tolerance_deg, 0.25);
        assert_eq!(config.command_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_bad_algorithm_name() {
        let err =
            TrajectoryConfig::from_json(r#"{"algorithm_name": "invalid_name"}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Invalid(ConfigError::UnknownAlgorithm(ref name))
                if name == "invalid_name"
        ));
    }

    #[test]
    fn test_bad_algorithm_config() {
        let err = TrajectoryConfig::from_json(r#"{"simple": 45}"#).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse(_)));

        let err = TrajectoryConfig::from_json(r#"{"simple": {"max_delta_azimuth_deg": -2}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse(_)));
    }

    #[test]
    fn test_misordered_thresholds_rejected() {
        let err =
            TrajectoryConfig::from_json(r#"{"vignetting": {"partial_deg": 8, "full_deg": 4}}"#)
                .unwrap_err();
        assert!(err.to_string().contains("must not exceed"), "{err}");
    }

    #[test]
    fn test_invalid_tolerance_and_timeout() {
        let err = TrajectoryConfig::from_json(r#"{"command_tolerance_deg": -0.1}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Invalid(ConfigError::InvalidTolerance(_))
        ));
        for timeout in ["0", "-5", "1e300"] {
            let json = format!(r#"{{"command_timeout_s": {timeout}}}"#);
            let err = TrajectoryConfig::from_json(&json).unwrap_err();
            assert!(
                matches!(err, ConfigLoadError::Invalid(ConfigError::InvalidTimeout(_))),
                "{timeout}: {err}"
            );
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = TrajectoryConfig::from_json(r#"{"max_daz": 5}"#).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse(_)));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = TrajectoryConfig {
            simple: AlgorithmConfig::new(2.0).unwrap(),
            command_timeout: Some(Duration::from_secs(90)),
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();
        assert_eq!(TrajectoryConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_build_controller() {
        let config = TrajectoryConfig::from_json(r#"{"simple": {"max_delta_azimuth_deg": 3.5}}"#)
            .unwrap();
        let controller = config.build_controller();
        assert!(!controller.is_enabled());
        assert_eq!(controller.algorithm_name(), "simple");
        assert_eq!(controller.config().max_delta_azimuth_deg(), 3.5);
        assert_eq!(config.algorithm_config_json(), r#"{"max_delta_azimuth_deg":3.5}"#);
    }

    #[test]
    fn test_checked_in_configs() {
        let default_path = test_helpers::project_config_path("default");
        let default = TrajectoryConfig::load_from_file(&default_path).unwrap();
        assert_eq!(default, TrajectoryConfig::default());

        let sample =
            TrajectoryConfig::load_from_file(&test_helpers::project_config_path("sample")).unwrap();
        assert_eq!(sample.simple.max_delta_azimuth_deg(), 3.5);
        assert_eq!(sample.command_timeout, Some(Duration::from_secs(120)));
    }
}
