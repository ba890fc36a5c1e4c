//! Validated algorithm and vignetting parameters.
//!
//! Both types can only be built through constructors that reject invalid
//! values, so a [`TrajectoryController`](crate::TrajectoryController) never
//! sees a misconfigured threshold. Deserialization goes through the same
//! checks.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default maximum dome/telescope azimuth offset before the dome moves (deg).
pub const DEFAULT_MAX_DELTA_AZIMUTH_DEG: f64 = 5.0;

/// Default separation at which the dome starts to vignette the telescope (deg).
pub const DEFAULT_PARTIAL_VIGNETTING_DEG: f64 = 6.0;

/// Default separation at which the dome fully blocks the telescope (deg).
pub const DEFAULT_FULL_VIGNETTING_DEG: f64 = 12.0;

/// Invalid configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("max_delta_azimuth_deg={0} must be finite and not negative")]
    InvalidMaxDeltaAzimuth(f64),

    #[error("vignetting threshold {name}={value} must be finite and not negative")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("partial_deg={partial_deg} must not exceed full_deg={full_deg}")]
    ThresholdOrder { partial_deg: f64, full_deg: f64 },

    #[error("command_tolerance_deg={0} must be finite and not negative")]
    InvalidTolerance(f64),

    #[error("command_timeout_s={0} must be finite and positive")]
    InvalidTimeout(f64),

    #[error("unknown algorithm {0:?}")]
    UnknownAlgorithm(String),
}

/// Configuration for the following algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAlgorithmConfig")]
pub struct AlgorithmConfig {
    max_delta_azimuth_deg: f64,
}

impl AlgorithmConfig {
    /// Create a config, rejecting negative or non-finite offsets.
    ///
    /// A value of zero means the dome moves for any non-zero offset.
    pub fn new(max_delta_azimuth_deg: f64) -> Result<Self, ConfigError> {
        if !max_delta_azimuth_deg.is_finite() || max_delta_azimuth_deg < 0.0 {
            return Err(ConfigError::InvalidMaxDeltaAzimuth(max_delta_azimuth_deg));
        }
        Ok(Self {
            max_delta_azimuth_deg,
        })
    }

    /// Maximum elevation-scaled azimuth offset tolerated without moving (deg).
    pub fn max_delta_azimuth_deg(&self) -> f64 {
        self.max_delta_azimuth_deg
    }
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            max_delta_azimuth_deg: DEFAULT_MAX_DELTA_AZIMUTH_DEG,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAlgorithmConfig {
    #[serde(default = "default_max_delta_azimuth")]
    max_delta_azimuth_deg: f64,
}

fn default_max_delta_azimuth() -> f64 {
    DEFAULT_MAX_DELTA_AZIMUTH_DEG
}

impl TryFrom<RawAlgorithmConfig> for AlgorithmConfig {
    type Error = ConfigError;

    fn try_from(raw: RawAlgorithmConfig) -> Result<Self, Self::Error> {
        Self::new(raw.max_delta_azimuth_deg)
    }
}

/// Azimuth separations that mark partial and full vignetting.
///
/// Invariant: `0 <= partial_deg <= full_deg`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVignettingThresholds")]
pub struct VignettingThresholds {
    partial_deg: f64,
    full_deg: f64,
}

impl VignettingThresholds {
    /// Create a threshold pair. Misordered pairs are rejected, never clamped.
    pub fn new(partial_deg: f64, full_deg: f64) -> Result<Self, ConfigError> {
        for (name, value) in [("partial_deg", partial_deg), ("full_deg", full_deg)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        if partial_deg > full_deg {
            return Err(ConfigError::ThresholdOrder {
                partial_deg,
                full_deg,
            });
        }
        Ok(Self {
            partial_deg,
            full_deg,
        })
    }

    pub fn partial_deg(&self) -> f64 {
        self.partial_deg
    }

    pub fn full_deg(&self) -> f64 {
        self.full_deg
    }
}

impl Default for VignettingThresholds {
    fn default() -> Self {
        Self {
            partial_deg: DEFAULT_PARTIAL_VIGNETTING_DEG,
            full_deg: DEFAULT_FULL_VIGNETTING_DEG,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVignettingThresholds {
    #[serde(default = "default_partial")]
    partial_deg: f64,
    #[serde(default = "default_full")]
    full_deg: f64,
}

fn default_partial() -> f64 {
    DEFAULT_PARTIAL_VIGNETTING_DEG
}

fn default_full() -> f64 {
    DEFAULT_FULL_VIGNETTING_DEG
}

impl TryFrom<RawVignettingThresholds> for VignettingThresholds {
    type Error = ConfigError;

    fn try_from(raw: RawVignettingThresholds) -> Result<Self, Self::Error> {
        Self::new(raw.partial_deg, raw.full_deg)
    }
}
