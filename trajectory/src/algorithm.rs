//! Dome following algorithms.

use std::fmt;
use std::str::FromStr;

use crate::angle::angle_diff;
use crate::config::{AlgorithmConfig, ConfigError};
use crate::types::TelescopePose;

/// Outcome of one following decision.
///
/// `target_azimuth_deg` is `Some` exactly when `should_move` is true.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowDecision {
    pub should_move: bool,
    pub target_azimuth_deg: Option<f64>,
}

impl FollowDecision {
    /// Leave the dome where it is.
    pub fn hold() -> Self {
        Self {
            should_move: false,
            target_azimuth_deg: None,
        }
    }

    /// Move the dome to `azimuth_deg`.
    pub fn move_to(azimuth_deg: f64) -> Self {
        Self {
            should_move: true,
            target_azimuth_deg: Some(azimuth_deg),
        }
    }
}

/// Trait for dome following algorithms.
///
/// Implementations must be pure: the same inputs always produce the same
/// decision and no state is carried between calls. Anything an algorithm
/// needs to remember (smoothing, hysteresis) has to be passed in explicitly.
///
/// # Function Signature (Conceptual)
///
/// ```text
/// f: (&TelescopePose, dome_azimuth_deg, &AlgorithmConfig) → FollowDecision
/// ```
pub trait FollowingAlgorithm: Send + Sync {
    /// Short identifier used in configuration files and events.
    fn name(&self) -> &'static str;

    /// Decide whether the dome should move to follow the telescope.
    ///
    /// # Parameters
    ///
    /// - `telescope`: Latest telescope pose
    /// - `dome_azimuth_deg`: Latest measured dome azimuth
    /// - `config`: Algorithm configuration
    fn decide(
        &self,
        telescope: &TelescopePose,
        dome_azimuth_deg: f64,
        config: &AlgorithmConfig,
    ) -> FollowDecision;
}

/// Move the dome straight to the telescope azimuth once the offset grows too large.
///
/// The azimuth offset is scaled by cos(elevation) before comparing it to
/// `max_delta_azimuth_deg`, so the dome moves less eagerly as the telescope
/// approaches zenith. The scaling only gates the move: the target is always
/// the raw telescope azimuth.
///
/// Elevation is used exactly as supplied. Above 90 degrees the cosine turns
/// negative but since the gate compares magnitudes the sign has no effect.
/// At exactly 90 degrees the dome never follows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleAlgorithm;

impl SimpleAlgorithm {
    /// Azimuth offset scaled by the cosine of the telescope elevation (deg).
    pub fn scaled_delta_azimuth(telescope: &TelescopePose, dome_azimuth_deg: f64) -> f64 {
        angle_diff(telescope.azimuth_deg, dome_azimuth_deg)
            * telescope.elevation_deg.to_radians().cos()
    }
}

impl FollowingAlgorithm for SimpleAlgorithm {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn decide(
        &self,
        telescope: &TelescopePose,
        dome_azimuth_deg: f64,
        config: &AlgorithmConfig,
    ) -> FollowDecision {
        let scaled_daz = Self::scaled_delta_azimuth(telescope, dome_azimuth_deg);
        if scaled_daz.abs() > config.max_delta_azimuth_deg() {
            FollowDecision::move_to(telescope.azimuth_deg)
        } else {
            FollowDecision::hold()
        }
    }
}

/// Algorithm selector as named in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlgorithmKind {
    #[default]
    Simple,
}

impl AlgorithmKind {
    /// Configuration name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmKind::Simple => "simple",
        }
    }

    /// Build a new instance of the selected algorithm.
    pub fn build(&self) -> Box<dyn FollowingAlgorithm> {
        match self {
            AlgorithmKind::Simple => Box::new(SimpleAlgorithm),
        }
    }
}

impl FromStr for AlgorithmKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(AlgorithmKind::Simple),
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;
    use approx::assert_relative_eq;

    fn pose(azimuth_deg: f64, elevation_deg: f64) -> TelescopePose {
        TelescopePose::new(azimuth_deg, elevation_deg, Timestamp::from_micros(0))
    }

    fn config(max_delta_azimuth_deg: f64) -> AlgorithmConfig {
        AlgorithmConfig::new(max_delta_azimuth_deg).unwrap()
    }

    #[test]
    fn test_moves_at_horizon() {
        let telescope = pose(100.0, 0.0);
        assert_relative_eq!(SimpleAlgorithm::scaled_delta_azimuth(&telescope, 80.0), 20.0);
        let decision = SimpleAlgorithm.decide(&telescope, 80.0, &config(3.5));
        assert_eq!(decision, FollowDecision::move_to(100.0));
    }

    #[test]
    fn test_elevation_scales_offset() {
        let telescope = pose(100.0, 60.0);
        assert_relative_eq!(
            SimpleAlgorithm::scaled_delta_azimuth(&telescope, 80.0),
            10.0,
            epsilon = 1e-9
        );
        let decision = SimpleAlgorithm.decide(&telescope, 80.0, &config(3.5));
        assert!(decision.should_move);
        assert_eq!(decision.target_azimuth_deg, Some(100.0));
    }

    #[test]
    fn test_never_moves_at_zenith() {
        for dome_az in [0.0, 45.0, 90.0, 179.0, 180.0, 270.0] {
            let decision = SimpleAlgorithm.decide(&pose(0.0, 90.0), dome_az, &config(3.5));
            assert_eq!(decision, FollowDecision::hold(), "dome_az={dome_az}");
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // scaled offset exactly at the limit does not move
        let decision = SimpleAlgorithm.decide(&pose(13.5, 0.0), 10.0, &config(3.5));
        assert!(!decision.should_move);
        assert_eq!(decision.target_azimuth_deg, None);

        let decision = SimpleAlgorithm.decide(&pose(13.5001, 0.0), 10.0, &config(3.5));
        assert!(decision.should_move);
    }

    #[test]
    fn test_boundary_scales_with_elevation() {
        let max = 3.5;
        for elevation in [0.0_f64, 20.0, 45.0, 70.0, 85.0] {
            let boundary = max / elevation.to_radians().cos();
            let inside =
                SimpleAlgorithm.decide(&pose(boundary * 0.999, elevation), 0.0, &config(max));
            let outside =
                SimpleAlgorithm.decide(&pose(boundary * 1.001, elevation), 0.0, &config(max));
            assert!(!inside.should_move, "elevation={elevation}");
            assert!(outside.should_move, "elevation={elevation}");
        }
    }

    #[test]
    fn test_shortest_path_across_north() {
        let decision = SimpleAlgorithm.decide(&pose(358.0, 0.0), 2.0, &config(3.5));
        assert!(decision.should_move);
        assert_eq!(decision.target_azimuth_deg, Some(358.0));

        let decision = SimpleAlgorithm.decide(&pose(359.0, 0.0), 1.0, &config(3.5));
        assert!(!decision.should_move);
    }

    #[test]
    fn test_target_is_raw_azimuth() {
        let decision = SimpleAlgorithm.decide(&pose(-90.0, 30.0), 180.0, &config(3.5));
        assert_eq!(decision.target_azimuth_deg, Some(-90.0));
    }

    #[test]
    fn test_zero_limit_moves_on_any_offset() {
        assert!(SimpleAlgorithm.decide(&pose(10.001, 0.0), 10.0, &config(0.0)).should_move);
        assert!(!SimpleAlgorithm.decide(&pose(10.0, 0.0), 10.0, &config(0.0)).should_move);
    }

    #[test]
    fn test_out_of_range_elevation_is_not_clamped() {
        // cos is even, so a negative elevation gates like its mirror
        let below = SimpleAlgorithm.decide(&pose(10.0, -60.0), 0.0, &config(3.5));
        let above = SimpleAlgorithm.decide(&pose(10.0, 60.0), 0.0, &config(3.5));
        assert_eq!(below, above);

        // past zenith the cosine is negative; the magnitude still gates
        let telescope = pose(10.0, 120.0);
        assert_relative_eq!(
            SimpleAlgorithm::scaled_delta_azimuth(&telescope, 0.0),
            -5.0,
            epsilon = 1e-9
        );
        assert!(SimpleAlgorithm.decide(&telescope, 0.0, &config(3.5)).should_move);
        assert!(!SimpleAlgorithm.decide(&telescope, 0.0, &config(6.0)).should_move);
    }

    #[test]
    fn test_algorithm_kind() {
        assert_eq!("simple".parse::<AlgorithmKind>(), Ok(AlgorithmKind::Simple));
        assert_eq!(
            "fancy".parse::<AlgorithmKind>(),
            Err(ConfigError::UnknownAlgorithm("fancy".to_string()))
        );
        assert_eq!(AlgorithmKind::default().build().name(), "simple");
        assert_eq!(AlgorithmKind::Simple.to_string(), "simple");
    }
}
