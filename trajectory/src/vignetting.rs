//! Vignetting classification from dome/telescope azimuth geometry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::angle::angle_diff;
use crate::config::VignettingThresholds;
use crate::types::TelescopePose;

/// How much of the telescope beam the dome aperture blocks.
///
/// Ordered by severity: `None < Partial < Full`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum VignettingState {
    #[default]
    None,
    Partial,
    Full,
}

impl fmt::Display for VignettingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VignettingState::None => "none",
            VignettingState::Partial => "partial",
            VignettingState::Full => "full",
        };
        f.write_str(s)
    }
}

/// Classify vignetting from the unscaled azimuth separation.
///
/// Unlike the following gate this does not scale by elevation: vignetting is
/// a property of where the dome and telescope are, not of how eagerly the
/// dome should move.
pub fn evaluate_vignetting(
    telescope: &TelescopePose,
    dome_azimuth_deg: f64,
    thresholds: &VignettingThresholds,
) -> VignettingState {
    let abs_daz = angle_diff(telescope.azimuth_deg, dome_azimuth_deg).abs();
    if abs_daz >= thresholds.full_deg() {
        VignettingState::Full
    } else if abs_daz >= thresholds.partial_deg() {
        VignettingState::Partial
    } else {
        VignettingState::None
    }
}
