//! Azimuth arithmetic on the circle.

/// Shortest signed difference `angle1 - angle2` in degrees.
///
/// The result lies in (-180, 180]. Inputs may be unwrapped (any finite value).
pub fn angle_diff(angle1_deg: f64, angle2_deg: f64) -> f64 {
    let diff = (angle1_deg - angle2_deg).rem_euclid(360.0);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

/// Wrap an angle into [0, 360) degrees.
pub fn wrap_angle(angle_deg: f64) -> f64 {
    let wrapped = angle_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
