//! Telemetry and command value types exchanged with the control loop.

use serde::{Deserialize, Serialize};

/// Timestamp in microseconds since the initialization of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create timestamp from microseconds.
    pub fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Get timestamp as microseconds.
    pub fn as_micros(&self) -> u64 {
        self.0
    }

    /// Get timestamp as fractional seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 * 1e-6
    }
}

/// Telescope pointing sample.
///
/// Azimuth is passed through exactly as the mount reports it (it may be
/// unwrapped, e.g. -90 or 400 degrees). Elevation is nominally in [0, 90]
/// but is not validated here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelescopePose {
    /// Azimuth in degrees
    pub azimuth_deg: f64,
    /// Elevation in degrees
    pub elevation_deg: f64,
    /// Time the pose was measured
    pub timestamp: Timestamp,
}

impl TelescopePose {
    /// Create a new telescope pose.
    pub fn new(azimuth_deg: f64, elevation_deg: f64, timestamp: Timestamp) -> Self {
        Self {
            azimuth_deg,
            elevation_deg,
            timestamp,
        }
    }
}

/// Last known actual dome position.
///
/// While a move is in flight this lags the commanded target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomeStatus {
    /// Measured dome azimuth in degrees
    pub azimuth_deg: f64,
    /// True while the azimuth drive is slewing
    pub is_moving: bool,
    /// Time the status was measured
    pub timestamp: Timestamp,
}

impl DomeStatus {
    /// Create a new dome status sample.
    pub fn new(azimuth_deg: f64, is_moving: bool, timestamp: Timestamp) -> Self {
        Self {
            azimuth_deg,
            is_moving,
            timestamp,
        }
    }
}

/// A move request issued to the dome.
///
/// Acts as the handle for the controller's single outstanding command slot.
/// Completion is only ever observed through later [`DomeStatus`] telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveCommand {
    /// Sequence number, unique per controller, starting at 1
    pub id: u64,
    /// Commanded dome azimuth in degrees
    pub target_azimuth_deg: f64,
    /// Timestamp of the telescope pose that triggered the command
    pub issued_at: Timestamp,
}
