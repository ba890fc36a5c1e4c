#![doc = include_str!("../README.md")]

pub mod algorithm;
pub mod angle;
pub mod config;
pub mod controller;
pub mod types;
pub mod vignetting;

pub use algorithm::{AlgorithmKind, FollowDecision, FollowingAlgorithm, SimpleAlgorithm};
pub use angle::{angle_diff, wrap_angle};
pub use config::{AlgorithmConfig, ConfigError, VignettingThresholds};
pub use controller::{ControllerOutput, TrajectoryController, DEFAULT_COMMAND_TOLERANCE_DEG};
pub use types::{DomeStatus, MoveCommand, TelescopePose, Timestamp};
pub use vignetting::{evaluate_vignetting, VignettingState};
