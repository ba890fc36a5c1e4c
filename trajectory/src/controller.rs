//! Stateful trajectory controller.
//!
//! [`TrajectoryController`] is the single owner of the following state. The
//! caller feeds it telescope poses, dome status samples and following-mode
//! edges as one ordered stream; each call returns a [`ControllerOutput`]
//! describing what the caller has to do next (dispatch a command, publish an
//! event). The controller itself performs no I/O and never blocks.
//!
//! # Outstanding Command
//!
//! At most one move command is in flight. While it is outstanding no new
//! decision is made, however many telescope samples arrive. The slot is only
//! cleared by dome telemetry showing the dome stopped within
//! `command_tolerance_deg` of the target. A command that never completes
//! suppresses following indefinitely; disabling does not clear it either.

use log::{debug, info};

use crate::algorithm::FollowingAlgorithm;
use crate::angle::angle_diff;
use crate::config::{AlgorithmConfig, VignettingThresholds};
use crate::types::{DomeStatus, MoveCommand, TelescopePose};
use crate::vignetting::{evaluate_vignetting, VignettingState};

/// Default distance from the target at which a stopped dome counts as arrived (deg).
pub const DEFAULT_COMMAND_TOLERANCE_DEG: f64 = 0.1;

/// Actions requested by the controller after ingesting one input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerOutput {
    /// New move command to hand to the dome
    pub command: Option<MoveCommand>,
    /// Outstanding command that the latest dome status completed
    pub completed: Option<MoveCommand>,
    /// New vignetting state, present only when it changed
    pub vignetting: Option<VignettingState>,
}

impl ControllerOutput {
    /// True if nothing needs to be dispatched or published.
    pub fn is_empty(&self) -> bool {
        self.command.is_none() && self.completed.is_none() && self.vignetting.is_none()
    }
}

/// Drives a [`FollowingAlgorithm`] off telescope and dome telemetry.
pub struct TrajectoryController {
    enabled: bool,
    algorithm: Box<dyn FollowingAlgorithm>,
    config: AlgorithmConfig,
    thresholds: VignettingThresholds,
    command_tolerance_deg: f64,
    last_telescope_pose: Option<TelescopePose>,
    last_dome_status: Option<DomeStatus>,
    outstanding_command: Option<MoveCommand>,
    last_vignetting: VignettingState,
    next_command_id: u64,
}

impl TrajectoryController {
    /// Create a controller with following disabled and no telemetry.
    ///
    /// `command_tolerance_deg` is expected to be validated by the caller
    /// (finite and not negative).
    pub fn new(
        algorithm: Box<dyn FollowingAlgorithm>,
        config: AlgorithmConfig,
        thresholds: VignettingThresholds,
        command_tolerance_deg: f64,
    ) -> Self {
        Self {
            enabled: false,
            algorithm,
            config,
            thresholds,
            command_tolerance_deg,
            last_telescope_pose: None,
            last_dome_status: None,
            outstanding_command: None,
            last_vignetting: VignettingState::None,
            next_command_id: 1,
        }
    }

    /// Enable or disable following.
    ///
    /// Returns true if the mode changed. Disabling does not stop a dome that
    /// is already moving and leaves the outstanding command in place; it only
    /// prevents new commands. After enabling, the next telescope sample is
    /// evaluated.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled == enabled {
            return false;
        }
        self.enabled = enabled;
        info!("Following {}", if enabled { "enabled" } else { "disabled" });
        true
    }

    /// Ingest a telescope pose.
    ///
    /// A pose older than the last one accepted is discarded without effect.
    pub fn on_telescope_pose(&mut self, pose: TelescopePose) -> ControllerOutput {
        if let Some(last) = &self.last_telescope_pose {
            if pose.timestamp < last.timestamp {
                debug!(
                    "Discarding stale telescope pose at {:?} (last {:?})",
                    pose.timestamp, last.timestamp
                );
                return ControllerOutput::default();
            }
        }
        self.last_telescope_pose = Some(pose);

        let mut output = ControllerOutput {
            command: self.follow(&pose),
            ..Default::default()
        };
        output.vignetting = self.update_vignetting();
        output
    }

    /// Ingest a dome status sample.
    ///
    /// A sample older than the last one accepted is discarded without effect.
    pub fn on_dome_status(&mut self, status: DomeStatus) -> ControllerOutput {
        if let Some(last) = &self.last_dome_status {
            if status.timestamp < last.timestamp {
                debug!(
                    "Discarding stale dome status at {:?} (last {:?})",
                    status.timestamp, last.timestamp
                );
                return ControllerOutput::default();
            }
        }
        self.last_dome_status = Some(status);

        let mut output = ControllerOutput::default();
        if let Some(command) = self.outstanding_command {
            let error = angle_diff(status.azimuth_deg, command.target_azimuth_deg).abs();
            if !status.is_moving && error <= self.command_tolerance_deg {
                info!(
                    "Move {} to {:.3} deg complete (dome at {:.3} deg)",
                    command.id, command.target_azimuth_deg, status.azimuth_deg
                );
                self.outstanding_command = None;
                output.completed = Some(command);
            }
        }
        output.vignetting = self.update_vignetting();
        output
    }

    /// Run the algorithm and claim the command slot if it asks for a move.
    fn follow(&mut self, pose: &TelescopePose) -> Option<MoveCommand> {
        if !self.enabled {
            return None;
        }
        if let Some(command) = &self.outstanding_command {
            debug!("Move {} still outstanding; not re-evaluating", command.id);
            return None;
        }
        let dome = self.last_dome_status?;

        let decision = self.algorithm.decide(pose, dome.azimuth_deg, &self.config);
        debug!(
            "telescope az={:.3} el={:.3}, dome az={:.3}: {:?}",
            pose.azimuth_deg, pose.elevation_deg, dome.azimuth_deg, decision
        );
        let target_azimuth_deg = decision.target_azimuth_deg.filter(|_| decision.should_move)?;

        let command = MoveCommand {
            id: self.next_command_id,
            target_azimuth_deg,
            issued_at: pose.timestamp,
        };
        self.next_command_id += 1;
        self.outstanding_command = Some(command);
        info!(
            "Issuing move {} to {:.3} deg (dome at {:.3} deg)",
            command.id, target_azimuth_deg, dome.azimuth_deg
        );
        Some(command)
    }

    /// Re-evaluate vignetting, returning the new state if it changed.
    fn update_vignetting(&mut self) -> Option<VignettingState> {
        let (pose, dome) = (self.last_telescope_pose?, self.last_dome_status?);
        let state = evaluate_vignetting(&pose, dome.azimuth_deg, &self.thresholds);
        if state == self.last_vignetting {
            return None;
        }
        info!("Vignetting changed: {} -> {}", self.last_vignetting, state);
        self.last_vignetting = state;
        Some(state)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn outstanding_command(&self) -> Option<&MoveCommand> {
        self.outstanding_command.as_ref()
    }

    pub fn last_telescope_pose(&self) -> Option<&TelescopePose> {
        self.last_telescope_pose.as_ref()
    }

    pub fn last_dome_status(&self) -> Option<&DomeStatus> {
        self.last_dome_status.as_ref()
    }

    /// Most recently reported vignetting state.
    pub fn vignetting(&self) -> VignettingState {
        self.last_vignetting
    }

    pub fn algorithm_name(&self) -> &'static str {
        self.algorithm.name()
    }

    pub fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    pub fn thresholds(&self) -> &VignettingThresholds {
        &self.thresholds
    }

    pub fn command_tolerance_deg(&self) -> f64 {
        self.command_tolerance_deg
    }
}
