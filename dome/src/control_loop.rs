//! Async driver for the trajectory controller.
//!
//! [`ControlLoop`] owns a [`TrajectoryController`] and a [`DomeInterface`]
//! and serializes every input through a single mpsc stream, so the
//! controller never sees two updates at once. Outputs become dome commands
//! and [`TrajectoryEvent`]s on a broadcast channel.
//!
//! Telemetry arriving before the dome command interface reports ready is
//! dropped; following-mode changes are always applied.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use trajectory::{
    ControllerOutput, DomeStatus, MoveCommand, TelescopePose, Timestamp, TrajectoryController,
    VignettingState,
};

use crate::dome_interface::DomeInterface;

/// How often the stale-command watchdog looks at the outstanding command.
pub const WATCHDOG_PERIOD: Duration = Duration::from_millis(500);

/// Monotonic clock shared by every telemetry source feeding one loop.
///
/// Timestamps are microseconds since the clock was started.
#[derive(Debug, Clone, Copy)]
pub struct ControlClock {
    origin: std::time::Instant,
}

impl ControlClock {
    pub fn start() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::from_micros(self.origin.elapsed().as_micros() as u64)
    }
}

/// Everything the control loop reacts to, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlInput {
    TelescopePose(TelescopePose),
    DomeStatus(DomeStatus),
    SetFollowing(bool),
}

/// Published state changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrajectoryEvent {
    /// Algorithm in use, emitted once when the loop starts
    Algorithm { name: String, config: String },
    FollowingMode { enabled: bool },
    Vignetting { state: VignettingState },
    MoveIssued { command: MoveCommand },
    MoveCompleted { command: MoveCommand },
    /// The transport refused the command; it stays outstanding
    DispatchFailed { command: MoveCommand, reason: String },
    /// The outstanding command has not completed within the configured timeout
    CommandStale { command: MoveCommand, age: Duration },
}

#[derive(Error, Debug)]
pub enum ControlLoopError {
    #[error("Dome readiness signal closed before the dome became ready")]
    ReadinessLost,
}

/// Drives a [`TrajectoryController`] from an input stream.
pub struct ControlLoop<D: DomeInterface> {
    controller: TrajectoryController,
    dome: D,
    events: broadcast::Sender<TrajectoryEvent>,
    algorithm_config: String,
    command_timeout: Option<Duration>,
    dispatched_at: Option<Instant>,
    stale_reported: bool,
}

impl<D: DomeInterface> ControlLoop<D> {
    pub fn new(
        controller: TrajectoryController,
        dome: D,
        events: broadcast::Sender<TrajectoryEvent>,
    ) -> Self {
        Self {
            controller,
            dome,
            events,
            algorithm_config: "{}".to_string(),
            command_timeout: None,
            dispatched_at: None,
            stale_reported: false,
        }
    }

    /// JSON rendering of the algorithm parameters, reported at start.
    pub fn with_algorithm_config(mut self, config_json: impl Into<String>) -> Self {
        self.algorithm_config = config_json.into();
        self
    }

    /// Report commands outstanding for longer than `timeout`. None disables.
    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn controller(&self) -> &TrajectoryController {
        &self.controller
    }

    /// Apply one input to the controller and act on its output.
    pub fn handle_input(&mut self, input: ControlInput) {
        match input {
            ControlInput::SetFollowing(enabled) => {
                if self.controller.set_enabled(enabled) {
                    self.publish(TrajectoryEvent::FollowingMode { enabled });
                }
            }
            ControlInput::TelescopePose(pose) => {
                let output = self.controller.on_telescope_pose(pose);
                self.apply(output);
            }
            ControlInput::DomeStatus(status) => {
                let output = self.controller.on_dome_status(status);
                self.apply(output);
            }
        }
    }

    fn apply(&mut self, output: ControllerOutput) {
        if let Some(command) = output.completed {
            self.dispatched_at = None;
            self.publish(TrajectoryEvent::MoveCompleted { command });
        }

        if let Some(command) = output.command {
            self.dispatch(command);
        }

        if let Some(state) = output.vignetting {
            self.publish(TrajectoryEvent::Vignetting { state });
        }
    }

    fn dispatch(&mut self, command: MoveCommand) {
        self.dispatched_at = Some(Instant::now());
        self.stale_reported = false;
        self.publish(TrajectoryEvent::MoveIssued { command });

        match self.dome.move_azimuth(&command) {
            Ok(()) => debug!(
                "Move {} to {:.3} deg dispatched",
                command.id, command.target_azimuth_deg
            ),
            Err(e) => {
                warn!("Move {} could not be dispatched: {e}", command.id);
                self.publish(TrajectoryEvent::DispatchFailed {
                    command,
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Report the outstanding command once if it has exceeded the timeout.
    ///
    /// The command stays outstanding; only dome telemetry can complete it.
    pub fn check_watchdog(&mut self, now: Instant) {
        let (Some(timeout), Some(dispatched_at)) = (self.command_timeout, self.dispatched_at) else {
            return;
        };
        if self.stale_reported {
            return;
        }
        let Some(command) = self.controller.outstanding_command().copied() else {
            return;
        };

        let age = now.saturating_duration_since(dispatched_at);
        if age >= timeout {
            warn!(
                "Move {} to {:.3} deg outstanding for {:.1}s",
                command.id,
                command.target_azimuth_deg,
                age.as_secs_f64()
            );
            self.stale_reported = true;
            self.publish(TrajectoryEvent::CommandStale { command, age });
        }
    }

    fn publish(&self, event: TrajectoryEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    /// Run until the input stream closes, returning the final controller state.
    pub async fn run(
        mut self,
        mut inputs: mpsc::Receiver<ControlInput>,
        mut ready: watch::Receiver<bool>,
    ) -> Result<TrajectoryController, ControlLoopError> {
        info!(
            "Starting dome trajectory control with algorithm {:?} {}",
            self.controller.algorithm_name(),
            self.algorithm_config
        );
        self.publish(TrajectoryEvent::Algorithm {
            name: self.controller.algorithm_name().to_string(),
            config: self.algorithm_config.clone(),
        });

        let mut dome_ready = *ready.borrow_and_update();
        let mut watchdog = tokio::time::interval(WATCHDOG_PERIOD);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // readiness first, so inputs queued behind it are not dropped
                biased;

                changed = ready.changed(), if !dome_ready => {
                    if changed.is_err() {
                        return Err(ControlLoopError::ReadinessLost);
                    }
                    dome_ready = *ready.borrow_and_update();
                    if dome_ready {
                        info!("Dome command interface ready");
                    }
                }
                input = inputs.recv() => {
                    let Some(input) = input else {
                        info!("Input stream closed; stopping dome trajectory control");
                        break;
                    };
                    if dome_ready || matches!(input, ControlInput::SetFollowing(_)) {
                        self.handle_input(input);
                    } else {
                        debug!("Dome not ready; dropping {input:?}");
                    }
                }
                _ = watchdog.tick(), if self.command_timeout.is_some() => {
                    self.check_watchdog(Instant::now());
                }
            }
        }

        Ok(self.controller)
    }
}
