//! Simulated dome for test harnesses and demos.
//!
//! [`MockDome`] models only the azimuth axis: it slews toward the last
//! commanded azimuth along the shortest path at a fixed rate and reports its
//! position at a fixed telemetry interval. It does not enforce motion limits,
//! has no shutter, and never drops a command on its own.
//!
//! [`MockDome::spawn`] runs the simulation as a tokio task and returns a
//! [`MockDomeCommander`] (the [`DomeInterface`] side) and a [`MockDomeTask`]
//! which stops the simulation when dropped.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use trajectory::{angle_diff, wrap_angle, DomeStatus, MoveCommand};

use crate::control_loop::{ControlClock, ControlInput};
use crate::dome_interface::{DomeError, DomeInterface};

/// Default azimuth slew rate (deg/s).
pub const DEFAULT_VELOCITY_DEG_PER_S: f64 = 3.0;

/// Default interval between position telemetry samples.
pub const DEFAULT_TELEMETRY_INTERVAL: Duration = Duration::from_millis(200);

/// Mock dome parameters.
#[derive(Debug, Clone)]
pub struct MockDomeConfig {
    /// Azimuth at start (deg)
    pub initial_azimuth_deg: f64,
    /// Azimuth slew rate (deg/s)
    pub velocity_deg_per_s: f64,
    /// Simulation step and telemetry period
    pub telemetry_interval: Duration,
    /// Number of commands the transport buffers before reporting a full queue
    pub command_capacity: usize,
}

impl Default for MockDomeConfig {
    fn default() -> Self {
        Self {
            initial_azimuth_deg: 0.0,
            velocity_deg_per_s: DEFAULT_VELOCITY_DEG_PER_S,
            telemetry_interval: DEFAULT_TELEMETRY_INTERVAL,
            command_capacity: 8,
        }
    }
}

/// Azimuth axis simulation.
#[derive(Debug, Clone)]
pub struct MockDome {
    config: MockDomeConfig,
    current_azimuth_deg: f64,
    commanded_azimuth_deg: f64,
}

impl MockDome {
    pub fn new(config: MockDomeConfig) -> Self {
        let azimuth = wrap_angle(config.initial_azimuth_deg);
        Self {
            config,
            current_azimuth_deg: azimuth,
            commanded_azimuth_deg: azimuth,
        }
    }

    /// Set a new azimuth target.
    pub fn command(&mut self, azimuth_deg: f64) {
        self.commanded_azimuth_deg = wrap_angle(azimuth_deg);
    }

    /// Advance the simulation by `dt`, moving at most `velocity * dt`.
    pub fn step(&mut self, dt: Duration) {
        let max_correction = (self.config.velocity_deg_per_s * dt.as_secs_f64()).abs();
        let error = angle_diff(self.commanded_azimuth_deg, self.current_azimuth_deg);
        let correction = error.abs().min(max_correction).copysign(error);
        self.current_azimuth_deg = if error.abs() <= max_correction {
            self.commanded_azimuth_deg
        } else {
            wrap_angle(self.current_azimuth_deg + correction)
        };
    }

    /// Current azimuth in [0, 360) degrees.
    pub fn azimuth_deg(&self) -> f64 {
        self.current_azimuth_deg
    }

    /// Commanded azimuth in [0, 360) degrees.
    pub fn commanded_azimuth_deg(&self) -> f64 {
        self.commanded_azimuth_deg
    }

    pub fn is_moving(&self) -> bool {
        self.current_azimuth_deg != self.commanded_azimuth_deg
    }

    /// Telemetry sample for the current state.
    pub fn status(&self, clock: &ControlClock) -> DomeStatus {
        DomeStatus::new(self.current_azimuth_deg, self.is_moving(), clock.now())
    }

    /// Run the simulation as a background task.
    ///
    /// Position telemetry is delivered to `telemetry` as
    /// [`ControlInput::DomeStatus`]. Samples are dropped, not queued, when
    /// the channel is full. The readiness signal flips to true once the
    /// first sample has been sent and commands are being accepted.
    pub fn spawn(
        self,
        clock: ControlClock,
        telemetry: mpsc::Sender<ControlInput>,
    ) -> (MockDomeCommander, MockDomeTask) {
        let (command_tx, command_rx) = mpsc::channel(self.config.command_capacity.max(1));
        let (ready_tx, ready_rx) = watch::channel(false);
        let reject = Arc::new(AtomicBool::new(false));
        let received = Arc::new(AtomicUsize::new(0));

        let handle = tokio::spawn(self.run(
            clock,
            telemetry,
            command_rx,
            ready_tx,
            received.clone(),
        ));

        let commander = MockDomeCommander {
            commands: command_tx,
            ready: ready_rx,
            reject: reject.clone(),
        };
        let task = MockDomeTask {
            handle,
            reject,
            received,
        };
        (commander, task)
    }

    async fn run(
        mut self,
        clock: ControlClock,
        telemetry: mpsc::Sender<ControlInput>,
        mut commands: mpsc::Receiver<MoveCommand>,
        ready: watch::Sender<bool>,
        received: Arc<AtomicUsize>,
    ) {
        let interval = self.config.telemetry_interval;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            "Mock dome started at {:.2} deg ({} deg/s)",
            self.current_azimuth_deg, self.config.velocity_deg_per_s
        );
        let mut announced = false;

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        debug!("Mock dome command channel closed");
                        break;
                    };
                    received.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "Mock dome move {} to {:.3} deg",
                        command.id, command.target_azimuth_deg
                    );
                    self.command(command.target_azimuth_deg);
                }
                _ = ticker.tick() => {
                    if announced {
                        self.step(interval);
                    }
                    match telemetry.try_send(ControlInput::DomeStatus(self.status(&clock))) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            debug!("Dropping dome status; input queue full")
                        }
                        Err(TrySendError::Closed(_)) => {
                            debug!("Mock dome telemetry channel closed");
                            break;
                        }
                    }
                    if !announced {
                        announced = true;
                        let _ = ready.send(true);
                    }
                }
            }
        }
    }
}

/// Command side of a spawned [`MockDome`].
#[derive(Debug, Clone)]
pub struct MockDomeCommander {
    commands: mpsc::Sender<MoveCommand>,
    ready: watch::Receiver<bool>,
    reject: Arc<AtomicBool>,
}

impl MockDomeCommander {
    /// Readiness signal for the dome command interface.
    pub fn ready_signal(&self) -> watch::Receiver<bool> {
        self.ready.clone()
    }
}

impl DomeInterface for MockDomeCommander {
    fn move_azimuth(&mut self, command: &MoveCommand) -> Result<(), DomeError> {
        if self.reject.load(Ordering::Relaxed) {
            warn!("Mock dome rejecting move {}", command.id);
            return Err(DomeError::Rejected("mock dome set to reject commands".to_string()));
        }
        self.commands.try_send(*command).map_err(|e| match e {
            TrySendError::Full(_) => DomeError::QueueFull,
            TrySendError::Closed(_) => DomeError::Disconnected,
        })
    }
}

/// Handle to the running simulation; aborts it on drop.
pub struct MockDomeTask {
    handle: JoinHandle<()>,
    reject: Arc<AtomicBool>,
    received: Arc<AtomicUsize>,
}

impl MockDomeTask {
    /// Make the command interface refuse every command (transport fault injection).
    pub fn set_reject_commands(&self, reject: bool) {
        self.reject.store(reject, Ordering::Relaxed);
    }

    /// Number of move commands the simulation has received.
    pub fn commands_received(&self) -> usize {
        self.received.load(Ordering::Relaxed)
    }
}

impl Drop for MockDomeTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dome_at(azimuth: f64) -> MockDome {
        MockDome::new(MockDomeConfig {
            initial_azimuth_deg: azimuth,
            ..Default::default()
        })
    }

    #[test]
    fn test_idle_dome_does_not_move() {
        let mut dome = dome_at(45.0);
        assert!(!dome.is_moving());
        dome.step(Duration::from_secs(1));
        assert_eq!(dome.azimuth_deg(), 45.0);
    }

    #[test]
    fn test_step_limited_by_velocity() {
        let mut dome = dome_at(0.0);
        dome.command(10.0);
        assert!(dome.is_moving());
        dome.step(Duration::from_millis(200));
        assert_relative_eq!(dome.azimuth_deg(), 0.6, epsilon = 1e-9);
        dome.step(Duration::from_secs(1));
        assert_relative_eq!(dome.azimuth_deg(), 3.6, epsilon = 1e-9);
    }

    #[test]
    fn test_arrives_exactly() {
        let mut dome = dome_at(0.0);
        dome.command(1.0);
        dome.step(Duration::from_secs(1));
        assert_eq!(dome.azimuth_deg(), 1.0);
        assert!(!dome.is_moving());
    }

    #[test]
    fn test_moves_along_shortest_path() {
        let mut dome = dome_at(10.0);
        dome.command(-20.0);
        assert_eq!(dome.commanded_azimuth_deg(), 340.0);
        dome.step(Duration::from_secs(2));
        assert_relative_eq!(dome.azimuth_deg(), 4.0, epsilon = 1e-9);
        dome.step(Duration::from_secs(5));
        assert_relative_eq!(dome.azimuth_deg(), 349.0, epsilon = 1e-9);
        dome.step(Duration::from_secs(5));
        assert_eq!(dome.azimuth_deg(), 340.0);
    }

    #[test]
    fn test_status_reports_motion() {
        let clock = ControlClock::start();
        let mut dome = dome_at(0.0);
        dome.command(90.0);
        let status = dome.status(&clock);
        assert!(status.is_moving);
        assert_eq!(status.azimuth_deg, 0.0);
    }

    #[tokio::test]
    async fn test_spawned_dome_follows_commands() {
        let (tx, mut rx) = mpsc::channel(64);
        let dome = MockDome::new(MockDomeConfig {
            velocity_deg_per_s: 200.0,
            telemetry_interval: Duration::from_millis(5),
            ..Default::default()
        });
        let (mut commander, task) = dome.spawn(ControlClock::start(), tx);

        let mut ready = commander.ready_signal();
        tokio::time::timeout(Duration::from_secs(2), ready.wait_for(|r| *r))
            .await
            .unwrap()
            .unwrap();

        let command = MoveCommand {
            id: 1,
            target_azimuth_deg: 20.0,
            issued_at: trajectory::Timestamp::from_micros(0),
        };
        commander.move_azimuth(&command).unwrap();

        let arrived = tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(input) = rx.recv().await {
                if let ControlInput::DomeStatus(status) = input {
                    if status.azimuth_deg == 20.0 && !status.is_moving {
                        return true;
                    }
                }
            }
            false
        })
        .await
        .unwrap();
        assert!(arrived);
        assert_eq!(task.commands_received(), 1);
    }

    #[tokio::test]
    async fn test_reject_commands() {
        let (tx, _rx) = mpsc::channel(64);
        let (mut commander, task) = MockDome::new(MockDomeConfig::default())
            .spawn(ControlClock::start(), tx);
        task.set_reject_commands(true);

        let command = MoveCommand {
            id: 7,
            target_azimuth_deg: 20.0,
            issued_at: trajectory::Timestamp::from_micros(0),
        };
        assert!(matches!(
            commander.move_azimuth(&command),
            Err(DomeError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_disconnected_after_drop() {
        let (tx, _rx) = mpsc::channel(64);
        let (mut commander, task) = MockDome::new(MockDomeConfig::default())
            .spawn(ControlClock::start(), tx);
        drop(task);
        // let the aborted task release its receiver
        tokio::time::sleep(Duration::from_millis(20)).await;

        let command = MoveCommand {
            id: 1,
            target_azimuth_deg: 20.0,
            issued_at: trajectory::Timestamp::from_micros(0),
        };
        assert_eq!(commander.move_azimuth(&command), Err(DomeError::Disconnected));
    }
}
