//! Dome side of dome trajectory control.
//!
//! Wraps the pure [`trajectory::TrajectoryController`] in an async
//! [`ControlLoop`] that consumes telemetry from a single ordered stream,
//! sends move commands through a [`DomeInterface`], and publishes
//! [`TrajectoryEvent`]s. [`MockDome`] provides a simulated dome for tests
//! and demos.

pub mod control_loop;
pub mod dome_interface;
pub mod mock_dome;

pub use control_loop::{
    ControlClock, ControlInput, ControlLoop, ControlLoopError, TrajectoryEvent, WATCHDOG_PERIOD,
};
pub use dome_interface::{DomeError, DomeInterface};
pub use mock_dome::{MockDome, MockDomeCommander, MockDomeConfig, MockDomeTask};
