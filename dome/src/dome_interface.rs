//! Dome command interface trait.

use thiserror::Error;
use trajectory::MoveCommand;

/// Errors handing a command to the dome transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomeError {
    /// The dome side of the transport has gone away.
    #[error("Dome command interface disconnected")]
    Disconnected,

    /// The transport cannot accept another command right now.
    #[error("Dome command queue full")]
    QueueFull,

    /// The dome refused the command.
    #[error("Dome rejected command: {0}")]
    Rejected(String),
}

/// Interface for dome azimuth control
///
/// Abstracts the dome transport for testability. Implementations hand the
/// command off and return immediately; success only means the command was
/// accepted for delivery. Completion is observed through dome telemetry.
pub trait DomeInterface: Send {
    /// Request a move of the dome azimuth to `command.target_azimuth_deg`
    fn move_azimuth(&mut self, command: &MoveCommand) -> Result<(), DomeError>;
}
