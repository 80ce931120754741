//! Vehicle command interface.
//!
//! The flight executor owns the single command link exclusively. Live
//! progress reporting goes through a separate [`StateProbe`] so the feedback
//! poller never interleaves with commands on that link.

use thiserror::Error;

/// Failures reported by the vehicle link.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActuatorError {
    #[error("Vehicle not connected")]
    NotConnected,

    #[error("Timed out waiting for '{0}'")]
    Timeout(String),

    #[error("Command '{command}' rejected: {reason}")]
    CommandRejected { command: String, reason: String },

    #[error("Link error: {0}")]
    Link(String),
}

pub type ActuatorResult<T> = std::result::Result<T, ActuatorError>;

/// Command and sensor link to the vehicle.
///
/// Every call may block until the vehicle acknowledges and every call may fail.
pub trait Actuator: Send {
    fn connect(&mut self) -> ActuatorResult<()>;

    fn takeoff(&mut self) -> ActuatorResult<()>;

    fn land(&mut self) -> ActuatorResult<()>;

    /// Fly forward along the current heading (cm).
    fn move_forward(&mut self, cm: u32) -> ActuatorResult<()>;

    /// Descend (cm).
    fn move_down(&mut self, cm: u32) -> ActuatorResult<()>;

    fn rotate_clockwise(&mut self, degrees: u32) -> ActuatorResult<()>;

    fn rotate_counter_clockwise(&mut self, degrees: u32) -> ActuatorResult<()>;

    /// Height above ground (cm).
    fn height(&mut self) -> ActuatorResult<f32>;

    /// Heading in degrees, north = 0, clockwise positive.
    fn yaw(&mut self) -> ActuatorResult<f32>;

    /// Battery charge (percent).
    fn battery(&mut self) -> ActuatorResult<u8>;

    /// Roll and pitch (degrees).
    fn roll_pitch(&mut self) -> ActuatorResult<(f32, f32)>;

    /// Read-only query channel for the feedback poller, if the vehicle has one.
    fn state_probe(&self) -> Option<Box<dyn StateProbe>>;
}

/// Read-only state queries that never touch the command link.
pub trait StateProbe: Send {
    /// Velocity along x (cm/s).
    fn speed_x(&self) -> ActuatorResult<f32>;

    /// Velocity along y (cm/s).
    fn speed_y(&self) -> ActuatorResult<f32>;

    fn height(&self) -> ActuatorResult<f32>;
}
