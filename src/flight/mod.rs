//! Flight execution along a planned route.
//!
//! This module provides:
//! - The vehicle command interface and its read-only state probe
//! - Conversion of waypoint pairs into bounded turn/move commands
//! - Dead-reckoning pose estimation
//! - The scoped "must land" obligation
//! - The flight executor and its outcome types

mod actuator;
mod commands;
mod executor;
mod landing;
mod odometry;

pub use actuator::{Actuator, ActuatorError, ActuatorResult, StateProbe};
pub use commands::{CommandLimits, SegmentPlan, TurnCommand, turn_between};
pub use executor::{FlightConfig, FlightExecutor, FlightFailure, FlightOutcome, FlightReport};
pub use landing::{LandingObligation, LandingStatus};
pub use odometry::{DeadReckoning, Pose};
