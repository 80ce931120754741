//! # Marga
//!
//! Route planning and flight execution for a small indoor drone.
//!
//! ## Overview
//!
//! - **Planning**: goal-biased RRT over a rectangular arena with axis-aligned
//!   obstacles, producing a collision-free polyline from start to goal
//! - **Flight**: turns each path segment into at most one rotation and one
//!   forward move, dead-reckons the position and publishes telemetry
//! - **Safety**: cooperative cancellation, low-battery preflight abort and a
//!   landing that is attempted exactly once whenever the vehicle took off
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marga::planning::{NullObserver, PlanningProblem, RrtPlanner};
//! use marga::flight::{FlightConfig, FlightExecutor};
//! use marga::shared::{CancellationToken, TelemetryChannel};
//! use marga::sim::{SimConfig, SimulatedDrone};
//!
//! let path = RrtPlanner::with_defaults().plan(&problem, &mut NullObserver)?;
//!
//! let drone = SimulatedDrone::new(SimConfig::default());
//! let mut executor = FlightExecutor::new(
//!     Box::new(drone),
//!     FlightConfig::default(),
//!     CancellationToken::new(),
//!     TelemetryChannel::default(),
//! );
//! let report = executor.execute(&path.waypoints);
//! println!("{}", report.outcome.reason());
//! ```
//!
//! ## Coordinate System
//!
//! - X, Y: arena centimeters
//! - Heading: degrees, 0 along +Y, clockwise positive, normalized to (-180, 180]

pub mod config;
pub mod error;
pub mod flight;
pub mod geometry;
pub mod planning;
pub mod shared;
pub mod sim;
pub mod threads;
pub mod utils;

pub use config::MargaConfig;
pub use error::{MargaError, Result};
pub use geometry::{Obstacle, Point2D};
