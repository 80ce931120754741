//! Worker threads for Marga.
//!
//! - Flight thread: runs the executor, owns the vehicle command link
//! - Feedback thread: polls the read-only state probe for live progress
//! - Console thread: turns `c` + Enter on stdin into a cancellation

mod console;
mod feedback;

pub use console::spawn_console_listener;
pub use feedback::FeedbackPoller;

use std::thread::{self, JoinHandle};

use crate::error::{MargaError, Result};
use crate::flight::{FlightExecutor, FlightReport};
use crate::geometry::Point2D;

/// Handle to the running flight thread.
pub struct FlightThread {
    handle: JoinHandle<FlightReport>,
}

impl FlightThread {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the flight to end.
    pub fn join(self) -> Result<FlightReport> {
        self.handle
            .join()
            .map_err(|_| MargaError::Thread("flight thread panicked".to_string()))
    }
}

/// Run `executor` over `path` on a dedicated thread.
pub fn spawn_flight(mut executor: FlightExecutor, path: Vec<Point2D>) -> Result<FlightThread> {
    let handle = thread::Builder::new()
        .name("flight".into())
        .spawn(move || executor.execute(&path))?;
    Ok(FlightThread { handle })
}
