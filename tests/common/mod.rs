//! Shared fixtures for integration tests
//!
//! - Arena scenarios and a recording tree observer for planner tests
//! - Instant simulated drones and a hook-wrapping actuator for flight tests

#![allow(dead_code)]

use marga::flight::{Actuator, ActuatorResult, FlightConfig, FlightExecutor, StateProbe};
use marga::geometry::{Obstacle, Point2D};
use marga::planning::{PlannedPath, PlanningProblem, Rejection, TreeNode, TreeObserver};
use marga::shared::{CancellationToken, TelemetryChannel};
use marga::sim::{DroneMonitor, SimConfig, SimulatedDrone};

/// 200x200 arena with one box between start and goal.
pub fn single_box_arena() -> PlanningProblem {
    PlanningProblem {
        start: Point2D::new(20.0, 20.0),
        goal: Point2D::new(133.0, 133.0),
        arena_width: 200.0,
        arena_height: 200.0,
        obstacles: vec![Obstacle::new(32.0, 50.0, 37.0, 25.0)],
    }
}

/// Default arena with both boxes.
pub fn two_box_arena() -> PlanningProblem {
    let mut problem = single_box_arena();
    problem.obstacles.push(Obstacle::new(111.0, 80.0, 37.0, 45.0));
    problem
}

/// Records every planner notification.
#[derive(Default)]
pub struct RecordingObserver {
    pub added: Vec<(usize, TreeNode, Point2D)>,
    pub rejected: Vec<(Point2D, Rejection)>,
    pub found: Option<PlannedPath>,
}

impl TreeObserver for RecordingObserver {
    fn on_node_added(&mut self, index: usize, node: &TreeNode, parent: Point2D) {
        self.added.push((index, *node, parent));
    }

    fn on_candidate_rejected(&mut self, candidate: Point2D, reason: Rejection) {
        self.rejected.push((candidate, reason));
    }

    fn on_path_found(&mut self, path: &PlannedPath) {
        self.found = Some(path.clone());
    }
}

/// Simulator that starts at the origin facing north and never sleeps.
pub fn instant_drone() -> SimulatedDrone {
    SimulatedDrone::new(SimConfig::instant())
}

/// Flight parameters with no settle delays and a fast feedback poll.
pub fn fast_flight_config() -> FlightConfig {
    FlightConfig {
        feedback_interval: std::time::Duration::from_millis(10),
        ..FlightConfig::default().without_delays()
    }
}

/// Executor over `actuator` with a fresh token and channel.
pub fn executor_for(actuator: Box<dyn Actuator>, config: FlightConfig) -> FlightExecutor {
    FlightExecutor::new(
        actuator,
        config,
        CancellationToken::new(),
        TelemetryChannel::default(),
    )
}

/// Square-ish route from the origin with a turn on every segment.
pub fn zigzag_path() -> Vec<Point2D> {
    vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(0.0, 100.0),
        Point2D::new(100.0, 100.0),
        Point2D::new(100.0, 0.0),
        Point2D::new(0.0, 0.0),
    ]
}

type Hook = Box<dyn FnMut(&DroneMonitor) + Send>;

/// Wraps a [`SimulatedDrone`] and runs a hook after a successful takeoff or forward move.
pub struct HookedDrone {
    inner: SimulatedDrone,
    after_takeoff: Option<Hook>,
    after_move: Option<Hook>,
}

impl HookedDrone {
    /// Run `hook` after every successful forward move.
    pub fn after_move(inner: SimulatedDrone, hook: impl FnMut(&DroneMonitor) + Send + 'static) -> Self {
        Self {
            inner,
            after_takeoff: None,
            after_move: Some(Box::new(hook)),
        }
    }

    /// Run `hook` once the vehicle is airborne.
    pub fn after_takeoff(
        inner: SimulatedDrone,
        hook: impl FnMut(&DroneMonitor) + Send + 'static,
    ) -> Self {
        Self {
            inner,
            after_takeoff: Some(Box::new(hook)),
            after_move: None,
        }
    }

    fn run(hook: &mut Option<Hook>, inner: &SimulatedDrone) {
        if let Some(hook) = hook {
            hook(&inner.monitor());
        }
    }
}

impl Actuator for HookedDrone {
    fn connect(&mut self) -> ActuatorResult<()> {
        self.inner.connect()
    }

    fn takeoff(&mut self) -> ActuatorResult<()> {
        self.inner.takeoff()?;
        Self::run(&mut self.after_takeoff, &self.inner);
        Ok(())
    }

    fn land(&mut self) -> ActuatorResult<()> {
        self.inner.land()
    }

    fn move_forward(&mut self, cm: u32) -> ActuatorResult<()> {
        self.inner.move_forward(cm)?;
        Self::run(&mut self.after_move, &self.inner);
        Ok(())
    }

    fn move_down(&mut self, cm: u32) -> ActuatorResult<()> {
        self.inner.move_down(cm)
    }

    fn rotate_clockwise(&mut self, degrees: u32) -> ActuatorResult<()> {
        self.inner.rotate_clockwise(degrees)
    }

    fn rotate_counter_clockwise(&mut self, degrees: u32) -> ActuatorResult<()> {
        self.inner.rotate_counter_clockwise(degrees)
    }

    fn height(&mut self) -> ActuatorResult<f32> {
        self.inner.height()
    }

    fn yaw(&mut self) -> ActuatorResult<f32> {
        self.inner.yaw()
    }

    fn battery(&mut self) -> ActuatorResult<u8> {
        self.inner.battery()
    }

    fn roll_pitch(&mut self) -> ActuatorResult<(f32, f32)> {
        self.inner.roll_pitch()
    }

    fn state_probe(&self) -> Option<Box<dyn StateProbe>> {
        self.inner.state_probe()
    }
}
