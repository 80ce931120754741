//! Simulated vehicle for hardware-free flights.
//!
//! [`SimulatedDrone`] implements [`Actuator`] entirely in-process. It keeps
//! the true pose, height and heading, logs every command it receives, and
//! can be told to fail a specific command to exercise error paths.
//!
//! | Quantity | Model |
//! |----------|-------|
//! | Heading | Exact: rotations add to yaw, normalized to (-180, 180] |
//! | Position | Exact: forward moves follow the current heading |
//! | Height | Takeoff to `takeoff_height`, `move_down` subtracts |
//! | Timing | `distance / speed * time_scale` per command (0 = instant) |
//!
//! A [`DroneMonitor`] shares the same state, so tests can inspect the
//! command log after the drone has been moved into an executor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::flight::{Actuator, ActuatorError, ActuatorResult, StateProbe};
use crate::geometry::Point2D;
use crate::utils::normalize_degrees;

/// Simulation parameters.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Reported battery charge (percent)
    pub battery_percent: u8,
    /// Height reached after takeoff (cm)
    pub takeoff_height: f32,
    /// Forward and vertical speed (cm/s)
    pub speed_cm_s: f32,
    /// Rotation rate (deg/s)
    pub rotation_deg_s: f32,
    /// Multiplier on simulated command durations (0 = instant)
    pub time_scale: f32,
    /// Starting position (cm)
    pub start: Point2D,
    /// Starting heading (degrees)
    pub initial_yaw: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            battery_percent: 90,
            takeoff_height: 80.0,
            speed_cm_s: 50.0,
            rotation_deg_s: 90.0,
            time_scale: 1.0,
            start: Point2D::new(0.0, 0.0),
            initial_yaw: 0.0,
        }
    }
}

impl SimConfig {
    /// Default parameters with every command completing immediately.
    pub fn instant() -> Self {
        Self {
            time_scale: 0.0,
            ..Default::default()
        }
    }
}

/// A command received by the simulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DroneCommand {
    Connect,
    Takeoff,
    Land,
    MoveForward(u32),
    MoveDown(u32),
    RotateClockwise(u32),
    RotateCounterClockwise(u32),
}

/// Command category, used for failure injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Connect,
    Takeoff,
    Land,
    MoveForward,
    MoveDown,
    Rotate,
}

impl DroneCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            DroneCommand::Connect => CommandKind::Connect,
            DroneCommand::Takeoff => CommandKind::Takeoff,
            DroneCommand::Land => CommandKind::Land,
            DroneCommand::MoveForward(_) => CommandKind::MoveForward,
            DroneCommand::MoveDown(_) => CommandKind::MoveDown,
            DroneCommand::RotateClockwise(_) | DroneCommand::RotateCounterClockwise(_) => {
                CommandKind::Rotate
            }
        }
    }

    pub fn is_land(&self) -> bool {
        self.kind() == CommandKind::Land
    }

    pub fn is_takeoff(&self) -> bool {
        self.kind() == CommandKind::Takeoff
    }

    pub fn is_move_forward(&self) -> bool {
        self.kind() == CommandKind::MoveForward
    }

    pub fn is_rotate(&self) -> bool {
        self.kind() == CommandKind::Rotate
    }

    fn name(&self) -> String {
        match self {
            DroneCommand::Connect => "command".to_string(),
            DroneCommand::Takeoff => "takeoff".to_string(),
            DroneCommand::Land => "land".to_string(),
            DroneCommand::MoveForward(cm) => format!("forward {}", cm),
            DroneCommand::MoveDown(cm) => format!("down {}", cm),
            DroneCommand::RotateClockwise(deg) => format!("cw {}", deg),
            DroneCommand::RotateCounterClockwise(deg) => format!("ccw {}", deg),
        }
    }
}

/// Simulator state shared with monitors and the state probe.
#[derive(Debug)]
struct SimState {
    connected: bool,
    airborne: bool,
    position: Point2D,
    height: f32,
    yaw: f32,
    velocity: (f32, f32),
    battery: u8,
    log: Vec<DroneCommand>,
    issued: HashMap<CommandKind, usize>,
    /// (kind, 1-based occurrence) pairs that must fail
    failures: Vec<(CommandKind, usize)>,
    sensors_failing: bool,
}

/// In-process vehicle simulator.
pub struct SimulatedDrone {
    config: SimConfig,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedDrone {
    pub fn new(config: SimConfig) -> Self {
        let state = SimState {
            connected: false,
            airborne: false,
            position: config.start,
            height: 0.0,
            yaw: normalize_degrees(config.initial_yaw),
            velocity: (0.0, 0.0),
            battery: config.battery_percent,
            log: Vec::new(),
            issued: HashMap::new(),
            failures: Vec::new(),
            sensors_failing: false,
        };
        Self {
            config,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Make the `nth` (1-based) command of `kind` fail.
    pub fn with_failure(self, kind: CommandKind, nth: usize) -> Self {
        self.state.lock().failures.push((kind, nth));
        self
    }

    /// Observer sharing this drone's state.
    pub fn monitor(&self) -> DroneMonitor {
        DroneMonitor {
            state: Arc::clone(&self.state),
        }
    }

    /// Log a command and decide whether it is accepted.
    fn begin(&self, command: DroneCommand) -> ActuatorResult<()> {
        let mut state = self.state.lock();
        state.log.push(command);
        let kind = command.kind();
        let count = {
            let entry = state.issued.entry(kind).or_insert(0);
            *entry += 1;
            *entry
        };

        if state.failures.contains(&(kind, count)) {
            return Err(ActuatorError::CommandRejected {
                command: command.name(),
                reason: "injected failure".to_string(),
            });
        }
        if command != DroneCommand::Connect && !state.connected {
            return Err(ActuatorError::NotConnected);
        }
        let needs_air = !matches!(command, DroneCommand::Connect | DroneCommand::Takeoff);
        if needs_air && !state.airborne {
            return Err(ActuatorError::CommandRejected {
                command: command.name(),
                reason: "not flying".to_string(),
            });
        }
        Ok(())
    }

    /// Block for the simulated duration of a command.
    fn wait(&self, seconds: f32) {
        let scaled = seconds * self.config.time_scale;
        if scaled > 0.0
            && let Ok(delay) = Duration::try_from_secs_f32(scaled)
        {
            std::thread::sleep(delay);
        }
    }

    fn rotate(&mut self, command: DroneCommand, signed_degrees: f32) -> ActuatorResult<()> {
        self.begin(command)?;
        self.wait(signed_degrees.abs() / self.config.rotation_deg_s.max(1.0));
        let mut state = self.state.lock();
        state.yaw = normalize_degrees(state.yaw + signed_degrees);
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&SimState) -> T) -> ActuatorResult<T> {
        let state = self.state.lock();
        if !state.connected {
            return Err(ActuatorError::NotConnected);
        }
        if state.sensors_failing {
            return Err(ActuatorError::Timeout("sensor read".to_string()));
        }
        Ok(f(&state))
    }
}

impl Actuator for SimulatedDrone {
    fn connect(&mut self) -> ActuatorResult<()> {
        self.begin(DroneCommand::Connect)?;
        self.state.lock().connected = true;
        tracing::debug!("Simulator connected");
        Ok(())
    }

    fn takeoff(&mut self) -> ActuatorResult<()> {
        self.begin(DroneCommand::Takeoff)?;
        self.wait(self.config.takeoff_height / self.config.speed_cm_s.max(1.0));
        let mut state = self.state.lock();
        state.airborne = true;
        state.height = self.config.takeoff_height;
        Ok(())
    }

    fn land(&mut self) -> ActuatorResult<()> {
        self.begin(DroneCommand::Land)?;
        let height = self.state.lock().height;
        self.wait(height / self.config.speed_cm_s.max(1.0));
        let mut state = self.state.lock();
        state.airborne = false;
        state.height = 0.0;
        Ok(())
    }

    fn move_forward(&mut self, cm: u32) -> ActuatorResult<()> {
        self.begin(DroneCommand::MoveForward(cm))?;
        let distance = cm as f32;
        let speed = self.config.speed_cm_s.max(1.0);

        let rad = self.state.lock().yaw.to_radians();
        self.state.lock().velocity = (speed * rad.sin(), speed * rad.cos());
        self.wait(distance / speed);

        let mut state = self.state.lock();
        state.position = state.position.advance(rad, distance);
        state.velocity = (0.0, 0.0);
        Ok(())
    }

    fn move_down(&mut self, cm: u32) -> ActuatorResult<()> {
        self.begin(DroneCommand::MoveDown(cm))?;
        self.wait(cm as f32 / self.config.speed_cm_s.max(1.0));
        let mut state = self.state.lock();
        state.height = (state.height - cm as f32).max(0.0);
        Ok(())
    }

    fn rotate_clockwise(&mut self, degrees: u32) -> ActuatorResult<()> {
        self.rotate(DroneCommand::RotateClockwise(degrees), degrees as f32)
    }

    fn rotate_counter_clockwise(&mut self, degrees: u32) -> ActuatorResult<()> {
        self.rotate(
            DroneCommand::RotateCounterClockwise(degrees),
            -(degrees as f32),
        )
    }

    fn height(&mut self) -> ActuatorResult<f32> {
        self.read(|s| s.height)
    }

    fn yaw(&mut self) -> ActuatorResult<f32> {
        self.read(|s| s.yaw)
    }

    fn battery(&mut self) -> ActuatorResult<u8> {
        self.read(|s| s.battery)
    }

    fn roll_pitch(&mut self) -> ActuatorResult<(f32, f32)> {
        self.read(|_| (0.0, 0.0))
    }

    fn state_probe(&self) -> Option<Box<dyn StateProbe>> {
        Some(Box::new(SimProbe {
            state: Arc::clone(&self.state),
        }))
    }
}

/// Read-only view used by the feedback poller.
struct SimProbe {
    state: Arc<Mutex<SimState>>,
}

impl SimProbe {
    fn read<T>(&self, f: impl FnOnce(&SimState) -> T) -> ActuatorResult<T> {
        let state = self.state.lock();
        if !state.connected {
            return Err(ActuatorError::NotConnected);
        }
        Ok(f(&state))
    }
}

impl StateProbe for SimProbe {
    fn speed_x(&self) -> ActuatorResult<f32> {
        self.read(|s| s.velocity.0)
    }

    fn speed_y(&self) -> ActuatorResult<f32> {
        self.read(|s| s.velocity.1)
    }

    fn height(&self) -> ActuatorResult<f32> {
        self.read(|s| s.height)
    }
}

/// Inspection handle for a [`SimulatedDrone`].
#[derive(Clone)]
pub struct DroneMonitor {
    state: Arc<Mutex<SimState>>,
}

impl DroneMonitor {
    /// Every command received so far, in order.
    pub fn commands(&self) -> Vec<DroneCommand> {
        self.state.lock().log.clone()
    }

    /// Number of logged commands matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&DroneCommand) -> bool) -> usize {
        self.state.lock().log.iter().filter(|c| predicate(c)).count()
    }

    /// True position of the simulated vehicle.
    pub fn position(&self) -> Point2D {
        self.state.lock().position
    }

    pub fn height(&self) -> f32 {
        self.state.lock().height
    }

    pub fn yaw(&self) -> f32 {
        self.state.lock().yaw
    }

    pub fn is_airborne(&self) -> bool {
        self.state.lock().airborne
    }

    /// Make every subsequent sensor read on the command link time out.
    pub fn set_sensors_failing(&self, failing: bool) {
        self.state.lock().sensors_failing = failing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_commands_require_connection() {
        let mut drone = SimulatedDrone::new(SimConfig::instant());
        assert_eq!(drone.takeoff(), Err(ActuatorError::NotConnected));
        assert_eq!(drone.battery(), Err(ActuatorError::NotConnected));
    }

    #[test]
    fn test_moves_follow_heading() {
        let mut drone = SimulatedDrone::new(SimConfig::instant());
        let monitor = drone.monitor();
        drone.connect().unwrap();
        drone.takeoff().unwrap();

        drone.rotate_clockwise(90).unwrap();
        drone.move_forward(100).unwrap();

        let p = monitor.position();
        assert_abs_diff_eq!(p.x, 100.0, epsilon = 1e-3);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(drone.yaw().unwrap(), 90.0);
    }

    #[test]
    fn test_yaw_wraps() {
        let mut drone = SimulatedDrone::new(SimConfig {
            initial_yaw: 170.0,
            ..SimConfig::instant()
        });
        drone.connect().unwrap();
        drone.takeoff().unwrap();
        drone.rotate_clockwise(20).unwrap();
        assert_abs_diff_eq!(drone.yaw().unwrap(), -170.0);
    }

    #[test]
    fn test_height_after_takeoff_and_descent() {
        let mut drone = SimulatedDrone::new(SimConfig::instant());
        drone.connect().unwrap();
        drone.takeoff().unwrap();
        assert_abs_diff_eq!(drone.height().unwrap(), 80.0);
        drone.move_down(50).unwrap();
        assert_abs_diff_eq!(drone.height().unwrap(), 30.0);
    }

    #[test]
    fn test_unrepresentable_delay_does_not_panic() {
        let mut drone = SimulatedDrone::new(SimConfig {
            time_scale: f32::INFINITY,
            ..SimConfig::default()
        });
        drone.connect().unwrap();
        drone.takeoff().unwrap();
        drone.land().unwrap();
        assert!(!drone.monitor().is_airborne());
    }

    #[test]
    fn test_injected_failure_hits_nth_command() {
        let mut drone =
            SimulatedDrone::new(SimConfig::instant()).with_failure(CommandKind::MoveForward, 2);
        drone.connect().unwrap();
        drone.takeoff().unwrap();

        assert!(drone.move_forward(30).is_ok());
        assert!(matches!(
            drone.move_forward(30),
            Err(ActuatorError::CommandRejected { .. })
        ));
        assert!(drone.move_forward(30).is_ok());
    }

    #[test]
    fn test_monitor_sees_command_log() {
        let mut drone = SimulatedDrone::new(SimConfig::instant());
        let monitor = drone.monitor();
        drone.connect().unwrap();
        drone.takeoff().unwrap();
        drone.rotate_counter_clockwise(45).unwrap();
        drone.land().unwrap();

        assert_eq!(
            monitor.commands(),
            vec![
                DroneCommand::Connect,
                DroneCommand::Takeoff,
                DroneCommand::RotateCounterClockwise(45),
                DroneCommand::Land
            ]
        );
        assert_eq!(monitor.count(DroneCommand::is_rotate), 1);
        assert!(!monitor.is_airborne());
    }

    #[test]
    fn test_probe_reads_without_logging_commands() {
        let mut drone = SimulatedDrone::new(SimConfig::instant());
        let monitor = drone.monitor();
        drone.connect().unwrap();
        drone.takeoff().unwrap();

        let probe = drone.state_probe().unwrap();
        assert_abs_diff_eq!(probe.height().unwrap(), 80.0);
        assert_abs_diff_eq!(probe.speed_x().unwrap(), 0.0);
        assert_eq!(monitor.commands().len(), 2);
    }
}
