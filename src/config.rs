//! Configuration loading for Marga

use crate::error::{MargaError, Result};
use crate::flight::{CommandLimits, FlightConfig};
use crate::geometry::{DEFAULT_EDGE_SAMPLES, Obstacle, Point2D};
use crate::planning::{PlannerConfig, PlanningProblem};
use crate::sim::SimConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MargaConfig {
    #[serde(default)]
    pub arena: ArenaConfig,
    #[serde(default)]
    pub planner: PlannerSection,
    #[serde(default)]
    pub flight: FlightSection,
    #[serde(default)]
    pub simulation: SimulationSection,
}

/// Planning arena
#[derive(Clone, Debug, Deserialize)]
pub struct ArenaConfig {
    /// Arena width in cm (default: 200)
    #[serde(default = "default_arena_size")]
    pub width: f32,

    /// Arena height in cm (default: 200)
    #[serde(default = "default_arena_size")]
    pub height: f32,

    /// Start position [x, y] in cm
    #[serde(default = "default_start")]
    pub start: Point2D,

    /// Goal position [x, y] in cm
    #[serde(default = "default_goal")]
    pub goal: Point2D,

    /// Axis-aligned obstacles
    #[serde(default = "default_obstacles")]
    pub obstacles: Vec<Obstacle>,
}

/// RRT parameters
#[derive(Clone, Debug, Deserialize)]
pub struct PlannerSection {
    /// Expansion attempts before giving up (default: 2000)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Maximum edge length in cm (default: 35)
    #[serde(default = "default_step_size")]
    pub step_size: f32,

    /// Every n-th attempt samples the goal (default: 10)
    #[serde(default = "default_goal_bias_interval")]
    pub goal_bias_interval: usize,

    /// Collision-check intervals per edge (default: 100)
    #[serde(default = "default_edge_samples")]
    pub edge_samples: usize,

    /// RNG seed, 0 for fresh entropy (default: 0)
    #[serde(default)]
    pub seed: u64,
}

/// Flight execution limits
#[derive(Clone, Debug, Deserialize)]
pub struct FlightSection {
    /// Cruise height in cm (default: 40)
    #[serde(default = "default_target_altitude")]
    pub target_altitude: f32,

    /// Preflight battery threshold in percent (default: 20)
    #[serde(default = "default_min_battery")]
    pub min_battery_percent: u8,

    /// Smallest height excess that triggers a descent in cm (default: 20)
    #[serde(default = "default_min_altitude_adjust")]
    pub min_altitude_adjust: f32,

    /// Shortest forward move in cm (default: 20)
    #[serde(default = "default_min_move")]
    pub min_move_cm: u32,

    /// Longest forward move in cm (default: 500)
    #[serde(default = "default_max_move")]
    pub max_move_cm: u32,

    /// Turns at or below this are skipped, degrees (default: 5)
    #[serde(default = "default_turn_deadband")]
    pub turn_deadband_deg: f32,

    /// Settle time after a rotation (default: 2000)
    #[serde(default = "default_settle_ms")]
    pub rotation_settle_ms: u64,

    /// Settle time after a forward move (default: 2000)
    #[serde(default = "default_settle_ms")]
    pub move_settle_ms: u64,

    /// Settle time after takeoff (default: 1000)
    #[serde(default = "default_takeoff_settle_ms")]
    pub takeoff_settle_ms: u64,

    /// Feedback poll interval (default: 200)
    #[serde(default = "default_feedback_interval_ms")]
    pub feedback_interval_ms: u64,

    /// Wait for the feedback poller on shutdown (default: 2000)
    #[serde(default = "default_poller_join_timeout_ms")]
    pub poller_join_timeout_ms: u64,

    /// Per-consumer telemetry buffer (default: 64)
    #[serde(default = "default_telemetry_capacity")]
    pub telemetry_capacity: usize,
}

/// Simulated vehicle parameters
#[derive(Clone, Debug, Deserialize)]
pub struct SimulationSection {
    /// Reported battery in percent (default: 90)
    #[serde(default = "default_sim_battery")]
    pub battery_percent: u8,

    /// Height after takeoff in cm (default: 80)
    #[serde(default = "default_takeoff_height")]
    pub takeoff_height: f32,

    /// Linear speed in cm/s (default: 50)
    #[serde(default = "default_speed")]
    pub speed_cm_s: f32,

    /// Rotation rate in deg/s (default: 90)
    #[serde(default = "default_rotation_rate")]
    pub rotation_deg_s: f32,

    /// Command duration multiplier, 0 for instant (default: 1.0)
    #[serde(default = "default_time_scale")]
    pub time_scale: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: default_arena_size(),
            height: default_arena_size(),
            start: default_start(),
            goal: default_goal(),
            obstacles: default_obstacles(),
        }
    }
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            step_size: default_step_size(),
            goal_bias_interval: default_goal_bias_interval(),
            edge_samples: default_edge_samples(),
            seed: 0,
        }
    }
}

impl Default for FlightSection {
    fn default() -> Self {
        Self {
            target_altitude: default_target_altitude(),
            min_battery_percent: default_min_battery(),
            min_altitude_adjust: default_min_altitude_adjust(),
            min_move_cm: default_min_move(),
            max_move_cm: default_max_move(),
            turn_deadband_deg: default_turn_deadband(),
            rotation_settle_ms: default_settle_ms(),
            move_settle_ms: default_settle_ms(),
            takeoff_settle_ms: default_takeoff_settle_ms(),
            feedback_interval_ms: default_feedback_interval_ms(),
            poller_join_timeout_ms: default_poller_join_timeout_ms(),
            telemetry_capacity: default_telemetry_capacity(),
        }
    }
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            battery_percent: default_sim_battery(),
            takeoff_height: default_takeoff_height(),
            speed_cm_s: default_speed(),
            rotation_deg_s: default_rotation_rate(),
            time_scale: default_time_scale(),
        }
    }
}

// Default value functions
fn default_arena_size() -> f32 {
    200.0
}
fn default_start() -> Point2D {
    Point2D::new(20.0, 20.0)
}
fn default_goal() -> Point2D {
    Point2D::new(133.0, 133.0)
}
fn default_obstacles() -> Vec<Obstacle> {
    vec![
        Obstacle::new(32.0, 50.0, 37.0, 25.0),
        Obstacle::new(111.0, 80.0, 37.0, 45.0),
    ]
}

// Planner defaults
fn default_max_iterations() -> usize {
    2000
}
fn default_step_size() -> f32 {
    35.0
}
fn default_goal_bias_interval() -> usize {
    10
}
fn default_edge_samples() -> usize {
    DEFAULT_EDGE_SAMPLES
}

// Flight defaults
fn default_target_altitude() -> f32 {
    40.0
}
fn default_min_battery() -> u8 {
    20
}
fn default_min_altitude_adjust() -> f32 {
    20.0
}
fn default_min_move() -> u32 {
    20
}
fn default_max_move() -> u32 {
    500
}
fn default_turn_deadband() -> f32 {
    5.0
}
fn default_settle_ms() -> u64 {
    2000
}
fn default_takeoff_settle_ms() -> u64 {
    1000
}
fn default_feedback_interval_ms() -> u64 {
    200
}
fn default_poller_join_timeout_ms() -> u64 {
    2000
}
fn default_telemetry_capacity() -> usize {
    64
}

// Simulation defaults
fn default_sim_battery() -> u8 {
    90
}
fn default_takeoff_height() -> f32 {
    80.0
}
fn default_speed() -> f32 {
    50.0
}
fn default_rotation_rate() -> f32 {
    90.0
}
fn default_time_scale() -> f32 {
    1.0
}

impl MargaConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MargaError::Config(format!("Failed to read config file: {}", e)))?;
        let config: MargaConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no flight or planning run can work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(MargaError::Config(msg)) };

        if !(self.arena.width > 0.0 && self.arena.height > 0.0) {
            return invalid(format!(
                "arena size must be positive, got {}x{}",
                self.arena.width, self.arena.height
            ));
        }
        if !(self.planner.step_size > 0.0) {
            return invalid(format!(
                "planner.step_size must be positive, got {}",
                self.planner.step_size
            ));
        }
        if self.planner.max_iterations == 0 {
            return invalid("planner.max_iterations must be at least 1".to_string());
        }
        if self.planner.goal_bias_interval == 0 {
            return invalid("planner.goal_bias_interval must be at least 1".to_string());
        }
        if self.planner.edge_samples == 0 {
            return invalid("planner.edge_samples must be at least 1".to_string());
        }
        if self.flight.min_move_cm > self.flight.max_move_cm {
            return invalid(format!(
                "flight.min_move_cm ({}) exceeds flight.max_move_cm ({})",
                self.flight.min_move_cm, self.flight.max_move_cm
            ));
        }
        if self.flight.feedback_interval_ms == 0 {
            return invalid("flight.feedback_interval_ms must be at least 1".to_string());
        }
        if !self.simulation.time_scale.is_finite() || self.simulation.time_scale < 0.0 {
            return invalid(format!(
                "simulation.time_scale must be finite and not negative, got {}",
                self.simulation.time_scale
            ));
        }
        Ok(())
    }

    pub fn planning_problem(&self) -> PlanningProblem {
        PlanningProblem {
            start: self.arena.start,
            goal: self.arena.goal,
            arena_width: self.arena.width,
            arena_height: self.arena.height,
            obstacles: self.arena.obstacles.clone(),
        }
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            max_iterations: self.planner.max_iterations,
            step_size: self.planner.step_size,
            goal_bias_interval: self.planner.goal_bias_interval,
            edge_samples: self.planner.edge_samples,
            seed: self.planner.seed,
        }
    }

    pub fn flight_config(&self) -> FlightConfig {
        let f = &self.flight;
        FlightConfig {
            target_altitude: f.target_altitude,
            min_battery_percent: f.min_battery_percent,
            min_altitude_adjust: f.min_altitude_adjust,
            limits: CommandLimits {
                min_move_cm: f.min_move_cm,
                max_move_cm: f.max_move_cm,
                turn_deadband_deg: f.turn_deadband_deg,
            },
            takeoff_settle: Duration::from_millis(f.takeoff_settle_ms),
            rotation_settle: Duration::from_millis(f.rotation_settle_ms),
            move_settle: Duration::from_millis(f.move_settle_ms),
            feedback_interval: Duration::from_millis(f.feedback_interval_ms),
            poller_join_timeout: Duration::from_millis(f.poller_join_timeout_ms),
        }
    }

    /// Simulator starting at the arena start, facing north
    pub fn sim_config(&self) -> SimConfig {
        let s = &self.simulation;
        SimConfig {
            battery_percent: s.battery_percent,
            takeoff_height: s.takeoff_height,
            speed_cm_s: s.speed_cm_s,
            rotation_deg_s: s.rotation_deg_s,
            time_scale: s.time_scale,
            start: self.arena.start,
            initial_yaw: 0.0,
        }
    }
}
