//! Flight executor: drives the vehicle along a planned route.
//!
//! Each consecutive waypoint pair becomes at most one rotation and one
//! forward move. Position is dead-reckoned from the commanded distance and
//! the heading reported by the vehicle after the segment. Every segment
//! produces one telemetry sample, appended to the history and offered to
//! the telemetry channel.
//!
//! Cancellation is cooperative: it is checked at the top of each segment
//! and before every rotate/move command. An in-flight command is never
//! interrupted. Whatever ends the flight, the executor sets the
//! cancellation token, stops the feedback poller and attempts to land
//! exactly once if airborne.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::geometry::Point2D;
use crate::shared::{
    CancellationToken, SharedFeedback, SharedHistory, TelemetryChannel, TelemetrySample,
};
use crate::threads::FeedbackPoller;

use super::actuator::{Actuator, ActuatorError, ActuatorResult};
use super::commands::{CommandLimits, SegmentPlan, TurnCommand, turn_between};
use super::landing::{LandingObligation, LandingStatus};
use super::odometry::DeadReckoning;

/// Flight execution parameters.
#[derive(Clone, Debug)]
pub struct FlightConfig {
    /// Cruise height (cm)
    pub target_altitude: f32,
    /// Preflight abort threshold (percent)
    pub min_battery_percent: u8,
    /// Smallest height excess worth a descent (cm)
    pub min_altitude_adjust: f32,
    /// Move/turn bounds
    pub limits: CommandLimits,
    /// Wait after takeoff and after the preflight descent
    pub takeoff_settle: Duration,
    /// Wait after each rotation
    pub rotation_settle: Duration,
    /// Wait after each forward move
    pub move_settle: Duration,
    /// Feedback poller interval
    pub feedback_interval: Duration,
    /// How long to wait for the poller to exit
    pub poller_join_timeout: Duration,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            target_altitude: 40.0,
            min_battery_percent: 20,
            min_altitude_adjust: 20.0,
            limits: CommandLimits::default(),
            takeoff_settle: Duration::from_secs(1),
            rotation_settle: Duration::from_secs(2),
            move_settle: Duration::from_secs(2),
            feedback_interval: Duration::from_millis(200),
            poller_join_timeout: Duration::from_secs(2),
        }
    }
}

impl FlightConfig {
    /// No settle delays; useful with an instant simulator.
    pub fn without_delays(mut self) -> Self {
        self.takeoff_settle = Duration::ZERO;
        self.rotation_settle = Duration::ZERO;
        self.move_settle = Duration::ZERO;
        self
    }
}

/// Why a flight did not complete.
#[derive(Clone, Debug, PartialEq)]
pub enum FlightFailure {
    /// Battery below the preflight threshold; nothing was commanded
    LowBattery { percent: u8 },
    /// The vehicle link failed
    Actuator(ActuatorError),
}

/// How a flight ended.
#[derive(Clone, Debug, PartialEq)]
pub enum FlightOutcome {
    Completed,
    Cancelled,
    Failed(FlightFailure),
}

impl FlightOutcome {
    /// Human-readable description.
    pub fn reason(&self) -> String {
        match self {
            FlightOutcome::Completed => "flight plan completed".to_string(),
            FlightOutcome::Cancelled => "flight cancelled".to_string(),
            FlightOutcome::Failed(FlightFailure::LowBattery { percent }) => {
                format!("battery too low ({}%), flight aborted", percent)
            }
            FlightOutcome::Failed(FlightFailure::Actuator(e)) => {
                format!("vehicle error: {}", e)
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        *self == FlightOutcome::Completed
    }
}

impl From<ActuatorError> for FlightOutcome {
    fn from(e: ActuatorError) -> Self {
        FlightOutcome::Failed(FlightFailure::Actuator(e))
    }
}

/// Everything known once the flight thread is done.
#[derive(Clone, Debug)]
pub struct FlightReport {
    pub outcome: FlightOutcome,
    pub landing: LandingStatus,
    /// Ordered telemetry history
    pub history: Vec<TelemetrySample>,
    /// Samples a full consumer queue had to drop
    pub dropped_samples: u64,
}

/// Runs one flight attempt on an exclusively owned vehicle link.
pub struct FlightExecutor {
    actuator: Box<dyn Actuator>,
    config: FlightConfig,
    cancel: CancellationToken,
    channel: TelemetryChannel,
    history: SharedHistory,
    feedback: SharedFeedback,
}

impl FlightExecutor {
    pub fn new(
        actuator: Box<dyn Actuator>,
        config: FlightConfig,
        cancel: CancellationToken,
        channel: TelemetryChannel,
    ) -> Self {
        Self {
            actuator,
            config,
            cancel,
            channel,
            history: Arc::new(RwLock::new(Vec::new())),
            feedback: Arc::new(RwLock::new(None)),
        }
    }

    /// Live view of the telemetry history.
    pub fn history(&self) -> SharedHistory {
        Arc::clone(&self.history)
    }

    /// Live view of the feedback poller's latest reading.
    pub fn feedback(&self) -> SharedFeedback {
        Arc::clone(&self.feedback)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fly `path`, blocking until the vehicle has landed or the flight was refused.
    pub fn execute(&mut self, path: &[Point2D]) -> FlightReport {
        let started = Instant::now();
        let mut recorder = Recorder {
            channel: &self.channel,
            history: &self.history,
            started,
        };
        let config = &self.config;
        let cancel = &self.cancel;
        let actuator = self.actuator.as_mut();

        if path.is_empty() {
            tracing::warn!("Empty flight plan, nothing to do");
            cancel.cancel();
            return report(FlightOutcome::Completed, LandingStatus::NotAirborne, &recorder);
        }

        if let Err(outcome) = preflight(actuator, config, cancel) {
            cancel.cancel();
            tracing::warn!("Flight not started: {}", outcome.reason());
            return report(outcome, LandingStatus::NotAirborne, &recorder);
        }

        let mut airborne = match LandingObligation::takeoff(actuator) {
            Ok(obligation) => obligation,
            Err(e) => {
                tracing::error!("Takeoff failed: {}", e);
                cancel.cancel();
                return report(e.into(), LandingStatus::NotAirborne, &recorder);
            }
        };

        let mut poller = None;
        let outcome = match fly(
            &mut airborne,
            path,
            config,
            cancel,
            &mut recorder,
            &self.feedback,
            &mut poller,
        ) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Flight aborted: {}", e);
                e.into()
            }
        };

        // Shutdown sequence runs on every exit path
        cancel.cancel();
        if let Some(poller) = poller {
            poller.stop_and_join(config.poller_join_timeout);
        }
        let landing = airborne.land();

        tracing::info!("Flight finished: {}", outcome.reason());
        report(outcome, landing, &recorder)
    }
}

/// Connect and check the battery. Nothing is commanded on failure.
fn preflight(
    actuator: &mut dyn Actuator,
    config: &FlightConfig,
    cancel: &CancellationToken,
) -> Result<(), FlightOutcome> {
    actuator.connect()?;

    let battery = actuator.battery()?;
    tracing::info!("Battery: {}%", battery);
    if battery < config.min_battery_percent {
        return Err(FlightOutcome::Failed(FlightFailure::LowBattery {
            percent: battery,
        }));
    }

    if cancel.is_cancelled() {
        return Err(FlightOutcome::Cancelled);
    }
    Ok(())
}

/// Airborne part of the flight. `Err` means an unrecoverable link failure.
fn fly(
    airborne: &mut LandingObligation<'_>,
    path: &[Point2D],
    config: &FlightConfig,
    cancel: &CancellationToken,
    recorder: &mut Recorder<'_>,
    feedback: &SharedFeedback,
    poller: &mut Option<FeedbackPoller>,
) -> ActuatorResult<FlightOutcome> {
    let actuator = airborne.actuator();
    std::thread::sleep(config.takeoff_settle);

    // Takeoff blocks for seconds on a real vehicle
    if cancel.is_cancelled() {
        tracing::info!("Flight cancelled during takeoff");
        return Ok(FlightOutcome::Cancelled);
    }

    let height = actuator.height()?;
    let excess = height - config.target_altitude;
    if excess >= config.min_altitude_adjust {
        let descent = config.limits.move_distance(excess);
        tracing::info!(
            "Descending {}cm to target altitude {:.0}cm",
            descent,
            config.target_altitude
        );
        actuator.move_down(descent)?;
        std::thread::sleep(config.takeoff_settle);
    }

    if let Some(probe) = actuator.state_probe() {
        *poller = FeedbackPoller::spawn(
            probe,
            config.feedback_interval,
            cancel.clone(),
            Arc::clone(feedback),
        );
    }

    let z = read_or(actuator.height(), height, "height");
    let yaw = read_or(actuator.yaw(), 0.0, "yaw");
    let (roll, pitch) = read_or(actuator.roll_pitch(), (0.0, 0.0), "roll/pitch");
    let mut odometry = DeadReckoning::new(path[0], z, yaw);
    recorder.record(&odometry, roll, pitch, 0.0, 0);

    for (i, pair) in path.windows(2).enumerate() {
        if cancel.is_cancelled() {
            tracing::info!("Flight cancelled before segment {}", i + 1);
            return Ok(FlightOutcome::Cancelled);
        }
        fly_segment(
            actuator,
            pair[0],
            pair[1],
            i + 1,
            config,
            cancel,
            &mut odometry,
            recorder,
        )?;
    }

    if cancel.is_cancelled() {
        Ok(FlightOutcome::Cancelled)
    } else {
        tracing::info!("Flight plan complete");
        Ok(FlightOutcome::Completed)
    }
}

#[allow(clippy::too_many_arguments)]
fn fly_segment(
    actuator: &mut dyn Actuator,
    p1: Point2D,
    p2: Point2D,
    waypoint_index: usize,
    config: &FlightConfig,
    cancel: &CancellationToken,
    odometry: &mut DeadReckoning,
    recorder: &mut Recorder<'_>,
) -> ActuatorResult<()> {
    let segment = SegmentPlan::between(p1, p2);

    // Fresh yaw from the vehicle corrects drift from the previous segment
    let current_yaw = read_or(actuator.yaw(), odometry.pose().yaw_deg, "yaw");
    let turn = turn_between(segment.heading_deg, current_yaw);

    tracing::debug!(
        "Segment {}: ({:.1}, {:.1}) -> ({:.1}, {:.1}), {:.1}cm, heading {:.1}°, turn {:.1}°",
        waypoint_index,
        p1.x,
        p1.y,
        p2.x,
        p2.y,
        segment.distance,
        segment.heading_deg,
        turn
    );

    let mut expected_yaw = current_yaw;
    if let Some(command) = config.limits.turn_command(turn) {
        if cancel.is_cancelled() {
            return Ok(());
        }
        match command {
            TurnCommand::Clockwise(deg) => actuator.rotate_clockwise(deg)?,
            TurnCommand::CounterClockwise(deg) => actuator.rotate_counter_clockwise(deg)?,
        }
        expected_yaw += command.signed_degrees() as f32;
        std::thread::sleep(config.rotation_settle);
    }

    let mut travelled = 0.0;
    let mut speed = 0.0;
    if segment.distance > 0.0 && !cancel.is_cancelled() {
        let step = config.limits.move_distance(segment.distance);
        let move_start = Instant::now();
        actuator.move_forward(step)?;
        let elapsed = move_start.elapsed().as_secs_f32();
        if elapsed > 0.0 {
            speed = segment.distance / elapsed;
        }
        travelled = segment.distance;
        std::thread::sleep(config.move_settle);
    }

    let yaw = read_or(actuator.yaw(), expected_yaw, "yaw");
    odometry.advance(travelled, yaw);
    odometry.set_height(read_or(actuator.height(), odometry.pose().z, "height"));
    let (roll, pitch) = read_or(actuator.roll_pitch(), (0.0, 0.0), "roll/pitch");

    recorder.record(odometry, roll, pitch, speed, waypoint_index);
    Ok(())
}

/// Keep the previous estimate when a sensor read fails mid-flight.
fn read_or<T>(reading: ActuatorResult<T>, fallback: T, what: &str) -> T {
    match reading {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}; keeping previous estimate", what, e);
            fallback
        }
    }
}

/// Appends samples to the history and fans them out to the channel.
struct Recorder<'a> {
    channel: &'a TelemetryChannel,
    history: &'a SharedHistory,
    started: Instant,
}

impl Recorder<'_> {
    fn record(
        &mut self,
        odometry: &DeadReckoning,
        roll: f32,
        pitch: f32,
        speed: f32,
        waypoint_index: usize,
    ) {
        let pose = odometry.pose();
        let sample = TelemetrySample {
            time_s: self.started.elapsed().as_secs_f32(),
            x: pose.x,
            y: pose.y,
            z: pose.z,
            roll,
            pitch,
            yaw: pose.yaw_deg,
            speed,
            waypoint_index,
        };

        self.history.write().push(sample);

        let subscribers = self.channel.subscriber_count();
        let delivered = self.channel.publish(&sample);
        if delivered < subscribers {
            tracing::debug!(
                "Telemetry sample {} delivered to {}/{} consumers",
                waypoint_index,
                delivered,
                subscribers
            );
        }

        tracing::info!(
            "Pos (x,y)=({:.1},{:.1}) | z={:.0}cm | yaw={:.0}° | v={:.1}cm/s | wp {}",
            sample.x,
            sample.y,
            sample.z,
            sample.yaw,
            sample.speed,
            waypoint_index
        );
    }
}

fn report(outcome: FlightOutcome, landing: LandingStatus, recorder: &Recorder<'_>) -> FlightReport {
    FlightReport {
        outcome,
        landing,
        history: recorder.history.read().clone(),
        dropped_samples: recorder.channel.dropped(),
    }
}
