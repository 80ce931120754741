//! Conversion of waypoint pairs into bounded vehicle commands.

use crate::geometry::Point2D;
use crate::utils::normalize_degrees;

/// Device limits applied when turning segments into commands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommandLimits {
    /// Shortest forward move the vehicle accepts (cm)
    pub min_move_cm: u32,
    /// Longest single forward move (cm)
    pub max_move_cm: u32,
    /// Turns at or below this magnitude are skipped (degrees)
    pub turn_deadband_deg: f32,
}

impl Default for CommandLimits {
    fn default() -> Self {
        Self {
            min_move_cm: 20,
            max_move_cm: 500,
            turn_deadband_deg: 5.0,
        }
    }
}

/// Rotation to issue before a forward move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnCommand {
    Clockwise(u32),
    CounterClockwise(u32),
}

impl TurnCommand {
    /// Signed angle in degrees (clockwise positive).
    pub fn signed_degrees(&self) -> i64 {
        match *self {
            TurnCommand::Clockwise(d) => d as i64,
            TurnCommand::CounterClockwise(d) => -(d as i64),
        }
    }
}

/// Geometry of one path segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentPlan {
    /// Straight-line length (cm)
    pub distance: f32,
    /// Heading from the first to the second waypoint (degrees)
    pub heading_deg: f32,
}

impl SegmentPlan {
    pub fn between(p1: Point2D, p2: Point2D) -> Self {
        Self {
            distance: p1.distance(&p2),
            heading_deg: p1.heading_to(&p2).to_degrees(),
        }
    }
}

impl CommandLimits {
    /// Forward distance to command for a segment of `distance` cm.
    pub fn move_distance(&self, distance: f32) -> u32 {
        let rounded = distance.round().max(0.0) as u32;
        rounded.clamp(self.min_move_cm, self.max_move_cm.max(self.min_move_cm))
    }

    /// Rotation for a signed turn in degrees, or `None` inside the deadband.
    pub fn turn_command(&self, turn_deg: f32) -> Option<TurnCommand> {
        if turn_deg.abs() <= self.turn_deadband_deg {
            return None;
        }
        let degrees = turn_deg.abs().round() as u32;
        if turn_deg > 0.0 {
            Some(TurnCommand::Clockwise(degrees))
        } else {
            Some(TurnCommand::CounterClockwise(degrees))
        }
    }
}

/// Signed turn in (-180, 180] from `current_yaw` to `target_heading` (degrees).
pub fn turn_between(target_heading: f32, current_yaw: f32) -> f32 {
    normalize_degrees(target_heading - current_yaw)
}
