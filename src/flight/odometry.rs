//! Dead-reckoning pose estimator
//!
//! The vehicle has no absolute position sensor. Position is estimated by
//! integrating each commanded forward move along the heading reported by
//! the vehicle.

use crate::geometry::Point2D;
use crate::utils::normalize_degrees;

/// Estimated vehicle pose.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    /// Position in arena coordinates (cm)
    pub x: f32,
    pub y: f32,
    /// Height (cm)
    pub z: f32,
    /// Heading in degrees, north = 0, clockwise positive
    pub yaw_deg: f32,
}

impl Pose {
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Dead-reckoning calculator
pub struct DeadReckoning {
    pose: Pose,
    /// Total distance integrated so far
    travelled: f32,
}

impl DeadReckoning {
    /// Start at `origin` with a measured height and heading.
    pub fn new(origin: Point2D, height: f32, yaw_deg: f32) -> Self {
        Self {
            pose: Pose {
                x: origin.x,
                y: origin.y,
                z: height,
                yaw_deg: normalize_degrees(yaw_deg),
            },
            travelled: 0.0,
        }
    }

    /// Integrate a straight move of `distance` cm at heading `yaw_deg`.
    ///
    /// # Returns
    /// The updated pose
    pub fn advance(&mut self, distance: f32, yaw_deg: f32) -> Pose {
        self.pose.yaw_deg = normalize_degrees(yaw_deg);
        if distance > 0.0 {
            let rad = self.pose.yaw_deg.to_radians();
            self.pose.x += distance * rad.sin();
            self.pose.y += distance * rad.cos();
            self.travelled += distance;
        }
        self.pose
    }

    pub fn set_height(&mut self, height: f32) {
        self.pose.z = height;
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn travelled(&self) -> f32 {
        self.travelled
    }
}
