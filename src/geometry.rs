//! Planar geometry and collision tests for the arena.
//!
//! Coordinates are centimeters. Headings follow the flight convention used
//! by the executor: 0 points along +y ("north") and angles grow clockwise,
//! so a heading is `atan2(dx, dy)`.

use serde::Deserialize;

/// Default number of intervals used when sampling a segment for collisions.
pub const DEFAULT_EDGE_SAMPLES: usize = 100;

/// A planar coordinate in centimeters.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(from = "[f32; 2]")]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point2D) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Heading from this point toward `other`, in radians (north = 0, clockwise positive).
    #[inline]
    pub fn heading_to(&self, other: &Point2D) -> f32 {
        (other.x - self.x).atan2(other.y - self.y)
    }

    /// Point reached by travelling `distance` along `heading` (radians).
    #[inline]
    pub fn advance(&self, heading: f32, distance: f32) -> Point2D {
        Point2D::new(
            self.x + distance * heading.sin(),
            self.y + distance * heading.cos(),
        )
    }

    /// Linear interpolation toward `other` (`t = 0` is self, `t = 1` is other).
    #[inline]
    pub fn lerp(&self, other: &Point2D, t: f32) -> Point2D {
        Point2D::new(
            self.x + t * (other.x - self.x),
            self.y + t * (other.y - self.y),
        )
    }
}

impl From<[f32; 2]> for Point2D {
    fn from(v: [f32; 2]) -> Self {
        Point2D::new(v[0], v[1])
    }
}

impl From<(f32, f32)> for Point2D {
    fn from((x, y): (f32, f32)) -> Self {
        Point2D::new(x, y)
    }
}

/// Axis-aligned rectangular obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Obstacle {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment: the left/top edges belong to the rectangle,
    /// the right/bottom edges do not.
    #[inline]
    pub fn contains(&self, p: Point2D) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }
}

/// True if `p` lies outside every obstacle.
pub fn is_free(p: Point2D, obstacles: &[Obstacle]) -> bool {
    !obstacles.iter().any(|obs| obs.contains(p))
}

/// Dense-sampling segment test.
///
/// Checks `samples + 1` evenly spaced points from `a` to `b`, both ends
/// included, against every obstacle.
pub fn segment_collides(a: Point2D, b: Point2D, obstacles: &[Obstacle], samples: usize) -> bool {
    let samples = samples.max(1);
    obstacles.iter().any(|obs| {
        (0..=samples).any(|i| {
            let t = i as f32 / samples as f32;
            obs.contains(a.lerp(&b, t))
        })
    })
}
