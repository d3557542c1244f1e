//! Planar geometry helpers shared by the resolver and the measurement step.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// 2D point in either normalized or pixel coordinates
pub type Point = Point2<f64>;

/// Euclidean distance between two points
#[must_use]
pub fn distance(a: &Point, b: &Point) -> f64 {
    nalgebra::distance(a, b)
}

/// Midpoint of the segment `a`-`b`
#[must_use]
pub fn midpoint(a: &Point, b: &Point) -> Point {
    nalgebra::center(a, b)
}

/// Absolute vertical separation of two points
#[must_use]
pub fn vertical_gap(a: &Point, b: &Point) -> f64 {
    (a.y - b.y).abs()
}

/// Map a normalized `[0, 1]` point to pixel coordinates of a `width` x `height` frame
#[must_use]
pub fn to_pixels(point: &Point, width: f64, height: f64) -> Point {
    Point::new(point.x * width, point.y * height)
}

/// Axis-aligned rectangle used to overlay the calibration reference on screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentBox {
    /// Box center in pixels
    pub center_x: f64,
    pub center_y: f64,
    /// Box extent in pixels
    pub width: f64,
    pub height: f64,
}

impl AlignmentBox {
    /// Build a box from its center point and extent
    #[must_use]
    pub fn centered(center: Point, width: f64, height: f64) -> Self {
        Self {
            center_x: center.x,
            center_y: center.y,
            width,
            height,
        }
    }

    /// Center point of the box
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }

    /// Top-left corner, as drawing APIs expect
    #[must_use]
    pub fn top_left(&self) -> Point {
        self.center() - Vector2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Bottom-right corner
    #[must_use]
    pub fn bottom_right(&self) -> Point {
        self.center() + Vector2::new(self.width / 2.0, self.height / 2.0)
    }
}
