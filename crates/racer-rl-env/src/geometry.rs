//! Planar pose helpers
//!
//! The world is Y-up. Heading is a yaw in degrees about the vertical axis,
//! with yaw 0 facing +Z and positive yaw turning toward +X.

use nalgebra::{Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Directions shorter than this normalise to zero.
const NORMALIZE_EPSILON: f64 = 1e-5;

/// Position and heading of a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World position
    pub position: Point3<f64>,
    /// Heading about the vertical axis, in degrees
    pub yaw: f64,
}

impl Pose {
    /// Create a pose
    #[must_use]
    pub fn new(position: Point3<f64>, yaw: f64) -> Self {
        Self { position, yaw }
    }

    /// Unit vector the body is facing
    #[must_use]
    pub fn forward(&self) -> Vector3<f64> {
        yaw_direction(self.yaw)
    }

    /// Point `forward` units ahead of and `up` units above the body
    #[must_use]
    pub fn local_point(&self, forward: f64, up: f64) -> Point3<f64> {
        self.position + self.forward() * forward + Vector3::y() * up
    }
}

/// Unit direction for a heading in degrees
#[must_use]
pub fn yaw_direction(yaw: f64) -> Vector3<f64> {
    rotate_yaw(&Vector3::z(), yaw)
}

/// Rotate a direction about the vertical axis by `degrees`
#[must_use]
pub fn rotate_yaw(direction: &Vector3<f64>, degrees: f64) -> Vector3<f64> {
    Rotation3::from_axis_angle(&Vector3::y_axis(), degrees.to_radians()) * direction
}

/// Wrap an angle in degrees into `(-180, 180]`
#[must_use]
pub fn wrap_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Normalise a vector, returning zero for degenerate input
#[must_use]
pub fn normalize_or_zero(v: &Vector3<f64>) -> Vector3<f64> {
    v.try_normalize(NORMALIZE_EPSILON).unwrap_or_else(Vector3::zeros)
}

/// Signed angle in degrees from `from` to `to`, measured about `axis`.
///
/// Positive when `to` lies clockwise of `from` looking down `axis`; a zero
/// cross product counts as positive.
#[must_use]
pub fn signed_angle(from: &Vector3<f64>, to: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    let unsigned = from.angle(to).to_degrees();
    let sign = if axis.dot(&from.cross(to)) < 0.0 { -1.0 } else { 1.0 };
    unsigned * sign
}
