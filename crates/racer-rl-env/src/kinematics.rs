//! Drive actions and the kinematic action applier

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use racer_rl_core::{Action, ActionSpace, RLError, Result};

use crate::geometry::{wrap_degrees, Pose};

/// Two-axis drive command
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveAction {
    /// Forward (+) / reverse (-) input
    pub throttle: f64,
    /// Right (+) / left (-) steering input
    pub turn: f64,
}

impl DriveAction {
    /// Neither accelerate nor steer
    pub const IDLE: Self = Self { throttle: 0.0, turn: 0.0 };

    /// Create a drive action
    #[must_use]
    pub fn new(throttle: f64, turn: f64) -> Self {
        Self { throttle, turn }
    }

    /// Both axes clamped to `[-1, 1]`; NaN becomes `0`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            throttle: clamp_unit(self.throttle),
            turn: clamp_unit(self.turn),
        }
    }

    /// Build from a raw continuous action buffer
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        match values {
            [throttle, turn] => Ok(Self::new(*throttle, *turn)),
            _ => Err(RLError::DimensionMismatch {
                expected: 2,
                actual: values.len(),
            }),
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

impl Action for DriveAction {
    fn to_vec(&self) -> Vec<f64> {
        vec![self.throttle, self.turn]
    }
}

/// The `[-1, 1] x [-1, 1]` drive action space
#[derive(Debug, Clone, Copy, Default)]
pub struct DriveSpace;

impl ActionSpace for DriveSpace {
    type Action = DriveAction;

    fn sample(&self) -> Self::Action {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        DriveAction::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0))
    }

    fn contains(&self, action: &Self::Action) -> bool {
        (-1.0..=1.0).contains(&action.throttle) && (-1.0..=1.0).contains(&action.turn)
    }

    fn dim(&self) -> Option<usize> {
        Some(2)
    }
}

/// Speeds used by the action applier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Distance per second at full throttle; also the speed normaliser
    pub move_speed: f64,
    /// Degrees per second at full steering
    pub turn_speed: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 15.0,
            turn_speed: 45.0,
        }
    }
}

impl MotionConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.move_speed.is_finite() && self.move_speed > 0.0) {
            return Err(RLError::Configuration(format!(
                "move_speed must be positive, got {}",
                self.move_speed
            )));
        }
        if !self.turn_speed.is_finite() {
            return Err(RLError::Configuration("turn_speed must be finite".to_string()));
        }
        Ok(())
    }
}

/// Integrate one tick of motion.
///
/// Translation uses the heading held at the start of the tick, then the
/// heading is rotated and wrapped into `(-180, 180]`. Mass and inertia play
/// no part.
#[must_use]
pub fn integrate(pose: &Pose, action: DriveAction, motion: &MotionConfig, dt: f64) -> Pose {
    let action = action.clamped();
    let position = pose.position + pose.forward() * (action.throttle * motion.move_speed * dt);
    let yaw = pose.yaw + action.turn * motion.turn_speed * dt;
    Pose::new(position, wrap_degrees(yaw))
}

/// Something that holds a pose and can be moved
pub trait MotionBody: Send + Sync {
    /// Current pose
    fn pose(&self) -> Pose;

    /// Current linear speed
    fn speed(&self) -> f64;

    /// Move to `pose` over `dt` seconds
    fn move_to(&mut self, pose: Pose, dt: f64);

    /// Place at `pose` with zero velocity
    fn teleport(&mut self, pose: Pose);
}

/// Body whose velocity is the last displacement over the last tick
#[derive(Debug, Clone)]
pub struct KinematicBody {
    pose: Pose,
    velocity: Vector3<f64>,
}

impl KinematicBody {
    /// Create a body at rest
    #[must_use]
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            velocity: Vector3::zeros(),
        }
    }

    /// Last computed velocity
    #[must_use]
    pub fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }
}

impl MotionBody for KinematicBody {
    fn pose(&self) -> Pose {
        self.pose
    }

    fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    fn move_to(&mut self, pose: Pose, dt: f64) {
        self.velocity = if dt > 0.0 {
            (pose.position - self.pose.position) / dt
        } else {
            Vector3::zeros()
        };
        self.pose = pose;
    }

    fn teleport(&mut self, pose: Pose) {
        self.pose = pose;
        self.velocity = Vector3::zeros();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_clamps_out_of_range_inputs() {
        let action = DriveAction::new(3.0, -7.5).clamped();
        assert_eq!(action, DriveAction::new(1.0, -1.0));
        assert_eq!(DriveAction::new(f64::NAN, 0.25).clamped(), DriveAction::new(0.0, 0.25));
    }

    #[test]
    fn test_integrate_moves_along_heading() {
        let pose = Pose::new(Point3::origin(), 0.0);
        let motion = MotionConfig::default();
        let next = integrate(&pose, DriveAction::new(1.0, 0.0), &motion, 0.02);
        assert_relative_eq!(next.position, Point3::new(0.0, 0.0, 0.3), epsilon = 1e-12);
        assert_relative_eq!(next.yaw, 0.0);
    }

    #[test]
    fn test_integrate_clamps_before_scaling() {
        let pose = Pose::new(Point3::origin(), 90.0);
        let motion = MotionConfig { move_speed: 10.0, turn_speed: 90.0 };
        let next = integrate(&pose, DriveAction::new(5.0, -5.0), &motion, 0.5);
        assert_relative_eq!(next.position, Point3::new(5.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(next.yaw, 45.0);
    }

    #[test]
    fn test_integrate_wraps_heading() {
        let pose = Pose::new(Point3::origin(), 179.0);
        let next = integrate(&pose, DriveAction::new(0.0, 1.0), &MotionConfig::default(), 0.1);
        assert_relative_eq!(next.yaw, -176.5, epsilon = 1e-9);
    }

    #[test]
    fn test_from_slice_requires_two_values() {
        assert_eq!(DriveAction::from_slice(&[0.5, -0.5]).unwrap(), DriveAction::new(0.5, -0.5));
        assert!(matches!(
            DriveAction::from_slice(&[1.0]),
            Err(RLError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_kinematic_body_speed() {
        let mut body = KinematicBody::new(Pose::new(Point3::origin(), 0.0));
        body.move_to(Pose::new(Point3::new(0.0, 0.0, 0.3), 0.0), 0.02);
        assert_relative_eq!(body.speed(), 15.0, epsilon = 1e-9);

        body.teleport(Pose::new(Point3::new(5.0, 0.0, 5.0), 10.0));
        assert_relative_eq!(body.speed(), 0.0);
    }

    #[test]
    fn test_drive_space_samples() {
        let space = DriveSpace;
        for _ in 0..50 {
            assert!(space.contains(&space.sample()));
        }
        assert!(!space.contains(&DriveAction::new(1.5, 0.0)));
    }
}
