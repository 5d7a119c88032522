//! Observation builder: obstacle rays, navigation features and speed

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use racer_rl_core::{BoxObservationSpace, Observation, ObservationSpace, RLError, Result};

use crate::geometry::{normalize_or_zero, rotate_yaw, signed_angle, Pose};
use crate::hooks::EpisodeHooks;
use crate::world::{LayerMask, RayOracle};

/// Direction x, direction z, angle and distance to the target.
pub const NAVIGATION_SLOTS: usize = 4;

/// Sensor layout and normalisation constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Maximum ray length; hit distances are divided by it
    pub ray_length: f64,
    /// Ray headings relative to forward, in degrees
    pub ray_offsets: Vec<f64>,
    /// Ray origin distance ahead of the body
    pub ray_origin_forward: f64,
    /// Ray origin height above the body
    pub ray_origin_height: f64,
    /// Layers the rays can hit
    pub obstacle_mask: LayerMask,
    /// Divisor for the raw distance to the target
    pub distance_scale: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            ray_length: 10.0,
            ray_offsets: vec![0.0, 30.0, -30.0, 60.0, -60.0],
            ray_origin_forward: 2.0,
            ray_origin_height: 0.5,
            obstacle_mask: LayerMask::ALL,
            distance_scale: 50.0,
        }
    }
}

impl SensorConfig {
    /// Length of every observation built with this layout
    #[must_use]
    pub fn observation_len(&self) -> usize {
        self.ray_offsets.len() + NAVIGATION_SLOTS + 1
    }

    /// Bounds of the observation vector
    pub fn observation_space(&self) -> Result<CarObservationSpace> {
        let rays = self.ray_offsets.len();
        let mut low = vec![0.0; rays];
        let mut high = vec![1.0; rays];
        low.extend([-1.0, -1.0, -1.0, 0.0, 0.0]);
        high.extend([1.0, 1.0, 1.0, f64::INFINITY, f64::INFINITY]);
        Ok(CarObservationSpace {
            bounds: BoxObservationSpace::new(low, high, vec![self.observation_len()])?,
            rays,
        })
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.ray_length.is_finite() && self.ray_length > 0.0) {
            return Err(RLError::Configuration(format!(
                "ray_length must be positive, got {}",
                self.ray_length
            )));
        }
        if !(self.distance_scale.is_finite() && self.distance_scale > 0.0) {
            return Err(RLError::Configuration(format!(
                "distance_scale must be positive, got {}",
                self.distance_scale
            )));
        }
        if self.ray_offsets.is_empty() {
            return Err(RLError::Configuration("at least one sensor ray is required".to_string()));
        }
        Ok(())
    }
}

/// One tick's worth of sensor readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarObservation {
    /// Normalised hit distance per ray, `1.0` when nothing is hit
    pub rays: Vec<f64>,
    /// Direction x, direction z, signed angle / 180, distance / scale.
    /// All zero once the course is complete.
    pub navigation: [f64; NAVIGATION_SLOTS],
    /// Speed over the maximum speed
    pub speed: f64,
    /// Whether a checkpoint remains to be reached. Not part of the feature
    /// vector; the navigation slots are also zero when the car sits exactly
    /// on its target.
    #[serde(default = "default_has_target")]
    pub has_target: bool,
}

fn default_has_target() -> bool {
    true
}

impl CarObservation {
    /// Signed angle to the target, in `[-1, 1]`
    #[must_use]
    pub fn target_angle(&self) -> f64 {
        self.navigation[2]
    }

    /// Normalised distance to the target
    #[must_use]
    pub fn target_distance(&self) -> f64 {
        self.navigation[3]
    }

    /// Normalised reading of the forward-most ray
    #[must_use]
    pub fn front_clearance(&self) -> f64 {
        self.rays.first().copied().unwrap_or(1.0)
    }
}

impl Observation for CarObservation {
    fn to_vec(&self) -> Vec<f64> {
        let mut data = Vec::with_capacity(self.rays.len() + NAVIGATION_SLOTS + 1);
        data.extend_from_slice(&self.rays);
        data.extend_from_slice(&self.navigation);
        data.push(self.speed);
        data
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.rays.len() + NAVIGATION_SLOTS + 1]
    }
}

/// Bounds of [`CarObservation`] vectors for a given ray layout
#[derive(Debug, Clone)]
pub struct CarObservationSpace {
    bounds: BoxObservationSpace,
    rays: usize,
}

impl CarObservationSpace {
    /// Flat bounds, rays first
    #[must_use]
    pub fn bounds(&self) -> &BoxObservationSpace {
        &self.bounds
    }
}

impl ObservationSpace for CarObservationSpace {
    type Observation = CarObservation;

    fn sample(&self) -> Self::Observation {
        let data = self.bounds.sample_vec();
        let (rays, rest) = data.split_at(self.rays);
        CarObservation {
            rays: rays.to_vec(),
            navigation: [rest[0], rest[1], rest[2], rest[3]],
            speed: rest[NAVIGATION_SLOTS],
            has_target: true,
        }
    }

    fn contains(&self, obs: &Self::Observation) -> bool {
        obs.rays.len() == self.rays && self.bounds.contains_slice(&obs.to_vec())
    }

    fn shape(&self) -> Vec<usize> {
        self.bounds.shape.clone()
    }
}

/// Normalised ray readings around the current heading
pub fn cast_rays<O>(config: &SensorConfig, pose: &Pose, oracle: &O, hooks: &mut dyn EpisodeHooks) -> Vec<f64>
where
    O: RayOracle + ?Sized,
{
    let origin = pose.local_point(config.ray_origin_forward, config.ray_origin_height);
    let forward = pose.forward();

    config
        .ray_offsets
        .iter()
        .map(|offset| {
            let direction = rotate_yaw(&forward, *offset);
            let hit = oracle
                .cast(&origin, &direction, config.ray_length, config.obstacle_mask)
                .filter(|d| d.is_finite() && *d >= 0.0 && *d <= config.ray_length);
            match hit {
                Some(distance) => {
                    hooks.on_ray(&origin, &direction, distance, true);
                    distance / config.ray_length
                }
                None => {
                    hooks.on_ray(&origin, &direction, config.ray_length, false);
                    1.0
                }
            }
        })
        .collect()
}

/// Navigation features toward `target`, or zeros when there is none
#[must_use]
pub fn navigation_features(config: &SensorConfig, pose: &Pose, target: Option<&Point3<f64>>) -> [f64; NAVIGATION_SLOTS] {
    let Some(target) = target else {
        return [0.0; NAVIGATION_SLOTS];
    };

    let offset = target - pose.position;
    let distance = offset.norm();
    let direction = normalize_or_zero(&offset);
    let angle = signed_angle(&pose.forward(), &direction, &Vector3::y()) / 180.0;

    [direction.x, direction.z, angle, distance / config.distance_scale]
}

/// Build the full observation vector
pub fn build_observation<O>(
    config: &SensorConfig,
    pose: &Pose,
    speed: f64,
    max_speed: f64,
    target: Option<&Point3<f64>>,
    oracle: &O,
    hooks: &mut dyn EpisodeHooks,
) -> CarObservation
where
    O: RayOracle + ?Sized,
{
    let rays = cast_rays(config, pose, oracle, hooks);
    if let Some(target) = target {
        hooks.on_target(&pose.position, target);
    }

    CarObservation {
        rays,
        navigation: navigation_features(config, pose, target),
        speed: if max_speed > 0.0 { speed / max_speed } else { 0.0 },
        has_target: target.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoopHooks;
    use approx::assert_relative_eq;

    /// Reports a hit at a fixed distance for rays pointing into +x.
    struct RightWall {
        distance: f64,
    }

    impl RayOracle for RightWall {
        fn cast(&self, _origin: &Point3<f64>, direction: &Vector3<f64>, max: f64, _mask: LayerMask) -> Option<f64> {
            (direction.x > 0.1 && self.distance <= max).then_some(self.distance)
        }
    }

    fn pose() -> Pose {
        Pose::new(Point3::origin(), 0.0)
    }

    #[test]
    fn test_ray_readings_follow_offsets() {
        let config = SensorConfig::default();
        let rays = cast_rays(&config, &pose(), &RightWall { distance: 4.0 }, &mut NoopHooks);
        // forward, +30, -30, +60, -60
        assert_eq!(rays, vec![1.0, 0.4, 1.0, 0.4, 1.0]);
    }

    #[test]
    fn test_far_reports_are_misses() {
        let config = SensorConfig::default();
        let rays = cast_rays(&config, &pose(), &RightWall { distance: 25.0 }, &mut NoopHooks);
        assert!(rays.iter().all(|r| (*r - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_navigation_features_toward_target() {
        let config = SensorConfig::default();
        let target = Point3::new(10.0, 0.0, 0.0);
        let nav = navigation_features(&config, &pose(), Some(&target));
        assert_relative_eq!(nav[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(nav[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(nav[2], 0.5, epsilon = 1e-9);
        assert_relative_eq!(nav[3], 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_navigation_zeroed_without_target() {
        let config = SensorConfig::default();
        assert_eq!(navigation_features(&config, &pose(), None), [0.0; 4]);
    }

    #[test]
    fn test_observation_length_is_fixed() {
        let config = SensorConfig::default();
        let oracle = RightWall { distance: 1.0 };
        let target = Point3::new(0.0, 0.0, 30.0);
        let with_target = build_observation(&config, &pose(), 7.5, 15.0, Some(&target), &oracle, &mut NoopHooks);
        let without = build_observation(&config, &pose(), 7.5, 15.0, None, &oracle, &mut NoopHooks);

        assert_eq!(with_target.to_vec().len(), 10);
        assert_eq!(without.to_vec().len(), 10);
        assert_eq!(config.observation_len(), 10);
        assert_relative_eq!(without.speed, 0.5);
        let space = config.observation_space().unwrap();
        assert!(space.contains(&with_target));
        assert!(space.contains(&without));
        assert!(space.contains(&space.sample()));
        assert_eq!(space.shape(), vec![10]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SensorConfig {
            ray_length: 0.0,
            ..SensorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
