//! Headless planar arena
//!
//! Obstacles are axis-aligned boxes on the ground plane with unbounded
//! height. Checkpoints are trigger spheres. Off the floor rectangle the car
//! sinks at a constant speed, which eventually trips the fall check.

use std::collections::BTreeSet;

use nalgebra::{distance, Point3, Vector3};

use racer_rl_core::Result;

use crate::checkpoint::{Checkpoint, CheckpointCourse};
use crate::config::{CourseConfig, FloorConfig};
use crate::geometry::Pose;
use crate::world::{ColliderId, ContactEvent, LayerMask, RayOracle, Tag};

const PARALLEL_EPSILON: f64 = 1e-12;

/// Solid axis-aligned box
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    /// Collider identity
    pub id: ColliderId,
    /// Gameplay tag
    pub tag: Tag,
    /// Physics layer
    pub layer: u8,
    /// Minimum corner `[x, z]`
    pub min: [f64; 2],
    /// Maximum corner `[x, z]`
    pub max: [f64; 2],
}

impl Obstacle {
    fn contains(&self, x: f64, z: f64) -> bool {
        (self.min[0]..=self.max[0]).contains(&x) && (self.min[1]..=self.max[1]).contains(&z)
    }

    fn overlaps_circle(&self, x: f64, z: f64, radius: f64) -> bool {
        let dx = x - x.clamp(self.min[0], self.max[0]);
        let dz = z - z.clamp(self.min[1], self.max[1]);
        dx * dx + dz * dz <= radius * radius
    }

    /// Slab test in the XZ plane; `t` is measured along `direction`.
    fn ray_distance(&self, origin: &Point3<f64>, direction: &Vector3<f64>) -> Option<f64> {
        if self.contains(origin.x, origin.z) {
            return None;
        }
        let mut t_min = 0.0_f64;
        let mut t_max = f64::INFINITY;
        let axes = [
            (origin.x, direction.x, self.min[0], self.max[0]),
            (origin.z, direction.z, self.min[1], self.max[1]),
        ];
        for (o, d, lo, hi) in axes {
            if d.abs() < PARALLEL_EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let (mut t1, mut t2) = ((lo - o) / d, (hi - o) / d);
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

/// Checkpoint trigger sphere
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerZone {
    /// Collider identity
    pub id: ColliderId,
    /// Centre
    pub center: Point3<f64>,
    /// Radius
    pub radius: f64,
}

/// Headless world: ray oracle, contact source and floor
#[derive(Debug, Clone)]
pub struct Arena {
    obstacles: Vec<Obstacle>,
    triggers: Vec<TriggerZone>,
    floor: FloorConfig,
    car_radius: f64,
    fall_speed: f64,
    touching: BTreeSet<ColliderId>,
}

impl Arena {
    /// Build an arena from a course layout
    #[must_use]
    pub fn new(course: &CourseConfig) -> Self {
        // Checkpoints take ids 0..n; obstacles follow so the two never share one.
        let first_obstacle_id = course.checkpoints.len() as u64;
        let obstacles = course
            .obstacles
            .iter()
            .zip(first_obstacle_id..)
            .map(|(o, id)| Obstacle {
                id: ColliderId(id),
                tag: o.tag,
                layer: o.layer,
                min: [o.min[0].min(o.max[0]), o.min[1].min(o.max[1])],
                max: [o.min[0].max(o.max[0]), o.min[1].max(o.max[1])],
            })
            .collect();
        let triggers = course
            .checkpoints
            .iter()
            .zip(0u64..)
            .map(|(c, id)| TriggerZone {
                id: ColliderId(id),
                center: Point3::from(c.position),
                radius: c.radius,
            })
            .collect();

        Self {
            obstacles,
            triggers,
            floor: course.floor,
            car_radius: course.car_radius,
            fall_speed: course.fall_speed,
            touching: BTreeSet::new(),
        }
    }

    /// The checkpoint sequence formed by the trigger zones
    pub fn checkpoint_course(&self) -> Result<CheckpointCourse> {
        CheckpointCourse::new(
            self.triggers
                .iter()
                .map(|t| Checkpoint {
                    id: t.id,
                    position: t.center,
                })
                .collect(),
        )
    }

    /// Solid obstacles
    #[must_use]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Whether the ground under `position` is drivable
    #[must_use]
    pub fn on_floor(&self, position: &Point3<f64>) -> bool {
        (self.floor.min[0]..=self.floor.max[0]).contains(&position.x)
            && (self.floor.min[1]..=self.floor.max[1]).contains(&position.z)
    }

    /// Apply gravity to a pose that has left the floor
    #[must_use]
    pub fn settle(&self, mut pose: Pose, dt: f64) -> Pose {
        if !self.on_floor(&pose.position) {
            pose.position.y -= self.fall_speed * dt;
        }
        pose
    }

    /// Forget what the car was touching, e.g. after a teleport
    pub fn reset_contacts(&mut self) {
        self.touching.clear();
    }

    /// Contacts that began at `position`: collisions first, then triggers.
    /// A contact is reported once until the car leaves and re-enters.
    pub fn contacts(&mut self, position: &Point3<f64>) -> Vec<ContactEvent> {
        let collisions = self
            .obstacles
            .iter()
            .filter(|o| o.overlaps_circle(position.x, position.z, self.car_radius))
            .map(|o| ContactEvent::collision(o.id, o.tag));
        let triggers = self
            .triggers
            .iter()
            .filter(|t| distance(position, &t.center) <= t.radius)
            .map(|t| ContactEvent::trigger(t.id, Tag::Checkpoint));
        let current: Vec<ContactEvent> = collisions.chain(triggers).collect();

        let entered = current
            .iter()
            .filter(|event| !self.touching.contains(&event.other.id))
            .copied()
            .collect();
        self.touching = current.iter().map(|event| event.other.id).collect();
        entered
    }
}

impl RayOracle for Arena {
    fn cast(
        &self,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
        max_distance: f64,
        mask: LayerMask,
    ) -> Option<f64> {
        self.obstacles
            .iter()
            .filter(|o| mask.contains(o.layer))
            .filter_map(|o| o.ray_distance(origin, direction))
            .filter(|t| *t <= max_distance)
            .min_by(f64::total_cmp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CheckpointConfig, ObstacleConfig, PoseConfig};
    use approx::assert_relative_eq;

    fn course() -> CourseConfig {
        CourseConfig {
            start: PoseConfig {
                position: [0.0, 0.0, 0.0],
                yaw: 0.0,
            },
            checkpoints: vec![CheckpointConfig {
                position: [0.0, 0.0, 10.0],
                radius: 2.0,
            }],
            obstacles: vec![
                ObstacleConfig {
                    tag: Tag::Wall,
                    layer: 0,
                    min: [4.0, -50.0],
                    max: [5.0, 50.0],
                },
                ObstacleConfig {
                    tag: Tag::Cube,
                    layer: 1,
                    min: [-1.0, 20.0],
                    max: [1.0, 22.0],
                },
            ],
            floor: FloorConfig {
                min: [-10.0, -10.0],
                max: [10.0, 40.0],
            },
            car_radius: 1.0,
            fall_speed: 10.0,
        }
    }

    #[test]
    fn test_ray_hits_nearest_obstacle() {
        let arena = Arena::new(&course());
        let hit = arena.cast(&Point3::origin(), &Vector3::x(), 10.0, LayerMask::ALL);
        assert_relative_eq!(hit.unwrap(), 4.0);

        assert!(arena.cast(&Point3::origin(), &-Vector3::x(), 10.0, LayerMask::ALL).is_none());
        assert!(arena.cast(&Point3::origin(), &Vector3::z(), 10.0, LayerMask::ALL).is_none());
        let far = arena.cast(&Point3::origin(), &Vector3::z(), 30.0, LayerMask::ALL);
        assert_relative_eq!(far.unwrap(), 20.0);
    }

    #[test]
    fn test_ray_respects_layer_mask() {
        let arena = Arena::new(&course());
        assert!(arena.cast(&Point3::origin(), &Vector3::z(), 30.0, LayerMask::layer(0)).is_none());
        assert!(arena.cast(&Point3::origin(), &Vector3::x(), 30.0, LayerMask::layer(1)).is_none());
    }

    #[test]
    fn test_contacts_fire_on_enter_only() {
        let mut arena = Arena::new(&course());
        assert!(arena.contacts(&Point3::origin()).is_empty());

        let near_wall = Point3::new(3.5, 0.0, 0.0);
        let events = arena.contacts(&near_wall);
        assert_eq!(events, vec![ContactEvent::collision(ColliderId(1), Tag::Wall)]);
        assert!(arena.contacts(&near_wall).is_empty());

        arena.contacts(&Point3::origin());
        assert_eq!(arena.contacts(&near_wall).len(), 1);
    }

    #[test]
    fn test_checkpoint_trigger() {
        let mut arena = Arena::new(&course());
        let events = arena.contacts(&Point3::new(0.0, 0.0, 9.0));
        assert_eq!(events, vec![ContactEvent::trigger(ColliderId(0), Tag::Checkpoint)]);

        let course = arena.checkpoint_course().unwrap();
        assert_eq!(course.index_of(ColliderId(0)), Some(0));
    }

    #[test]
    fn test_settle_drops_off_floor() {
        let arena = Arena::new(&course());
        let on = arena.settle(Pose::new(Point3::origin(), 0.0), 0.5);
        assert_relative_eq!(on.position.y, 0.0);
        let off = arena.settle(Pose::new(Point3::new(20.0, 0.0, 0.0), 0.0), 0.5);
        assert_relative_eq!(off.position.y, -5.0);
    }

    #[test]
    fn test_obstacle_ids_follow_large_checkpoint_count() {
        let mut config = course();
        config.checkpoints = (0..1001)
            .map(|i| CheckpointConfig {
                position: [0.0, 0.0, f64::from(i) * 100.0],
                radius: 2.0,
            })
            .collect();
        config.checkpoints[1000].position = [0.0, 0.0, 0.0];
        config.obstacles = vec![ObstacleConfig {
            tag: Tag::Untagged,
            layer: 0,
            min: [3.0, 3.0],
            max: [5.0, 5.0],
        }];
        config.floor.max = [10.0, 200_000.0];
        let mut arena = Arena::new(&config);
        assert_eq!(arena.obstacles()[0].id, ColliderId(1001));

        let beside_box = Point3::new(4.0, 0.0, 4.5);
        assert_eq!(
            arena.contacts(&beside_box),
            vec![ContactEvent::collision(ColliderId(1001), Tag::Untagged)]
        );
        // Checkpoint 0 also sits at the origin.
        assert_eq!(
            arena.contacts(&Point3::origin()),
            vec![
                ContactEvent::trigger(ColliderId(0), Tag::Checkpoint),
                ContactEvent::trigger(ColliderId(1000), Tag::Checkpoint),
            ]
        );
        assert!(arena.checkpoint_course().is_ok());
    }
}
