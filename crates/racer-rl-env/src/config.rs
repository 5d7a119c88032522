//! Serializable configuration for agents, courses and runs

use std::path::Path;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use racer_rl_core::{RLError, Result};

use crate::geometry::Pose;
use crate::kinematics::MotionConfig;
use crate::sensors::SensorConfig;
use crate::world::Tag;

/// Reward shaping and termination constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Reward for reaching the expected checkpoint
    pub checkpoint_reward: f64,
    /// Penalty per tick once the car counts as stuck (subtracted)
    pub stationary_penalty: f64,
    /// Scale applied to the per-tick change in distance to the target
    pub progress_reward_multiplier: f64,
    /// Reward granted every tick
    pub living_reward: f64,
    /// Stationary ticks tolerated before the penalty applies
    pub stationary_threshold: u32,
    /// Displacement below which a tick counts as stationary
    pub stationary_epsilon: f64,
    /// Height below which the car has fallen off the track
    pub fall_height: f64,
    /// Reward for hitting a wall
    pub wall_penalty: f64,
    /// Reward for falling off the track
    pub fall_penalty: f64,
    /// Reward for hitting an obstacle cube
    pub cube_penalty: f64,
    /// Reward for touching a checkpoint ahead of the expected one
    pub wrong_checkpoint_penalty: f64,
    /// Reward for completing the course
    pub completion_bonus: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            checkpoint_reward: 0.5,
            stationary_penalty: 0.005,
            progress_reward_multiplier: 0.01,
            living_reward: 0.001,
            stationary_threshold: 30,
            stationary_epsilon: 0.01,
            fall_height: -20.0,
            wall_penalty: -1.0,
            fall_penalty: -1.0,
            cube_penalty: -0.5,
            wrong_checkpoint_penalty: -0.5,
            completion_bonus: 1.0,
        }
    }
}

/// Everything that parameterises one agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Action applier speeds
    pub motion: MotionConfig,
    /// Sensor layout
    pub sensors: SensorConfig,
    /// Reward constants
    pub rewards: RewardConfig,
}

impl AgentConfig {
    /// Reject values that would make observations or rewards meaningless
    pub fn validate(&self) -> Result<()> {
        self.motion.validate()?;
        self.sensors.validate()?;
        if !(self.rewards.stationary_epsilon.is_finite() && self.rewards.stationary_epsilon >= 0.0) {
            return Err(RLError::Configuration(
                "stationary_epsilon must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Start pose in a config file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseConfig {
    /// `[x, y, z]`
    pub position: [f64; 3],
    /// Heading in degrees
    pub yaw: f64,
}

impl From<PoseConfig> for Pose {
    fn from(config: PoseConfig) -> Self {
        Pose::new(Point3::from(config.position), config.yaw)
    }
}

/// Checkpoint trigger sphere
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Centre `[x, y, z]`
    pub position: [f64; 3],
    /// Trigger radius
    #[serde(default = "default_checkpoint_radius")]
    pub radius: f64,
}

fn default_checkpoint_radius() -> f64 {
    3.0
}

/// Axis-aligned solid box on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleConfig {
    /// Gameplay tag, usually `wall` or `cube`
    pub tag: Tag,
    /// Physics layer
    #[serde(default)]
    pub layer: u8,
    /// Minimum corner `[x, z]`
    pub min: [f64; 2],
    /// Maximum corner `[x, z]`
    pub max: [f64; 2],
}

/// Drivable ground rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloorConfig {
    /// Minimum corner `[x, z]`
    pub min: [f64; 2],
    /// Maximum corner `[x, z]`
    pub max: [f64; 2],
}

/// Layout of a headless course
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseConfig {
    /// Where every episode starts
    pub start: PoseConfig,
    /// Checkpoints in the order they must be visited
    pub checkpoints: Vec<CheckpointConfig>,
    /// Walls and cubes
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
    /// Ground the car can drive on
    pub floor: FloorConfig,
    /// Radius of the car's collision circle
    #[serde(default = "default_car_radius")]
    pub car_radius: f64,
    /// Drop speed when off the floor
    #[serde(default = "default_fall_speed")]
    pub fall_speed: f64,
}

fn default_car_radius() -> f64 {
    1.0
}

fn default_fall_speed() -> f64 {
    20.0
}

impl Default for CourseConfig {
    /// A straight run south from the standard start pose: three checkpoints
    /// between two side walls, an end wall and a cube off the racing line.
    fn default() -> Self {
        let [x, y, z] = [954.39, 8.27, 791.74];
        let wall = |min: [f64; 2], max: [f64; 2]| ObstacleConfig {
            tag: Tag::Wall,
            layer: 0,
            min,
            max,
        };

        Self {
            start: PoseConfig {
                position: [x, y, z],
                yaw: 180.0,
            },
            checkpoints: [20.0, 45.0, 70.0]
                .iter()
                .map(|d| CheckpointConfig {
                    position: [x, y, z - d],
                    radius: default_checkpoint_radius(),
                })
                .collect(),
            obstacles: vec![
                wall([x - 9.0, z - 95.0], [x - 8.0, z + 5.0]),
                wall([x + 8.0, z - 95.0], [x + 9.0, z + 5.0]),
                wall([x - 9.0, z - 96.0], [x + 9.0, z - 95.0]),
                ObstacleConfig {
                    tag: Tag::Cube,
                    layer: 1,
                    min: [x + 4.0, z - 34.0],
                    max: [x + 6.0, z - 32.0],
                },
            ],
            floor: FloorConfig {
                min: [x - 10.0, z - 100.0],
                max: [x + 10.0, z + 10.0],
            },
            car_radius: default_car_radius(),
            fall_speed: default_fall_speed(),
        }
    }
}

/// A complete run description: agent, course and tick settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RacerConfig {
    /// Agent parameters
    pub agent: AgentConfig,
    /// Course layout
    pub course: CourseConfig,
    /// Fixed tick duration in seconds
    pub tick_seconds: f64,
    /// Host step budget per episode
    pub max_steps: usize,
}

impl Default for RacerConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            course: CourseConfig::default(),
            tick_seconds: 0.02,
            max_steps: 5000,
        }
    }
}

impl RacerConfig {
    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Write as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.agent.validate()?;
        if !(self.tick_seconds.is_finite() && self.tick_seconds > 0.0) {
            return Err(RLError::Configuration(format!(
                "tick_seconds must be positive, got {}",
                self.tick_seconds
            )));
        }
        if self.course.checkpoints.is_empty() {
            return Err(RLError::Configuration(
                "course has no checkpoints".to_string(),
            ));
        }
        Ok(())
    }
}
