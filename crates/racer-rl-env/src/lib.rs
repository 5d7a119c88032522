//! Checkpoint course driving environment
//!
//! An agent drives a kinematic car through an ordered sequence of
//! checkpoints. This crate provides:
//! - Observation building from obstacle rays and target navigation
//! - The reward and episode state machine
//! - A headless arena and the [`Environment`] adapter around it
//! - Wrappers, scripted policies and keyboard-style manual control

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod arena;
pub mod checkpoint;
pub mod config;
pub mod controller;
pub mod env;
pub mod geometry;
pub mod hooks;
pub mod kinematics;
pub mod manual;
pub mod policies;
pub mod sensors;
pub mod world;
pub mod wrappers;

pub use arena::{Arena, Obstacle, TriggerZone};
pub use checkpoint::{Checkpoint, CheckpointCourse, CheckpointStatus};
pub use config::{
    AgentConfig, CheckpointConfig, CourseConfig, FloorConfig, ObstacleConfig, PoseConfig, RacerConfig,
    RewardConfig,
};
pub use controller::{EpisodeController, EpisodePhase, EpisodeState, TerminationReason};
pub use env::CheckpointCourseEnv;
pub use geometry::Pose;
pub use hooks::{EpisodeEvent, EpisodeHooks, NoopHooks, TracingHooks};
pub use kinematics::{DriveAction, DriveSpace, KinematicBody, MotionBody, MotionConfig};
pub use manual::{InputAxis, KeyState, ManualControl};
pub use policies::{random_drive_policy, ManualPolicy, RandomDrivePolicy, SeekCheckpointPolicy};
pub use sensors::{CarObservation, CarObservationSpace, SensorConfig};
pub use world::{ColliderId, ColliderRef, ContactEvent, ContactKind, LayerMask, RayOracle, Tag};
pub use wrappers::{RewardScale, RewardWrapper, TimeLimit};

// Re-export core types
pub use racer_rl_core::{
    Action, ActionSpace, Environment, Episode, Observation, ObservationSpace, Reward,
    State, Step, TrackedEnvironment,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CheckpointCourseEnv, DriveAction, RacerConfig, SeekCheckpointPolicy, TimeLimit,
    };
    pub use racer_rl_core::prelude::*;
}
