//! Core reinforcement learning traits and types for Checkpoint Racer
//!
//! This crate provides the foundational abstractions the driving
//! environments are built on: environments, observations, actions,
//! rewards, policies and recorded trajectories.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod environment;
pub mod error;
pub mod observation;
pub mod policy;
pub mod reward;
pub mod state;
pub mod trajectory;

// Re-export core traits and types
pub use action::{Action, ActionSpace};
pub use environment::{Environment, Episode, Step, StepInfo, TrackedEnvironment};
pub use error::{RLError, Result};
pub use observation::{BoxObservationSpace, Observation, ObservationSpace};
pub use policy::{Policy, RandomPolicy};
pub use reward::Reward;
pub use state::State;
pub use trajectory::{Trajectory, Transition};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, ActionSpace, Environment, Observation, ObservationSpace, Policy, Result, Reward,
        State, Step,
    };
}
