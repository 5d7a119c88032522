//! Policies that drive the car without a learned model

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use racer_rl_core::{Policy, RandomPolicy, Result};

use crate::kinematics::{DriveAction, DriveSpace};
use crate::manual::{KeyState, ManualControl};
use crate::sensors::CarObservation;

/// Uniformly random throttle and turn
pub type RandomDrivePolicy = RandomPolicy<DriveSpace, CarObservation>;

/// A random policy over the full drive space
#[must_use]
pub fn random_drive_policy() -> RandomDrivePolicy {
    RandomPolicy::new(DriveSpace)
}

/// Steers toward the current checkpoint and eases off when the front ray
/// reports something close.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekCheckpointPolicy {
    /// Turn per unit of normalised target angle
    pub steer_gain: f64,
    /// Throttle with a clear road ahead
    pub cruise_throttle: f64,
    /// Front clearance below which the car slows down
    pub brake_clearance: f64,
    /// Throttle while slowing down
    pub brake_throttle: f64,
}

impl Default for SeekCheckpointPolicy {
    fn default() -> Self {
        Self {
            steer_gain: 4.0,
            cruise_throttle: 1.0,
            brake_clearance: 0.3,
            brake_throttle: 0.2,
        }
    }
}

impl SeekCheckpointPolicy {
    /// Pick an action without going through the async trait
    #[must_use]
    pub fn decide(&self, observation: &CarObservation) -> DriveAction {
        if !observation.has_target {
            return DriveAction::IDLE;
        }

        let turn = (observation.target_angle() * self.steer_gain).clamp(-1.0, 1.0);
        let throttle = if observation.front_clearance() < self.brake_clearance {
            self.brake_throttle
        } else {
            self.cruise_throttle
        };
        DriveAction::new(throttle, turn)
    }
}

#[async_trait]
impl Policy for SeekCheckpointPolicy {
    type Observation = CarObservation;
    type Action = DriveAction;

    async fn act(&self, observation: &Self::Observation) -> Result<Self::Action> {
        Ok(self.decide(observation))
    }
}

/// Replays recorded key frames through the smoothed input axes.
/// Once the recording runs out every key counts as released.
pub struct ManualPolicy {
    dt: f64,
    inner: Mutex<ManualReplay>,
}

struct ManualReplay {
    control: ManualControl,
    frames: VecDeque<KeyState>,
}

impl ManualPolicy {
    /// Replay `frames`, one per tick of `dt` seconds
    pub fn new(frames: impl IntoIterator<Item = KeyState>, dt: f64) -> Self {
        Self {
            dt,
            inner: Mutex::new(ManualReplay {
                control: ManualControl::default(),
                frames: frames.into_iter().collect(),
            }),
        }
    }

    /// Parse one key string per line, e.g. `"W"`, `"WD"` or an empty line
    pub fn from_script(script: &str, dt: f64) -> Self {
        Self::new(script.lines().map(|line| KeyState::parse(line.trim())), dt)
    }

    /// Frames not yet replayed
    pub async fn remaining(&self) -> usize {
        self.inner.lock().await.frames.len()
    }
}

#[async_trait]
impl Policy for ManualPolicy {
    type Observation = CarObservation;
    type Action = DriveAction;

    async fn act(&self, _observation: &Self::Observation) -> Result<Self::Action> {
        let mut replay = self.inner.lock().await;
        let keys = replay.frames.pop_front().unwrap_or_default();
        Ok(replay.control.update(keys, self.dt))
    }
}
