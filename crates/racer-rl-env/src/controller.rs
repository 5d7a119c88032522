//! Episode controller: checkpoint progression, rewards and termination
//!
//! One controller drives one agent. The host calls [`EpisodeController::tick`]
//! once per fixed update and [`EpisodeController::handle_contact`] for each
//! contact notification; both return the reward they produced. Nothing
//! accrues once the episode has terminated, until
//! [`EpisodeController::begin_episode`] is called again.

use std::cmp::Ordering;
use std::sync::Arc;

use nalgebra::{distance, Point3};
use serde::{Deserialize, Serialize};
use tracing::warn;

use racer_rl_core::{Result, Reward, State};

use crate::checkpoint::{CheckpointCourse, CheckpointStatus};
use crate::config::AgentConfig;
use crate::geometry::Pose;
use crate::hooks::{EpisodeEvent, EpisodeHooks, NoopHooks};
use crate::kinematics::{self, DriveAction};
use crate::sensors::{self, CarObservation};
use crate::world::{ContactEvent, ContactKind, RayOracle, Tag};

/// Why an episode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Drove into a wall
    WallCollision,
    /// Drove into an obstacle cube
    ObstacleCollision,
    /// Dropped below the fall height
    FellOffTrack,
    /// Passed every checkpoint in order
    CourseCompleted,
}

impl TerminationReason {
    /// Whether the episode ended by finishing the course
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::CourseCompleted)
    }
}

/// Lifecycle of an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodePhase {
    /// Rewards accrue
    Running,
    /// Ended; waiting for the episode manager to reset
    Terminated(TerminationReason),
}

/// Mutable per-episode state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeState {
    /// Index of the checkpoint to reach next; equals the course length once
    /// the course is complete
    pub current_checkpoint: usize,
    /// Display status per checkpoint
    pub statuses: Vec<CheckpointStatus>,
    /// Position at the end of the previous tick
    pub previous_position: Point3<f64>,
    /// Distance to the target at the end of the previous tick
    pub previous_checkpoint_distance: f64,
    /// Consecutive ticks with displacement under the threshold
    pub stationary_frames: u32,
    /// Sum of every reward produced this episode
    pub cumulative_reward: f64,
    /// Running or terminated
    pub phase: EpisodePhase,
}

impl EpisodeState {
    fn begin(course: &CheckpointCourse, start: &Pose) -> Self {
        let previous_checkpoint_distance = course
            .get(0)
            .map_or(0.0, |first| distance(&start.position, &first.position));

        Self {
            current_checkpoint: 0,
            statuses: course.initial_statuses(),
            previous_position: start.position,
            previous_checkpoint_distance,
            stationary_frames: 0,
            cumulative_reward: 0.0,
            phase: EpisodePhase::Running,
        }
    }

    /// Checkpoints passed so far
    #[must_use]
    pub fn reached_count(&self) -> usize {
        self.current_checkpoint
    }

    /// The reason the episode ended, if it has
    #[must_use]
    pub fn termination(&self) -> Option<TerminationReason> {
        match self.phase {
            EpisodePhase::Running => None,
            EpisodePhase::Terminated(reason) => Some(reason),
        }
    }
}

impl State for EpisodeState {
    #[allow(clippy::cast_precision_loss)]
    fn features(&self) -> Vec<f64> {
        vec![
            self.current_checkpoint as f64,
            self.previous_checkpoint_distance,
            f64::from(self.stationary_frames),
            self.cumulative_reward,
        ]
    }

    fn is_terminal(&self) -> bool {
        matches!(self.phase, EpisodePhase::Terminated(_))
    }
}

/// Observation, action and reward logic for one agent
pub struct EpisodeController {
    config: AgentConfig,
    course: Arc<CheckpointCourse>,
    state: EpisodeState,
    hooks: Box<dyn EpisodeHooks>,
}

impl EpisodeController {
    /// Validate the configuration and begin the first episode at `start`
    pub fn new(config: AgentConfig, course: Arc<CheckpointCourse>, start: &Pose) -> Result<Self> {
        config.validate()?;
        let state = EpisodeState::begin(&course, start);
        let mut controller = Self {
            config,
            course,
            state,
            hooks: Box::new(NoopHooks),
        };
        controller.emit_began();
        Ok(controller)
    }

    /// Replace the instrumentation hooks
    #[must_use]
    pub fn with_hooks(mut self, hooks: impl EpisodeHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Reinitialise episode state and checkpoint display status
    pub fn begin_episode(&mut self, start: &Pose) {
        self.state = EpisodeState::begin(&self.course, start);
        self.emit_began();
    }

    fn emit_began(&mut self) {
        self.hooks.on_event(&EpisodeEvent::Began {
            reference_distance: self.state.previous_checkpoint_distance,
        });
    }

    /// Agent configuration
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Shared checkpoint course
    #[must_use]
    pub fn course(&self) -> &Arc<CheckpointCourse> {
        &self.course
    }

    /// Current episode state
    #[must_use]
    pub fn state(&self) -> &EpisodeState {
        &self.state
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> EpisodePhase {
        self.state.phase
    }

    /// Whether rewards still accrue
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.phase == EpisodePhase::Running
    }

    /// Index of the checkpoint to reach next
    #[must_use]
    pub fn current_checkpoint(&self) -> usize {
        self.state.current_checkpoint
    }

    /// Sum of every reward produced this episode
    #[must_use]
    pub fn cumulative_reward(&self) -> f64 {
        self.state.cumulative_reward
    }

    /// Position of the checkpoint being targeted, if any remain
    #[must_use]
    pub fn target(&self) -> Option<Point3<f64>> {
        self.course
            .get(self.state.current_checkpoint)
            .map(|checkpoint| checkpoint.position)
    }

    /// Build this tick's observation
    pub fn observe<O>(&mut self, pose: &Pose, speed: f64, oracle: &O) -> CarObservation
    where
        O: RayOracle + ?Sized,
    {
        let target = self.target();
        sensors::build_observation(
            &self.config.sensors,
            pose,
            speed,
            self.config.motion.move_speed,
            target.as_ref(),
            oracle,
            self.hooks.as_mut(),
        )
    }

    /// Pose after applying `action` for `dt` seconds
    #[must_use]
    pub fn apply_action(&self, pose: &Pose, action: DriveAction, dt: f64) -> Pose {
        kinematics::integrate(pose, action, &self.config.motion, dt)
    }

    /// Per-tick reward: living reward, progress toward the target and the
    /// stationary penalty. Also ends the episode if the car has fallen.
    pub fn tick(&mut self, position: &Point3<f64>) -> Reward {
        if !self.is_running() {
            return Reward::ZERO;
        }
        let rewards = &self.config.rewards;
        let mut reward = rewards.living_reward;

        if let Some(target) = self.target() {
            let current = distance(position, &target);
            reward += (self.state.previous_checkpoint_distance - current) * rewards.progress_reward_multiplier;
            self.state.previous_checkpoint_distance = current;
        }

        if distance(position, &self.state.previous_position) < rewards.stationary_epsilon {
            self.state.stationary_frames = self.state.stationary_frames.saturating_add(1);
            if self.state.stationary_frames > rewards.stationary_threshold {
                reward -= rewards.stationary_penalty;
                self.hooks.on_event(&EpisodeEvent::Stuck {
                    frames: self.state.stationary_frames,
                });
            }
        } else {
            self.state.stationary_frames = 0;
        }

        self.state.previous_position = *position;
        let mut total = self.grant(reward);

        if position.y < self.config.rewards.fall_height {
            total += self.terminate(TerminationReason::FellOffTrack, self.config.rewards.fall_penalty);
        }
        total
    }

    /// React to a collision or trigger notification. `position` is the car's
    /// position when the contact happened.
    pub fn handle_contact(&mut self, event: &ContactEvent, position: &Point3<f64>) -> Reward {
        if !self.is_running() {
            return Reward::ZERO;
        }
        match event.kind {
            ContactKind::Collision => self.handle_collision(event.other.tag, position),
            ContactKind::Trigger if event.other.tag == Tag::Checkpoint => {
                match self.course.index_of(event.other.id) {
                    Some(index) => self.handle_checkpoint(index, position),
                    None => {
                        warn!(id = ?event.other.id, "checkpoint trigger is not part of the course");
                        self.hooks.on_event(&EpisodeEvent::UnknownCheckpoint { id: event.other.id });
                        Reward::ZERO
                    }
                }
            }
            ContactKind::Trigger => Reward::ZERO,
        }
    }

    fn handle_collision(&mut self, tag: Tag, position: &Point3<f64>) -> Reward {
        let rewards = &self.config.rewards;
        if tag == Tag::Wall {
            let penalty = rewards.wall_penalty;
            self.terminate(TerminationReason::WallCollision, penalty)
        } else if position.y < rewards.fall_height {
            let penalty = rewards.fall_penalty;
            self.terminate(TerminationReason::FellOffTrack, penalty)
        } else if tag == Tag::Cube {
            let penalty = rewards.cube_penalty;
            self.terminate(TerminationReason::ObstacleCollision, penalty)
        } else {
            Reward::ZERO
        }
    }

    fn handle_checkpoint(&mut self, index: usize, position: &Point3<f64>) -> Reward {
        let expected = self.state.current_checkpoint;
        match index.cmp(&expected) {
            Ordering::Equal if self.state.statuses[index] != CheckpointStatus::Reached => {
                let reward = self.config.rewards.checkpoint_reward;
                self.state.statuses[index] = CheckpointStatus::Reached;
                self.state.current_checkpoint += 1;

                let next = self.state.current_checkpoint;
                if let Some(checkpoint) = self.course.get(next) {
                    self.state.previous_checkpoint_distance = distance(position, &checkpoint.position);
                    self.state.statuses[next] = CheckpointStatus::Current;
                }
                self.hooks.on_event(&EpisodeEvent::CheckpointPassed { index, reward });

                let mut total = self.grant(reward);
                if next == self.course.len() {
                    let bonus = self.config.rewards.completion_bonus;
                    total += self.terminate(TerminationReason::CourseCompleted, bonus);
                }
                total
            }
            Ordering::Equal | Ordering::Less => {
                self.hooks.on_event(&EpisodeEvent::CheckpointRevisited { index });
                Reward::ZERO
            }
            Ordering::Greater => {
                self.hooks.on_event(&EpisodeEvent::CheckpointOutOfOrder {
                    touched: index,
                    expected,
                });
                self.grant(self.config.rewards.wrong_checkpoint_penalty)
            }
        }
    }

    fn grant(&mut self, amount: f64) -> Reward {
        self.state.cumulative_reward += amount;
        Reward(amount)
    }

    fn terminate(&mut self, reason: TerminationReason, amount: f64) -> Reward {
        let reward = self.grant(amount);
        self.state.phase = EpisodePhase::Terminated(reason);
        self.hooks.on_event(&EpisodeEvent::Terminated {
            reason,
            cumulative_reward: self.state.cumulative_reward,
        });
        reward
    }
}

impl std::fmt::Debug for EpisodeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpisodeController")
            .field("config", &self.config)
            .field("checkpoints", &self.course.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
