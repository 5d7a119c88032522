//! Checkpoint course environment
//!
//! Couples an [`EpisodeController`] with the headless [`Arena`] so that whole
//! episodes can be stepped through the generic [`Environment`] interface.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use racer_rl_core::{
    ActionSpace, Environment, ObservationSpace, RLError, Result, Step, StepInfo,
};

use crate::arena::Arena;
use crate::config::RacerConfig;
use crate::controller::{EpisodeController, EpisodeState};
use crate::geometry::Pose;
use crate::hooks::EpisodeHooks;
use crate::kinematics::{DriveAction, DriveSpace, KinematicBody, MotionBody};
use crate::sensors::{CarObservation, CarObservationSpace};

/// Drive a car through an ordered checkpoint course
pub struct CheckpointCourseEnv {
    config: RacerConfig,
    arena: Arena,
    body: KinematicBody,
    controller: EpisodeController,
    observation_space: CarObservationSpace,
    start: Pose,
    steps: usize,
}

impl CheckpointCourseEnv {
    /// Build the arena and controller described by `config`
    pub fn new(config: RacerConfig) -> Result<Self> {
        config.validate()?;
        let arena = Arena::new(&config.course);
        let course = Arc::new(arena.checkpoint_course()?);
        let start = Pose::from(config.course.start);
        let controller = EpisodeController::new(config.agent.clone(), course, &start)?;
        let observation_space = config.agent.sensors.observation_space()?;

        Ok(Self {
            config,
            arena,
            body: KinematicBody::new(start),
            controller,
            observation_space,
            start,
            steps: 0,
        })
    }

    /// Route debug geometry and events to `hooks`
    #[must_use]
    pub fn with_hooks(mut self, hooks: impl EpisodeHooks + 'static) -> Self {
        self.controller = self.controller.with_hooks(hooks);
        self
    }

    /// Run configuration
    #[must_use]
    pub fn config(&self) -> &RacerConfig {
        &self.config
    }

    /// Reward and checkpoint logic
    #[must_use]
    pub fn controller(&self) -> &EpisodeController {
        &self.controller
    }

    /// Headless world
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Current car pose
    #[must_use]
    pub fn pose(&self) -> Pose {
        self.body.pose()
    }

    /// Steps taken this episode
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn observe(&mut self) -> CarObservation {
        let pose = self.body.pose();
        let speed = self.body.speed();
        self.controller.observe(&pose, speed, &self.arena)
    }

    fn info(&self) -> StepInfo {
        let state = self.controller.state();
        let info = StepInfo::default()
            .with("checkpoint", state.current_checkpoint)
            .with("checkpoints", self.controller.course().len())
            .with("stationary_frames", state.stationary_frames)
            .with("cumulative_reward", state.cumulative_reward);
        match state.termination() {
            Some(reason) => info.with("termination", serde_json::to_value(reason).unwrap_or_default()),
            None => info,
        }
    }
}

#[async_trait]
impl Environment for CheckpointCourseEnv {
    type Observation = CarObservation;
    type Action = DriveAction;
    type State = EpisodeState;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        Box::new(self.observation_space.clone())
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        Box::new(DriveSpace)
    }

    async fn reset(&mut self) -> Result<(Self::Observation, StepInfo)> {
        self.steps = 0;
        self.body.teleport(self.start);
        self.arena.reset_contacts();
        self.controller.begin_episode(&self.start);
        info!(
            checkpoints = self.controller.course().len(),
            reference_distance = self.controller.state().previous_checkpoint_distance,
            "episode reset"
        );

        Ok((self.observe(), self.info()))
    }

    async fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation, Self::State>> {
        if !self.controller.is_running() {
            return Err(RLError::Environment(
                "episode has terminated; call reset before stepping".to_string(),
            ));
        }

        let dt = self.config.tick_seconds;
        let pose = self.controller.apply_action(&self.body.pose(), action, dt);
        let pose = self.arena.settle(pose, dt);
        self.body.move_to(pose, dt);

        let mut reward = self.controller.tick(&pose.position);
        for event in self.arena.contacts(&pose.position) {
            reward += self.controller.handle_contact(&event, &pose.position);
        }
        self.steps += 1;

        let done = !self.controller.is_running();
        if done {
            debug!(
                steps = self.steps,
                termination = ?self.controller.state().termination(),
                "episode done"
            );
        }

        Ok(Step {
            observation: self.observe(),
            reward,
            done,
            truncated: false,
            info: self.info(),
            state: Some(self.controller.state().clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{EpisodePhase, TerminationReason};
    use crate::policies::SeekCheckpointPolicy;
    use racer_rl_core::{Observation, Policy, State};

    #[tokio::test]
    async fn test_reset_observation_shape() {
        let mut env = CheckpointCourseEnv::new(RacerConfig::default()).unwrap();
        let (obs, info) = env.reset().await.unwrap();
        assert_eq!(obs.to_vec().len(), 10);
        assert_eq!(info.get("checkpoint"), Some(&serde_json::json!(0)));
        assert!(env.observation_space().contains(&obs));
    }

    #[tokio::test]
    async fn test_seek_policy_completes_default_course() {
        let mut env = CheckpointCourseEnv::new(RacerConfig::default()).unwrap();
        let policy = SeekCheckpointPolicy::default();
        let (mut obs, _) = env.reset().await.unwrap();

        let mut total = 0.0;
        let mut last = None;
        for _ in 0..2000 {
            let action = policy.act(&obs).await.unwrap();
            let step = env.step(action).await.unwrap();
            total += step.reward.value();
            obs = step.observation.clone();
            let done = step.done;
            last = Some(step);
            if done {
                break;
            }
        }

        let step = last.unwrap();
        assert!(step.done);
        assert!(step.state.as_ref().unwrap().is_terminal());
        assert_eq!(
            env.controller().phase(),
            EpisodePhase::Terminated(TerminationReason::CourseCompleted)
        );
        assert_eq!(step.info.get("termination"), Some(&serde_json::json!("course_completed")));
        assert_eq!(obs.navigation, [0.0; 4]);
        assert!(!obs.has_target);
        assert!((total - env.controller().cumulative_reward()).abs() < 1e-9);
        assert!(total > 2.5);
    }

    #[tokio::test]
    async fn test_driving_into_wall_terminates() {
        let mut env = CheckpointCourseEnv::new(RacerConfig::default()).unwrap();
        env.reset().await.unwrap();

        // Face east toward the side wall and floor it.
        let turn_ticks = (90.0 / (45.0 * 0.02)) as usize;
        for _ in 0..turn_ticks {
            env.step(DriveAction::new(0.0, -1.0)).await.unwrap();
        }
        let mut result = None;
        for _ in 0..200 {
            let step = env.step(DriveAction::new(1.0, 0.0)).await.unwrap();
            if step.done {
                result = Some(step);
                break;
            }
        }

        let step = result.unwrap();
        assert_eq!(
            step.state.unwrap().termination(),
            Some(TerminationReason::WallCollision)
        );
        assert!(env.step(DriveAction::IDLE).await.is_err());

        env.reset().await.unwrap();
        assert!(env.controller().is_running());
        assert_eq!(env.steps(), 0);
    }

    #[tokio::test]
    async fn test_idle_car_gets_stationary_penalty() {
        let mut env = CheckpointCourseEnv::new(RacerConfig::default()).unwrap();
        env.reset().await.unwrap();
        let mut rewards = Vec::new();
        for _ in 0..32 {
            rewards.push(env.step(DriveAction::IDLE).await.unwrap().reward.value());
        }
        assert!((rewards[29] - 0.001).abs() < 1e-12);
        assert!((rewards[30] - (0.001 - 0.005)).abs() < 1e-12);
        assert!(env.controller().is_running());
    }
}
