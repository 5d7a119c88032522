//! Environment traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Action, ActionSpace, Observation, ObservationSpace, Reward, State};

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step<O, S> {
    /// Observation from the environment
    pub observation: O,
    /// Reward signal
    pub reward: Reward,
    /// Whether the episode is done
    pub done: bool,
    /// Whether the episode was truncated (e.g., time limit)
    pub truncated: bool,
    /// Additional info from the environment
    pub info: StepInfo,
    /// Internal state (if available)
    pub state: Option<S>,
}

/// Additional information from a step
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepInfo {
    /// Custom fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StepInfo {
    /// Attach a field, replacing any previous value under the same key
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a field
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}

/// Episode information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Episode ID
    pub id: String,
    /// Total reward
    pub total_reward: f64,
    /// Number of steps
    pub steps: usize,
    /// Whether episode was truncated
    pub truncated: bool,
    /// Start time
    pub start_time: chrono::DateTime<chrono::Utc>,
    /// End time
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Core environment trait
#[async_trait]
pub trait Environment: Send + Sync {
    /// Observation type
    type Observation: Observation;
    /// Action type
    type Action: Action;
    /// State type
    type State: State;

    /// Get the observation space
    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>>;

    /// Get the action space
    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>>;

    /// Reset the environment
    async fn reset(&mut self) -> crate::Result<(Self::Observation, StepInfo)>;

    /// Take a step in the environment
    async fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation, Self::State>>;

    /// Close the environment
    async fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }

    /// Get current episode info
    fn episode_info(&self) -> Option<Episode> {
        None
    }
}

/// Wrapper for environments that tracks episodes
pub struct TrackedEnvironment<E> {
    /// Inner environment
    pub env: E,
    /// Current episode
    pub episode: Option<Episode>,
    /// Step counter
    pub step_count: usize,
}

impl<E> TrackedEnvironment<E> {
    /// Create a new tracked environment
    pub fn new(env: E) -> Self {
        Self {
            env,
            episode: None,
            step_count: 0,
        }
    }
}

#[async_trait]
impl<E> Environment for TrackedEnvironment<E>
where
    E: Environment,
{
    type Observation = E::Observation;
    type Action = E::Action;
    type State = E::State;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        self.env.observation_space()
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        self.env.action_space()
    }

    async fn reset(&mut self) -> crate::Result<(Self::Observation, StepInfo)> {
        // End current episode if exists
        if let Some(ref mut episode) = self.episode {
            if episode.end_time.is_none() {
                episode.end_time = Some(chrono::Utc::now());
            }
        }

        self.episode = Some(Episode {
            id: uuid::Uuid::new_v4().to_string(),
            total_reward: 0.0,
            steps: 0,
            truncated: false,
            start_time: chrono::Utc::now(),
            end_time: None,
        });
        self.step_count = 0;

        self.env.reset().await
    }

    async fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation, Self::State>> {
        let step = self.env.step(action).await?;

        self.step_count += 1;
        if let Some(ref mut episode) = self.episode {
            episode.total_reward += step.reward.0;
            episode.steps = self.step_count;

            if step.done || step.truncated {
                episode.truncated = step.truncated;
                episode.end_time = Some(chrono::Utc::now());
                tracing::debug!(
                    episode = %episode.id,
                    steps = episode.steps,
                    total_reward = episode.total_reward,
                    truncated = episode.truncated,
                    "episode finished"
                );
            }
        }

        Ok(step)
    }

    async fn close(&mut self) -> crate::Result<()> {
        self.env.close().await
    }

    fn episode_info(&self) -> Option<Episode> {
        self.episode.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Count(f64);

    impl Observation for Count {
        fn to_vec(&self) -> Vec<f64> {
            vec![self.0]
        }

        fn shape(&self) -> Vec<usize> {
            vec![1]
        }
    }

    impl State for Count {
        fn features(&self) -> Vec<f64> {
            vec![self.0]
        }

        fn is_terminal(&self) -> bool {
            self.0 >= 3.0
        }
    }

    #[derive(Debug, Clone, Copy)]
    struct Nudge(f64);

    impl Action for Nudge {
        fn to_vec(&self) -> Vec<f64> {
            vec![self.0]
        }
    }

    struct NudgeSpace;

    impl ActionSpace for NudgeSpace {
        type Action = Nudge;

        fn sample(&self) -> Self::Action {
            Nudge(0.5)
        }

        fn contains(&self, action: &Self::Action) -> bool {
            (0.0..=1.0).contains(&action.0)
        }

        fn dim(&self) -> Option<usize> {
            Some(1)
        }
    }

    struct CountSpace;

    impl ObservationSpace for CountSpace {
        type Observation = Count;

        fn sample(&self) -> Self::Observation {
            Count(0.0)
        }

        fn contains(&self, obs: &Self::Observation) -> bool {
            obs.0 >= 0.0
        }

        fn shape(&self) -> Vec<usize> {
            vec![1]
        }
    }

    /// Counts up by the action value and stops at three.
    struct CountingEnv {
        value: f64,
    }

    #[async_trait]
    impl Environment for CountingEnv {
        type Observation = Count;
        type Action = Nudge;
        type State = Count;

        fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
            Box::new(CountSpace)
        }

        fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
            Box::new(NudgeSpace)
        }

        async fn reset(&mut self) -> crate::Result<(Self::Observation, StepInfo)> {
            self.value = 0.0;
            Ok((Count(0.0), StepInfo::default()))
        }

        async fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation, Self::State>> {
            self.value += action.0;
            let state = Count(self.value);
            Ok(Step {
                observation: Count(self.value),
                reward: Reward(action.0),
                done: state.is_terminal(),
                truncated: false,
                info: StepInfo::default().with("value", self.value),
                state: Some(state),
            })
        }
    }

    #[tokio::test]
    async fn test_tracked_environment_accumulates_episode() {
        let mut env = TrackedEnvironment::new(CountingEnv { value: 0.0 });
        assert!(env.episode_info().is_none());
        assert_eq!(env.action_space().dim(), Some(1));

        env.reset().await.unwrap();
        let mut last = None;
        for _ in 0..3 {
            last = Some(env.step(Nudge(1.0)).await.unwrap());
        }

        let step = last.unwrap();
        assert!(step.done);
        assert!(step.state.unwrap().is_terminal());
        assert_eq!(step.info.get("value"), Some(&serde_json::json!(3.0)));
        assert!(env.observation_space().contains(&step.observation));

        let episode = env.episode_info().unwrap();
        assert_eq!(episode.steps, 3);
        assert!((episode.total_reward - 3.0).abs() < 1e-12);
        assert!(episode.end_time.is_some());
        assert!(!episode.truncated);
    }

    #[tokio::test]
    async fn test_reset_starts_fresh_episode() {
        let mut env = TrackedEnvironment::new(CountingEnv { value: 0.0 });
        env.reset().await.unwrap();
        let first = env.episode_info().unwrap().id;
        env.step(Nudge(0.5)).await.unwrap();

        env.reset().await.unwrap();
        let episode = env.episode_info().unwrap();
        assert_ne!(episode.id, first);
        assert_eq!(episode.steps, 0);
        assert_eq!(env.step_count, 0);
    }
}
