//! Trajectory and experience storage

use serde::{Deserialize, Serialize};

use crate::Reward;

/// Single transition in a trajectory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition<O, A> {
    /// Current observation
    pub observation: O,
    /// Action taken
    pub action: A,
    /// Reward received
    pub reward: Reward,
    /// Next observation
    pub next_observation: O,
    /// Whether episode ended
    pub done: bool,
}

/// Complete trajectory of an episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory<O, A> {
    /// Sequence of transitions
    pub transitions: Vec<Transition<O, A>>,
    /// Total reward
    pub total_reward: f64,
    /// Episode ID
    pub episode_id: String,
}

impl<O, A> Trajectory<O, A> {
    /// Create a new empty trajectory
    pub fn new(episode_id: impl Into<String>) -> Self {
        Self {
            transitions: Vec::new(),
            total_reward: 0.0,
            episode_id: episode_id.into(),
        }
    }

    /// Add a transition to the trajectory
    pub fn push(&mut self, transition: Transition<O, A>) {
        self.total_reward += transition.reward.0;
        self.transitions.push(transition);
    }

    /// Get the length of the trajectory
    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Check if trajectory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Compute returns (cumulative discounted rewards)
    #[must_use]
    pub fn returns(&self, gamma: f64) -> Vec<f64> {
        let mut returns = vec![0.0; self.len()];
        let mut running_return = 0.0;

        for i in (0..self.len()).rev() {
            if self.transitions[i].done {
                running_return = 0.0;
            }
            running_return = self.transitions[i].reward.0 + gamma * running_return;
            returns[i] = running_return;
        }

        returns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(reward: f64, done: bool) -> Transition<u8, u8> {
        Transition {
            observation: 0,
            action: 0,
            reward: Reward(reward),
            next_observation: 0,
            done,
        }
    }

    #[test]
    fn test_push_tracks_total_reward() {
        let mut trajectory = Trajectory::new("ep-1");
        assert!(trajectory.is_empty());
        trajectory.push(transition(0.5, false));
        trajectory.push(transition(-0.25, true));
        assert_eq!(trajectory.len(), 2);
        assert!((trajectory.total_reward - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_discounted_returns() {
        let mut trajectory = Trajectory::new("ep-2");
        trajectory.push(transition(1.0, false));
        trajectory.push(transition(1.0, false));
        trajectory.push(transition(1.0, true));

        let returns = trajectory.returns(0.5);
        assert!((returns[2] - 1.0).abs() < 1e-12);
        assert!((returns[1] - 1.5).abs() < 1e-12);
        assert!((returns[0] - 1.75).abs() < 1e-12);
    }

    proptest::proptest! {
        #[test]
        fn prop_undiscounted_return_is_total(rewards in proptest::collection::vec(-1.0f64..1.0, 1..50)) {
            let mut trajectory = Trajectory::new("prop");
            let last = rewards.len() - 1;
            for (i, r) in rewards.iter().enumerate() {
                trajectory.push(transition(*r, i == last));
            }
            let returns = trajectory.returns(1.0);
            proptest::prop_assert!((returns[0] - trajectory.total_reward).abs() < 1e-9);
            proptest::prop_assert!((returns[last] - rewards[last]).abs() < 1e-12);
        }
    }
}
