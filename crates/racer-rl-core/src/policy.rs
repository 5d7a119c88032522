//! Policy abstractions for action selection

use async_trait::async_trait;
use std::marker::PhantomData;

use crate::{Action, ActionSpace, Observation};

/// Core policy trait for selecting actions
///
/// The environment does not care where actions come from: a trained network,
/// a scripted heuristic or a human at the keyboard all sit behind this trait.
#[async_trait]
pub trait Policy: Send + Sync {
    /// Observation type
    type Observation: Observation;
    /// Action type
    type Action: Action;

    /// Select an action given an observation
    async fn act(&self, observation: &Self::Observation) -> crate::Result<Self::Action>;

    /// Update the policy (for learnable policies)
    async fn update(&mut self) -> crate::Result<()> {
        Ok(())
    }
}

/// Random policy that always selects random actions
pub struct RandomPolicy<A, O> {
    /// Action space
    pub action_space: A,
    _observation: PhantomData<fn() -> O>,
}

impl<A, O> RandomPolicy<A, O> {
    /// Create a new random policy
    pub fn new(action_space: A) -> Self {
        Self {
            action_space,
            _observation: PhantomData,
        }
    }
}

#[async_trait]
impl<A, O> Policy for RandomPolicy<A, O>
where
    O: Observation,
    A: ActionSpace,
{
    type Observation = O;
    type Action = A::Action;

    async fn act(&self, _observation: &Self::Observation) -> crate::Result<Self::Action> {
        Ok(self.action_space.sample())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Lever(i8);

    impl Action for Lever {
        fn to_vec(&self) -> Vec<f64> {
            vec![f64::from(self.0)]
        }
    }

    #[derive(Debug, Clone)]
    struct Blank;

    impl Observation for Blank {
        fn to_vec(&self) -> Vec<f64> {
            Vec::new()
        }

        fn shape(&self) -> Vec<usize> {
            vec![0]
        }
    }

    struct LeverSpace;

    impl ActionSpace for LeverSpace {
        type Action = Lever;

        fn sample(&self) -> Self::Action {
            use rand::Rng;
            Lever(rand::thread_rng().gen_range(-1..=1))
        }

        fn contains(&self, action: &Self::Action) -> bool {
            (-1..=1).contains(&action.0)
        }

        fn dim(&self) -> Option<usize> {
            Some(1)
        }
    }

    #[tokio::test]
    async fn test_random_policy_samples_from_space() {
        let policy: RandomPolicy<_, Blank> = RandomPolicy::new(LeverSpace);
        for _ in 0..20 {
            let action = policy.act(&Blank).await.unwrap();
            assert!(LeverSpace.contains(&action));
        }
    }
}
