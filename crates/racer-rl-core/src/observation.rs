//! Observation representations and observation spaces

use std::fmt::Debug;

/// Trait for observations from an environment
pub trait Observation: Clone + Debug + Send + Sync {
    /// Convert observation to a feature vector
    fn to_vec(&self) -> Vec<f64>;

    /// Get the shape of the observation
    fn shape(&self) -> Vec<usize>;
}

/// Trait for defining observation spaces
pub trait ObservationSpace: Send + Sync {
    /// The type of observations in this space
    type Observation: Observation;

    /// Sample a random observation from the space
    fn sample(&self) -> Self::Observation;

    /// Check if an observation is valid within this space
    fn contains(&self, obs: &Self::Observation) -> bool;

    /// Get the shape of observations in this space
    fn shape(&self) -> Vec<usize>;
}

/// Per-feature bounds of a flat observation vector.
///
/// Domain observation spaces wrap this and convert to and from their own
/// observation type.
#[derive(Debug, Clone)]
pub struct BoxObservationSpace {
    /// Lower bounds
    pub low: Vec<f64>,
    /// Upper bounds
    pub high: Vec<f64>,
    /// Shape of observations
    pub shape: Vec<usize>,
}

impl BoxObservationSpace {
    /// Create a new box observation space
    pub fn new(low: Vec<f64>, high: Vec<f64>, shape: Vec<usize>) -> crate::Result<Self> {
        let total_size: usize = shape.iter().product();
        if low.len() != total_size || high.len() != total_size {
            return Err(crate::RLError::DimensionMismatch {
                expected: total_size,
                actual: low.len(),
            });
        }
        Ok(Self { low, high, shape })
    }

    /// Check a raw feature vector against the bounds
    #[must_use]
    pub fn contains_slice(&self, data: &[f64]) -> bool {
        data.len() == self.low.len()
            && data
                .iter()
                .zip(&self.low)
                .zip(&self.high)
                .all(|((x, l), h)| x >= l && x <= h)
    }

    /// Sample a raw feature vector inside the bounds
    #[must_use]
    pub fn sample_vec(&self) -> Vec<f64> {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        self.low
            .iter()
            .zip(&self.high)
            .map(|(l, h)| match (l.is_finite(), h.is_finite()) {
                (true, true) if l < h => rng.gen_range(*l..*h),
                (true, true) => *l,
                (true, false) => l + rng.gen::<f64>(),
                (false, true) => h - rng.gen::<f64>(),
                (false, false) => rng.gen_range(-1.0..1.0),
            })
            .collect()
    }
}
