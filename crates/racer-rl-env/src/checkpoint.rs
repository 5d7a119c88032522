//! Ordered checkpoint course

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use racer_rl_core::{RLError, Result};

use crate::world::ColliderId;

/// A checkpoint the car must pass through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Trigger collider identity
    pub id: ColliderId,
    /// Centre of the trigger volume
    pub position: Point3<f64>,
}

/// Display status of a checkpoint for one agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    /// Not reached yet and not the target
    Pending,
    /// The checkpoint the agent is heading for
    Current,
    /// Already passed
    Reached,
}

/// Non-empty ordered sequence of checkpoints.
///
/// Read-only once built; share it between agents behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CheckpointCourse {
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointCourse {
    /// Build a course. An empty list is rejected, as are duplicate ids.
    pub fn new(checkpoints: Vec<Checkpoint>) -> Result<Self> {
        if checkpoints.is_empty() {
            return Err(RLError::Configuration(
                "checkpoint course is empty; at least one checkpoint is required".to_string(),
            ));
        }
        for (i, checkpoint) in checkpoints.iter().enumerate() {
            if checkpoints[..i].iter().any(|c| c.id == checkpoint.id) {
                return Err(RLError::Configuration(format!(
                    "duplicate checkpoint id {:?} at index {i}",
                    checkpoint.id
                )));
            }
        }
        Ok(Self { checkpoints })
    }

    /// Build a course from positions, numbering ids from zero
    pub fn from_positions(positions: impl IntoIterator<Item = Point3<f64>>) -> Result<Self> {
        Self::new(
            positions
                .into_iter()
                .zip(0u64..)
                .map(|(position, id)| Checkpoint {
                    id: ColliderId(id),
                    position,
                })
                .collect(),
        )
    }

    /// Number of checkpoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Whether there are no checkpoints; never true for a built course
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Checkpoint at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Checkpoint> {
        self.checkpoints.get(index)
    }

    /// Sequence index of the checkpoint with collider `id`
    #[must_use]
    pub fn index_of(&self, id: ColliderId) -> Option<usize> {
        self.checkpoints.iter().position(|c| c.id == id)
    }

    /// Iterate in course order
    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }

    /// Statuses at episode start: first checkpoint current, the rest pending
    #[must_use]
    pub fn initial_statuses(&self) -> Vec<CheckpointStatus> {
        (0..self.len())
            .map(|i| {
                if i == 0 {
                    CheckpointStatus::Current
                } else {
                    CheckpointStatus::Pending
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_course_rejected() {
        let err = CheckpointCourse::new(Vec::new()).unwrap_err();
        assert!(matches!(err, RLError::Configuration(_)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let cp = Checkpoint {
            id: ColliderId(7),
            position: Point3::origin(),
        };
        assert!(CheckpointCourse::new(vec![cp.clone(), cp]).is_err());
    }

    #[test]
    fn test_lookup_by_id() {
        let course = CheckpointCourse::from_positions([
            Point3::new(0.0, 0.0, 10.0),
            Point3::new(0.0, 0.0, 20.0),
        ])
        .unwrap();
        assert_eq!(course.len(), 2);
        assert_eq!(course.index_of(ColliderId(1)), Some(1));
        assert_eq!(course.index_of(ColliderId(9)), None);
        assert_eq!(
            course.initial_statuses(),
            vec![CheckpointStatus::Current, CheckpointStatus::Pending]
        );
    }
}
