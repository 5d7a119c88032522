//! Optional instrumentation for debug drawing and logging

use nalgebra::{Point3, Vector3};
use tracing::{debug, info, trace};

use crate::controller::TerminationReason;
use crate::world::ColliderId;

/// Notable things that happen during an episode
#[derive(Debug, Clone, PartialEq)]
pub enum EpisodeEvent {
    /// Episode state was reinitialised
    Began {
        /// Distance from the start pose to the first checkpoint
        reference_distance: f64,
    },
    /// The expected checkpoint was reached
    CheckpointPassed {
        /// Index of the checkpoint
        index: usize,
        /// Reward granted
        reward: f64,
    },
    /// An already passed checkpoint was entered again
    CheckpointRevisited {
        /// Index of the checkpoint
        index: usize,
    },
    /// A checkpoint ahead of the expected one was entered
    CheckpointOutOfOrder {
        /// Index touched
        touched: usize,
        /// Index expected
        expected: usize,
    },
    /// A checkpoint-tagged trigger that is not part of the course
    UnknownCheckpoint {
        /// Collider identity
        id: ColliderId,
    },
    /// The car has not moved for longer than the threshold
    Stuck {
        /// Consecutive stationary ticks
        frames: u32,
    },
    /// The episode ended
    Terminated {
        /// Why it ended
        reason: TerminationReason,
        /// Reward accumulated over the episode
        cumulative_reward: f64,
    },
}

/// Receives debug geometry and episode events. All methods default to no-ops.
pub trait EpisodeHooks: Send + Sync {
    /// A sensor ray was cast. `length` is the hit distance or the full ray
    /// length on a miss.
    fn on_ray(&mut self, _origin: &Point3<f64>, _direction: &Vector3<f64>, _length: f64, _hit: bool) {}

    /// Line from the car to the checkpoint it is heading for
    fn on_target(&mut self, _from: &Point3<f64>, _to: &Point3<f64>) {}

    /// An episode event occurred
    fn on_event(&mut self, _event: &EpisodeEvent) {}
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl EpisodeHooks for NoopHooks {}

/// Hooks that emit `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHooks {
    /// Also trace every sensor ray and target line
    pub rays: bool,
}

impl EpisodeHooks for TracingHooks {
    fn on_ray(&mut self, origin: &Point3<f64>, direction: &Vector3<f64>, length: f64, hit: bool) {
        if self.rays {
            let end = origin + direction * length;
            trace!(?origin, ?end, hit, "sensor ray");
        }
    }

    fn on_target(&mut self, from: &Point3<f64>, to: &Point3<f64>) {
        if self.rays {
            trace!(?from, ?to, "target line");
        }
    }

    fn on_event(&mut self, event: &EpisodeEvent) {
        match event {
            EpisodeEvent::Began { reference_distance } => {
                debug!(reference_distance, "episode begin");
            }
            EpisodeEvent::CheckpointPassed { index, reward } => {
                debug!(index, reward, "passed checkpoint");
            }
            EpisodeEvent::CheckpointRevisited { index } => {
                debug!(index, "re-entered passed checkpoint, ignoring");
            }
            EpisodeEvent::CheckpointOutOfOrder { touched, expected } => {
                debug!(touched, expected, "wrong checkpoint order");
            }
            EpisodeEvent::UnknownCheckpoint { id } => {
                debug!(?id, "checkpoint trigger is not part of the course");
            }
            EpisodeEvent::Stuck { frames } => {
                debug!(frames, "agent stuck");
            }
            EpisodeEvent::Terminated {
                reason,
                cumulative_reward,
            } => {
                info!(?reason, cumulative_reward, "episode terminated");
            }
        }
    }
}
