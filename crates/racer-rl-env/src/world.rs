//! Interfaces to the world the car drives in
//!
//! Raycasts and contacts come from whatever simulates the world (the headless
//! [`Arena`](crate::arena::Arena) or an engine bridge). The controller only
//! sees these types.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Identity of a collider in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderId(pub u64);

/// Gameplay tag attached to a collider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    /// Track boundary
    Wall,
    /// Loose obstacle cube
    Cube,
    /// Checkpoint trigger volume
    Checkpoint,
    /// Anything else
    Untagged,
}

/// Bit set of physics layers a ray can hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Every layer
    pub const ALL: Self = Self(u32::MAX);
    /// No layer
    pub const NONE: Self = Self(0);

    /// Mask with a single layer set
    #[must_use]
    pub fn layer(layer: u8) -> Self {
        Self(1u32.checked_shl(u32::from(layer)).unwrap_or(0))
    }

    /// Whether `layer` is part of the mask
    #[must_use]
    pub fn contains(self, layer: u8) -> bool {
        self.0 & Self::layer(layer).0 != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl std::ops::BitOr for LayerMask {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// The other side of a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColliderRef {
    /// Collider identity
    pub id: ColliderId,
    /// Gameplay tag
    pub tag: Tag,
}

/// Solid collision or trigger overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    /// Solid body contact
    Collision,
    /// Overlap with a trigger volume
    Trigger,
}

/// Contact notification delivered to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEvent {
    /// Collision or trigger
    pub kind: ContactKind,
    /// What was touched
    pub other: ColliderRef,
}

impl ContactEvent {
    /// Collision with a tagged collider
    #[must_use]
    pub fn collision(id: ColliderId, tag: Tag) -> Self {
        Self {
            kind: ContactKind::Collision,
            other: ColliderRef { id, tag },
        }
    }

    /// Trigger overlap with a tagged collider
    #[must_use]
    pub fn trigger(id: ColliderId, tag: Tag) -> Self {
        Self {
            kind: ContactKind::Trigger,
            other: ColliderRef { id, tag },
        }
    }
}

/// Ray-intersection oracle
pub trait RayOracle: Send + Sync {
    /// Distance to the first obstacle on a layer in `mask` along `direction`
    /// (unit length) within `max_distance`, if any.
    fn cast(
        &self,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
        max_distance: f64,
        mask: LayerMask,
    ) -> Option<f64>;
}

impl<F> RayOracle for F
where
    F: Fn(&Point3<f64>, &Vector3<f64>, f64, LayerMask) -> Option<f64> + Send + Sync,
{
    fn cast(
        &self,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
        max_distance: f64,
        mask: LayerMask,
    ) -> Option<f64> {
        self(origin, direction, max_distance, mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_mask() {
        let mask = LayerMask::layer(3) | LayerMask::layer(8);
        assert!(mask.contains(3));
        assert!(mask.contains(8));
        assert!(!mask.contains(0));
        assert!(LayerMask::ALL.contains(31));
        assert!(!LayerMask::NONE.contains(0));
        assert_eq!(LayerMask::layer(40), LayerMask::NONE);
    }

    #[test]
    fn test_closure_oracle() {
        let oracle = |_: &Point3<f64>, _: &Vector3<f64>, max: f64, _: LayerMask| Some(max / 2.0);
        assert_eq!(oracle.cast(&Point3::origin(), &Vector3::z(), 10.0, LayerMask::ALL), Some(5.0));
    }

    #[test]
    fn test_tag_serde_names() {
        let json = serde_json::to_string(&Tag::Checkpoint).unwrap();
        assert_eq!(json, "\"checkpoint\"");
        let tag: Tag = serde_json::from_str("\"wall\"").unwrap();
        assert_eq!(tag, Tag::Wall);
    }
}
