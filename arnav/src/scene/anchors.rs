//! Detected-surface bookkeeping.
//!
//! Each detected horizontal plane contributes an observed floor height and
//! a translucent floor visual. Both live in one [`AnchorBook`] so their key
//! sets cannot drift apart.

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use super::graph::{Color, Geometry, NodeId, NodeLayer, SceneNode};
use crate::pose::{translate, Pose};

/// Opacity of floor visuals.
const FLOOR_ALPHA: f32 = 0.2;

/// Provider-assigned anchor identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(String);

impl AnchorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnchorId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A horizontal plane reported by the tracking subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneAnchor {
    /// Anchor identity.
    pub id: AnchorId,
    /// Anchor pose in session space. Its Y translation is the plane height.
    pub transform: Pose,
    /// Plane centre relative to the anchor.
    pub center: Vector3<f64>,
    /// Plane size along the anchor's X and Z axes (Y unused).
    pub extent: Vector3<f64>,
}

impl PlaneAnchor {
    /// Anchor sitting at `height` with the given footprint, centred on it.
    pub fn at_height(id: impl Into<AnchorId>, height: f64, width: f64, depth: f64) -> Self {
        Self {
            id: id.into(),
            transform: Pose::from_translation(0.0, height, 0.0),
            center: Vector3::zeros(),
            extent: Vector3::new(width, 0.0, depth),
        }
    }

    /// Observed height of the plane.
    pub fn height(&self) -> f64 {
        self.transform.translation().y
    }

    /// World transform of the floor visual: at the plane centre, lying flat.
    pub fn floor_transform(&self) -> Pose {
        translate(&self.transform, Vector3::new(self.center.x, 0.0, self.center.z))
            .then(&Pose::from_pitch(-FRAC_PI_2))
    }

    fn floor_geometry(&self) -> Geometry {
        Geometry::Plane {
            width: self.extent.x,
            height: self.extent.z,
        }
    }
}

impl From<String> for AnchorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Heights and floor visuals keyed by anchor.
#[derive(Debug, Default)]
pub struct AnchorBook {
    heights: HashMap<AnchorId, f64>,
    floors: HashMap<AnchorId, SceneNode>,
}

/// Outcome of [`AnchorBook::upsert`].
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert {
    /// First sighting; the new floor visual.
    Added(SceneNode),
    /// Known anchor; the floor visual after the update.
    Updated(SceneNode),
}

impl AnchorBook {
    /// Record or refresh an anchor, creating its floor visual on first sight.
    pub fn upsert(&mut self, anchor: &PlaneAnchor) -> Upsert {
        self.heights.insert(anchor.id.clone(), anchor.height());

        match self.floors.get_mut(&anchor.id) {
            Some(floor) => {
                floor.geometry = anchor.floor_geometry();
                floor.transform = anchor.floor_transform();
                Upsert::Updated(floor.clone())
            }
            None => {
                let floor = SceneNode {
                    id: NodeId::next(),
                    layer: NodeLayer::Surface,
                    geometry: anchor.floor_geometry(),
                    color: Color::WHITE.with_alpha(FLOOR_ALPHA),
                    transform: anchor.floor_transform(),
                };
                self.floors.insert(anchor.id.clone(), floor.clone());
                Upsert::Added(floor)
            }
        }
    }

    /// Forget an anchor; returns its floor visual.
    pub fn remove(&mut self, id: &AnchorId) -> Option<SceneNode> {
        self.heights.remove(id);
        self.floors.remove(id)
    }

    /// Forget everything; returns all floor visuals.
    pub fn clear(&mut self) -> Vec<SceneNode> {
        self.heights.clear();
        self.floors.drain().map(|(_, floor)| floor).collect()
    }

    /// Lowest observed height, if any anchor is known.
    pub fn min_height(&self) -> Option<f64> {
        self.heights.values().copied().reduce(f64::min)
    }

    /// Observed height of one anchor.
    pub fn height(&self, id: &AnchorId) -> Option<f64> {
        self.heights.get(id).copied()
    }

    /// Floor visual of one anchor.
    pub fn floor(&self, id: &AnchorId) -> Option<&SceneNode> {
        self.floors.get(id)
    }

    /// Number of known anchors.
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Known anchor ids, sorted.
    pub fn ids(&self) -> Vec<AnchorId> {
        let mut ids: Vec<_> = self.heights.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether both maps hold exactly the same keys.
    pub fn is_consistent(&self) -> bool {
        self.heights.len() == self.floors.len()
            && self.heights.keys().all(|k| self.floors.contains_key(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_adds_then_updates() {
        let mut book = AnchorBook::default();
        let mut anchor = PlaneAnchor::at_height("A1", -1.4, 2.0, 3.0);

        let floor = match book.upsert(&anchor) {
            Upsert::Added(floor) => floor,
            other => panic!("expected Added, got {:?}", other),
        };
        assert_eq!(
            floor.geometry,
            Geometry::Plane {
                width: 2.0,
                height: 3.0
            }
        );
        assert_eq!(floor.layer, NodeLayer::Surface);

        anchor.extent = Vector3::new(4.0, 0.0, 5.0);
        anchor.transform = Pose::from_translation(0.0, -1.45, 0.0);
        match book.upsert(&anchor) {
            Upsert::Updated(updated) => {
                assert_eq!(updated.id, floor.id, "floor visual identity is stable");
                assert_eq!(
                    updated.geometry,
                    Geometry::Plane {
                        width: 4.0,
                        height: 5.0
                    }
                );
            }
            other => panic!("expected Updated, got {:?}", other),
        }
        assert_eq!(book.height(&"A1".into()), Some(-1.45));
        assert!(book.is_consistent());
    }

    #[test]
    fn test_min_height() {
        let mut book = AnchorBook::default();
        assert_eq!(book.min_height(), None);

        book.upsert(&PlaneAnchor::at_height("A1", -1.4, 1.0, 1.0));
        book.upsert(&PlaneAnchor::at_height("A2", -1.6, 1.0, 1.0));
        assert_eq!(book.min_height(), Some(-1.6));

        book.remove(&"A2".into());
        assert_eq!(book.min_height(), Some(-1.4));
        assert!(book.is_consistent());
    }

    #[test]
    fn test_clear_returns_floors() {
        let mut book = AnchorBook::default();
        book.upsert(&PlaneAnchor::at_height("A1", -1.0, 1.0, 1.0));
        book.upsert(&PlaneAnchor::at_height("A2", -1.0, 1.0, 1.0));

        let floors = book.clear();
        assert_eq!(floors.len(), 2);
        assert!(book.is_empty());
        assert!(book.is_consistent());
    }

    #[test]
    fn test_floor_transform_lies_flat_at_centre() {
        let anchor = PlaneAnchor {
            id: "A1".into(),
            transform: Pose::from_translation(1.0, -1.5, 2.0),
            center: Vector3::new(0.5, 0.0, -0.5),
            extent: Vector3::new(1.0, 0.0, 1.0),
        };

        let t = anchor.floor_transform();
        let translation = t.translation();
        assert!((translation - Vector3::new(1.5, -1.5, 1.5)).norm() < 1e-12);

        // The plane's local +Z normal must point up after the pitch
        let normal = t.rotation() * Vector3::z();
        assert!((normal - Vector3::y()).norm() < 1e-12);
    }
}
