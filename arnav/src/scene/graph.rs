//! Scene-graph abstraction.
//!
//! The core treats nodes as opaque handles with a settable transform. The
//! renderer implements [`SceneGraph`]; [`MemorySceneGraph`] is a plain
//! in-memory implementation for tests, demos and headless replay.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::pose::Pose;

/// Global counter for node identifiers.
static NODE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque scene node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocate a fresh, process-unique id.
    pub fn next() -> Self {
        Self(NODE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// RGBA colour, components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// Waypoint marker palette, cycled by step index.
pub const WAYPOINT_PALETTE: [Color; 6] = [
    Color::rgb(0.96, 0.42, 0.38),
    Color::rgb(0.33, 0.69, 0.96),
    Color::rgb(0.45, 0.83, 0.52),
    Color::rgb(0.99, 0.76, 0.30),
    Color::rgb(0.71, 0.51, 0.93),
    Color::rgb(0.30, 0.85, 0.82),
];

/// Node geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// Sphere marker.
    Sphere { radius: f64 },
    /// Flat rectangle in the node's local XY plane.
    Plane { width: f64, height: f64 },
}

/// Which part of the scene a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeLayer {
    /// Placed content (waypoints, markers).
    Content,
    /// Detected-surface visuals owned by the session.
    Surface,
}

/// A node as seen by the core.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: NodeId,
    pub layer: NodeLayer,
    pub geometry: Geometry,
    pub color: Color,
    pub transform: Pose,
}

impl SceneNode {
    /// Content-layer sphere at the origin.
    pub fn sphere(radius: f64, color: Color) -> Self {
        Self {
            id: NodeId::next(),
            layer: NodeLayer::Content,
            geometry: Geometry::Sphere { radius },
            color,
            transform: Pose::identity(),
        }
    }
}

/// Scene graph operations the core needs.
pub trait SceneGraph: Send + Sync {
    /// Add a node at the root.
    fn add_node(&self, node: SceneNode);

    /// Set a node's transform. Returns `false` if the node is unknown.
    fn set_transform(&self, id: NodeId, transform: Pose) -> bool;

    /// Replace a node's geometry and transform. Returns `false` if unknown.
    fn update_node(&self, node: &SceneNode) -> bool;

    /// Remove one node.
    fn remove_node(&self, id: NodeId) -> Option<SceneNode>;

    /// Remove every node of a layer and return them.
    fn remove_layer(&self, layer: NodeLayer) -> Vec<SceneNode>;
}

/// In-memory scene graph.
#[derive(Debug, Default)]
pub struct MemorySceneGraph {
    nodes: Mutex<Vec<SceneNode>>,
}

impl MemorySceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a node.
    pub fn node(&self, id: NodeId) -> Option<SceneNode> {
        self.nodes.lock().iter().find(|n| n.id == id).cloned()
    }

    /// Snapshot of every node in insertion order.
    pub fn nodes(&self) -> Vec<SceneNode> {
        self.nodes.lock().clone()
    }

    /// Number of nodes in a layer.
    pub fn count(&self, layer: NodeLayer) -> usize {
        self.nodes.lock().iter().filter(|n| n.layer == layer).count()
    }
}

impl SceneGraph for MemorySceneGraph {
    fn add_node(&self, node: SceneNode) {
        let mut nodes = self.nodes.lock();
        match nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => *existing = node,
            None => nodes.push(node),
        }
    }

    fn set_transform(&self, id: NodeId, transform: Pose) -> bool {
        match self.nodes.lock().iter_mut().find(|n| n.id == id) {
            Some(node) => {
                node.transform = transform;
                true
            }
            None => false,
        }
    }

    fn update_node(&self, node: &SceneNode) -> bool {
        match self.nodes.lock().iter_mut().find(|n| n.id == node.id) {
            Some(existing) => {
                *existing = node.clone();
                true
            }
            None => false,
        }
    }

    fn remove_node(&self, id: NodeId) -> Option<SceneNode> {
        let mut nodes = self.nodes.lock();
        let index = nodes.iter().position(|n| n.id == id)?;
        Some(nodes.remove(index))
    }

    fn remove_layer(&self, layer: NodeLayer) -> Vec<SceneNode> {
        let mut nodes = self.nodes.lock();
        let (removed, kept): (Vec<_>, Vec<_>) = nodes.drain(..).partition(|n| n.layer == layer);
        *nodes = kept;
        removed
    }
}
