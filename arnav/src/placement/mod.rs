//! Waypoint placement.
//!
//! Keeps one sphere node per route step and re-anchors every node on each
//! tick from the latest camera pose and GPS coordinate.
//!
//! # Per-Tick Algorithm
//!
//! ```text
//! camera pose ──► anchor = (camera.x, waypoint.height, camera.z), no rotation
//!                   │
//! GPS coordinate ──►place_at(anchor, coordinate, step.coordinate, max_render_distance)
//!                   │
//!                   └──► node transform (no smoothing)
//! ```
//!
//! Missing pose skips the whole tick. Missing GPS or an invalid step target
//! skips the affected waypoints only.

use std::sync::Arc;

use nalgebra::Vector3;
use parking_lot::Mutex;

use crate::geo::{coordinate_delta, GeoCoordinate};
use crate::location::{Route, RouteStep};
use crate::pose::{place_at, Pose};
use crate::scene::{NodeId, SceneGraph, SceneNode, SceneSessionManager, WAYPOINT_PALETTE};

/// Default clamp on waypoint distance from the camera (meters).
pub const DEFAULT_MAX_RENDER_DISTANCE: f64 = 50.0;

/// Default waypoint sphere radius (meters).
pub const DEFAULT_WAYPOINT_RADIUS: f64 = 0.5;

/// Placement settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementConfig {
    /// Waypoints farther than this are drawn at this distance.
    pub max_render_distance: f64,
    /// Skip recomputation while both the camera and GPS moved less than this
    /// many meters since the last computed tick. `0` recomputes every tick.
    pub recompute_threshold: f64,
    /// Sphere radius of waypoint nodes.
    pub waypoint_radius: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            max_render_distance: DEFAULT_MAX_RENDER_DISTANCE,
            recompute_threshold: 0.0,
            waypoint_radius: DEFAULT_WAYPOINT_RADIUS,
        }
    }
}

/// Scene-side state of one route step.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    /// Node carrying the marker.
    pub node_id: NodeId,
    /// The step this waypoint marks.
    pub step: RouteStep,
    /// Vertical placement in session space.
    pub height: f64,
    /// Last transform assigned to the node.
    pub transform: Option<Pose>,
}

/// Outcome of one [`WaypointPlacementEngine::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReport {
    /// No camera pose yet; nothing touched.
    NoPose,
    /// Below the recompute threshold; nothing touched.
    Unchanged,
    /// Waypoints were processed.
    Placed { placed: usize, skipped: usize },
}

/// Inputs of the last computed tick.
#[derive(Debug, Clone, Copy)]
struct TickInput {
    camera: Vector3<f64>,
    coordinate: GeoCoordinate,
}

/// Re-anchors waypoint nodes as the device moves.
pub struct WaypointPlacementEngine {
    scene: Arc<dyn SceneGraph>,
    config: PlacementConfig,
    waypoints: Mutex<Vec<Waypoint>>,
    last_tick: Mutex<Option<TickInput>>,
}

impl std::fmt::Debug for WaypointPlacementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaypointPlacementEngine")
            .field("config", &self.config)
            .field("waypoints", &self.waypoints.lock().len())
            .finish_non_exhaustive()
    }
}

impl WaypointPlacementEngine {
    pub fn new(scene: Arc<dyn SceneGraph>, config: PlacementConfig) -> Self {
        Self {
            scene,
            config,
            waypoints: Mutex::new(Vec::new()),
            last_tick: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Replace the current waypoints with one node per step of `route`.
    ///
    /// Nodes start at the session's estimated floor height and are coloured
    /// by step index from [`WAYPOINT_PALETTE`].
    pub fn load_route(&self, route: &Route, session: &SceneSessionManager) -> Vec<NodeId> {
        let removed = self.clear_route(session);
        let height = session.estimated_height();

        let waypoints: Vec<Waypoint> = route
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let color = WAYPOINT_PALETTE[index % WAYPOINT_PALETTE.len()];
                let mut node = SceneNode::sphere(self.config.waypoint_radius, color);
                node.transform = Pose::from_translation(0.0, height, 0.0);
                let node_id = node.id;
                session.add_node(node);

                Waypoint {
                    node_id,
                    step: step.clone(),
                    height,
                    transform: None,
                }
            })
            .collect();

        tracing::info!(
            route = %route.name,
            steps = waypoints.len(),
            replaced = removed.len(),
            height,
            "Route loaded"
        );

        let ids = waypoints.iter().map(|w| w.node_id).collect();
        *self.waypoints.lock() = waypoints;
        ids
    }

    /// Remove every waypoint node and return the removed nodes.
    pub fn clear_route(&self, session: &SceneSessionManager) -> Vec<SceneNode> {
        let waypoints = std::mem::take(&mut *self.waypoints.lock());
        *self.last_tick.lock() = None;

        waypoints
            .into_iter()
            .filter_map(|w| session.remove_node(w.node_id))
            .collect()
    }

    /// Move every waypoint to a new floor height, typically
    /// [`SceneSessionManager::estimated_height`] after surfaces changed.
    ///
    /// Heights are fixed at load time otherwise. A change forces the next
    /// tick past the recompute gate. Returns how many waypoints moved.
    pub fn refresh_height(&self, height: f64) -> usize {
        let mut moved = 0;
        for waypoint in self.waypoints.lock().iter_mut() {
            if waypoint.height != height {
                waypoint.height = height;
                moved += 1;
            }
        }
        if moved > 0 {
            *self.last_tick.lock() = None;
            tracing::debug!(height, moved, "Waypoint height refreshed");
        }
        moved
    }

    /// Re-anchor all waypoints for the current camera pose and GPS fix.
    pub fn update(&self, camera: Option<&Pose>, coordinate: Option<GeoCoordinate>) -> TickReport {
        let Some(camera) = camera else {
            tracing::trace!("No camera pose, skipping placement tick");
            return TickReport::NoPose;
        };
        let camera_position = camera.translation();
        let coordinate = coordinate.filter(|c| {
            let valid = c.is_valid();
            if !valid {
                tracing::debug!(coordinate = %c, "Ignoring invalid GPS coordinate");
            }
            valid
        });

        if self.below_threshold(camera_position, coordinate) {
            return TickReport::Unchanged;
        }

        let mut waypoints = self.waypoints.lock();
        let mut placed = 0;
        let mut skipped = 0;

        for waypoint in waypoints.iter_mut() {
            let Some(current) = coordinate else {
                skipped += 1;
                continue;
            };
            if !waypoint.step.coordinate.is_valid() {
                tracing::debug!(
                    node = %waypoint.node_id,
                    target = %waypoint.step.coordinate,
                    "Skipping waypoint with invalid target"
                );
                skipped += 1;
                continue;
            }

            let anchor =
                Pose::from_translation(camera_position.x, waypoint.height, camera_position.z);
            let transform = place_at(
                &anchor,
                &current,
                &waypoint.step.coordinate,
                self.config.max_render_distance,
            );

            if self.scene.set_transform(waypoint.node_id, transform) {
                waypoint.transform = Some(transform);
                placed += 1;
            } else {
                tracing::debug!(node = %waypoint.node_id, "Waypoint node missing from scene");
                skipped += 1;
            }
        }
        drop(waypoints);

        if let Some(coordinate) = coordinate {
            *self.last_tick.lock() = Some(TickInput {
                camera: camera_position,
                coordinate,
            });
        }

        tracing::trace!(placed, skipped, "Placement tick");
        TickReport::Placed { placed, skipped }
    }

    fn below_threshold(&self, camera: Vector3<f64>, coordinate: Option<GeoCoordinate>) -> bool {
        let threshold = self.config.recompute_threshold;
        if threshold <= 0.0 {
            return false;
        }
        let (Some(last), Some(coordinate)) = (*self.last_tick.lock(), coordinate) else {
            return false;
        };
        (camera - last.camera).norm() < threshold
            && coordinate_delta(&last.coordinate, &coordinate) < threshold
    }

    /// Snapshot of the current waypoints.
    pub fn waypoints(&self) -> Vec<Waypoint> {
        self.waypoints.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.waypoints.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.lock().is_empty()
    }
}
