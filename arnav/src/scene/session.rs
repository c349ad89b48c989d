//! Scene session manager.
//!
//! Owns the tracking session handle, the tracking-quality state machine and
//! the surface-anchor bookkeeping. All handlers take `&self` and may be
//! invoked from the tracking subsystem's delivery thread; none of them block
//! on I/O.
//!
//! # Lifecycle
//!
//! ```text
//! launch  -> clear anchors, run(default configuration)
//! pause   -> pause tracking, keep state and anchors
//! reload  -> clear anchors, run(default configuration, reset + remove anchors)
//! ```
//!
//! `reload` runs automatically after an interruption ends or the session
//! fails. It is idempotent and holds no lock while calling the tracking
//! handle, so it is safe to call from a state event subscriber.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::anchors::{AnchorBook, AnchorId, PlaneAnchor, Upsert};
use super::graph::{NodeId, NodeLayer, SceneGraph, SceneNode};
use crate::pose::Pose;
use crate::tracking::{
    Recovery, SessionEvent, SessionState, TrackingQuality, TrackingSignal, TrackingStateMachine,
    DEFAULT_EVENT_CAPACITY,
};

/// Height assumed for the floor before any surface is detected (meters,
/// relative to the session origin, which starts at device height).
pub const DEFAULT_FALLBACK_HEIGHT: f64 = -1.5;

/// How the session aligns its world axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldAlignment {
    /// Y up, −Z true north. Required for geodesic placement.
    GravityAndHeading,
    /// Y up, −Z initial camera direction.
    Gravity,
}

/// Which surfaces the session should detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneDetection {
    None,
    Horizontal,
}

/// Tracking configuration passed to the tracking subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingConfiguration {
    pub light_estimation: bool,
    pub world_alignment: WorldAlignment,
    pub plane_detection: PlaneDetection,
}

impl Default for TrackingConfiguration {
    fn default() -> Self {
        Self {
            light_estimation: true,
            world_alignment: WorldAlignment::GravityAndHeading,
            plane_detection: PlaneDetection::Horizontal,
        }
    }
}

/// Options for (re)running a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub reset_tracking: bool,
    pub remove_existing_anchors: bool,
}

impl RunOptions {
    /// Plain run, keep everything.
    pub const NONE: RunOptions = RunOptions {
        reset_tracking: false,
        remove_existing_anchors: false,
    };

    /// Fresh start used by reload.
    pub const RESET: RunOptions = RunOptions {
        reset_tracking: true,
        remove_existing_anchors: true,
    };
}

/// Handle to the visual tracking subsystem.
pub trait TrackingSession: Send + Sync {
    /// Whether world tracking is available on this device.
    fn is_supported(&self) -> bool;

    /// Start or restart tracking.
    fn run(&self, configuration: &TrackingConfiguration, options: RunOptions);

    /// Stop tracking, keep state.
    fn pause(&self);

    /// Camera transform of the latest frame, if any.
    fn current_camera_transform(&self) -> Option<Pose>;
}

/// Session manager settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Height returned by `estimated_height` before any surface is known.
    pub fallback_height: f64,
    /// Attach floor visuals to the scene.
    pub display_floor: bool,
    /// Capacity of the state event channel.
    pub event_capacity: usize,
    /// Configuration used for every run.
    pub tracking: TrackingConfiguration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fallback_height: DEFAULT_FALLBACK_HEIGHT,
            display_floor: true,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            tracking: TrackingConfiguration::default(),
        }
    }
}

/// Orchestrates the tracking session, its state and detected surfaces.
pub struct SceneSessionManager {
    tracking: Arc<dyn TrackingSession>,
    scene: Arc<dyn SceneGraph>,
    machine: TrackingStateMachine,
    anchors: Mutex<AnchorBook>,
    last_quality: Mutex<Option<TrackingQuality>>,
    config: SessionConfig,
}

impl std::fmt::Debug for SceneSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneSessionManager")
            .field("state", &self.machine.state())
            .field("anchors", &self.anchors.lock().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SceneSessionManager {
    /// Create a manager for the given tracking handle and scene graph.
    pub fn new(
        tracking: Arc<dyn TrackingSession>,
        scene: Arc<dyn SceneGraph>,
        config: SessionConfig,
    ) -> Self {
        Self {
            tracking,
            scene,
            machine: TrackingStateMachine::new(config.event_capacity),
            anchors: Mutex::new(AnchorBook::default()),
            last_quality: Mutex::new(None),
            config,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Clear anchor bookkeeping and start tracking.
    pub fn launch(&self) {
        if !self.supported("launch") {
            return;
        }
        self.discard_anchors();
        tracing::info!("Launching tracking session");
        self.tracking.run(&self.config.tracking, RunOptions::NONE);
    }

    /// Stop tracking; state and anchors are preserved.
    pub fn pause(&self) {
        if !self.supported("pause") {
            return;
        }
        tracing::info!("Pausing tracking session");
        self.tracking.pause();
    }

    /// Reset tracking and discard all anchors.
    pub fn reload(&self) {
        if !self.supported("reload") {
            return;
        }
        let discarded = self.discard_anchors();
        tracing::info!(discarded_anchors = discarded, "Reloading tracking session");
        self.tracking.run(&self.config.tracking, RunOptions::RESET);
    }

    fn supported(&self, operation: &'static str) -> bool {
        let supported = self.tracking.is_supported();
        if !supported {
            tracing::warn!(operation, "World tracking not supported on this device");
        }
        supported
    }

    /// Clear the book and detach floor visuals. Returns how many anchors went.
    fn discard_anchors(&self) -> usize {
        let floors = self.anchors.lock().clear();
        let count = floors.len();
        for floor in floors {
            self.scene.remove_node(floor.id);
        }
        count
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State
    // ─────────────────────────────────────────────────────────────────────────

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    /// Subscribe to session state events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.machine.subscribe()
    }

    /// Camera tracking quality changed.
    pub fn on_tracking_quality(&self, quality: TrackingQuality) {
        *self.last_quality.lock() = Some(quality);
        self.signal(TrackingSignal::Quality(quality));
    }

    /// Session was interrupted.
    pub fn on_interrupted(&self) {
        self.signal(TrackingSignal::Interrupted);
    }

    /// Interruption is over; the session reloads itself.
    pub fn on_interruption_ended(&self) {
        self.signal(TrackingSignal::InterruptionEnded);
    }

    /// Session failed; the session reloads itself.
    pub fn on_failed(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(%reason, "Tracking session failed");
        self.signal(TrackingSignal::Failed(reason));
    }

    fn signal(&self, signal: TrackingSignal) {
        let has_anchors = !self.anchors.lock().is_empty();
        let transition = self.machine.handle(&signal, has_anchors);
        if transition.recovery == Recovery::Reload {
            self.reload();
        }
    }

    /// Re-evaluate the state after the anchor set changed.
    fn reevaluate(&self) {
        let quality = *self.last_quality.lock();
        if let Some(quality) = quality {
            self.signal(TrackingSignal::Quality(quality));
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Anchors
    // ─────────────────────────────────────────────────────────────────────────

    /// A surface was detected.
    pub fn on_anchor_added(&self, anchor: &PlaneAnchor) {
        self.apply_anchor(anchor);
        self.reevaluate();
    }

    /// A surface changed. Unknown anchors are treated as new.
    pub fn on_anchor_updated(&self, anchor: &PlaneAnchor) {
        if let Upsert::Added(_) = self.apply_anchor(anchor) {
            self.reevaluate();
        }
    }

    /// A surface disappeared.
    pub fn on_anchor_removed(&self, id: &AnchorId) {
        let floor = self.anchors.lock().remove(id);
        match floor {
            Some(floor) => {
                self.scene.remove_node(floor.id);
                tracing::debug!(anchor = %id, "Surface removed");
            }
            None => tracing::debug!(anchor = %id, "Removal for unknown surface ignored"),
        }
        self.reevaluate();
    }

    fn apply_anchor(&self, anchor: &PlaneAnchor) -> Upsert {
        let upsert = self.anchors.lock().upsert(anchor);
        match &upsert {
            Upsert::Added(floor) => {
                tracing::debug!(anchor = %anchor.id, height = anchor.height(), "Surface detected");
                if self.config.display_floor {
                    self.scene.add_node(floor.clone());
                    self.detach_if_discarded(&anchor.id, floor.id);
                }
            }
            Upsert::Updated(floor) => {
                tracing::trace!(anchor = %anchor.id, height = anchor.height(), "Surface updated");
                if self.config.display_floor {
                    self.scene.update_node(floor);
                }
            }
        }
        upsert
    }

    /// Drop a just-attached floor whose anchor was removed or discarded
    /// before the attach landed.
    fn detach_if_discarded(&self, id: &AnchorId, node: NodeId) {
        let owned = self.anchors.lock().floor(id).map(|f| f.id) == Some(node);
        if !owned {
            self.scene.remove_node(node);
            tracing::debug!(anchor = %id, "Detached floor of discarded surface");
        }
    }

    /// Lowest detected surface height, or the configured fallback.
    pub fn estimated_height(&self) -> f64 {
        self.anchors
            .lock()
            .min_height()
            .unwrap_or(self.config.fallback_height)
    }

    /// Number of known surfaces.
    pub fn anchor_count(&self) -> usize {
        self.anchors.lock().len()
    }

    /// Known surface ids, sorted.
    pub fn anchor_ids(&self) -> Vec<AnchorId> {
        self.anchors.lock().ids()
    }

    /// Floor visual of a surface.
    pub fn floor_node(&self, id: &AnchorId) -> Option<SceneNode> {
        self.anchors.lock().floor(id).cloned()
    }

    /// Whether the height and floor maps hold the same keys.
    pub fn anchors_consistent(&self) -> bool {
        self.anchors.lock().is_consistent()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scene pass-through
    // ─────────────────────────────────────────────────────────────────────────

    /// Camera transform of the latest frame.
    pub fn current_camera_transform(&self) -> Option<Pose> {
        self.tracking.current_camera_transform()
    }

    /// Shared handle to the scene graph.
    pub fn scene(&self) -> Arc<dyn SceneGraph> {
        Arc::clone(&self.scene)
    }

    pub fn add_node(&self, node: SceneNode) {
        self.scene.add_node(node);
    }

    pub fn add_nodes(&self, nodes: impl IntoIterator<Item = SceneNode>) {
        for node in nodes {
            self.add_node(node);
        }
    }

    pub fn remove_node(&self, id: NodeId) -> Option<SceneNode> {
        self.scene.remove_node(id)
    }

    /// Remove all placed content and return it. Surface visuals stay.
    pub fn remove_all_nodes(&self) -> Vec<SceneNode> {
        self.scene.remove_layer(NodeLayer::Content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::graph::{Color, MemorySceneGraph};
    use crate::tracking::LimitedReason;

    #[derive(Default)]
    struct RecordingTracking {
        unsupported: bool,
        runs: Mutex<Vec<RunOptions>>,
        pauses: Mutex<usize>,
    }

    impl TrackingSession for RecordingTracking {
        fn is_supported(&self) -> bool {
            !self.unsupported
        }

        fn run(&self, _configuration: &TrackingConfiguration, options: RunOptions) {
            self.runs.lock().push(options);
        }

        fn pause(&self) {
            *self.pauses.lock() += 1;
        }

        fn current_camera_transform(&self) -> Option<Pose> {
            None
        }
    }

    fn manager() -> (SceneSessionManager, Arc<RecordingTracking>, Arc<MemorySceneGraph>) {
        let tracking = Arc::new(RecordingTracking::default());
        let scene = Arc::new(MemorySceneGraph::new());
        let manager = SceneSessionManager::new(
            tracking.clone(),
            scene.clone(),
            SessionConfig::default(),
        );
        (manager, tracking, scene)
    }

    #[test]
    fn test_estimated_height_fallback() {
        let (manager, _, _) = manager();
        assert_eq!(manager.estimated_height(), DEFAULT_FALLBACK_HEIGHT);
    }

    #[test]
    fn test_anchor_lifecycle_updates_scene() {
        let (manager, _, scene) = manager();

        manager.on_anchor_added(&PlaneAnchor::at_height("A1", -1.4, 2.0, 2.0));
        assert_eq!(scene.count(NodeLayer::Surface), 1);
        assert_eq!(manager.estimated_height(), -1.4);

        manager.on_anchor_updated(&PlaneAnchor::at_height("A1", -1.3, 3.0, 3.0));
        assert_eq!(scene.count(NodeLayer::Surface), 1);
        assert_eq!(manager.estimated_height(), -1.3);

        manager.on_anchor_removed(&"A1".into());
        assert_eq!(scene.count(NodeLayer::Surface), 0);
        assert_eq!(manager.anchor_count(), 0);
        assert!(manager.anchors_consistent());
    }

    #[test]
    fn test_update_for_unknown_anchor_is_an_add() {
        let (manager, _, _) = manager();
        manager.on_tracking_quality(TrackingQuality::Normal);
        assert_eq!(manager.state(), SessionState::NormalNoAnchors);

        manager.on_anchor_updated(&PlaneAnchor::at_height("ghost", -1.0, 1.0, 1.0));

        assert_eq!(manager.anchor_count(), 1);
        assert!(manager.floor_node(&"ghost".into()).is_some());
        assert!(manager.anchors_consistent());
        assert_eq!(
            manager.state(),
            SessionState::Normal,
            "an update that adds a surface should leave the no-anchors state"
        );
    }

    /// Scene graph that runs a hook just before a node is attached.
    #[derive(Default)]
    struct HookedScene {
        inner: MemorySceneGraph,
        on_add: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl SceneGraph for HookedScene {
        fn add_node(&self, node: SceneNode) {
            let hook = self.on_add.lock().take();
            if let Some(hook) = hook {
                hook();
            }
            self.inner.add_node(node);
        }

        fn set_transform(&self, id: NodeId, transform: Pose) -> bool {
            self.inner.set_transform(id, transform)
        }

        fn update_node(&self, node: &SceneNode) -> bool {
            self.inner.update_node(node)
        }

        fn remove_node(&self, id: NodeId) -> Option<SceneNode> {
            self.inner.remove_node(id)
        }

        fn remove_layer(&self, layer: NodeLayer) -> Vec<SceneNode> {
            self.inner.remove_layer(layer)
        }
    }

    fn hooked_manager() -> (Arc<SceneSessionManager>, Arc<HookedScene>) {
        let scene = Arc::new(HookedScene::default());
        let manager = Arc::new(SceneSessionManager::new(
            Arc::new(RecordingTracking::default()),
            scene.clone(),
            SessionConfig::default(),
        ));
        (manager, scene)
    }

    #[test]
    fn test_reload_during_floor_attach_leaves_no_orphan() {
        let (manager, scene) = hooked_manager();
        // Scene graphs never call back into the session; the hook stands in
        // for a reload issued from another thread mid-attach.
        let weak = Arc::downgrade(&manager);
        *scene.on_add.lock() = Some(Box::new(move || {
            if let Some(manager) = weak.upgrade() {
                manager.reload();
            }
        }));

        manager.on_anchor_added(&PlaneAnchor::at_height("A1", -1.4, 2.0, 2.0));

        assert_eq!(manager.anchor_count(), 0);
        assert_eq!(
            scene.inner.count(NodeLayer::Surface),
            0,
            "floor of a discarded surface must not stay in the scene"
        );
    }

    #[test]
    fn test_removal_during_floor_attach_leaves_no_orphan() {
        let (manager, scene) = hooked_manager();
        let weak = Arc::downgrade(&manager);
        *scene.on_add.lock() = Some(Box::new(move || {
            if let Some(manager) = weak.upgrade() {
                manager.on_anchor_removed(&"A1".into());
            }
        }));

        manager.on_anchor_added(&PlaneAnchor::at_height("A1", -1.4, 2.0, 2.0));

        assert_eq!(manager.anchor_count(), 0);
        assert_eq!(scene.inner.count(NodeLayer::Surface), 0);
        assert!(manager.anchors_consistent());
    }

    #[test]
    fn test_attached_floor_survives_recheck() {
        let (manager, scene) = hooked_manager();
        manager.on_anchor_added(&PlaneAnchor::at_height("A1", -1.4, 2.0, 2.0));

        assert_eq!(scene.inner.count(NodeLayer::Surface), 1);
        assert_eq!(manager.anchor_count(), 1);
    }

    #[test]
    fn test_floor_hidden_when_display_disabled() {
        let scene = Arc::new(MemorySceneGraph::new());
        let manager = SceneSessionManager::new(
            Arc::new(RecordingTracking::default()),
            scene.clone(),
            SessionConfig {
                display_floor: false,
                ..Default::default()
            },
        );

        manager.on_anchor_added(&PlaneAnchor::at_height("A1", -1.4, 2.0, 2.0));
        assert_eq!(scene.count(NodeLayer::Surface), 0);
        assert!(manager.floor_node(&"A1".into()).is_some());
    }

    #[test]
    fn test_launch_clears_anchors() {
        let (manager, tracking, scene) = manager();
        manager.on_anchor_added(&PlaneAnchor::at_height("A1", -1.4, 2.0, 2.0));

        manager.launch();

        assert_eq!(manager.anchor_count(), 0);
        assert_eq!(scene.count(NodeLayer::Surface), 0);
        assert_eq!(*tracking.runs.lock(), vec![RunOptions::NONE]);
    }

    #[test]
    fn test_pause_keeps_anchors() {
        let (manager, tracking, _) = manager();
        manager.on_anchor_added(&PlaneAnchor::at_height("A1", -1.4, 2.0, 2.0));

        manager.pause();

        assert_eq!(manager.anchor_count(), 1);
        assert_eq!(*tracking.pauses.lock(), 1);
    }

    #[test]
    fn test_failure_triggers_reload() {
        let (manager, tracking, _) = manager();
        manager.on_anchor_added(&PlaneAnchor::at_height("A1", -1.4, 2.0, 2.0));

        manager.on_failed("camera lost");

        assert_eq!(manager.state(), SessionState::Failed("camera lost".into()));
        assert_eq!(manager.anchor_count(), 0);
        assert_eq!(*tracking.runs.lock(), vec![RunOptions::RESET]);
    }

    #[test]
    fn test_interruption_end_triggers_reload() {
        let (manager, tracking, _) = manager();

        manager.on_interrupted();
        assert!(tracking.runs.lock().is_empty());

        manager.on_interruption_ended();
        assert_eq!(manager.state(), SessionState::InterruptionEnded);
        assert_eq!(*tracking.runs.lock(), vec![RunOptions::RESET]);
    }

    #[test]
    fn test_reload_is_idempotent() {
        let (manager, tracking, _) = manager();
        manager.on_anchor_added(&PlaneAnchor::at_height("A1", -1.4, 2.0, 2.0));

        manager.reload();
        manager.reload();

        assert_eq!(manager.anchor_count(), 0);
        assert_eq!(
            *tracking.runs.lock(),
            vec![RunOptions::RESET, RunOptions::RESET]
        );
    }

    #[test]
    fn test_unsupported_device_is_noop() {
        let tracking = Arc::new(RecordingTracking {
            unsupported: true,
            ..Default::default()
        });
        let manager = SceneSessionManager::new(
            tracking.clone(),
            Arc::new(MemorySceneGraph::new()),
            SessionConfig::default(),
        );

        manager.launch();
        manager.pause();
        manager.reload();

        assert!(tracking.runs.lock().is_empty());
        assert_eq!(*tracking.pauses.lock(), 0);
    }

    #[test]
    fn test_anchor_change_reevaluates_normal_state() {
        let (manager, _, _) = manager();

        manager.on_tracking_quality(TrackingQuality::Normal);
        assert_eq!(manager.state(), SessionState::NormalNoAnchors);

        manager.on_anchor_added(&PlaneAnchor::at_height("A1", -1.4, 2.0, 2.0));
        assert_eq!(manager.state(), SessionState::Normal);

        manager.on_anchor_removed(&"A1".into());
        assert_eq!(manager.state(), SessionState::NormalNoAnchors);
    }

    #[test]
    fn test_limited_state_ignores_anchor_count() {
        let (manager, _, _) = manager();
        manager.on_tracking_quality(TrackingQuality::Limited(LimitedReason::InsufficientFeatures));
        manager.on_anchor_added(&PlaneAnchor::at_height("A1", -1.4, 2.0, 2.0));
        assert_eq!(manager.state(), SessionState::LimitedInsufficientFeatures);
    }

    #[test]
    fn test_remove_all_nodes_keeps_surfaces() {
        let (manager, _, scene) = manager();
        manager.on_anchor_added(&PlaneAnchor::at_height("A1", -1.4, 2.0, 2.0));
        manager.add_nodes(vec![
            SceneNode::sphere(0.5, Color::WHITE),
            SceneNode::sphere(0.5, Color::WHITE),
        ]);

        let removed = manager.remove_all_nodes();

        assert_eq!(removed.len(), 2);
        assert_eq!(scene.count(NodeLayer::Content), 0);
        assert_eq!(scene.count(NodeLayer::Surface), 1);
    }

    #[test]
    fn test_reload_from_event_subscriber_does_not_deadlock() {
        let (manager, tracking, _) = manager();
        let manager = Arc::new(manager);
        let mut events = manager.subscribe();

        manager.on_interrupted();

        // A subscriber reacting to the event by reloading
        let event = events.try_recv().unwrap();
        assert_eq!(event.current, SessionState::Interrupted);
        manager.reload();

        assert_eq!(tracking.runs.lock().len(), 1);
    }
}
