//! Scene session management.
//!
//! Everything between the visual tracking subsystem and the scene graph:
//!
//! - [`SceneSessionManager`] runs the tracking session lifecycle, feeds the
//!   [`TrackingStateMachine`](crate::tracking::TrackingStateMachine) and keeps
//!   detected surfaces in an [`AnchorBook`].
//! - [`SceneGraph`] is the renderer seam; [`MemorySceneGraph`] implements it
//!   in memory.
//!
//! # Floor Height
//!
//! ```text
//! no surfaces        -> fallback_height (default -1.5 m)
//! surfaces detected  -> min(observed heights)
//! ```

mod anchors;
mod graph;
mod session;

pub use anchors::{AnchorBook, AnchorId, PlaneAnchor, Upsert};
pub use graph::{
    Color, Geometry, MemorySceneGraph, NodeId, NodeLayer, SceneGraph, SceneNode, WAYPOINT_PALETTE,
};
pub use session::{
    PlaneDetection, RunOptions, SceneSessionManager, SessionConfig, TrackingConfiguration,
    TrackingSession, WorldAlignment, DEFAULT_FALLBACK_HEIGHT,
};
