//! `arnav simulate`: replay a recorded scenario headlessly.
//!
//! A scenario is a JSON file with an origin, a route and an ordered list of
//! events. Tracking, anchor, camera and GPS events are fed to the session and
//! location managers; every `tick` runs one placement pass and prints the
//! waypoint positions.
//!
//! ```json
//! {
//!   "origin": { "latitude": 53.5461, "longitude": 9.9661 },
//!   "route": { "name": "harbour", "steps": [
//!     { "coordinate": { "latitude": 53.5463, "longitude": 9.9661 }, "instructions": "Head north" }
//!   ] },
//!   "events": [
//!     { "tracking": { "limited": "initializing" } },
//!     { "anchor_added": { "id": "floor", "height": -1.4 } },
//!     { "tracking": "normal" },
//!     { "fix": { "latitude": 53.5461, "longitude": 9.9661 } },
//!     { "camera": { "x": 0.0, "y": 0.0, "z": 0.0, "yaw_deg": 0.0 } },
//!     "tick"
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use nalgebra::Vector3;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info};

use arnav::config::ConfigFile;
use arnav::geo::deg_to_rad;
use arnav::location::{
    AuthorizationStatus, BoxFuture, DirectionsProvider, DirectionsRequest, LocationFix,
    LocationServiceManager, LocationSource, ProviderError, Route, TokioExecutor,
};
use arnav::placement::{TickReport, WaypointPlacementEngine};
use arnav::pose::Pose;
use arnav::scene::{
    AnchorId, MemorySceneGraph, PlaneAnchor, RunOptions, SceneSessionManager,
    TrackingConfiguration, TrackingSession,
};
use arnav::tracking::{SessionEvent, TrackingQuality};
use arnav::GeoCoordinate;

use crate::error::CliError;

/// How long to wait for the directions callback.
const DIRECTIONS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Scenario file (JSON)
    pub scenario: PathBuf,
}

/// Recorded scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Where directions are requested from.
    pub origin: GeoCoordinate,
    /// Route the directions provider answers with.
    pub route: Route,
    pub events: Vec<ScenarioEvent>,
}

/// Surface anchor as recorded.
#[derive(Debug, Clone, Deserialize)]
pub struct AnchorSpec {
    pub id: String,
    pub height: f64,
    #[serde(default = "default_extent")]
    pub width: f64,
    #[serde(default = "default_extent")]
    pub depth: f64,
}

fn default_extent() -> f64 {
    1.0
}

/// Camera position and heading in session space.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CameraSpec {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub yaw_deg: f64,
}

impl CameraSpec {
    fn pose(&self) -> Pose {
        Pose::from_yaw(deg_to_rad(self.yaw_deg)).with_translation(Vector3::new(self.x, self.y, self.z))
    }
}

/// One recorded event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioEvent {
    Tracking(TrackingQuality),
    Interrupted,
    InterruptionEnded,
    Failed(String),
    AnchorAdded(AnchorSpec),
    AnchorUpdated(AnchorSpec),
    AnchorRemoved(String),
    Camera(CameraSpec),
    Fix(GeoCoordinate),
    Tick,
}

/// Tracking handle replaying recorded camera poses.
#[derive(Default)]
struct ReplayTracking {
    camera: Mutex<Option<Pose>>,
}

impl TrackingSession for ReplayTracking {
    fn is_supported(&self) -> bool {
        true
    }

    fn run(&self, _configuration: &TrackingConfiguration, options: RunOptions) {
        if options.reset_tracking {
            *self.camera.lock() = None;
        }
    }

    fn pause(&self) {}

    fn current_camera_transform(&self) -> Option<Pose> {
        *self.camera.lock()
    }
}

/// Location source that is always authorized.
struct ReplaySource;

impl LocationSource for ReplaySource {
    fn authorization_status(&self) -> AuthorizationStatus {
        AuthorizationStatus::Authorized
    }
    fn request_authorization(&self) {}
    fn start_updates(&self) {}
    fn stop_updates(&self) {}
}

/// Directions provider answering with the recorded route.
struct RecordedDirections {
    route: Route,
}

impl DirectionsProvider for RecordedDirections {
    fn compute_routes(
        &self,
        _request: DirectionsRequest,
    ) -> BoxFuture<'_, Result<Vec<Route>, ProviderError>> {
        let route = self.route.clone();
        Box::pin(async move { Ok(vec![route]) })
    }
}

/// Read and parse a scenario file.
pub fn load_scenario(path: &Path) -> Result<Scenario, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::Scenario(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::Scenario(format!("{}: {}", path.display(), e)))
}

pub fn run(args: &SimulateArgs, config: &ConfigFile) -> Result<(), CliError> {
    let scenario = load_scenario(&args.scenario)?;
    info!(
        path = %args.scenario.display(),
        events = scenario.events.len(),
        "Replaying scenario"
    );
    for line in replay(&scenario, config)? {
        println!("{}", line);
    }
    Ok(())
}

/// Replay a scenario and return the printed transcript.
pub fn replay(scenario: &Scenario, config: &ConfigFile) -> Result<Vec<String>, CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let tracking = Arc::new(ReplayTracking::default());
    let scene = Arc::new(MemorySceneGraph::new());
    let session = SceneSessionManager::new(tracking.clone(), scene.clone(), config.session.clone());
    let engine = WaypointPlacementEngine::new(scene, config.placement.clone());
    let location = LocationServiceManager::new(
        Arc::new(ReplaySource),
        Arc::new(TokioExecutor::new(runtime.handle().clone())),
        config.location.clone(),
    )
    .with_directions(Arc::new(RecordedDirections {
        route: scenario.route.clone(),
    }));

    let mut out = Vec::new();
    let mut states = session.subscribe();

    let destination = scenario
        .route
        .steps
        .last()
        .map(|s| s.coordinate)
        .ok_or_else(|| CliError::Scenario("route has no steps".to_string()))?;
    let route = request_route(&location, scenario.origin, destination)?;
    engine.load_route(&route, &session);
    out.push(format!(
        "route '{}': {} steps, floor at {:.2} m",
        route.name,
        route.steps.len(),
        session.estimated_height()
    ));

    session.launch();
    location.launch_updating();

    for event in &scenario.events {
        debug!(?event, "Scenario event");
        match event {
            ScenarioEvent::Tracking(quality) => session.on_tracking_quality(*quality),
            ScenarioEvent::Interrupted => session.on_interrupted(),
            ScenarioEvent::InterruptionEnded => session.on_interruption_ended(),
            ScenarioEvent::Failed(reason) => session.on_failed(reason.clone()),
            ScenarioEvent::AnchorAdded(spec) => session.on_anchor_added(&anchor(spec)),
            ScenarioEvent::AnchorUpdated(spec) => session.on_anchor_updated(&anchor(spec)),
            ScenarioEvent::AnchorRemoved(id) => session.on_anchor_removed(&AnchorId::new(id.clone())),
            ScenarioEvent::Camera(spec) => *tracking.camera.lock() = Some(spec.pose()),
            ScenarioEvent::Fix(coordinate) => location.on_locations(&[LocationFix::new(*coordinate)]),
            ScenarioEvent::Tick => {
                engine.refresh_height(session.estimated_height());
                let report = engine.update(
                    session.current_camera_transform().as_ref(),
                    location.current_coordinate(),
                );
                out.push(describe_tick(report));
                if matches!(report, TickReport::Placed { .. }) {
                    for (index, waypoint) in engine.waypoints().iter().enumerate() {
                        if let Some(transform) = waypoint.transform {
                            let t = transform.translation();
                            out.push(format!(
                                "  #{} {:<24} x={:>7.2} y={:>6.2} z={:>7.2}",
                                index, waypoint.step.instructions, t.x, t.y, t.z
                            ));
                        }
                    }
                }
            }
        }

        while let Ok(SessionEvent { previous, current }) = states.try_recv() {
            if previous != current {
                out.push(format!("state {} -> {}: {}", previous, current, current.hint()));
            }
        }
    }

    Ok(out)
}

fn anchor(spec: &AnchorSpec) -> PlaneAnchor {
    PlaneAnchor::at_height(spec.id.as_str(), spec.height, spec.width, spec.depth)
}

fn describe_tick(report: TickReport) -> String {
    match report {
        TickReport::NoPose => "tick: no camera pose".to_string(),
        TickReport::Unchanged => "tick: unchanged".to_string(),
        TickReport::Placed { placed, skipped } => {
            format!("tick: placed {}, skipped {}", placed, skipped)
        }
    }
}

fn request_route(
    location: &LocationServiceManager,
    origin: GeoCoordinate,
    destination: GeoCoordinate,
) -> Result<Route, CliError> {
    let (tx, rx) = mpsc::channel();
    location.request_directions(origin, destination, Default::default(), move |result| {
        let _ = tx.send(result);
    });

    match rx.recv_timeout(DIRECTIONS_TIMEOUT) {
        Ok(Ok(Some(route))) => Ok(route),
        Ok(Ok(None)) => Err(CliError::Scenario("no route found".to_string())),
        Ok(Err(e)) => Err(CliError::Scenario(format!("directions failed: {}", e))),
        Err(_) => Err(CliError::Scenario("directions request timed out".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "origin": { "latitude": 0.0, "longitude": 0.0 },
        "route": {
            "name": "north then east",
            "steps": [
                { "coordinate": { "latitude": 0.0002, "longitude": 0.0 }, "instructions": "Head north" },
                { "coordinate": { "latitude": 1.0, "longitude": 0.0 }, "instructions": "Keep going" }
            ]
        },
        "events": [
            { "tracking": { "limited": "initializing" } },
            "tick",
            { "anchor_added": { "id": "floor", "height": -1.4 } },
            { "tracking": "normal" },
            { "fix": { "latitude": 0.0, "longitude": 0.0 } },
            { "camera": { "x": 0.0, "y": 0.0, "z": 0.0 } },
            "tick",
            { "tracking": { "limited": "excessive_motion" } },
            { "anchor_removed": "floor" }
        ]
    }"#;

    #[test]
    fn test_scenario_replay() {
        let scenario: Scenario = serde_json::from_str(SCENARIO).unwrap();
        let transcript = replay(&scenario, &ConfigFile::default()).unwrap();

        assert!(transcript[0].starts_with("route 'north then east': 2 steps"));
        assert!(transcript.contains(&"tick: no camera pose".to_string()));
        assert!(transcript.contains(&"tick: placed 2, skipped 0".to_string()));
        assert!(transcript
            .iter()
            .any(|l| l.contains("normal") && l.contains("AR session prepared.")));
        // The far step is clamped to the render distance
        assert!(transcript.iter().any(|l| l.contains("Keep going") && l.contains("z= -50.00")));
        // Waypoints follow the floor detected after the route was loaded
        assert!(transcript.iter().any(|l| l.contains("Head north") && l.contains("y= -1.40")));
    }

    #[test]
    fn test_route_without_steps_rejected() {
        let scenario = Scenario {
            origin: GeoCoordinate::new(0.0, 0.0),
            route: Route::default(),
            events: Vec::new(),
        };
        assert!(matches!(
            replay(&scenario, &ConfigFile::default()),
            Err(CliError::Scenario(_))
        ));
    }

    #[test]
    fn test_load_scenario_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        match load_scenario(&path) {
            Err(CliError::Scenario(msg)) => assert!(msg.contains("broken.json")),
            other => panic!("expected scenario error, got {:?}", other),
        }
    }
}
