//! Property tests for geodesy, placement and anchor bookkeeping.
//!
//! Run with: `cargo test --test properties`

use std::sync::Arc;

use nalgebra::Vector3;
use proptest::prelude::*;

use arnav::geo::{bearing, distance};
use arnav::pose::{place_at, translate, Pose};
use arnav::scene::{
    AnchorBook, MemorySceneGraph, PlaneAnchor, RunOptions, SceneSessionManager, SessionConfig,
    TrackingConfiguration, TrackingSession,
};
use arnav::tracking::{next_state, LimitedReason, TrackingQuality, TrackingSignal};
use arnav::GeoCoordinate;

struct NoTracking;

impl TrackingSession for NoTracking {
    fn is_supported(&self) -> bool {
        true
    }
    fn run(&self, _configuration: &TrackingConfiguration, _options: RunOptions) {}
    fn pause(&self) {}
    fn current_camera_transform(&self) -> Option<Pose> {
        None
    }
}

fn coordinate() -> impl Strategy<Value = GeoCoordinate> {
    (-89.9f64..89.9, -179.9f64..179.9).prop_map(|(lat, lon)| GeoCoordinate::new(lat, lon))
}

#[derive(Debug, Clone)]
enum AnchorOp {
    Add(u8, f64),
    Update(u8, f64),
    Remove(u8),
}

fn anchor_op() -> impl Strategy<Value = AnchorOp> {
    prop_oneof![
        (0u8..6, -3.0f64..0.0).prop_map(|(id, h)| AnchorOp::Add(id, h)),
        (0u8..6, -3.0f64..0.0).prop_map(|(id, h)| AnchorOp::Update(id, h)),
        (0u8..6).prop_map(AnchorOp::Remove),
    ]
}

fn signal() -> impl Strategy<Value = TrackingSignal> {
    prop_oneof![
        Just(TrackingSignal::Quality(TrackingQuality::Normal)),
        Just(TrackingSignal::Quality(TrackingQuality::NotAvailable)),
        proptest::sample::select(LimitedReason::ALL.to_vec())
            .prop_map(|r| TrackingSignal::Quality(TrackingQuality::Limited(r))),
        Just(TrackingSignal::Interrupted),
        Just(TrackingSignal::InterruptionEnded),
        "[a-z ]{0,12}".prop_map(TrackingSignal::Failed),
    ]
}

proptest! {
    /// Distance to self is zero
    #[test]
    fn prop_distance_to_self_is_zero(a in coordinate()) {
        prop_assert_eq!(distance(&a, &a), 0.0);
    }

    /// Distance is symmetric
    #[test]
    fn prop_distance_symmetric(a in coordinate(), b in coordinate()) {
        let ab = distance(&a, &b);
        let ba = distance(&b, &a);
        prop_assert!((ab - ba).abs() <= 1e-6 * ab.max(1.0), "{} vs {}", ab, ba);
    }

    /// Bearing always lands in [0, 2π)
    #[test]
    fn prop_bearing_in_range(a in coordinate(), b in coordinate()) {
        let theta = bearing(&a, &b);
        prop_assert!((0.0..std::f64::consts::TAU).contains(&theta), "bearing {}", theta);
    }

    /// Placement offset magnitude is the clamped distance
    #[test]
    fn prop_place_at_magnitude(
        a in coordinate(),
        b in coordinate(),
        max in 0.0f64..500.0,
        x in -100.0f64..100.0,
        y in -5.0f64..5.0,
        z in -100.0f64..100.0,
        yaw in -3.0f64..3.0,
    ) {
        let pose = Pose::from_yaw(yaw).with_translation(Vector3::new(x, y, z));
        let placed = place_at(&pose, &a, &b, max);
        let offset = (placed.translation() - pose.translation()).norm();
        let expected = distance(&a, &b).min(max);

        prop_assert!(offset <= max + 1e-6);
        prop_assert!((offset - expected).abs() < 1e-6, "offset {} expected {}", offset, expected);
    }

    /// Translating forth and back returns to the start
    #[test]
    fn prop_translate_round_trip(
        x in -50.0f64..50.0,
        y in -50.0f64..50.0,
        z in -50.0f64..50.0,
        yaw in -3.0f64..3.0,
    ) {
        let pose = Pose::from_yaw(yaw).with_translation(Vector3::new(1.0, 2.0, 3.0));
        let offset = Vector3::new(x, y, z);
        let back = translate(&translate(&pose, offset), -offset);
        prop_assert!((back.translation() - pose.translation()).norm() < 1e-9);
    }

    /// Every signal maps to a state with a hint
    #[test]
    fn prop_state_machine_total(sig in signal(), has_anchors in any::<bool>()) {
        let (state, _) = next_state(&sig, has_anchors);
        prop_assert!(!state.hint().is_empty());
    }

    /// Anchor maps never diverge
    #[test]
    fn prop_anchor_book_consistent(ops in prop::collection::vec(anchor_op(), 0..40)) {
        let mut book = AnchorBook::default();
        for op in &ops {
            match op {
                AnchorOp::Add(id, h) | AnchorOp::Update(id, h) => {
                    book.upsert(&PlaneAnchor::at_height(format!("A{}", id), *h, 1.0, 1.0));
                }
                AnchorOp::Remove(id) => {
                    book.remove(&format!("A{}", id).into());
                }
            }
            prop_assert!(book.is_consistent());
        }
    }

    /// Session floor height is the minimum over live anchors
    #[test]
    fn prop_session_height_is_minimum(ops in prop::collection::vec(anchor_op(), 0..30)) {
        let session = SceneSessionManager::new(
            Arc::new(NoTracking),
            Arc::new(MemorySceneGraph::new()),
            SessionConfig::default(),
        );
        let mut live = std::collections::HashMap::new();

        for op in &ops {
            match op {
                AnchorOp::Add(id, h) => {
                    session.on_anchor_added(&PlaneAnchor::at_height(format!("A{}", id), *h, 1.0, 1.0));
                    live.insert(*id, *h);
                }
                AnchorOp::Update(id, h) => {
                    session.on_anchor_updated(&PlaneAnchor::at_height(format!("A{}", id), *h, 1.0, 1.0));
                    live.insert(*id, *h);
                }
                AnchorOp::Remove(id) => {
                    session.on_anchor_removed(&format!("A{}", id).into());
                    live.remove(id);
                }
            }
        }

        let expected = live.values().copied().reduce(f64::min).unwrap_or(-1.5);
        prop_assert_eq!(session.estimated_height(), expected);
        prop_assert!(session.anchors_consistent());
        prop_assert_eq!(session.anchor_count(), live.len());
    }
}
