//! Camera-space transform math.
//!
//! Converts a geodesic displacement (distance + bearing between two
//! coordinates) into a camera-relative 4×4 transform usable for scene
//! placement.
//!
//! # Conventions
//!
//! - Column-vector matrices: a point `p` maps to `M · p`, translation lives in
//!   column 3.
//! - Y is up. With a gravity-and-heading aligned session, −Z points to true
//!   north and +X to east.
//! - Bearings are compass bearings in radians (0 = north, π/2 = east).
//!
//! Everything in this module is pure computation; it is called from the
//! per-frame update path and never blocks.

use nalgebra::{Matrix3, Matrix4, Rotation3, Vector3};

use crate::geo::{self, GeoCoordinate};

/// A rigid transform (rotation + translation) in session-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose(Matrix4<f64>);

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// The identity transform.
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    /// Wrap a homogeneous matrix.
    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self(matrix)
    }

    /// Pure translation.
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self(Matrix4::new_translation(&Vector3::new(x, y, z)))
    }

    /// Pure rotation about the vertical (Y) axis.
    pub fn from_yaw(radians: f64) -> Self {
        Self(Rotation3::from_axis_angle(&Vector3::y_axis(), radians).to_homogeneous())
    }

    /// Pure rotation about the X axis.
    pub fn from_pitch(radians: f64) -> Self {
        Self(Rotation3::from_axis_angle(&Vector3::x_axis(), radians).to_homogeneous())
    }

    /// The underlying homogeneous matrix.
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    /// Translation component.
    pub fn translation(&self) -> Vector3<f64> {
        self.0.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Rotation component.
    pub fn rotation(&self) -> Matrix3<f64> {
        self.0.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Same rotation, new translation.
    pub fn with_translation(mut self, translation: Vector3<f64>) -> Self {
        self.0.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
        self
    }

    /// Identity rotation, same translation.
    pub fn translation_only(&self) -> Self {
        Self::identity().with_translation(self.translation())
    }

    /// Compose `self · other`.
    pub fn then(&self, other: &Pose) -> Pose {
        Pose(self.0 * other.0)
    }
}

impl From<Matrix4<f64>> for Pose {
    fn from(matrix: Matrix4<f64>) -> Self {
        Self(matrix)
    }
}

/// Translate a pose by `offset` expressed in the pose's local frame.
///
/// `pose' = pose · T(offset)`; the rotation is unchanged.
#[inline]
pub fn translate(pose: &Pose, offset: Vector3<f64>) -> Pose {
    Pose(pose.0 * Matrix4::new_translation(&offset))
}

/// Rotate a pose about the vertical axis by the inverse of a yaw of `radians`.
///
/// `pose' = R_y(radians)⁻¹ · pose`. The angle is a compass bearing: how far
/// the forward (−Z) vector must turn to face the target. A bearing of π/2
/// (east) swings content from −Z to +X.
#[inline]
pub fn rotate_around_vertical(pose: &Pose, radians: f64) -> Pose {
    let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), radians);
    Pose(rotation.inverse().to_homogeneous() * pose.0)
}

/// Place content at the geodesic offset from `current` to `destination`.
///
/// The distance is clamped to `max_distance` so a waypoint cannot fly off
/// when GPS and route points are far apart or temporarily inaccurate. The
/// pose is pushed `distance` meters along its forward axis, then swung
/// around the vertical axis through its own position by the bearing.
///
/// The output translation differs from the input translation by a vector
/// whose length is exactly `min(distance, max_distance)`.
pub fn place_at(
    pose: &Pose,
    current: &GeoCoordinate,
    destination: &GeoCoordinate,
    max_distance: f64,
) -> Pose {
    let distance = geo::distance(current, destination).min(max_distance.max(0.0));
    let bearing = geo::bearing(current, destination);

    let origin = pose.translation();
    let pivot = pose.with_translation(Vector3::zeros());

    let pushed = translate(&pivot, Vector3::new(0.0, 0.0, -distance));
    let swung = rotate_around_vertical(&pushed, bearing);

    swung.with_translation(swung.translation() + origin)
}

/// Euclidean distance between two poses' translations, in meters.
#[inline]
pub fn pose_delta(a: &Pose, b: &Pose) -> f64 {
    (a.translation() - b.translation()).norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-9;

    fn assert_vec_eq(actual: Vector3<f64>, expected: Vector3<f64>, tol: f64) {
        assert!(
            (actual - expected).norm() < tol,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_translate_identity() {
        let moved = translate(&Pose::identity(), Vector3::new(1.0, 2.0, 3.0));
        assert_vec_eq(moved.translation(), Vector3::new(1.0, 2.0, 3.0), EPS);
    }

    #[test]
    fn test_translate_adds_to_existing_translation() {
        let pose = Pose::from_translation(0.5, -1.5, 2.0);
        let moved = translate(&pose, Vector3::new(1.0, 1.0, -4.0));
        assert_vec_eq(moved.translation(), Vector3::new(1.5, -0.5, -2.0), EPS);
    }

    #[test]
    fn test_translate_preserves_rotation() {
        let pose = Pose::from_yaw(0.7).then(&Pose::from_pitch(0.2));
        let moved = translate(&pose, Vector3::new(3.0, 0.0, 1.0));
        assert!((moved.rotation() - pose.rotation()).norm() < EPS);
    }

    #[test]
    fn test_translate_is_local_frame() {
        // Facing east (yaw −π/2 turns −Z into +X); forward is +X in world space
        let facing_east = Pose::from_yaw(-FRAC_PI_2);
        let moved = translate(&facing_east, Vector3::new(0.0, 0.0, -2.0));
        assert_vec_eq(moved.translation(), Vector3::new(2.0, 0.0, 0.0), EPS);
    }

    #[test]
    fn test_rotate_around_vertical_east_bearing() {
        let ahead = Pose::from_translation(0.0, 0.0, -10.0);
        let rotated = rotate_around_vertical(&ahead, FRAC_PI_2);
        assert_vec_eq(rotated.translation(), Vector3::new(10.0, 0.0, 0.0), EPS);
    }

    #[test]
    fn test_rotate_around_vertical_keeps_height() {
        let p = Pose::from_translation(3.0, -1.4, -4.0);
        let rotated = rotate_around_vertical(&p, 1.234);
        assert!((rotated.translation().y - (-1.4)).abs() < EPS);
        assert!((rotated.translation().norm() - p.translation().norm()).abs() < EPS);
    }

    #[test]
    fn test_rotate_full_turn_is_identity() {
        let p = Pose::from_translation(1.0, 2.0, 3.0).then(&Pose::from_yaw(0.3));
        let rotated = rotate_around_vertical(&p, 2.0 * PI);
        assert!((rotated.matrix() - p.matrix()).norm() < EPS);
    }

    #[test]
    fn test_place_at_due_north_is_forward() {
        let current = GeoCoordinate::new(0.0, 0.0);
        let destination = GeoCoordinate::new(1.0, 0.0);

        let placed = place_at(&Pose::identity(), &current, &destination, 50.0);

        assert_vec_eq(placed.translation(), Vector3::new(0.0, 0.0, -50.0), 1e-6);
    }

    #[test]
    fn test_place_at_due_east_is_positive_x() {
        let current = GeoCoordinate::new(0.0, 0.0);
        let destination = GeoCoordinate::new(0.0, 1.0);

        let placed = place_at(&Pose::identity(), &current, &destination, 50.0);

        assert_vec_eq(placed.translation(), Vector3::new(50.0, 0.0, 0.0), 1e-6);
    }

    #[test]
    fn test_place_at_short_distance_not_clamped() {
        let current = GeoCoordinate::new(50.0, 30.0);
        let destination = GeoCoordinate::new(50.0001, 30.0);
        let actual = geo::distance(&current, &destination);
        assert!(actual < 50.0);

        let origin = Pose::from_translation(2.0, -1.5, 7.0);
        let placed = place_at(&origin, &current, &destination, 50.0);

        assert!((pose_delta(&placed, &origin) - actual).abs() < 1e-6);
        assert!((placed.translation().y - (-1.5)).abs() < EPS);
    }

    #[test]
    fn test_place_at_offsets_from_pose_position() {
        let current = GeoCoordinate::new(0.0, 0.0);
        let destination = GeoCoordinate::new(0.0, 1.0);
        let origin = Pose::from_translation(5.0, -1.0, 5.0);

        let placed = place_at(&origin, &current, &destination, 20.0);

        assert_vec_eq(placed.translation(), Vector3::new(25.0, -1.0, 5.0), 1e-6);
    }

    #[test]
    fn test_place_at_same_coordinate_stays_put() {
        let here = GeoCoordinate::new(48.0, 11.0);
        let origin = Pose::from_translation(1.0, 1.0, 1.0);

        let placed = place_at(&origin, &here, &here, 50.0);

        assert_vec_eq(placed.translation(), origin.translation(), EPS);
    }

    #[test]
    fn test_place_at_negative_limit_collapses_to_origin() {
        let current = GeoCoordinate::new(0.0, 0.0);
        let destination = GeoCoordinate::new(0.0, 1.0);

        let placed = place_at(&Pose::identity(), &current, &destination, -5.0);

        assert!(placed.translation().norm() < EPS);
    }

    #[test]
    fn test_pose_delta() {
        let a = Pose::from_translation(0.0, 0.0, 0.0);
        let b = Pose::from_translation(3.0, 4.0, 0.0).then(&Pose::from_yaw(1.0));
        assert!((pose_delta(&a, &b) - 5.0).abs() < EPS);
        assert_eq!(pose_delta(&b, &b), 0.0);
    }

    #[test]
    fn test_translation_only_drops_rotation() {
        let p = Pose::from_translation(1.0, 2.0, 3.0).then(&Pose::from_yaw(0.9));
        let t = p.translation_only();
        assert!((t.rotation() - Matrix3::identity()).norm() < EPS);
        assert_vec_eq(t.translation(), Vector3::new(1.0, 2.0, 3.0), EPS);
    }
}
