//! Rounding of tangent discontinuities.
//!
//! When subdivision bottoms out on an interval whose boundary tangents still
//! disagree, no single curve position can represent the turn. Instead a short
//! fan of rings is swept at one position while the tangent rotates from the
//! incoming direction to the outgoing one.

use super::core::{Tolerance, Vec3};
use super::frame::{perpendicular_unit, rotate_about_axis};

/// Rotation axis carrying `t1` onto `t2`.
///
/// Parallel and antiparallel tangents have no unique axis; any unit vector
/// perpendicular to `t1` is used instead.
#[must_use]
pub fn cusp_rotation_axis(t1: Vec3, t2: Vec3) -> Vec3 {
    t1.cross(t2)
        .normalized_with(Tolerance::DEFAULT)
        .unwrap_or_else(|| perpendicular_unit(t1))
}

/// Angle in radians between two unit tangents.
#[must_use]
pub fn cusp_angle(t1: Vec3, t2: Vec3) -> f64 {
    t1.dot(t2).clamp(-1.0, 1.0).acos()
}

/// `steps` unit tangents rotating `t1` into `t2` about [`cusp_rotation_axis`],
/// at fractions `i / (steps - 1)` of the full angle.
///
/// The first entry is `t1`, the last `t2` (up to rounding). A single step
/// yields only `t1`. Zero-length inputs borrow the other tangent's direction.
#[must_use]
pub fn cusp_sweep_tangents(t1: Vec3, t2: Vec3, steps: usize) -> Vec<Vec3> {
    let (start, end) = match (t1.normalized(), t2.normalized()) {
        (Some(a), Some(b)) => (a, b),
        (Some(a), None) => (a, a),
        (None, Some(b)) => (b, b),
        (None, None) => (Vec3::Z, Vec3::Z),
    };
    let axis = cusp_rotation_axis(start, end);
    let theta = cusp_angle(start, end);

    let denominator = steps.saturating_sub(1).max(1) as f64;
    (0..steps)
        .map(|i| {
            let qt = i as f64 / denominator;
            let rotated = rotate_about_axis(start, axis, qt * theta);
            rotated.normalized().unwrap_or(start)
        })
        .collect()
}
