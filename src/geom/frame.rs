//! Discrete rotation-minimising frames propagated ring by ring along a curve.
//!
//! Only the previous normal carries information from one ring to the next: each
//! step re-derives the binormal from the new tangent and that normal, then the
//! normal from the binormal. The frame therefore never flips on near-straight runs
//! and never references a fixed world axis after seeding.

use super::core::{Tolerance, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub tangent: Vec3,
    pub normal: Vec3,
    pub binormal: Vec3,
}

/// How a call to [`Frame::step`] produced its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep {
    Propagated,
    /// The new tangent was degenerate or parallel to the previous normal; the
    /// frame was seeded afresh from the tangent.
    Reseeded,
}

impl Frame {
    /// Initial frame for a tangent: the normal comes from crossing the tangent
    /// with the coordinate axis it is least aligned with.
    #[must_use]
    pub fn seed(tangent: Vec3) -> Self {
        let tangent = tangent.normalized().unwrap_or(Vec3::Z);
        let normal = perpendicular_unit(tangent);
        let binormal = tangent.cross(normal).normalized().unwrap_or(Vec3::Y);
        Self {
            tangent,
            normal: binormal.cross(tangent),
            binormal,
        }
    }

    /// Advances the frame to a new tangent. See [`Frame::step`].
    #[must_use]
    pub fn advance(self, tangent: Vec3) -> Self {
        self.step(tangent).0
    }

    /// Advances the frame to a new tangent: `B = T × N_prev`, `N = B × T`.
    #[must_use]
    pub fn step(self, tangent: Vec3) -> (Self, FrameStep) {
        let Some(tangent) = tangent.normalized_with(Tolerance::ZERO_LENGTH) else {
            return (Self::seed(self.tangent), FrameStep::Reseeded);
        };
        let Some(binormal) = tangent
            .cross(self.normal)
            .normalized_with(Tolerance::ZERO_LENGTH)
        else {
            return (Self::seed(tangent), FrameStep::Reseeded);
        };
        let normal = binormal.cross(tangent).normalized().unwrap_or(self.normal);
        (
            Self {
                tangent,
                normal,
                binormal,
            },
            FrameStep::Propagated,
        )
    }

    /// Unit lengths and pairwise orthogonality, each within `tol.eps`.
    #[must_use]
    pub fn is_orthonormal(&self, tol: Tolerance) -> bool {
        let unit = |v: Vec3| (v.length() - 1.0).abs() <= tol.eps;
        unit(self.tangent)
            && unit(self.normal)
            && unit(self.binormal)
            && self.tangent.dot(self.normal).abs() <= tol.eps
            && self.tangent.dot(self.binormal).abs() <= tol.eps
            && self.normal.dot(self.binormal).abs() <= tol.eps
    }

    /// Point on the unit circle in the (N, B) plane at angle `phi`.
    #[must_use]
    pub fn radial(&self, phi: f64) -> Vec3 {
        self.normal
            .mul_scalar(phi.cos())
            .add(self.binormal.mul_scalar(phi.sin()))
    }
}

/// Coordinate axis with the smallest absolute component of `v`.
#[must_use]
pub fn least_aligned_axis(v: Vec3) -> Vec3 {
    let a = v.abs();
    if a.x <= a.y && a.x <= a.z {
        Vec3::X
    } else if a.y <= a.z {
        Vec3::Y
    } else {
        Vec3::Z
    }
}

/// Unit vector perpendicular to `v`, built against its least aligned axis.
#[must_use]
pub fn perpendicular_unit(v: Vec3) -> Vec3 {
    v.cross(least_aligned_axis(v)).normalized().unwrap_or(Vec3::X)
}

/// Rodrigues rotation of `v` about the unit `axis` by `angle` radians.
#[must_use]
pub fn rotate_about_axis(v: Vec3, axis: Vec3, angle: f64) -> Vec3 {
    let (sin_angle, cos_angle) = angle.sin_cos();
    v.mul_scalar(cos_angle)
        .add(axis.cross(v).mul_scalar(sin_angle))
        .add(axis.mul_scalar(axis.dot(v) * (1.0 - cos_angle)))
}
