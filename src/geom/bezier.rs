//! Closed-form cubic Bézier math.
//!
//! Besides evaluation this module carries the two editing helpers a curve tool
//! needs: forcing the curve through a picked point
//! ([`CubicBezier::adjust_control_points_to_pass_through`]) and rebuilding the
//! inner control points from four points the curve must interpolate
//! ([`apportioned_chords`]).

use serde::{Deserialize, Serialize};

use super::core::{Point3, Tolerance, Vec3};
use super::curve::ParametricCurve;

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq)]
pub enum BezierError {
    /// The 2×2 system for the inner control points is singular.
    #[error("chord ratios are degenerate; inner control points cannot be solved")]
    DegenerateChords,
    #[error("control point index {0} is outside 0..=3")]
    ControlPointIndex(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    points: [Point3; 4],
}

impl CubicBezier {
    #[must_use]
    pub const fn new(p0: Point3, p1: Point3, p2: Point3, p3: Point3) -> Self {
        Self {
            points: [p0, p1, p2, p3],
        }
    }

    #[must_use]
    pub const fn from_points(points: [Point3; 4]) -> Self {
        Self { points }
    }

    /// Builds the curve through `p0..p3`, placing `p1`/`p2` at chord-length parameters.
    pub fn from_interpolated_points(
        p0: Point3,
        p1: Point3,
        p2: Point3,
        p3: Point3,
    ) -> Result<Self, BezierError> {
        let chords = apportioned_chords(p0, p1, p2, p3)?;
        Ok(Self::new(p0, chords.q1, chords.q2, p3))
    }

    #[must_use]
    pub const fn points(&self) -> &[Point3; 4] {
        &self.points
    }

    #[must_use]
    pub fn control_point(&self, index: usize) -> Option<Point3> {
        self.points.get(index).copied()
    }

    pub fn set_control_point(&mut self, index: usize, point: Point3) -> Result<(), BezierError> {
        let slot = self
            .points
            .get_mut(index)
            .ok_or(BezierError::ControlPointIndex(index))?;
        *slot = point;
        Ok(())
    }

    /// Bernstein evaluation. `t` is not clamped; values outside `[0, 1]` extrapolate.
    #[must_use]
    pub fn position_at(&self, t: f64) -> Point3 {
        let [b0, b1, b2, b3] = bernstein(t);
        let [p0, p1, p2, p3] = self.points;
        Point3::new(
            p0.x * b0 + p1.x * b1 + p2.x * b2 + p3.x * b3,
            p0.y * b0 + p1.y * b1 + p2.y * b2 + p3.y * b3,
            p0.z * b0 + p1.z * b1 + p2.z * b2 + p3.z * b3,
        )
    }

    #[must_use]
    pub fn first_derivative_at(&self, t: f64) -> Vec3 {
        let u = 1.0 - t;
        let [p0, p1, p2, p3] = self.points;
        let a = p1.sub_point(p0);
        let b = p2.sub_point(p1);
        let c = p3.sub_point(p2);
        a.mul_scalar(3.0 * u * u)
            .add(b.mul_scalar(6.0 * u * t))
            .add(c.mul_scalar(3.0 * t * t))
    }

    #[must_use]
    pub fn second_derivative_at(&self, t: f64) -> Vec3 {
        let u = 1.0 - t;
        let [p0, p1, p2, p3] = self.points;
        let a = p2.sub_point(p1).sub(p1.sub_point(p0));
        let b = p3.sub_point(p2).sub(p2.sub_point(p1));
        a.mul_scalar(6.0 * u).add(b.mul_scalar(6.0 * t))
    }

    /// True when both inner control points lie within `epsilon` of the line P0–P3.
    #[must_use]
    pub fn is_flat(&self, epsilon: f64) -> bool {
        let [p0, p1, p2, p3] = self.points;
        p1.distance_to_line(p0, p3) < epsilon && p2.distance_to_line(p0, p3) < epsilon
    }

    /// Moves one control point so the curve passes through `p` at parameter `t`.
    ///
    /// Near the ends the end point itself is overwritten; otherwise the inner
    /// control point with the larger Bernstein weight at `t` (P1 up to and
    /// including 0.5, P2 beyond) is solved for in closed form.
    pub fn adjust_control_points_to_pass_through(&mut self, t: f64, p: Point3) {
        let eps = Tolerance::LOOSE.eps;
        let [b0, b1, b2, b3] = bernstein(t);
        let [p0, p1, p2, p3] = self.points.map(Point3::to_vec3);
        let target = p.to_vec3();

        if t <= eps {
            self.points[0] = p;
        } else if t <= 0.5 {
            let rest = p0.mul_scalar(b0).add(p2.mul_scalar(b2)).add(p3.mul_scalar(b3));
            self.points[1] = Point3::ORIGIN.add_vec(target.sub(rest).mul_scalar(1.0 / b1));
        } else if t < 1.0 - eps {
            let rest = p0.mul_scalar(b0).add(p1.mul_scalar(b1)).add(p3.mul_scalar(b3));
            self.points[2] = Point3::ORIGIN.add_vec(target.sub(rest).mul_scalar(1.0 / b2));
        } else {
            self.points[3] = p;
        }
    }
}

impl ParametricCurve for CubicBezier {
    fn position_at(&self, t: f64) -> Point3 {
        CubicBezier::position_at(self, t)
    }

    fn tangent_at(&self, t: f64) -> Vec3 {
        self.first_derivative_at(t)
    }

    fn hull_points(&self) -> Option<Vec<Point3>> {
        Some(self.points.to_vec())
    }
}

/// Inner control points recovered from four interpolated points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApportionedChords {
    pub q1: Point3,
    pub q2: Point3,
    /// Chord-length parameter at which the curve passes through `p1`.
    pub u: f64,
    /// Chord-length parameter at which the curve passes through `p2`.
    pub v: f64,
}

/// Solves for the inner control points of the cubic through `p0, p1, p2, p3`.
///
/// `p1` and `p2` are placed at the chord-length parameters `u` and `v`; the two
/// Bernstein equations at `u` and `v` form a 2×2 system in `q1, q2`.
///
/// # Errors
/// [`BezierError::DegenerateChords`] when the system determinant is zero or not
/// finite (coincident points, or chord ratios collapsing `u`/`v` onto the ends
/// or onto each other). The input cannot be fitted; retrying will not help.
pub fn apportioned_chords(
    p0: Point3,
    p1: Point3,
    p2: Point3,
    p3: Point3,
) -> Result<ApportionedChords, BezierError> {
    let d1 = p1.distance_to(p0);
    let d2 = p2.distance_to(p1);
    let d3 = p3.distance_to(p2);
    let total = d1 + d2 + d3;
    let u = d1 / total;
    let v = (d1 + d2) / total;

    let [a0, a1, a2, a3] = bernstein(u);
    let [c0, c1, c2, c3] = bernstein(v);
    let det = a1 * c2 - a2 * c1;
    if !det.is_finite() || det == 0.0 {
        return Err(BezierError::DegenerateChords);
    }

    let (v0, v3) = (p0.to_vec3(), p3.to_vec3());
    let r1 = p1.to_vec3().sub(v0.mul_scalar(a0)).sub(v3.mul_scalar(a3));
    let r2 = p2.to_vec3().sub(v0.mul_scalar(c0)).sub(v3.mul_scalar(c3));

    let q1 = r1.mul_scalar(c2).sub(r2.mul_scalar(a2)).mul_scalar(1.0 / det);
    let q2 = r2.mul_scalar(a1).sub(r1.mul_scalar(c1)).mul_scalar(1.0 / det);

    Ok(ApportionedChords {
        q1: Point3::ORIGIN.add_vec(q1),
        q2: Point3::ORIGIN.add_vec(q2),
        u,
        v,
    })
}

fn bernstein(t: f64) -> [f64; 4] {
    let u = 1.0 - t;
    [u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t]
}
