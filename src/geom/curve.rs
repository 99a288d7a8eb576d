//! Curve representations consumed by the tube tessellator.
//!
//! The tessellator only needs two things from a curve: a position and a tangent
//! for `t ∈ [0, 1]`. [`ParametricCurve`] captures exactly that contract; any type
//! providing it can be swept into a tube. [`AnyCurve`] is the tagged-variant form
//! used where curves arrive as data (the wasm facade).

use serde::{Deserialize, Serialize};

use super::bezier::{BezierError, CubicBezier};
use super::core::{Point3, Tolerance, Vec3};

/// Number of uniform samples used by [`is_straight`].
const STRAIGHTNESS_SAMPLES: usize = 9;

/// Position/tangent evaluator over the unit parameter domain.
///
/// Callers make no continuity assumption beyond what the flatness and cusp
/// tests explicitly check; implementations must be cheap to call repeatedly.
pub trait ParametricCurve {
    fn position_at(&self, t: f64) -> Point3;

    /// Derivative direction at `t`. Need not be unit length and may vanish at cusps.
    fn tangent_at(&self, t: f64) -> Vec3;

    /// Logical span count of the curve, used to scale adaptive thresholds so
    /// multi-span curves are refined as finely per span as single-span ones.
    #[must_use]
    fn segment_count(&self) -> usize {
        1
    }

    #[must_use]
    fn unit_tangent_at(&self, t: f64) -> Option<Vec3> {
        self.tangent_at(t).normalized_with(Tolerance::ZERO_LENGTH)
    }

    /// Control polygon whose convex hull contains the curve over `[0, 1]`,
    /// starting at `position_at(0)` and ending at `position_at(1)`.
    ///
    /// `None` for curves without one; [`is_straight`] then falls back to sampling.
    #[must_use]
    fn hull_points(&self) -> Option<Vec<Point3>> {
        None
    }
}

impl<C: ParametricCurve + ?Sized> ParametricCurve for &C {
    fn position_at(&self, t: f64) -> Point3 {
        (**self).position_at(t)
    }

    fn tangent_at(&self, t: f64) -> Vec3 {
        (**self).tangent_at(t)
    }

    fn segment_count(&self) -> usize {
        (**self).segment_count()
    }

    fn hull_points(&self) -> Option<Vec<Point3>> {
        (**self).hull_points()
    }
}

impl<C: ParametricCurve + ?Sized> ParametricCurve for Box<C> {
    fn position_at(&self, t: f64) -> Point3 {
        (**self).position_at(t)
    }

    fn tangent_at(&self, t: f64) -> Vec3 {
        (**self).tangent_at(t)
    }

    fn segment_count(&self) -> usize {
        (**self).segment_count()
    }

    fn hull_points(&self) -> Option<Vec<Point3>> {
        (**self).hull_points()
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum CurveError {
    #[error("curve needs at least {min} control points, got {actual}")]
    TooFewControlPoints { min: usize, actual: usize },
    #[error("curve degree {degree} is invalid for {count} control points")]
    InvalidDegree { degree: usize, count: usize },
    #[error("control point {index} has a non-positive or non-finite weight")]
    InvalidWeight { index: usize },
    #[error("control point {index} is not finite")]
    NonFiniteControlPoint { index: usize },
    #[error("control point index {index} is out of range (curve has {count})")]
    ControlPointIndex { index: usize, count: usize },
}

// ─────────────────────────────────────────────────────────────────────────────
// Line3
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line3 {
    pub start: Point3,
    pub end: Point3,
}

impl Line3 {
    #[must_use]
    pub const fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn direction(self) -> Vec3 {
        self.end.sub_point(self.start)
    }
}

impl ParametricCurve for Line3 {
    fn position_at(&self, t: f64) -> Point3 {
        self.start.add_vec(self.direction().mul_scalar(t))
    }

    fn tangent_at(&self, _t: f64) -> Vec3 {
        self.direction()
    }

    fn hull_points(&self) -> Option<Vec<Point3>> {
        Some(vec![self.start, self.end])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GenericCurve (rational B-spline over editable control points)
// ─────────────────────────────────────────────────────────────────────────────

/// Editable control point of a [`GenericCurve`].
///
/// `shape_parameters[0]` is the rational weight. The remaining two entries belong
/// to editing tools and are carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub position: Point3,
    #[serde(default = "default_shape_parameters")]
    pub shape_parameters: [f64; 3],
}

fn default_shape_parameters() -> [f64; 3] {
    [1.0, 0.0, 0.0]
}

impl ControlPoint {
    #[must_use]
    pub const fn new(position: Point3) -> Self {
        Self {
            position,
            shape_parameters: [1.0, 0.0, 0.0],
        }
    }

    #[must_use]
    pub const fn with_weight(position: Point3, weight: f64) -> Self {
        Self {
            position,
            shape_parameters: [weight, 0.0, 0.0],
        }
    }

    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.shape_parameters[0]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GenericCurveData {
    #[serde(default = "default_degree")]
    degree: usize,
    control_points: Vec<ControlPoint>,
}

fn default_degree() -> usize {
    3
}

/// Rational B-spline with a uniform clamped knot vector over `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GenericCurveData", into = "GenericCurveData")]
pub struct GenericCurve {
    degree: usize,
    control_points: Vec<ControlPoint>,
    knots: Vec<f64>,
}

impl TryFrom<GenericCurveData> for GenericCurve {
    type Error = CurveError;

    fn try_from(data: GenericCurveData) -> Result<Self, Self::Error> {
        Self::new(data.degree, data.control_points)
    }
}

impl From<GenericCurve> for GenericCurveData {
    fn from(curve: GenericCurve) -> Self {
        Self {
            degree: curve.degree,
            control_points: curve.control_points,
        }
    }
}

impl GenericCurve {
    pub fn new(degree: usize, control_points: Vec<ControlPoint>) -> Result<Self, CurveError> {
        if control_points.len() < 2 {
            return Err(CurveError::TooFewControlPoints {
                min: 2,
                actual: control_points.len(),
            });
        }
        if degree == 0 || degree >= control_points.len() {
            return Err(CurveError::InvalidDegree {
                degree,
                count: control_points.len(),
            });
        }
        for (index, cp) in control_points.iter().enumerate() {
            validate_control_point(index, cp)?;
        }

        let knots = clamped_uniform_knots(control_points.len(), degree);
        Ok(Self {
            degree,
            control_points,
            knots,
        })
    }

    /// Non-rational curve through the given control polygon.
    pub fn from_points(degree: usize, points: &[Point3]) -> Result<Self, CurveError> {
        Self::new(degree, points.iter().copied().map(ControlPoint::new).collect())
    }

    #[must_use]
    pub fn degree(&self) -> usize {
        self.degree
    }

    #[must_use]
    pub fn control_points(&self) -> &[ControlPoint] {
        &self.control_points
    }

    #[must_use]
    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Replaces one control point. The knot vector only depends on the count, so
    /// it stays valid.
    pub fn set_control_point(&mut self, index: usize, control_point: ControlPoint) -> Result<(), CurveError> {
        let count = self.control_points.len();
        let slot = self
            .control_points
            .get_mut(index)
            .ok_or(CurveError::ControlPointIndex { index, count })?;
        validate_control_point(index, &control_point)?;
        *slot = control_point;
        Ok(())
    }

    fn evaluate(&self, u: f64) -> Point3 {
        let p = self.degree;
        let n = self.control_points.len() - 1;
        let u = u.clamp(0.0, 1.0);
        let span = find_span(n, p, u, &self.knots);

        let mut d: Vec<HPoint4> = (0..=p)
            .map(|j| {
                let cp = &self.control_points[span - p + j];
                let w = cp.weight();
                HPoint4::new(cp.position.x * w, cp.position.y * w, cp.position.z * w, w)
            })
            .collect();
        de_boor(&mut d, span, p, u, &self.knots);
        d[p].to_point3().unwrap_or(self.control_points[span].position)
    }
}

impl ParametricCurve for GenericCurve {
    fn position_at(&self, t: f64) -> Point3 {
        self.evaluate(t)
    }

    fn tangent_at(&self, t: f64) -> Vec3 {
        let h = Tolerance::DERIVATIVE.eps;
        let t0 = (t - h).max(0.0);
        let t1 = (t + h).min(1.0);
        if t1 <= t0 {
            return Vec3::ZERO;
        }
        self.evaluate(t1)
            .sub_point(self.evaluate(t0))
            .mul_scalar(1.0 / (t1 - t0))
    }

    fn segment_count(&self) -> usize {
        self.control_points.len() - self.degree
    }

    /// Weights are positive and the knots clamped, so the curve stays inside
    /// the hull of its control points and starts and ends on them.
    fn hull_points(&self) -> Option<Vec<Point3>> {
        Some(self.control_points.iter().map(|cp| cp.position).collect())
    }
}

fn validate_control_point(index: usize, cp: &ControlPoint) -> Result<(), CurveError> {
    if !cp.position.is_finite() || cp.shape_parameters.iter().any(|v| !v.is_finite()) {
        return Err(CurveError::NonFiniteControlPoint { index });
    }
    if cp.weight() <= 0.0 {
        return Err(CurveError::InvalidWeight { index });
    }
    Ok(())
}

fn clamped_uniform_knots(count: usize, degree: usize) -> Vec<f64> {
    let spans = count - degree;
    let mut knots = Vec::with_capacity(count + degree + 1);
    knots.extend(std::iter::repeat(0.0).take(degree + 1));
    for i in 1..spans {
        knots.push(i as f64 / spans as f64);
    }
    knots.extend(std::iter::repeat(1.0).take(degree + 1));
    knots
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HPoint4 {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

impl HPoint4 {
    const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    fn lerp(self, rhs: Self, t: f64) -> Self {
        let s = 1.0 - t;
        Self::new(
            self.x * s + rhs.x * t,
            self.y * s + rhs.y * t,
            self.z * s + rhs.z * t,
            self.w * s + rhs.w * t,
        )
    }

    fn to_point3(self) -> Option<Point3> {
        if self.w.is_finite() && self.w != 0.0 {
            Some(Point3::new(self.x / self.w, self.y / self.w, self.z / self.w))
        } else {
            None
        }
    }
}

fn find_span(n: usize, p: usize, u: f64, knots: &[f64]) -> usize {
    if u >= knots[n + 1] {
        return n;
    }
    if u <= knots[p] {
        return p;
    }

    let mut low = p;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

fn de_boor(d: &mut [HPoint4], span: usize, p: usize, u: f64, knots: &[f64]) {
    for r in 1..=p {
        for j in (r..=p).rev() {
            let i = span - p + j;
            let denom = knots[i + p + 1 - r] - knots[i];
            let alpha = if denom == 0.0 { 0.0 } else { (u - knots[i]) / denom };
            d[j] = d[j - 1].lerp(d[j], alpha);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AnyCurve
// ─────────────────────────────────────────────────────────────────────────────

/// Curve kinds accepted as data, dispatched by tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnyCurve {
    Bezier(CubicBezier),
    Line(Line3),
    Generic(GenericCurve),
}

impl AnyCurve {
    #[must_use]
    pub fn control_point_count(&self) -> usize {
        match self {
            Self::Bezier(_) => 4,
            Self::Line(_) => 2,
            Self::Generic(curve) => curve.control_points().len(),
        }
    }

    /// Moves one control point, keeping any shape parameters it carries.
    pub fn move_control_point(&mut self, index: usize, position: Point3) -> Result<(), CurveError> {
        if !position.is_finite() {
            return Err(CurveError::NonFiniteControlPoint { index });
        }
        let count = self.control_point_count();
        match self {
            Self::Bezier(bezier) => bezier
                .set_control_point(index, position)
                .map_err(|_: BezierError| CurveError::ControlPointIndex { index, count }),
            Self::Line(line) => match index {
                0 => {
                    line.start = position;
                    Ok(())
                }
                1 => {
                    line.end = position;
                    Ok(())
                }
                _ => Err(CurveError::ControlPointIndex { index, count }),
            },
            Self::Generic(curve) => {
                let mut cp = curve
                    .control_points()
                    .get(index)
                    .copied()
                    .ok_or(CurveError::ControlPointIndex { index, count })?;
                cp.position = position;
                curve.set_control_point(index, cp)
            }
        }
    }
}

impl ParametricCurve for AnyCurve {
    fn position_at(&self, t: f64) -> Point3 {
        match self {
            Self::Bezier(curve) => curve.position_at(t),
            Self::Line(curve) => curve.position_at(t),
            Self::Generic(curve) => curve.position_at(t),
        }
    }

    fn tangent_at(&self, t: f64) -> Vec3 {
        match self {
            Self::Bezier(curve) => ParametricCurve::tangent_at(curve, t),
            Self::Line(curve) => curve.tangent_at(t),
            Self::Generic(curve) => curve.tangent_at(t),
        }
    }

    fn segment_count(&self) -> usize {
        match self {
            Self::Bezier(curve) => curve.segment_count(),
            Self::Line(curve) => curve.segment_count(),
            Self::Generic(curve) => curve.segment_count(),
        }
    }

    fn hull_points(&self) -> Option<Vec<Point3>> {
        match self {
            Self::Bezier(curve) => curve.hull_points(),
            Self::Line(curve) => curve.hull_points(),
            Self::Generic(curve) => curve.hull_points(),
        }
    }
}

impl From<CubicBezier> for AnyCurve {
    fn from(curve: CubicBezier) -> Self {
        Self::Bezier(curve)
    }
}

impl From<Line3> for AnyCurve {
    fn from(curve: Line3) -> Self {
        Self::Line(curve)
    }
}

impl From<GenericCurve> for AnyCurve {
    fn from(curve: GenericCurve) -> Self {
        Self::Generic(curve)
    }
}

/// Returns `true` when the curve is a straight, forward-moving segment end to end.
///
/// Curves exposing [`ParametricCurve::hull_points`] are judged on their control
/// polygon: every point must lie on the chord within `tol.eps` (relative to the
/// chord length once it exceeds 1) and advance monotonically along it, which
/// bounds the whole curve. Other curves are sampled uniformly under the same
/// rule, and their end tangents (where defined) must agree with the chord.
/// Closed or point-like curves are never straight.
#[must_use]
pub fn is_straight<C: ParametricCurve + ?Sized>(curve: &C, tol: Tolerance) -> bool {
    let start = curve.position_at(0.0);
    let end = curve.position_at(1.0);
    if !start.is_finite() || !end.is_finite() {
        return false;
    }
    let chord = end.sub_point(start);
    let Some(dir) = chord.normalized_with(Tolerance::ZERO_LENGTH) else {
        return false;
    };
    let limit = tol.eps * chord.length().max(1.0);

    if let Some(hull) = curve.hull_points() {
        return advances_along_chord(hull, start, end, dir, limit);
    }

    let samples = (0..STRAIGHTNESS_SAMPLES)
        .map(|i| curve.position_at(i as f64 / (STRAIGHTNESS_SAMPLES - 1) as f64));
    if !advances_along_chord(samples, start, end, dir, limit) {
        return false;
    }

    [0.0, 1.0].into_iter().all(|t| {
        curve
            .unit_tangent_at(t)
            .is_none_or(|tangent| tangent.dot(dir) >= 1.0 - tol.eps)
    })
}

/// Every point lies within `limit` of the chord and none steps back along it.
fn advances_along_chord(
    points: impl IntoIterator<Item = Point3>,
    start: Point3,
    end: Point3,
    dir: Vec3,
    limit: f64,
) -> bool {
    let mut last_projection = f64::NEG_INFINITY;
    for p in points {
        if !p.is_finite() || p.distance_to_line(start, end) > limit {
            return false;
        }
        let projection = p.sub_point(start).dot(dir);
        if projection < last_projection - limit {
            return false;
        }
        last_projection = projection;
    }
    true
}
