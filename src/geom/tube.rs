//! Tube emission: sweeps a circular cross-section along a [`ParametricCurve`].
//!
//! A pass has three phases:
//! 1. plan the samples, either via [`plan_samples`] or, for straight curves,
//!    the two-endpoint straight extension;
//! 2. emit one ring per stack while threading a [`Frame`] from ring to ring;
//! 3. stitch consecutive stacks with quads and close both ends with fans.
//!
//! Stacks are laid out as: start cap ring, one side ring per sample (a cusp
//! sample sweeps `cusp_subdivision_count` rings), end cap ring, followed by the
//! start and end cap centre vertices. Vertex `slice` of stack `stack` has handle
//! `stack * slice_count + slice`. Each cap ring shares its positions with the
//! adjacent side ring, so the quads between them have zero area.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use super::adaptive::{
    AdaptiveSampleList, SampleKind, SubdivisionSettings, SubdivisionStats, plan_samples,
};
use super::color::debug_color;
use super::core::{Point3, Tolerance, Vec3};
use super::curve::{ParametricCurve, is_straight};
use super::cusp::cusp_sweep_tangents;
use super::diagnostics::TessellationDiagnostics;
use super::frame::{Frame, FrameStep};
use super::mesh::{MeshCapacity, MeshError, MeshSink, TubeMesh, TubeVertex, VertexHandle};
use super::metrics::{TessellationMetrics, TimingBucket};

/// Upper bound on [`TubeOptions::slice_count`].
pub const MAX_SLICE_COUNT: usize = 4096;
/// Upper bound on [`TubeOptions::cusp_subdivision_count`].
pub const MAX_CUSP_SUBDIVISION_COUNT: usize = 1024;

/// Tube options. Deserialises from camelCase with every field optional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TubeOptions {
    /// Vertices per ring.
    pub slice_count: usize,
    #[serde(alias = "tubeRadius")]
    pub radius: f64,
    /// Flatness threshold on proxy dot products, before segment scaling.
    pub adaptive_epsilon: f64,
    /// Rings swept across each cusp.
    pub cusp_subdivision_count: usize,
    /// Width below which a non-flat interval becomes a cusp, before segment scaling.
    pub cusp_interval: f64,
    /// Written to every vertex.
    pub id: u32,
}

impl Default for TubeOptions {
    fn default() -> Self {
        Self {
            slice_count: 24,
            radius: 0.05,
            adaptive_epsilon: 0.9995,
            cusp_subdivision_count: 8,
            cusp_interval: 1.0 / 512.0,
            id: 0,
        }
    }
}

impl TubeOptions {
    #[must_use]
    pub fn with_slice_count(mut self, slice_count: usize) -> Self {
        self.slice_count = slice_count;
        self
    }

    #[must_use]
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    #[must_use]
    pub fn with_adaptive_epsilon(mut self, adaptive_epsilon: f64) -> Self {
        self.adaptive_epsilon = adaptive_epsilon;
        self
    }

    #[must_use]
    pub fn with_cusp_subdivision_count(mut self, cusp_subdivision_count: usize) -> Self {
        self.cusp_subdivision_count = cusp_subdivision_count;
        self
    }

    #[must_use]
    pub fn with_cusp_interval(mut self, cusp_interval: f64) -> Self {
        self.cusp_interval = cusp_interval;
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }

    pub fn validate(&self) -> Result<(), TubeError> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(TubeError::InvalidRadius(self.radius));
        }
        if self.slice_count < 3 {
            return Err(TubeError::NotEnoughSlices(self.slice_count));
        }
        if self.slice_count > MAX_SLICE_COUNT {
            return Err(TubeError::TooManySlices(self.slice_count));
        }
        if !(self.adaptive_epsilon > 0.0 && self.adaptive_epsilon < 1.0) {
            return Err(TubeError::InvalidAdaptiveEpsilon(self.adaptive_epsilon));
        }
        if self.cusp_subdivision_count < 2 {
            return Err(TubeError::NotEnoughCuspSteps(self.cusp_subdivision_count));
        }
        if self.cusp_subdivision_count > MAX_CUSP_SUBDIVISION_COUNT {
            return Err(TubeError::TooManyCuspSteps(self.cusp_subdivision_count));
        }
        if !(self.cusp_interval > 0.0 && self.cusp_interval <= 1.0) {
            return Err(TubeError::InvalidCuspInterval(self.cusp_interval));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TubeError {
    #[error("tube radius must be finite and > 0, got {0}")]
    InvalidRadius(f64),
    #[error("tube requires at least 3 slices, got {0}")]
    NotEnoughSlices(usize),
    #[error("tube allows at most {MAX_SLICE_COUNT} slices, got {0}")]
    TooManySlices(usize),
    #[error("adaptive epsilon must lie in (0, 1), got {0}")]
    InvalidAdaptiveEpsilon(f64),
    #[error("cusp sweep requires at least 2 steps, got {0}")]
    NotEnoughCuspSteps(usize),
    #[error("cusp sweep allows at most {MAX_CUSP_SUBDIVISION_COUNT} steps, got {0}")]
    TooManyCuspSteps(usize),
    #[error("cusp interval must lie in (0, 1], got {0}")]
    InvalidCuspInterval(f64),
    #[error("curve evaluates to a non-finite position at t={0}")]
    NonFiniteCurve(f64),
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// How the samples of a pass were chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TessellationPath {
    Adaptive,
    /// Straight curve: only the two endpoints, no subdivision.
    StraightExtension,
}

/// Everything a pass decided, retained for debug builders and inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TubeTessellation {
    pub samples: AdaptiveSampleList,
    /// Frame of every stack, cap rings included.
    #[serde(skip)]
    pub frames: Vec<Frame>,
    pub stack_count: usize,
    pub slice_count: usize,
    pub path: TessellationPath,
    pub stats: SubdivisionStats,
    pub diagnostics: TessellationDiagnostics,
}

impl TubeTessellation {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.diagnostics.vertex_count
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.diagnostics.triangle_count
    }

    /// First stack emitted for the sample recorded at `t`.
    #[must_use]
    pub fn stack_of_sample(&self, t: f64, cusp_steps: usize) -> Option<usize> {
        let index = self.samples.index_of(t)?;
        let preceding: usize = self.samples.as_slice()[..index]
            .iter()
            .map(|s| s.ring_count(cusp_steps))
            .fold(0, usize::saturating_add);
        Some(preceding.saturating_add(1))
    }
}

/// Element counts of a capped tube with `stack_count` rings.
///
/// # Errors
///
/// [`MeshError::CapacityOverflow`] when a count does not fit in `usize`.
pub fn tube_capacity(stack_count: usize, slice_count: usize) -> Result<MeshCapacity, MeshError> {
    let overflow = |kind| MeshError::CapacityOverflow {
        kind,
        capacity: usize::MAX,
    };
    let vertices = stack_count
        .checked_mul(slice_count)
        .and_then(|ring_vertices| ring_vertices.checked_add(2))
        .ok_or_else(|| overflow("vertices"))?;
    let triangles = stack_count
        .saturating_sub(1)
        .checked_add(1)
        .and_then(|quad_rows_and_caps| quad_rows_and_caps.checked_mul(slice_count))
        .and_then(|per_side| per_side.checked_mul(2))
        .ok_or_else(|| overflow("triangles"))?;
    Ok(MeshCapacity {
        vertices,
        triangles,
        lines: 0,
    })
}

/// Tessellates `curve` into `sink` inside one edit bracket.
///
/// # Errors
///
/// Invalid options and non-finite curve positions are rejected before the
/// sink is touched; sink failures surface as [`TubeError::Mesh`].
pub fn tessellate_tube<C, S>(
    curve: &C,
    options: &TubeOptions,
    sink: &mut S,
) -> Result<TubeTessellation, TubeError>
where
    C: ParametricCurve + ?Sized,
    S: MeshSink + ?Sized,
{
    options.validate()?;
    let mut metrics = TessellationMetrics::default();
    metrics.begin();

    let (samples, stats, path) = metrics.time(TimingBucket::Subdivision, || {
        if is_straight(curve, Tolerance::LOOSE) {
            (
                AdaptiveSampleList::endpoints_only(),
                SubdivisionStats::default(),
                TessellationPath::StraightExtension,
            )
        } else {
            let settings = SubdivisionSettings::for_curve(options, curve.segment_count());
            let (samples, stats) = plan_samples(curve, settings);
            (samples, stats, TessellationPath::Adaptive)
        }
    });

    if let Some(bad) = samples
        .iter()
        .find(|s| !curve.position_at(s.t).is_finite())
    {
        return Err(TubeError::NonFiniteCurve(bad.t));
    }

    let stack_count = samples
        .ring_count(options.cusp_subdivision_count)
        .checked_add(2)
        .ok_or(MeshError::CapacityOverflow {
            kind: "stacks",
            capacity: usize::MAX,
        })?;
    let capacity = tube_capacity(stack_count, options.slice_count)?;
    if u32::try_from(capacity.vertices).is_err() {
        return Err(MeshError::CapacityOverflow {
            kind: "vertices",
            capacity: u32::MAX as usize,
        }
        .into());
    }

    sink.begin_edit(capacity)?;
    let mut writer = RingWriter {
        sink: &mut *sink,
        slice_count: options.slice_count,
        radius: options.radius,
        id: options.id,
        frames: Vec::with_capacity(stack_count),
        diagnostics: TessellationDiagnostics::new(),
        emitted: 0,
    };
    metrics.time(TimingBucket::RingEmission, || {
        emit_rings(&mut writer, curve, &samples, options.cusp_subdivision_count);
    });
    let RingWriter {
        frames,
        mut diagnostics,
        ..
    } = writer;
    debug_assert_eq!(frames.len(), stack_count);

    metrics.time(TimingBucket::Stitching, || {
        stitch(sink, stack_count, options.slice_count);
    });
    sink.end_edit()?;

    diagnostics.stack_count = stack_count;
    diagnostics.slice_count = options.slice_count;
    diagnostics.vertex_count = capacity.vertices;
    diagnostics.triangle_count = capacity.triangles;
    diagnostics.sample_count = samples.len();
    diagnostics.cusp_count = samples.cusp_count();
    diagnostics.subdivision_node_count = stats.node_count;
    diagnostics.max_subdivision_depth = stats.max_depth;
    diagnostics.straight_extension = path == TessellationPath::StraightExtension;
    diagnostics.timing = metrics.end();

    log::debug!("tube tessellated: {}", diagnostics.summary());

    Ok(TubeTessellation {
        samples,
        frames,
        stack_count,
        slice_count: options.slice_count,
        path,
        stats,
        diagnostics,
    })
}

/// Tessellates into a fresh [`TubeMesh`].
pub fn tube_mesh<C>(curve: &C, options: &TubeOptions) -> Result<(TubeMesh, TubeTessellation), TubeError>
where
    C: ParametricCurve + ?Sized,
{
    let mut mesh = TubeMesh::new();
    let tessellation = tessellate_tube(curve, options, &mut mesh)?;
    Ok((mesh, tessellation))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RingNormals {
    Radial,
    /// Flat start cap, facing `-T`.
    StartCap,
    /// Flat end cap, facing `+T`.
    EndCap,
}

/// Write cursor threaded through ring emission. Counts stacks through the
/// frames it records.
struct RingWriter<'s, S: ?Sized> {
    sink: &'s mut S,
    slice_count: usize,
    radius: f64,
    id: u32,
    frames: Vec<Frame>,
    diagnostics: TessellationDiagnostics,
    /// Vertices emitted so far; handles must follow this count for `stitch`.
    emitted: usize,
}

impl<S: MeshSink + ?Sized> RingWriter<'_, S> {
    /// Advances `frame` to `tangent`, emits a side ring and returns the new frame.
    fn side_ring(&mut self, frame: Frame, t: f64, position: Point3, tangent: Vec3) -> Frame {
        let (frame, step) = frame.step(tangent);
        if step == FrameStep::Reseeded {
            self.diagnostics.frame_reseed_count += 1;
            log::warn!("frame re-seeded at t={t}");
        }
        self.write_ring(&frame, t, position, RingNormals::Radial);
        frame
    }

    fn write_ring(&mut self, frame: &Frame, t: f64, position: Point3, normals: RingNormals) {
        let color = debug_color(t);
        for slice in 0..self.slice_count {
            let phi = TAU * slice as f64 / self.slice_count as f64;
            let radial = frame.radial(phi);
            let normal = match normals {
                RingNormals::Radial => radial,
                RingNormals::StartCap => frame.tangent.neg(),
                RingNormals::EndCap => frame.tangent,
            };
            let handle = self.sink.emit_vertex(TubeVertex {
                position: position.add_vec(radial.mul_scalar(self.radius)),
                normal,
                tangent: frame.tangent,
                color,
                param: t,
                id: self.id,
            });
            self.check_handle(handle);
        }
        self.frames.push(*frame);
    }

    fn write_center(&mut self, t: f64, position: Point3, normal: Vec3, tangent: Vec3) {
        let handle = self.sink.emit_vertex(TubeVertex {
            position,
            normal,
            tangent,
            color: debug_color(t),
            param: t,
            id: self.id,
        });
        self.check_handle(handle);
    }

    /// Rejected writes return [`VertexHandle::INVALID`] and are reported by `end_edit`.
    fn check_handle(&mut self, handle: VertexHandle) {
        debug_assert!(
            handle == VertexHandle::INVALID || handle.index() == self.emitted,
            "vertex handle out of stack order: got {}, expected {}",
            handle.index(),
            self.emitted
        );
        self.emitted += 1;
    }

    /// Unit tangent at `t`, falling back to a short secant and then to `previous`.
    fn resolve_tangent<C: ParametricCurve + ?Sized>(&mut self, curve: &C, t: f64, previous: Vec3) -> Vec3 {
        if let Some(tangent) = curve.unit_tangent_at(t) {
            return tangent;
        }
        let h = Tolerance::DERIVATIVE.eps;
        let secant = curve
            .position_at((t + h).min(1.0))
            .sub_point(curve.position_at((t - h).max(0.0)));
        if let Some(tangent) = secant.normalized_with(Tolerance::ZERO_LENGTH) {
            return tangent;
        }
        log::warn!("tangent vanished at t={t}; reusing previous direction");
        self.diagnostics
            .add_warning(format!("tangent vanished at t={t}"));
        previous
    }
}

fn emit_rings<C, S>(writer: &mut RingWriter<'_, S>, curve: &C, samples: &AdaptiveSampleList, cusp_steps: usize)
where
    C: ParametricCurve + ?Sized,
    S: MeshSink + ?Sized,
{
    let start = curve.position_at(0.0);
    let start_tangent = writer.resolve_tangent(curve, 0.0, Vec3::Z);
    let start_frame = Frame::seed(start_tangent);
    writer.write_ring(&start_frame, 0.0, start, RingNormals::StartCap);

    let mut frame = start_frame;
    for sample in samples {
        let position = curve.position_at(sample.t);
        match sample.kind {
            SampleKind::Endpoint | SampleKind::Ring => {
                let tangent = writer.resolve_tangent(curve, sample.t, frame.tangent);
                frame = writer.side_ring(frame, sample.t, position, tangent);
            }
            SampleKind::Cusp {
                start_tangent,
                end_tangent,
            } => {
                for tangent in cusp_sweep_tangents(start_tangent, end_tangent, cusp_steps) {
                    frame = writer.side_ring(frame, sample.t, position, tangent);
                }
            }
        }
    }

    let end = curve.position_at(1.0);
    writer.write_ring(&frame, 1.0, end, RingNormals::EndCap);

    writer.write_center(0.0, start, start_frame.tangent.neg(), start_frame.tangent);
    writer.write_center(1.0, end, frame.tangent, frame.tangent);
}

/// Side quads between consecutive stacks, then the two cap fans.
fn stitch<S: MeshSink + ?Sized>(sink: &mut S, stack_count: usize, slice_count: usize) {
    let vertex = |stack: usize, slice: usize| VertexHandle((stack * slice_count + slice % slice_count) as u32);

    for stack in 0..stack_count.saturating_sub(1) {
        for slice in 0..slice_count {
            sink.emit_quad([
                vertex(stack, slice),
                vertex(stack, slice + 1),
                vertex(stack + 1, slice + 1),
                vertex(stack + 1, slice),
            ]);
        }
    }

    let start_center = VertexHandle((stack_count * slice_count) as u32);
    let end_center = VertexHandle((stack_count * slice_count + 1) as u32);
    let last = stack_count - 1;
    for slice in 0..slice_count {
        sink.emit_triangle([start_center, vertex(0, slice + 1), vertex(0, slice)]);
    }
    for slice in 0..slice_count {
        sink.emit_triangle([end_center, vertex(last, slice), vertex(last, slice + 1)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::curve::Line3;

    #[test]
    fn default_options_are_valid() {
        let options = TubeOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.slice_count, 24);
        assert_eq!(options.cusp_subdivision_count, 8);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let base = TubeOptions::default();
        assert_eq!(base.with_radius(0.0).validate(), Err(TubeError::InvalidRadius(0.0)));
        assert_eq!(base.with_slice_count(2).validate(), Err(TubeError::NotEnoughSlices(2)));
        assert_eq!(
            base.with_adaptive_epsilon(1.0).validate(),
            Err(TubeError::InvalidAdaptiveEpsilon(1.0))
        );
        assert_eq!(
            base.with_cusp_subdivision_count(1).validate(),
            Err(TubeError::NotEnoughCuspSteps(1))
        );
        assert_eq!(
            base.with_cusp_interval(0.0).validate(),
            Err(TubeError::InvalidCuspInterval(0.0))
        );
        assert!(matches!(
            base.with_radius(f64::NAN).validate(),
            Err(TubeError::InvalidRadius(r)) if r.is_nan()
        ));
    }

    #[test]
    fn capacity_formula() {
        let capacity = tube_capacity(4, 8).unwrap();
        assert_eq!(capacity.vertices, 34);
        assert_eq!(capacity.triangles, 8 * 3 * 2 + 16);
    }

    #[test]
    fn capacity_overflow_is_an_error() {
        assert!(matches!(
            tube_capacity(usize::MAX / 2, 4),
            Err(MeshError::CapacityOverflow { kind: "vertices", .. })
        ));
        assert!(matches!(
            tube_capacity(usize::MAX, 1),
            Err(MeshError::CapacityOverflow { kind: "vertices", .. })
        ));
    }

    #[test]
    fn oversized_counts_are_rejected() {
        let base = TubeOptions::default();
        assert_eq!(
            base.with_slice_count(usize::MAX / 2).validate(),
            Err(TubeError::TooManySlices(usize::MAX / 2))
        );
        assert_eq!(
            base.with_cusp_subdivision_count(usize::MAX).validate(),
            Err(TubeError::TooManyCuspSteps(usize::MAX))
        );
        assert_eq!(base.with_slice_count(MAX_SLICE_COUNT).validate(), Ok(()));
        assert_eq!(
            base.with_cusp_subdivision_count(MAX_CUSP_SUBDIVISION_COUNT).validate(),
            Ok(())
        );

        let line = Line3::new(Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0));
        let mut mesh = TubeMesh::new();
        assert!(matches!(
            tessellate_tube(&line, &base.with_slice_count(usize::MAX / 2), &mut mesh),
            Err(TubeError::TooManySlices(_))
        ));
        assert!(mesh.is_empty());
    }

    #[test]
    fn line_takes_straight_extension() {
        let line = Line3::new(Point3::ORIGIN, Point3::new(0.0, 0.0, 2.0));
        let options = TubeOptions::default().with_slice_count(6).with_radius(0.5);
        let (mesh, tessellation) = tube_mesh(&line, &options).unwrap();

        assert_eq!(tessellation.path, TessellationPath::StraightExtension);
        assert_eq!(tessellation.stack_count, 4);
        assert_eq!(tessellation.samples.parameters(), vec![0.0, 1.0]);
        assert_eq!(tessellation.stats.node_count, 0);
        assert_eq!(mesh.vertex_count(), 4 * 6 + 2);
        assert_eq!(mesh.triangle_count(), 6 * 3 * 2 + 12);
        assert!(tessellation.diagnostics.straight_extension);
        assert!(tessellation.diagnostics.is_clean());
    }

    #[test]
    fn ring_vertices_sit_on_the_radius() {
        let line = Line3::new(Point3::ORIGIN, Point3::new(3.0, 0.0, 0.0));
        let options = TubeOptions::default().with_slice_count(8).with_radius(0.25);
        let (mesh, _) = tube_mesh(&line, &options).unwrap();
        for (position, param) in mesh.positions().iter().zip(mesh.params()).take(4 * 8) {
            let axis_point = Point3::new(3.0 * param, 0.0, 0.0);
            let distance = Point3::from_array(*position).distance_to(axis_point);
            assert!((distance - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn stack_of_sample_counts_the_start_cap() {
        let line = Line3::new(Point3::ORIGIN, Point3::new(1.0, 0.0, 0.0));
        let (_, tessellation) = tube_mesh(&line, &TubeOptions::default()).unwrap();
        assert_eq!(tessellation.stack_of_sample(0.0, 8), Some(1));
        assert_eq!(tessellation.stack_of_sample(1.0, 8), Some(2));
        assert_eq!(tessellation.stack_of_sample(0.5, 8), None);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        use serde::de::value::{Error, MapDeserializer};

        let fields = MapDeserializer::<_, Error>::new([("sliceCount", 12_u64)].into_iter());
        let options = TubeOptions::deserialize(fields).unwrap();
        assert_eq!(options.slice_count, 12);
        assert_eq!(options.radius, TubeOptions::default().radius);
    }
}
