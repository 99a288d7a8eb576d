mod adaptive;
mod batch;
mod bezier;
mod color;
mod core;
mod curve;
mod cusp;
mod debug_mesh;
mod diagnostics;
mod frame;
mod mesh;
mod metrics;
mod tube;

pub use adaptive::{
    AdaptiveSample, AdaptiveSampleList, SampleKind, SubdivisionSettings, SubdivisionStats,
    TangentProxies, plan_samples,
};
pub use batch::{TubeResult, tessellate_tubes};
pub use bezier::{ApportionedChords, BezierError, CubicBezier, apportioned_chords};
pub use color::{debug_color, hsv_to_rgb};
pub use core::{Point3, Tolerance, Vec3};
pub use curve::{
    AnyCurve, ControlPoint, CurveError, GenericCurve, Line3, ParametricCurve, is_straight,
};
pub use cusp::{cusp_angle, cusp_rotation_axis, cusp_sweep_tangents};
pub use debug_mesh::{MarkerOptions, build_line_mesh, build_point_mesh};
pub use diagnostics::TessellationDiagnostics;
pub use frame::{Frame, FrameStep, least_aligned_axis, perpendicular_unit, rotate_about_axis};
pub use mesh::{MeshCapacity, MeshError, MeshExport, MeshSink, TubeMesh, TubeVertex, VertexHandle};
pub use metrics::{TessellationMetrics, TessellationTimingReport, TimingBucket};
pub use tube::{
    MAX_CUSP_SUBDIVISION_COUNT, MAX_SLICE_COUNT, TessellationPath, TubeError, TubeOptions,
    TubeTessellation, tessellate_tube, tube_capacity, tube_mesh,
};

#[cfg(test)]
mod tests;
