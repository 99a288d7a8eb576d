//! Debug marker meshes replaying a retained [`AdaptiveSampleList`].
//!
//! Neither builder re-runs subdivision; they draw exactly the parameters a
//! previous tessellation pass recorded.

use serde::{Deserialize, Serialize};

use super::adaptive::{AdaptiveSample, AdaptiveSampleList, SampleKind};
use super::color::debug_color;
use super::core::Vec3;
use super::curve::ParametricCurve;
use super::mesh::{MeshCapacity, MeshError, MeshSink, TubeVertex, VertexHandle};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkerOptions {
    /// Length of the tangent tick drawn at each sample by [`build_line_mesh`].
    pub tangent_length: f64,
    pub id: u32,
}

impl Default for MarkerOptions {
    fn default() -> Self {
        Self {
            tangent_length: 0.1,
            id: 0,
        }
    }
}

/// One vertex per sample, with the sample's tangent as both normal and tangent.
pub fn build_point_mesh<C, S>(
    curve: &C,
    samples: &AdaptiveSampleList,
    options: &MarkerOptions,
    sink: &mut S,
) -> Result<(), MeshError>
where
    C: ParametricCurve + ?Sized,
    S: MeshSink + ?Sized,
{
    sink.begin_edit(MeshCapacity {
        vertices: samples.len(),
        triangles: 0,
        lines: 0,
    })?;
    for sample in samples {
        sink.emit_vertex(marker_vertex(curve, sample, options, 0.0));
    }
    sink.end_edit()
}

/// Centre-line segments between consecutive samples plus a tangent tick at
/// each sample.
///
/// Vertices `0..n` are the samples and `n..2n` the tick tips.
pub fn build_line_mesh<C, S>(
    curve: &C,
    samples: &AdaptiveSampleList,
    options: &MarkerOptions,
    sink: &mut S,
) -> Result<(), MeshError>
where
    C: ParametricCurve + ?Sized,
    S: MeshSink + ?Sized,
{
    let n = samples.len();
    sink.begin_edit(MeshCapacity {
        vertices: 2 * n,
        triangles: 0,
        lines: (2 * n).saturating_sub(1),
    })?;

    let centers: Vec<VertexHandle> = samples
        .iter()
        .map(|sample| sink.emit_vertex(marker_vertex(curve, sample, options, 0.0)))
        .collect();
    let tips: Vec<VertexHandle> = samples
        .iter()
        .map(|sample| sink.emit_vertex(marker_vertex(curve, sample, options, options.tangent_length)))
        .collect();

    for pair in centers.windows(2) {
        sink.emit_line([pair[0], pair[1]]);
    }
    for (&center, &tip) in centers.iter().zip(&tips) {
        sink.emit_line([center, tip]);
    }
    sink.end_edit()
}

/// Unit direction drawn for a sample: the curve tangent, or for cusps whose
/// tangent vanishes the outgoing sweep direction.
fn sample_tangent<C: ParametricCurve + ?Sized>(curve: &C, sample: &AdaptiveSample) -> Vec3 {
    curve.unit_tangent_at(sample.t).unwrap_or(match sample.kind {
        SampleKind::Cusp { end_tangent, .. } => end_tangent,
        SampleKind::Endpoint | SampleKind::Ring => Vec3::Z,
    })
}

fn marker_vertex<C: ParametricCurve + ?Sized>(
    curve: &C,
    sample: &AdaptiveSample,
    options: &MarkerOptions,
    offset: f64,
) -> TubeVertex {
    let tangent = sample_tangent(curve, sample);
    TubeVertex {
        position: curve.position_at(sample.t).add_vec(tangent.mul_scalar(offset)),
        normal: tangent,
        tangent,
        color: debug_color(sample.t),
        param: sample.t,
        id: options.id,
    }
}
