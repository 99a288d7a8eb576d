use serde::Serialize;

use super::core::{Point3, Vec3};

/// Index of an emitted vertex within the current edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VertexHandle(pub u32);

impl VertexHandle {
    /// Returned for writes the sink rejected (outside an edit or past capacity).
    pub const INVALID: Self = Self(u32::MAX);

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Attributes of one emitted tube vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TubeVertex {
    pub position: Point3,
    pub normal: Vec3,
    pub tangent: Vec3,
    /// Debug RGBA colour.
    pub color: [f64; 4],
    /// Curve parameter the vertex was emitted for.
    pub param: f64,
    pub id: u32,
}

/// Exact element counts a writer promises to emit inside one edit session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MeshCapacity {
    pub vertices: usize,
    pub triangles: usize,
    pub lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeshError {
    #[error("mesh edit already in progress")]
    AlreadyEditing,
    #[error("no mesh edit in progress")]
    NotEditing,
    #[error("more {kind} emitted than the reserved {capacity}")]
    CapacityOverflow { kind: &'static str, capacity: usize },
    #[error("expected {expected} {kind}, got {actual}")]
    CapacityMismatch {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("vertex {vertex} has a non-finite attribute")]
    NonFiniteAttribute { vertex: usize },
}

/// Writer side of a vertex/index buffer pair.
///
/// Every write happens between [`begin_edit`](Self::begin_edit) and
/// [`end_edit`](Self::end_edit). Nothing written inside the bracket may be
/// observable before `end_edit` succeeds, and a failed `end_edit` leaves the
/// previously committed contents in place. Vertex handles start at 0 in every
/// session.
pub trait MeshSink {
    fn begin_edit(&mut self, capacity: MeshCapacity) -> Result<(), MeshError>;

    fn emit_vertex(&mut self, vertex: TubeVertex) -> VertexHandle;

    fn emit_triangle(&mut self, triangle: [VertexHandle; 3]);

    /// Emits `a-b-c` and `a-c-d`.
    fn emit_quad(&mut self, quad: [VertexHandle; 4]) {
        let [a, b, c, d] = quad;
        self.emit_triangle([a, b, c]);
        self.emit_triangle([a, c, d]);
    }

    fn emit_line(&mut self, line: [VertexHandle; 2]);

    fn end_edit(&mut self) -> Result<(), MeshError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
struct MeshBuffers {
    positions: Vec<[f64; 3]>,
    normals: Vec<[f64; 3]>,
    tangents: Vec<[f64; 3]>,
    colors: Vec<[f64; 4]>,
    params: Vec<f64>,
    ids: Vec<u32>,
    indices: Vec<u32>,
    lines: Vec<u32>,
}

impl MeshBuffers {
    fn with_capacity(capacity: MeshCapacity) -> Self {
        Self {
            positions: Vec::with_capacity(capacity.vertices),
            normals: Vec::with_capacity(capacity.vertices),
            tangents: Vec::with_capacity(capacity.vertices),
            colors: Vec::with_capacity(capacity.vertices),
            params: Vec::with_capacity(capacity.vertices),
            ids: Vec::with_capacity(capacity.vertices),
            indices: Vec::with_capacity(capacity.triangles * 3),
            lines: Vec::with_capacity(capacity.lines * 2),
        }
    }

    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn push_vertex(&mut self, vertex: TubeVertex) {
        self.positions.push(vertex.position.to_array());
        self.normals.push(vertex.normal.to_array());
        self.tangents.push(vertex.tangent.to_array());
        self.colors.push(vertex.color);
        self.params.push(vertex.param);
        self.ids.push(vertex.id);
    }

    fn validate(&self) -> Result<(), MeshError> {
        let vertex_count = self.vertex_count();
        if let Some(&index) = self
            .indices
            .iter()
            .chain(self.lines.iter())
            .find(|&&i| i as usize >= vertex_count)
        {
            return Err(MeshError::IndexOutOfRange { index, vertex_count });
        }

        let finite3 = |v: &[f64; 3]| v.iter().all(|c| c.is_finite());
        let bad_vertex = (0..vertex_count).find(|&i| {
            !finite3(&self.positions[i])
                || !finite3(&self.normals[i])
                || !finite3(&self.tangents[i])
                || !self.colors[i].iter().all(|c| c.is_finite())
                || !self.params[i].is_finite()
        });
        match bad_vertex {
            Some(vertex) => Err(MeshError::NonFiniteAttribute { vertex }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Staging {
    capacity: MeshCapacity,
    buffers: MeshBuffers,
    overflow: Option<MeshError>,
}

impl Staging {
    fn record_overflow(&mut self, kind: &'static str, capacity: usize) {
        if self.overflow.is_none() {
            self.overflow = Some(MeshError::CapacityOverflow { kind, capacity });
        }
    }

    fn check_counts(&self) -> Result<(), MeshError> {
        let counts = [
            ("vertices", self.capacity.vertices, self.buffers.vertex_count()),
            ("triangles", self.capacity.triangles, self.buffers.indices.len() / 3),
            ("lines", self.capacity.lines, self.buffers.lines.len() / 2),
        ];
        for (kind, expected, actual) in counts {
            if expected != actual {
                return Err(MeshError::CapacityMismatch {
                    kind,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// In-memory [`MeshSink`] with a committed front buffer and a staging buffer.
///
/// The read accessors always reflect the last successfully committed session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TubeMesh {
    front: MeshBuffers,
    staging: Option<Staging>,
    stray_writes: usize,
}

impl TubeMesh {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.staging.is_some()
    }

    /// Writes attempted outside an edit session since the last `end_edit`.
    #[must_use]
    pub fn stray_writes(&self) -> usize {
        self.stray_writes
    }

    /// Drops the committed contents.
    pub fn clear(&mut self) {
        self.front = MeshBuffers::default();
    }

    #[must_use]
    pub fn positions(&self) -> &[[f64; 3]] {
        &self.front.positions
    }

    #[must_use]
    pub fn normals(&self) -> &[[f64; 3]] {
        &self.front.normals
    }

    #[must_use]
    pub fn tangents(&self) -> &[[f64; 3]] {
        &self.front.tangents
    }

    #[must_use]
    pub fn colors(&self) -> &[[f64; 4]] {
        &self.front.colors
    }

    #[must_use]
    pub fn params(&self) -> &[f64] {
        &self.front.params
    }

    #[must_use]
    pub fn ids(&self) -> &[u32] {
        &self.front.ids
    }

    /// Triangle list, three indices per triangle.
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.front.indices
    }

    /// Line list, two indices per segment.
    #[must_use]
    pub fn lines(&self) -> &[u32] {
        &self.front.lines
    }

    /// Positions as `[x0, y0, z0, x1, ...]` for packed GPU/JS uploads.
    #[must_use]
    pub fn positions_flat(&self) -> &[f64] {
        self.front.positions.as_flattened()
    }

    #[must_use]
    pub fn normals_flat(&self) -> &[f64] {
        self.front.normals.as_flattened()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.front.vertex_count()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.front.indices.len() / 3
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.front.lines.len() / 2
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.front.positions.is_empty()
    }

    /// Checks the committed buffers: indices in range, every attribute finite.
    pub fn validate(&self) -> Result<(), MeshError> {
        self.front.validate()
    }

    /// Owned copy of the committed buffers for serialisation.
    #[must_use]
    pub fn export(&self) -> MeshExport {
        MeshExport {
            positions: self.positions_flat().to_vec(),
            normals: self.normals_flat().to_vec(),
            tangents: self.front.tangents.as_flattened().to_vec(),
            colors: self.front.colors.as_flattened().to_vec(),
            params: self.front.params.clone(),
            ids: self.front.ids.clone(),
            indices: self.front.indices.clone(),
            lines: self.front.lines.clone(),
        }
    }
}

impl MeshSink for TubeMesh {
    fn begin_edit(&mut self, capacity: MeshCapacity) -> Result<(), MeshError> {
        if self.staging.is_some() {
            return Err(MeshError::AlreadyEditing);
        }
        self.staging = Some(Staging {
            capacity,
            buffers: MeshBuffers::with_capacity(capacity),
            overflow: None,
        });
        Ok(())
    }

    fn emit_vertex(&mut self, vertex: TubeVertex) -> VertexHandle {
        let Some(staging) = self.staging.as_mut() else {
            self.stray_writes += 1;
            return VertexHandle::INVALID;
        };
        let index = staging.buffers.vertex_count();
        if index >= staging.capacity.vertices {
            staging.record_overflow("vertices", staging.capacity.vertices);
            return VertexHandle::INVALID;
        }
        staging.buffers.push_vertex(vertex);
        u32::try_from(index).map_or(VertexHandle::INVALID, VertexHandle)
    }

    fn emit_triangle(&mut self, triangle: [VertexHandle; 3]) {
        let Some(staging) = self.staging.as_mut() else {
            self.stray_writes += 1;
            return;
        };
        if staging.buffers.indices.len() / 3 >= staging.capacity.triangles {
            staging.record_overflow("triangles", staging.capacity.triangles);
            return;
        }
        staging.buffers.indices.extend(triangle.map(|h| h.0));
    }

    fn emit_line(&mut self, line: [VertexHandle; 2]) {
        let Some(staging) = self.staging.as_mut() else {
            self.stray_writes += 1;
            return;
        };
        if staging.buffers.lines.len() / 2 >= staging.capacity.lines {
            staging.record_overflow("lines", staging.capacity.lines);
            return;
        }
        staging.buffers.lines.extend(line.map(|h| h.0));
    }

    fn end_edit(&mut self) -> Result<(), MeshError> {
        let staging = self.staging.take().ok_or(MeshError::NotEditing)?;
        if self.stray_writes > 0 {
            log::warn!("{} mesh writes happened outside an edit session", self.stray_writes);
            self.stray_writes = 0;
            return Err(MeshError::NotEditing);
        }
        if let Some(overflow) = staging.overflow {
            return Err(overflow);
        }
        staging.check_counts()?;
        staging.buffers.validate()?;
        self.front = staging.buffers;
        Ok(())
    }
}

/// Serialisable snapshot of a [`TubeMesh`] with flat attribute arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshExport {
    pub positions: Vec<f64>,
    pub normals: Vec<f64>,
    pub tangents: Vec<f64>,
    pub colors: Vec<f64>,
    pub params: Vec<f64>,
    pub ids: Vec<u32>,
    pub indices: Vec<u32>,
    pub lines: Vec<u32>,
}
