//! Diagnostics for a tessellation pass.
//!
//! Returned inside every [`TubeTessellation`](super::tube::TubeTessellation);
//! the wasm facade forwards them to JS unchanged.
//!
//! ```ignore
//! let (mesh, tessellation) = tube_mesh(&curve, &options)?;
//! if !tessellation.diagnostics.is_clean() {
//!     for warning in &tessellation.diagnostics.warnings {
//!         eprintln!("warning: {warning}");
//!     }
//! }
//! ```

use std::fmt;

use serde::Serialize;

use super::metrics::TessellationTimingReport;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TessellationDiagnostics {
    /// Vertex rings emitted, both cap rings included.
    pub stack_count: usize,

    pub slice_count: usize,

    pub vertex_count: usize,

    pub triangle_count: usize,

    /// Entries in the adaptive sample list, endpoints included.
    pub sample_count: usize,

    /// Samples swept as cusps. Each one contributes a fan of rings at a single
    /// curve position.
    pub cusp_count: usize,

    /// Intervals tested by subdivision. Zero on the straight extension path.
    pub subdivision_node_count: usize,

    pub max_subdivision_depth: u32,

    /// The curve was straight and skipped subdivision entirely.
    pub straight_extension: bool,

    /// Rings whose frame had to be seeded again because the tangent became
    /// parallel to the previous normal or vanished.
    ///
    /// Non-zero values usually indicate a cusp the subdivision did not isolate.
    pub frame_reseed_count: usize,

    pub timing: Option<TessellationTimingReport>,

    pub warnings: Vec<String>,
}

impl TessellationDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// No re-seeded frames and no warnings. Cusps are expected geometry and do
    /// not count against cleanliness.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.frame_reseed_count == 0 && self.warnings.is_empty()
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![format!(
            "V:{} T:{} stacks:{}x{}",
            self.vertex_count, self.triangle_count, self.stack_count, self.slice_count
        )];
        if self.straight_extension {
            parts.push("straight".to_string());
        }
        if self.cusp_count > 0 {
            parts.push(format!("cusps:{}", self.cusp_count));
        }
        if self.frame_reseed_count > 0 {
            parts.push(format!("reseeds:{}", self.frame_reseed_count));
        }
        parts.join(" ")
    }
}

impl fmt::Display for TessellationDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tessellation Diagnostics:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Triangles: {}", self.triangle_count)?;
        writeln!(f, "  Stacks: {} x {} slices", self.stack_count, self.slice_count)?;
        writeln!(f, "  Samples: {}", self.sample_count)?;

        if self.straight_extension {
            writeln!(f, "  Path: straight extension")?;
        } else {
            writeln!(
                f,
                "  Path: adaptive ({} nodes, depth {})",
                self.subdivision_node_count, self.max_subdivision_depth
            )?;
        }
        if self.cusp_count > 0 {
            writeln!(f, "  Cusps: {}", self.cusp_count)?;
        }
        if self.frame_reseed_count > 0 {
            writeln!(f, "  Frame reseeds: {}", self.frame_reseed_count)?;
        }

        if !self.warnings.is_empty() {
            writeln!(f, "  Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "    - {warning}")?;
            }
        }

        if let Some(ref timing) = self.timing {
            writeln!(f, "  Timing: {} ms total", timing.total_ms())?;
        }

        let status = if self.is_clean() { "CLEAN" } else { "ISSUES DETECTED" };
        writeln!(f, "  Status: {status}")?;
        Ok(())
    }
}
