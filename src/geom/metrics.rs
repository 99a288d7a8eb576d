//! Opt-in timing hooks for tube tessellation.
//!
//! Timing is only collected when the `tube_engine_metrics` feature is enabled
//! and the target is not `wasm32` (`std::time::Instant` is unavailable there).
//! Otherwise every call compiles down to running the closure.
//!
//! ```ignore
//! use tube_engine::geom::{TessellationMetrics, TimingBucket};
//!
//! let mut metrics = TessellationMetrics::default();
//! metrics.begin();
//! let plan = metrics.time(TimingBucket::Subdivision, || plan_samples(&curve, settings));
//! if let Some(report) = metrics.end() {
//!     println!("subdivision: {} ns", report.subdivision_ns);
//! }
//! ```

use serde::Serialize;

/// Phases of a tessellation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingBucket {
    /// Adaptive sample planning, including the straightness check.
    Subdivision,
    /// Frame propagation and ring vertex emission.
    RingEmission,
    /// Side quads and cap fans.
    Stitching,
    /// Point and line marker meshes.
    DebugMesh,
}

/// Cumulative nanoseconds per [`TimingBucket`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TessellationTimingReport {
    pub subdivision_ns: u64,
    pub ring_emission_ns: u64,
    pub stitching_ns: u64,
    pub debug_mesh_ns: u64,
}

impl TessellationTimingReport {
    #[must_use]
    pub fn total_ns(&self) -> u64 {
        self.subdivision_ns
            .saturating_add(self.ring_emission_ns)
            .saturating_add(self.stitching_ns)
            .saturating_add(self.debug_mesh_ns)
    }

    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }
}

/// Accumulator for timing tessellation phases.
///
/// Call [`begin`](Self::begin) to reset, wrap work in [`time`](Self::time) and
/// collect the report with [`end`](Self::end), which is `None` when metrics are
/// compiled out.
#[derive(Debug, Default)]
pub struct TessellationMetrics {
    #[cfg(all(feature = "tube_engine_metrics", not(target_arch = "wasm32")))]
    report: TessellationTimingReport,
}

impl TessellationMetrics {
    pub fn begin(&mut self) {
        #[cfg(all(feature = "tube_engine_metrics", not(target_arch = "wasm32")))]
        {
            self.report = TessellationTimingReport::default();
        }
    }

    #[must_use]
    pub fn end(&self) -> Option<TessellationTimingReport> {
        #[cfg(all(feature = "tube_engine_metrics", not(target_arch = "wasm32")))]
        {
            Some(self.report.clone())
        }
        #[cfg(not(all(feature = "tube_engine_metrics", not(target_arch = "wasm32"))))]
        {
            None
        }
    }

    /// Runs `f`, adding its wall time to `bucket`.
    pub fn time<R>(&mut self, bucket: TimingBucket, f: impl FnOnce() -> R) -> R {
        #[cfg(all(feature = "tube_engine_metrics", not(target_arch = "wasm32")))]
        {
            let start = std::time::Instant::now();
            let result = f();
            // Cap at u64::MAX to prevent overflow
            let nanos = start.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64;
            self.add_to_bucket(bucket, nanos);
            result
        }

        #[cfg(not(all(feature = "tube_engine_metrics", not(target_arch = "wasm32"))))]
        {
            let _ = bucket;
            f()
        }
    }

    #[cfg(all(feature = "tube_engine_metrics", not(target_arch = "wasm32")))]
    fn add_to_bucket(&mut self, bucket: TimingBucket, nanos: u64) {
        let slot = match bucket {
            TimingBucket::Subdivision => &mut self.report.subdivision_ns,
            TimingBucket::RingEmission => &mut self.report.ring_emission_ns,
            TimingBucket::Stitching => &mut self.report.stitching_ns,
            TimingBucket::DebugMesh => &mut self.report.debug_mesh_ns,
        };
        *slot = slot.saturating_add(nanos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_total() {
        let report = TessellationTimingReport {
            subdivision_ns: 1000,
            ring_emission_ns: 2000,
            stitching_ns: 3000,
            debug_mesh_ns: 0,
        };
        assert_eq!(report.total_ns(), 6000);
        assert!((report.total_ms() - 0.006).abs() < 1e-9);
    }

    #[test]
    fn time_returns_closure_result() {
        let mut metrics = TessellationMetrics::default();
        metrics.begin();
        assert_eq!(metrics.time(TimingBucket::Stitching, || 42), 42);
        let report = metrics.end();
        #[cfg(all(feature = "tube_engine_metrics", not(target_arch = "wasm32")))]
        assert!(report.is_some());
        #[cfg(not(all(feature = "tube_engine_metrics", not(target_arch = "wasm32"))))]
        assert!(report.is_none());
    }
}
