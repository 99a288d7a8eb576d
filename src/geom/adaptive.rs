//! Curvature-driven sampling of a curve for tube emission.
//!
//! [`plan_samples`] recursively bisects `[0, 1]`. Each interval is sampled at
//! four evenly spaced positions which act as tangent proxies: the chord from
//! first to last, the first third and the last third. When all three pairwise
//! alignments exceed the flatness threshold, and the interval spans at most one
//! curve segment, a ring is recorded at the interval midpoint. Otherwise the
//! interval is bisected, unless it has already shrunk below the cusp interval,
//! in which case it is recorded as a cusp.
//!
//! Planning is separate from emission so the sink can be sized exactly before
//! any vertex is written, and so debug builders can replay the same samples.

use serde::Serialize;

use super::core::{Tolerance, Vec3};
use super::curve::ParametricCurve;
use super::tube::TubeOptions;

/// Lower bound on the effective cusp interval. Keeps bisection away from
/// intervals too narrow for their midpoint to be distinct from the ends.
const MIN_CUSP_INTERVAL: f64 = 1e-12;

/// Thresholds driving one subdivision pass, already scaled to the curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubdivisionSettings {
    /// An interval is flat when all three proxy dot products exceed this.
    pub flatness_threshold: f64,
    /// Non-flat intervals narrower than this become cusps.
    pub cusp_interval: f64,
    /// Wider intervals are bisected without testing, so every span is tested.
    pub max_flat_width: f64,
}

impl SubdivisionSettings {
    /// Scales the options' thresholds by the curve's logical segment count.
    ///
    /// The flatness threshold tightens to `1 - (1 - adaptive_epsilon) / segments`
    /// and the cusp interval shrinks to `cusp_interval / segments`, so every span of
    /// a multi-span curve is refined like a single-span curve would be. No interval
    /// wider than one span is accepted as flat.
    #[must_use]
    pub fn for_curve(options: &TubeOptions, segment_count: usize) -> Self {
        Self::new(options.adaptive_epsilon, options.cusp_interval, segment_count)
    }

    #[must_use]
    pub fn new(adaptive_epsilon: f64, cusp_interval: f64, segment_count: usize) -> Self {
        let segments = segment_count.max(1) as f64;
        Self {
            flatness_threshold: 1.0 - (1.0 - adaptive_epsilon) / segments,
            cusp_interval: (cusp_interval / segments).max(MIN_CUSP_INTERVAL),
            max_flat_width: 1.0 / segments,
        }
    }
}

/// Unit tangent proxies of one interval.
///
/// `chord` is `P0 → P3`, `start` is `P0 → P1`, `end` is `P2 → P3`, with the four
/// points taken at `t0`, a third of the way, two thirds of the way and `t1`.
/// Proxies whose points coincide fall back to the curve's own tangent at the
/// interval boundary; they are `None` only when that vanishes too.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentProxies {
    pub chord: Option<Vec3>,
    pub start: Option<Vec3>,
    pub end: Option<Vec3>,
}

impl TangentProxies {
    pub fn sample<C: ParametricCurve + ?Sized>(curve: &C, t0: f64, t1: f64) -> Self {
        let width = t1 - t0;
        let p0 = curve.position_at(t0);
        let p1 = curve.position_at(t0 + width / 3.0);
        let p2 = curve.position_at(t0 + 2.0 * width / 3.0);
        let p3 = curve.position_at(t1);

        let unit = |v: Vec3| v.normalized_with(Tolerance::ZERO_LENGTH);
        Self {
            chord: unit(p3.sub_point(p0)),
            start: unit(p1.sub_point(p0)).or_else(|| curve.unit_tangent_at(t0)),
            end: unit(p3.sub_point(p2)).or_else(|| curve.unit_tangent_at(t1)),
        }
    }

    /// `(d1, d2, d3)`: start·chord, end·chord and start·end.
    ///
    /// `None` when the chord vanishes, as there is no reference direction.
    /// A missing start or end proxy is replaced by the chord.
    #[must_use]
    pub fn deviation(&self) -> Option<(f64, f64, f64)> {
        let chord = self.chord?;
        let start = self.start.unwrap_or(chord);
        let end = self.end.unwrap_or(chord);
        Some((start.dot(chord), end.dot(chord), start.dot(end)))
    }

    /// Whether every alignment exceeds `threshold`.
    ///
    /// A closed interval (vanishing chord) with any non-zero proxy is not flat;
    /// a stationary one, with every proxy vanishing, is.
    #[must_use]
    pub fn is_flat(&self, threshold: f64) -> bool {
        match self.deviation() {
            Some((d1, d2, d3)) => d1 > threshold && d2 > threshold && d3 > threshold,
            None => self.start.is_none() && self.end.is_none(),
        }
    }

    /// Incoming and outgoing directions used to sweep a cusp.
    #[must_use]
    pub fn boundary_tangents(&self) -> (Vec3, Vec3) {
        let fallback = self.chord.or(self.start).or(self.end).unwrap_or(Vec3::Z);
        (
            self.start.unwrap_or(fallback),
            self.end.unwrap_or(fallback),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SampleKind {
    /// Curve end at `t = 0` or `t = 1`; closed by a cap.
    Endpoint,
    /// Midpoint of an interval that passed the flatness test.
    Ring,
    /// Midpoint of an interval that stayed bent below the cusp interval.
    Cusp {
        start_tangent: Vec3,
        end_tangent: Vec3,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdaptiveSample {
    pub t: f64,
    #[serde(flatten)]
    pub kind: SampleKind,
}

impl AdaptiveSample {
    #[must_use]
    pub const fn endpoint(t: f64) -> Self {
        Self {
            t,
            kind: SampleKind::Endpoint,
        }
    }

    #[must_use]
    pub const fn is_cusp(&self) -> bool {
        matches!(self.kind, SampleKind::Cusp { .. })
    }

    /// Rings this sample contributes to the side surface.
    #[must_use]
    pub const fn ring_count(&self, cusp_steps: usize) -> usize {
        if self.is_cusp() { cusp_steps } else { 1 }
    }
}

/// Parameters at which rings were emitted, strictly ascending, from `0.0` to `1.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AdaptiveSampleList {
    samples: Vec<AdaptiveSample>,
}

impl AdaptiveSampleList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The straight-extension plan: only the two endpoints.
    #[must_use]
    pub fn endpoints_only() -> Self {
        Self {
            samples: vec![AdaptiveSample::endpoint(0.0), AdaptiveSample::endpoint(1.0)],
        }
    }

    #[must_use]
    pub fn parameters(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.t).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AdaptiveSample> {
        self.samples.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[AdaptiveSample] {
        &self.samples
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn cusp_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_cusp()).count()
    }

    /// Side rings the list expands to when each cusp sweeps `cusp_steps` rings.
    ///
    /// Saturates at `usize::MAX`; callers size buffers with checked arithmetic.
    #[must_use]
    pub fn ring_count(&self, cusp_steps: usize) -> usize {
        self.samples
            .iter()
            .map(|s| s.ring_count(cusp_steps))
            .fold(0, usize::saturating_add)
    }

    /// Position of the sample recorded at exactly `t`.
    #[must_use]
    pub fn index_of(&self, t: f64) -> Option<usize> {
        let index = self.samples.partition_point(|s| s.t < t);
        (self.samples.get(index)?.t == t).then_some(index)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub(crate) fn push(&mut self, sample: AdaptiveSample) {
        debug_assert!(self.samples.last().is_none_or(|last| last.t < sample.t));
        self.samples.push(sample);
    }
}

impl<'a> IntoIterator for &'a AdaptiveSampleList {
    type Item = &'a AdaptiveSample;
    type IntoIter = std::slice::Iter<'a, AdaptiveSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// Counters describing one subdivision pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SubdivisionStats {
    /// Intervals tested, the root included.
    pub node_count: usize,
    /// Deepest recursion level reached; the root is level 0.
    pub max_depth: u32,
    pub cusp_count: usize,
    pub flat_leaf_count: usize,
    /// Narrowest interval that was bisected, `None` if the root was a leaf.
    pub min_bisected_width: Option<f64>,
}

/// Runs adaptive subdivision over `[0, 1]` and returns the recorded samples.
pub fn plan_samples<C: ParametricCurve + ?Sized>(
    curve: &C,
    settings: SubdivisionSettings,
) -> (AdaptiveSampleList, SubdivisionStats) {
    let mut planner = Planner {
        curve,
        settings,
        samples: AdaptiveSampleList::new(),
        stats: SubdivisionStats::default(),
    };
    planner.samples.push(AdaptiveSample::endpoint(0.0));
    planner.subdivide(0.0, 1.0, 0);
    planner.samples.push(AdaptiveSample::endpoint(1.0));

    log::debug!(
        "adaptive plan: {} samples, {} nodes, depth {}, {} cusps",
        planner.samples.len(),
        planner.stats.node_count,
        planner.stats.max_depth,
        planner.stats.cusp_count
    );
    (planner.samples, planner.stats)
}

struct Planner<'c, C: ?Sized> {
    curve: &'c C,
    settings: SubdivisionSettings,
    samples: AdaptiveSampleList,
    stats: SubdivisionStats,
}

impl<C: ParametricCurve + ?Sized> Planner<'_, C> {
    fn subdivide(&mut self, t0: f64, t1: f64, depth: u32) {
        self.stats.node_count += 1;
        self.stats.max_depth = self.stats.max_depth.max(depth);

        let tm = 0.5 * (t0 + t1);
        let width = t1 - t0;
        let proxies = TangentProxies::sample(self.curve, t0, t1);

        if width <= self.settings.max_flat_width && proxies.is_flat(self.settings.flatness_threshold) {
            log::trace!("flat [{t0}, {t1}] -> ring at {tm}");
            self.stats.flat_leaf_count += 1;
            self.samples.push(AdaptiveSample {
                t: tm,
                kind: SampleKind::Ring,
            });
            return;
        }

        if width < self.settings.cusp_interval {
            let (start_tangent, end_tangent) = proxies.boundary_tangents();
            log::trace!("cusp [{t0}, {t1}] at {tm}: {:?}", proxies.deviation());
            self.stats.cusp_count += 1;
            self.samples.push(AdaptiveSample {
                t: tm,
                kind: SampleKind::Cusp {
                    start_tangent,
                    end_tangent,
                },
            });
            return;
        }

        log::trace!("bisect [{t0}, {t1}] at depth {depth}");
        self.stats.min_bisected_width = Some(
            self.stats
                .min_bisected_width
                .map_or(width, |narrowest| narrowest.min(width)),
        );
        self.subdivide(t0, tm, depth + 1);
        self.subdivide(tm, t1, depth + 1);
    }
}
