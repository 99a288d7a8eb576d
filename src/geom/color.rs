//! Colour helpers for debug visualisation of tessellated tubes.

/// Fraction of the hue wheel swept by [`debug_color`] across `t ∈ [0, 1]`.
/// Stopping short of a full turn keeps the two curve ends distinguishable.
const DEBUG_HUE_SPAN: f64 = 0.8;
const DEBUG_SATURATION: f64 = 0.85;
const DEBUG_VALUE: f64 = 0.95;

/// Converts HSV to linear RGB.
///
/// `h` is measured in turns and wrapped into `[0, 1)`; `s` and `v` are clamped to `[0, 1]`.
#[must_use]
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [f64; 3] {
    let s = s.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);
    if s <= 0.0 || !h.is_finite() {
        return [v, v, v];
    }

    let h = h.rem_euclid(1.0) * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match sector as u8 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

/// RGBA colour keyed by the curve parameter, used to tint debug vertices.
#[must_use]
pub fn debug_color(t: f64) -> [f64; 4] {
    let [r, g, b] = hsv_to_rgb(t.clamp(0.0, 1.0) * DEBUG_HUE_SPAN, DEBUG_SATURATION, DEBUG_VALUE);
    [r, g, b, 1.0]
}
