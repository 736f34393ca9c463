//! Alpha pass: remove pixels close to the backdrop color.
//!
//! Each pixel is keyed from its own color and alpha only, so the pass can run
//! in any order over the buffer.

use super::params::{BackdropColor, KeyingParameters};

/// Euclidean RGB distance between a pixel and the backdrop.
pub fn color_distance(r: u8, g: u8, b: u8, backdrop: BackdropColor) -> f64 {
    let dr = f64::from(r) - f64::from(backdrop.r);
    let dg = f64::from(g) - f64::from(backdrop.g);
    let db = f64::from(b) - f64::from(backdrop.b);
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Alpha for a pixel at `distance` from the backdrop.
///
/// Below `low_threshold` the pixel is removed; across the smooth range alpha
/// ramps linearly from 0 up to its original value; beyond it alpha is kept.
pub fn keyed_alpha(alpha: u8, distance: f64, params: &KeyingParameters) -> u8 {
    if distance < params.low_threshold {
        0
    } else if distance < params.high_threshold() {
        let ramp = (distance - params.low_threshold) / params.smooth_range;
        (f64::from(alpha) * ramp).floor().clamp(0.0, 255.0) as u8
    } else {
        alpha
    }
}

/// Overwrite the alpha channel of an RGBA8 buffer in place.
pub fn apply(pixels: &mut [u8], backdrop: BackdropColor, params: &KeyingParameters) {
    let _span = tracing::debug_span!("chroma_key").entered();

    for px in pixels.chunks_exact_mut(4) {
        let distance = color_distance(px[0], px[1], px[2], backdrop);
        px[3] = keyed_alpha(px[3], distance, params);
    }
}
