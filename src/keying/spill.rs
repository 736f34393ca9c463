//! Second pass over retained pixels: green spill removal and edge feathering.

use super::params::{KeyingParameters, FEATHER_MIN_ALPHA};

/// Correct one RGBA8 pixel using the alpha computed by the key pass.
///
/// Pixels with zero alpha are left untouched.
pub fn suppress_pixel(px: &mut [u8], params: &KeyingParameters) {
    let alpha = px[3];
    if alpha == 0 {
        return;
    }

    let (r, g, b) = (px[0], px[1], px[2]);
    if g > r && g > b {
        let max_other = r.max(b);
        let spill = f64::from(g - max_other) * params.spill_factor;
        let green = (f64::from(g) - spill).max(f64::from(max_other));
        // Halfway values round to even.
        px[1] = green.round_ties_even().clamp(0.0, 255.0) as u8;
    }

    if alpha > FEATHER_MIN_ALPHA && alpha < u8::MAX {
        px[3] = (f64::from(alpha) * params.feather_factor)
            .floor()
            .clamp(0.0, 255.0) as u8;
    }
}

pub fn apply(pixels: &mut [u8], params: &KeyingParameters) {
    let _span = tracing::debug_span!("spill_suppress").entered();

    for px in pixels.chunks_exact_mut(4) {
        suppress_pixel(px, params);
    }
}
