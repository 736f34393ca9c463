mod background;
mod surface;

pub use background::Background;
pub use surface::Surface;

use crate::error::FrameError;
use crate::frame::Frame;

/// Draws the background, then the keyed frame over it.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    surface: Surface,
    background: Background,
}

impl Compositor {
    pub fn new(background: Background) -> Self {
        Self {
            surface: Surface::new(),
            background,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Composite `frame` onto the surface.
    ///
    /// A frame that fails validation is rejected before anything is touched,
    /// so the surface keeps showing the previous result. Returns whether the
    /// surface had to be resized.
    pub fn compose(&mut self, frame: &Frame) -> Result<bool, FrameError> {
        frame.validate()?;
        let _span = tracing::debug_span!("composite").entered();

        let (width, height) = frame.dimensions();
        let resized = self.surface.resize(width, height);
        self.background.prepare(width, height);

        let layer = self.background.layer();
        let pixels = self
            .surface
            .image_mut()
            .chunks_exact_mut(3)
            .zip(layer.chunks_exact(3))
            .zip(frame.data().chunks_exact(4));
        for ((dst, bg), fg) in pixels {
            let alpha = u16::from(fg[3]);
            for i in 0..3 {
                dst[i] = over(fg[i], bg[i], alpha);
            }
        }

        Ok(resized)
    }
}

/// `fg * a + bg * (1 - a)` with `a` in 0..=255.
pub fn over(fg: u8, bg: u8, alpha: u16) -> u8 {
    let inv = 255 - alpha;
    ((u32::from(fg) * u32::from(alpha) + u32::from(bg) * u32::from(inv) + 127) / 255) as u8
}
