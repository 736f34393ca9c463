use image::RgbImage;

/// The displayed canvas. Always fully opaque.
#[derive(Debug, Clone)]
pub struct Surface {
    image: RgbImage,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    pub fn new() -> Self {
        Self {
            image: RgbImage::new(0, 0),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub(crate) fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Resize to `width`x`height`. Returns false when the size already matches.
    pub(crate) fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.image.dimensions() == (width, height) {
            return false;
        }
        tracing::info!(
            "Resizing surface from {}x{} to {}x{}",
            self.image.width(),
            self.image.height(),
            width,
            height
        );
        self.image = RgbImage::new(width, height);
        true
    }
}
