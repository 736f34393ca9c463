use anyhow::{Context, Result};
use image::{imageops, Rgb, RgbImage};
use std::path::Path;

/// Static layer drawn beneath the keyed subject.
///
/// The source raster is loaded once. A copy scaled to cover the surface,
/// centered and optionally vignetted is rebuilt only when the surface size
/// changes.
#[derive(Debug, Clone)]
pub struct Background {
    source: Option<RgbImage>,
    fill: Rgb<u8>,
    vignette: f32,
    layer: RgbImage,
}

impl Default for Background {
    fn default() -> Self {
        Self::solid(Rgb([0, 0, 0]))
    }
}

impl Background {
    pub fn solid(fill: Rgb<u8>) -> Self {
        Self {
            source: None,
            fill,
            vignette: 0.0,
            layer: RgbImage::new(0, 0),
        }
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self {
            source: Some(image),
            ..Self::default()
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading background image from {}", path.display());

        let image = image::open(path)
            .with_context(|| format!("Failed to load background image {}", path.display()))?
            .to_rgb8();

        tracing::info!("Background loaded ({}x{})", image.width(), image.height());
        Ok(Self::from_image(image))
    }

    /// Darken image backgrounds towards the corners, reaching `opacity` black
    /// at the farthest corner. Zero disables it. Solid fills are never vignetted.
    pub fn with_vignette(mut self, opacity: f32) -> Self {
        self.vignette = opacity.clamp(0.0, 1.0);
        self.layer = RgbImage::new(0, 0);
        self
    }

    /// Layer matching the size passed to the last [`Background::prepare`].
    pub fn layer(&self) -> &RgbImage {
        &self.layer
    }

    /// Build the layer for a `width`x`height` surface if it is not already cached.
    pub fn prepare(&mut self, width: u32, height: u32) {
        if self.layer.dimensions() == (width, height) {
            return;
        }
        let _span = tracing::debug_span!("background_prepare").entered();

        self.layer = match &self.source {
            Some(source) if source.width() > 0 && source.height() > 0 => {
                let mut layer = cover(source, width, height);
                if self.vignette > 0.0 {
                    vignette(&mut layer, self.vignette);
                }
                layer
            }
            _ => RgbImage::from_pixel(width, height, self.fill),
        };
    }
}

/// Scale `source` to cover `width`x`height` preserving aspect, then center-crop.
fn cover(source: &RgbImage, width: u32, height: u32) -> RgbImage {
    if width == 0 || height == 0 {
        return RgbImage::new(width, height);
    }

    let (sw, sh) = source.dimensions();
    let scale = f64::max(
        f64::from(width) / f64::from(sw),
        f64::from(height) / f64::from(sh),
    );
    let scaled_w = ((f64::from(sw) * scale).ceil() as u32).max(width);
    let scaled_h = ((f64::from(sh) * scale).ceil() as u32).max(height);

    let scaled = if (scaled_w, scaled_h) == (sw, sh) {
        source.clone()
    } else {
        imageops::resize(source, scaled_w, scaled_h, imageops::FilterType::Triangle)
    };

    let x = (scaled_w - width) / 2;
    let y = (scaled_h - height) / 2;
    imageops::crop_imm(&scaled, x, y, width, height).to_image()
}

/// Elliptical radial gradient sized to the farthest corner: clear out to half
/// the radius, then ramping linearly to `opacity` black at the corners.
fn vignette(layer: &mut RgbImage, opacity: f32) {
    let (width, height) = layer.dimensions();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let rx = cx * std::f32::consts::SQRT_2;
    let ry = cy * std::f32::consts::SQRT_2;

    for (x, y, px) in layer.enumerate_pixels_mut() {
        let dx = (x as f32 + 0.5 - cx) / rx;
        let dy = (y as f32 + 0.5 - cy) / ry;
        let t = (dx * dx + dy * dy).sqrt();
        let shade = opacity * ((t - 0.5) / 0.5).clamp(0.0, 1.0);
        if shade <= 0.0 {
            continue;
        }
        for c in px.0.iter_mut() {
            *c = (f32::from(*c) * (1.0 - shade)).round() as u8;
        }
    }
}
