use super::OutputSink;
use anyhow::{Context, Result};
use image::RgbImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, FourCC};

/// Writes composited frames as YUYV to a v4l2loopback device.
pub struct V4L2Output {
    file: File,
    width: u32,
    height: u32,
    yuyv: Vec<u8>,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2 device at {}", path.display()))?;
        let mut format = Output::format(&device).context("Failed to query output format")?;
        format.width = width;
        format.height = height;
        format.fourcc = FourCC::new(b"YUYV");
        let format = Output::set_format(&device, &format).context("Failed to set output format")?;
        tracing::info!(
            "Output format negotiated: {}x{} {}",
            format.width,
            format.height,
            format.fourcc
        );

        // v4l2loopback accepts raw frame data written to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            file,
            width: format.width,
            height: format.height,
            yuyv: Vec::new(),
        })
    }

    /// Convert an RGB frame to YUV422 (YUYV), reusing `out`.
    fn rgb_to_yuyv(rgb_image: &RgbImage, out: &mut Vec<u8>) {
        let (width, height) = rgb_image.dimensions();
        out.clear();
        out.reserve((width as usize) * (height as usize) * 2);

        for y in 0..height {
            for x in (0..width).step_by(2) {
                let pixel1 = rgb_image.get_pixel(x, y);
                let pixel2 = if x + 1 < width {
                    rgb_image.get_pixel(x + 1, y)
                } else {
                    pixel1
                };

                let (y1, u1, v1) = rgb_to_yuv(pixel1[0], pixel1[1], pixel1[2]);
                let (y2, u2, v2) = rgb_to_yuv(pixel2[0], pixel2[1], pixel2[2]);

                // Chroma is shared by the pixel pair
                let u = ((u16::from(u1) + u16::from(u2)) / 2) as u8;
                let v = ((u16::from(v1) + u16::from(v2)) / 2) as u8;

                out.extend_from_slice(&[y1, u, y2, v]);
            }
        }
    }
}

/// Convert RGB to YUV color space
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = f32::from(r);
    let g = f32::from(g);
    let b = f32::from(b);

    let y = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).clamp(0.0, 255.0) as u8;

    (y, u, v)
}

impl OutputSink for V4L2Output {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() == (self.width, self.height) {
            Self::rgb_to_yuyv(frame, &mut self.yuyv);
        } else {
            let resized = image::imageops::resize(
                frame,
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            );
            Self::rgb_to_yuyv(&resized, &mut self.yuyv);
        }

        self.file
            .write_all(&self.yuyv)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        Some((self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn yuyv_packs_pixel_pairs() {
        let image = RgbImage::from_pixel(4, 1, Rgb([255, 255, 255]));
        let mut out = Vec::new();
        V4L2Output::rgb_to_yuyv(&image, &mut out);
        assert_eq!(out.len(), 8);
        assert!(out[0] >= 254);
        assert_eq!(out[0], out[2]);
    }

    #[test]
    fn odd_width_repeats_last_pixel() {
        let image = RgbImage::from_pixel(3, 1, Rgb([0, 0, 0]));
        let mut out = vec![1; 64];
        V4L2Output::rgb_to_yuyv(&image, &mut out);
        assert_eq!(out, vec![0, 128, 0, 128, 0, 128, 0, 128]);
    }
}
