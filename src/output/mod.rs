mod loopback;
mod png_sequence;

pub use loopback::V4L2Output;
pub use png_sequence::PngSequence;

use anyhow::Result;
use image::RgbImage;

/// Trait for output destinations
pub trait OutputSink {
    /// Write a composited frame to the output
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Get the expected output resolution, if fixed
    fn resolution(&self) -> Option<(u32, u32)>;
}
