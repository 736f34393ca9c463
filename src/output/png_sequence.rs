use super::OutputSink;
use anyhow::{Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

/// Writes each composited frame as `frame_NNNNNN.png` into a directory.
pub struct PngSequence {
    dir: PathBuf,
    next_index: u64,
}

impl PngSequence {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        tracing::info!("Writing PNG frames to {}", dir.display());
        Ok(Self { dir, next_index: 0 })
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }
}

impl OutputSink for PngSequence {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let path = self.frame_path(self.next_index);
        frame
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.next_index += 1;
        Ok(())
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        None
    }
}
