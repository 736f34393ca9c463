use super::Track;
use crate::error::TrackError;
use crate::frame::Frame;
use anyhow::{bail, Context, Result};
use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tga", "tif", "tiff"];

/// Track that plays back a fixed list of frames.
///
/// Used to run the pipeline from a folder of images instead of a camera.
pub struct StillTrack {
    name: String,
    frames: Vec<Frame>,
    cursor: usize,
    looping: bool,
    started: bool,
}

impl StillTrack {
    pub fn from_frames(name: impl Into<String>, frames: Vec<Frame>, looping: bool) -> Self {
        Self {
            name: name.into(),
            frames,
            cursor: 0,
            looping,
            started: false,
        }
    }

    /// Load every image in `dir`, ordered by file name.
    pub fn load_dir<P: AsRef<Path>>(dir: P, looping: bool) -> Result<Self> {
        let dir = dir.as_ref();
        tracing::info!("Loading still frames from {}", dir.display());

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory {}", dir.display()))?
        {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            bail!("No images found in {}", dir.display());
        }

        let frames = paths
            .iter()
            .map(|path| {
                image::open(path)
                    .map(|img| Frame::from_rgba(img.to_rgba8()))
                    .with_context(|| format!("Failed to load frame {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!("Loaded {} still frames", frames.len());
        Ok(Self::from_frames(dir.display().to_string(), frames, looping))
    }
}

impl Track for StillTrack {
    fn label(&self) -> String {
        self.name.clone()
    }

    fn start(&mut self) -> Result<(), TrackError> {
        self.started = true;
        Ok(())
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        if !self.started {
            return None;
        }
        let frame = self.frames.get(self.cursor).or(self.frames.first())?;
        Some(frame.dimensions())
    }

    fn read_frame(&mut self, into: &mut Frame) -> Result<bool, TrackError> {
        if !self.started {
            return Ok(false);
        }
        if self.cursor >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return Err(TrackError::Ended);
            }
            self.cursor = 0;
        }
        into.copy_from(&self.frames[self.cursor]);
        self.cursor += 1;
        Ok(true)
    }

    fn stop(&mut self) {
        self.started = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_before_start_yields_nothing() {
        let mut track = StillTrack::from_frames("t", vec![Frame::filled(1, 1, [3; 4])], true);
        let mut frame = Frame::default();
        assert!(!track.read_frame(&mut frame).unwrap());
        assert_eq!(frame, Frame::default());
    }

    #[test]
    fn no_metadata_before_start() {
        let track = StillTrack::from_frames("t", vec![Frame::filled(2, 1, [0; 4])], false);
        assert_eq!(track.dimensions(), None);
    }

    #[test]
    fn plays_once_then_ends() {
        let mut track = StillTrack::from_frames(
            "t",
            vec![Frame::filled(1, 1, [1; 4]), Frame::filled(1, 1, [2; 4])],
            false,
        );
        track.start().unwrap();
        let mut frame = Frame::default();

        assert!(track.read_frame(&mut frame).unwrap());
        assert_eq!(frame.data(), &[1; 4]);
        assert!(track.read_frame(&mut frame).unwrap());
        assert_eq!(frame.data(), &[2; 4]);
        assert!(matches!(
            track.read_frame(&mut frame),
            Err(TrackError::Ended)
        ));
    }

    #[test]
    fn looping_wraps_around() {
        let mut track = StillTrack::from_frames("t", vec![Frame::filled(1, 1, [7; 4])], true);
        track.start().unwrap();
        let mut frame = Frame::default();
        for _ in 0..3 {
            assert!(track.read_frame(&mut frame).unwrap());
        }
        assert_eq!(track.dimensions(), Some((1, 1)));
    }
}
