mod source;
mod still;
mod webcam;

pub use source::{FrameSource, LatestFrame, LatestFrameMut, SourceState};
pub use still::StillTrack;
pub use webcam::WebcamTrack;

use crate::error::TrackError;
use crate::frame::Frame;

/// Trait for live frame-producing tracks
///
/// A track may be rebound or withdrawn at any time. Only the newest decoded
/// frame matters: implementations that buffer should drop older frames.
pub trait Track {
    /// Human-readable name for logs
    fn label(&self) -> String;

    /// Begin playback.
    ///
    /// A policy refusal is [`TrackError::PlaybackRejected`] and can be retried
    /// later; any other error means the track cannot play at all.
    fn start(&mut self) -> Result<(), TrackError>;

    /// Frame dimensions, or `None` while metadata is still loading
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Decode the most recent frame into `into`, reusing its buffer.
    ///
    /// Returns `Ok(false)` if no new frame is ready. On error `into` may hold
    /// partial data and must not be shown.
    fn read_frame(&mut self, into: &mut Frame) -> Result<bool, TrackError>;

    /// Release the underlying stream
    fn stop(&mut self) {}
}

impl<T: Track + ?Sized> Track for Box<T> {
    fn label(&self) -> String {
        (**self).label()
    }

    fn start(&mut self) -> Result<(), TrackError> {
        (**self).start()
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        (**self).dimensions()
    }

    fn read_frame(&mut self, into: &mut Frame) -> Result<bool, TrackError> {
        (**self).read_frame(into)
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}
