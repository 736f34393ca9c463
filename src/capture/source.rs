use super::Track;
use crate::error::TrackError;
use crate::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// No track has ever been bound.
    Idle,
    /// A track is bound; frames may or may not be flowing yet.
    Attached,
    /// The track was released. Only a new `attach` leaves this state.
    Stopped,
}

/// The newest decoded frame together with its arrival number.
#[derive(Debug, Clone, Copy)]
pub struct LatestFrame<'a> {
    pub seq: u64,
    pub frame: &'a Frame,
}

/// Mutable view of the newest frame, for keying it in place.
#[derive(Debug)]
pub struct LatestFrameMut<'a> {
    pub seq: u64,
    pub frame: &'a mut Frame,
}

/// Lifecycle adapter between a [`Track`] and the compositing loop.
///
/// Frames are decoded into a scratch buffer and swapped in only when the
/// decode succeeds, so a failed decode never replaces the last good frame.
/// Both buffers are reused for the lifetime of the source.
pub struct FrameSource<T: Track> {
    track: Option<T>,
    latest: Frame,
    scratch: Frame,
    has_frame: bool,
    seq: u64,
    state: SourceState,
    start_deferred: bool,
}

impl<T: Track> Default for FrameSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Track> FrameSource<T> {
    pub fn new() -> Self {
        Self {
            track: None,
            latest: Frame::default(),
            scratch: Frame::default(),
            has_frame: false,
            seq: 0,
            state: SourceState::Idle,
            start_deferred: false,
        }
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.state == SourceState::Attached
    }

    /// True while playback was refused and is waiting for [`FrameSource::resume`].
    pub fn is_start_deferred(&self) -> bool {
        self.start_deferred
    }

    /// Bind `track`, replacing any previous track and discarding its frame.
    ///
    /// A playback refusal leaves the track attached with a deferred start.
    /// Any other start failure releases the track, stops the source and is
    /// returned.
    pub fn attach(&mut self, track: T) -> Result<(), TrackError> {
        self.release();

        tracing::info!("Attaching track {}", track.label());
        self.track = Some(track);
        self.state = SourceState::Attached;

        if let Err(err) = self.try_start() {
            self.detach();
            return Err(err);
        }
        Ok(())
    }

    /// Release the bound track. `current_frame` returns `None` afterwards.
    pub fn detach(&mut self) {
        if self.track.is_some() {
            self.release();
            tracing::info!("Track detached");
        }
        self.state = SourceState::Stopped;
    }

    /// Retry a start that was refused. Returns true once playback is running.
    ///
    /// Failures other than a refusal are logged and the start stays deferred.
    pub fn resume(&mut self) -> bool {
        if self.start_deferred && self.state == SourceState::Attached {
            if let Err(err) = self.try_start() {
                tracing::warn!("Failed to resume playback: {}", err);
            }
        }
        self.state == SourceState::Attached && !self.start_deferred
    }

    /// Pull the newest frame from the track, if one is ready.
    ///
    /// Decode problems are not errors here: they leave the previous frame in
    /// place. A track that ends is detached.
    pub fn refresh(&mut self) {
        if self.state != SourceState::Attached || self.start_deferred {
            return;
        }
        let Some(track) = self.track.as_mut() else {
            return;
        };
        if track.dimensions().is_none() {
            return;
        }

        match track.read_frame(&mut self.scratch) {
            Ok(true) => {
                std::mem::swap(&mut self.latest, &mut self.scratch);
                self.has_frame = true;
                self.seq += 1;
            }
            Ok(false) => {}
            Err(TrackError::Ended) => {
                tracing::info!("Track {} ended", track.label());
                self.detach();
            }
            Err(err) => {
                tracing::warn!("Frame not available: {}", err);
            }
        }
    }

    /// The most recently decoded frame, or `None` before metadata has loaded.
    pub fn current_frame(&self) -> Option<LatestFrame<'_>> {
        if !self.frame_visible() {
            return None;
        }
        Some(LatestFrame {
            seq: self.seq,
            frame: &self.latest,
        })
    }

    /// Like [`FrameSource::current_frame`], but lets the caller key the frame
    /// in place instead of copying it out.
    pub fn current_frame_mut(&mut self) -> Option<LatestFrameMut<'_>> {
        if !self.frame_visible() {
            return None;
        }
        Some(LatestFrameMut {
            seq: self.seq,
            frame: &mut self.latest,
        })
    }

    fn frame_visible(&self) -> bool {
        self.state == SourceState::Attached
            && self.has_frame
            && self
                .track
                .as_ref()
                .is_some_and(|track| track.dimensions().is_some())
    }

    fn try_start(&mut self) -> Result<(), TrackError> {
        let Some(track) = self.track.as_mut() else {
            return Ok(());
        };
        match track.start() {
            Ok(()) => {
                self.start_deferred = false;
                Ok(())
            }
            Err(TrackError::PlaybackRejected(reason)) => {
                tracing::warn!("Playback of {} deferred: {}", track.label(), reason);
                self.start_deferred = true;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn release(&mut self) {
        if let Some(mut track) = self.track.take() {
            track.stop();
        }
        self.has_frame = false;
        self.start_deferred = false;
    }
}
