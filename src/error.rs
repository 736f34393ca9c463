/// Errors raised when a frame cannot be composited.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame has empty dimensions {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },

    #[error("frame buffer holds {actual} bytes but {width}x{height} rgba8 needs {expected}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Conditions reported by a frame-producing track.
///
/// None of these are fatal to the pipeline: a rejected start keeps the source
/// attached until [`crate::capture::FrameSource::resume`] is called, decode and
/// device errors are treated as "no frame this tick", and `Ended` withdraws the
/// track.
#[derive(thiserror::Error, Debug)]
pub enum TrackError {
    /// Playback was refused (autoplay policy, stream not yet permitted).
    #[error("playback rejected: {0}")]
    PlaybackRejected(String),

    /// A frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The track has no more frames and was withdrawn by its producer.
    #[error("track ended")]
    Ended,

    /// Wrapped lower-level error from the capture device.
    #[error(transparent)]
    Device(#[from] anyhow::Error),
}

impl TrackError {
    pub fn playback_rejected(msg: impl Into<String>) -> Self {
        Self::PlaybackRejected(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

/// Errors returned by pipeline setup and lifecycle calls.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The loop was stopped; a fresh instance is needed to bind again.
    #[error("pipeline is stopped")]
    Stopped,

    /// The bound track could not start and was released.
    #[error("track failed to start: {0}")]
    TrackStart(String),

    #[error("invalid keying parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl PipelineError {
    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Self::InvalidParameters(msg.into())
    }
}
