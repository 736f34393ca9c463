//! Real-time chroma-key compositing.
//!
//! Frames from a live [`capture::Track`] are keyed against a known backdrop
//! color, cleaned of green spill, feathered, and drawn over a static
//! background onto a [`composite::Surface`]. [`pipeline::CompositorLoop`]
//! drives the whole thing one frame at a time.

pub mod capture;
pub mod composite;
pub mod error;
pub mod frame;
pub mod keying;
pub mod output;
pub mod pipeline;

pub use error::{FrameError, PipelineError, TrackError};
pub use frame::Frame;
