use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle of a compositing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    /// No source bound.
    Idle,
    /// Source bound, no valid frame seen yet.
    Attached,
    /// Compositing frames.
    Processing,
    /// Terminal. A new loop is needed to bind again.
    Stopped,
}

impl ProcessingState {
    /// Whether a host should show its loading affordance.
    pub fn is_loading(self) -> bool {
        matches!(self, Self::Idle | Self::Attached)
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Attached => "attached",
            Self::Processing => "processing",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Result of a single loop step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The loop is stopped. Nothing ran and nothing should be scheduled.
    Halted,
    /// No source, or no frame ready yet.
    Waiting,
    /// The newest frame was already composited.
    Unchanged,
    /// The newest frame failed validation and was dropped.
    Rejected,
    /// A frame reached the surface.
    Composited { resized: bool },
}

impl TickOutcome {
    pub fn should_reschedule(self) -> bool {
        self != Self::Halted
    }
}

/// Cloneable cancellation flag for a running loop.
///
/// Stopping is sticky: once set, no later tick runs the pipeline.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
