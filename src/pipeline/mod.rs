//! The compositing loop: pull the newest frame, key it, draw it.
//!
//! [`CompositorLoop::tick`] performs exactly one step and never sleeps, so
//! hosts and tests can drive it by hand. [`CompositorLoop::run`] repeats it on
//! a monotonic clock until stopped.

mod clock;
mod state;

pub use clock::{FrameClock, LoopStats};
pub use state::{ProcessingState, StopHandle, TickOutcome};

use crate::capture::{FrameSource, Track};
use crate::composite::{Compositor, Surface};
use crate::error::PipelineError;
use crate::keying::Keyer;
use crate::output::OutputSink;
use anyhow::Result;
use std::time::Instant;

type StateListener = Box<dyn FnMut(ProcessingState)>;

pub struct CompositorLoop<T: Track> {
    source: FrameSource<T>,
    keyer: Box<dyn Keyer>,
    compositor: Compositor,
    state: ProcessingState,
    stop: StopHandle,
    last_seq: Option<u64>,
    listener: Option<StateListener>,
    stats: LoopStats,
}

impl<T: Track> CompositorLoop<T> {
    pub fn new(keyer: Box<dyn Keyer>, compositor: Compositor) -> Self {
        Self {
            source: FrameSource::new(),
            keyer,
            compositor,
            state: ProcessingState::Idle,
            stop: StopHandle::new(),
            last_seq: None,
            listener: None,
            stats: LoopStats::default(),
        }
    }

    pub fn state(&self) -> ProcessingState {
        self.state
    }

    pub fn surface(&self) -> &Surface {
        self.compositor.surface()
    }

    pub fn source(&self) -> &FrameSource<T> {
        &self.source
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Handle that stops this loop from anywhere, including another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Register a callback invoked on every state transition.
    pub fn on_state_change(&mut self, listener: impl FnMut(ProcessingState) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Bind a track. Replaces any track already bound.
    ///
    /// Fails once the loop has been stopped; build a new loop instead. A track
    /// that cannot start at all stops the loop. A refused start does not: the
    /// loop stays Attached until [`CompositorLoop::resume`] succeeds.
    pub fn bind(&mut self, track: T) -> Result<(), PipelineError> {
        if self.state == ProcessingState::Stopped || self.stop.is_stopped() {
            return Err(PipelineError::Stopped);
        }
        if let Err(err) = self.source.attach(track) {
            tracing::warn!("Track failed to start: {:#}", err);
            self.halt();
            return Err(PipelineError::TrackStart(format!("{err:#}")));
        }
        self.last_seq = None;
        self.set_state(ProcessingState::Attached);
        Ok(())
    }

    /// Retry a playback start that the track refused.
    pub fn resume(&mut self) -> bool {
        self.source.resume()
    }

    /// Withdraw the source. The surface keeps its last composited frame.
    pub fn detach(&mut self) {
        self.halt();
    }

    /// Stop immediately. No later tick runs the pipeline.
    pub fn stop(&mut self) {
        self.halt();
    }

    /// Run one step of the loop.
    pub fn tick(&mut self) -> TickOutcome {
        if self.stop.is_stopped() && self.state != ProcessingState::Stopped {
            self.halt();
        }

        match self.state {
            ProcessingState::Stopped => return TickOutcome::Halted,
            ProcessingState::Idle => return TickOutcome::Waiting,
            ProcessingState::Attached | ProcessingState::Processing => {}
        }

        self.source.refresh();
        if !self.source.is_attached() {
            tracing::info!("Source withdrawn");
            self.halt();
            return TickOutcome::Halted;
        }

        // The frame is keyed in place: its sequence number guarantees it is
        // never keyed twice.
        let Some(latest) = self.source.current_frame_mut() else {
            return TickOutcome::Waiting;
        };
        let seq = latest.seq;
        if self.last_seq == Some(seq) {
            return TickOutcome::Unchanged;
        }
        self.last_seq = Some(seq);

        if let Err(err) = latest.frame.validate() {
            tracing::warn!("Dropping frame {}: {}", seq, err);
            self.stats.rejected += 1;
            return TickOutcome::Rejected;
        }

        let key_start = Instant::now();
        self.keyer.key(latest.frame);
        self.stats.total_key_time += key_start.elapsed();

        let composite_start = Instant::now();
        let composed = self.compositor.compose(latest.frame);
        self.stats.total_composite_time += composite_start.elapsed();

        let outcome = match composed {
            Ok(resized) => {
                self.stats.composited += 1;
                TickOutcome::Composited { resized }
            }
            Err(err) => {
                tracing::warn!("Dropping frame {}: {}", seq, err);
                self.stats.rejected += 1;
                TickOutcome::Rejected
            }
        };
        if matches!(outcome, TickOutcome::Composited { .. })
            && self.state == ProcessingState::Attached
        {
            self.set_state(ProcessingState::Processing);
        }

        tracing::debug!("Tick {}: {:?}", seq, outcome);
        outcome
    }

    /// Tick on `clock` until stopped, writing each new surface to `sink`.
    ///
    /// A refused playback start is retried every `clock.resume_backoff()`.
    /// Returns early only if the sink fails; the loop is stopped first.
    pub fn run<O: OutputSink + ?Sized>(&mut self, sink: &mut O, clock: FrameClock) -> Result<()> {
        tracing::info!(
            "Starting compositor loop ({:.1}ms per frame)",
            clock.frame_duration().as_secs_f64() * 1000.0
        );

        let mut last_resume: Option<Instant> = None;
        loop {
            let tick_start = Instant::now();

            if self.source.is_start_deferred()
                && last_resume.map_or(true, |at| at.elapsed() >= clock.resume_backoff())
            {
                last_resume = Some(tick_start);
                if self.resume() {
                    tracing::info!("Playback started");
                }
            }

            let outcome = self.tick();
            if !outcome.should_reschedule() {
                break;
            }
            if let TickOutcome::Composited { .. } = outcome {
                let output_start = Instant::now();
                if let Err(err) = sink.write_frame(self.compositor.surface().image()) {
                    self.halt();
                    return Err(err.context("Failed to write frame"));
                }
                self.stats.total_output_time += output_start.elapsed();

                if self.stats.should_report() {
                    self.stats.report();
                }
                if clock.is_exhausted(self.stats.composited) {
                    tracing::info!("Reached frame limit");
                    self.halt();
                    break;
                }
            }

            let remaining = clock.remaining(tick_start);
            if !remaining.is_zero() && !self.stop.is_stopped() {
                std::thread::sleep(remaining);
            }
        }

        tracing::info!(
            "Compositor loop stopped after {} frames ({} rejected)",
            self.stats.composited,
            self.stats.rejected
        );
        Ok(())
    }

    fn halt(&mut self) {
        self.stop.stop();
        self.source.detach();
        self.set_state(ProcessingState::Stopped);
    }

    fn set_state(&mut self, next: ProcessingState) {
        if self.state == next {
            return;
        }
        tracing::info!("Processing state {} -> {}", self.state, next);
        self.state = next;
        if let Some(listener) = self.listener.as_mut() {
            listener(next);
        }
    }
}
