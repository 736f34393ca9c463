use std::time::{Duration, Instant};

/// Monotonic pacing for [`super::CompositorLoop::run`].
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    frame_duration: Duration,
    max_frames: Option<u64>,
    resume_backoff: Duration,
}

impl FrameClock {
    pub fn from_fps(fps: u32) -> Self {
        Self {
            frame_duration: Duration::from_secs_f64(1.0 / f64::from(fps.max(1))),
            max_frames: None,
            resume_backoff: Duration::from_secs(1),
        }
    }

    /// Stop the loop after this many composited frames.
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Minimum wait between retries of a refused playback start.
    pub fn with_resume_backoff(mut self, backoff: Duration) -> Self {
        self.resume_backoff = backoff;
        self
    }

    pub fn resume_backoff(&self) -> Duration {
        self.resume_backoff
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    pub fn is_exhausted(&self, composited: u64) -> bool {
        self.max_frames.is_some_and(|max| composited >= max)
    }

    /// Time left in the current frame slot that started at `tick_start`.
    pub fn remaining(&self, tick_start: Instant) -> Duration {
        self.frame_duration.saturating_sub(tick_start.elapsed())
    }
}

/// Running per-stage timings, reported every `REPORT_EVERY` frames.
#[derive(Debug, Clone, Default)]
pub struct LoopStats {
    pub composited: u64,
    pub rejected: u64,
    pub total_key_time: Duration,
    pub total_composite_time: Duration,
    pub total_output_time: Duration,
}

impl LoopStats {
    pub const REPORT_EVERY: u64 = 30;

    pub fn should_report(&self) -> bool {
        self.composited > 0 && self.composited % Self::REPORT_EVERY == 0
    }

    pub fn report(&self) {
        let frames = self.composited.max(1) as f64;
        let avg_key_ms = self.total_key_time.as_secs_f64() * 1000.0 / frames;
        let avg_composite_ms = self.total_composite_time.as_secs_f64() * 1000.0 / frames;
        let avg_output_ms = self.total_output_time.as_secs_f64() * 1000.0 / frames;
        let total_ms = avg_key_ms + avg_composite_ms + avg_output_ms;
        let fps = if total_ms > 0.0 { 1000.0 / total_ms } else { 0.0 };

        tracing::info!(
            "Frame {}: key={:.1}ms, composite={:.1}ms, output={:.1}ms, total={:.1}ms, fps={:.1}, rejected={}",
            self.composited,
            avg_key_ms,
            avg_composite_ms,
            avg_output_ms,
            total_ms,
            fps,
            self.rejected
        );
    }
}
