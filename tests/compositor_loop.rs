use greenscreen::capture::{SourceState, StillTrack, Track};
use greenscreen::composite::{Background, Compositor};
use greenscreen::keying::ChromaKeyer;
use greenscreen::output::OutputSink;
use greenscreen::pipeline::{CompositorLoop, FrameClock, ProcessingState, TickOutcome};
use greenscreen::{Frame, PipelineError, TrackError};
use image::{Rgb, RgbImage};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

const GREEN: [u8; 4] = [0, 255, 155, 255];
const BG: Rgb<u8> = Rgb([10, 20, 30]);

/// Track fed by the test through a shared queue.
#[derive(Clone, Default)]
struct ScriptedTrack {
    inner: Rc<RefCell<Script>>,
}

#[derive(Default)]
struct Script {
    dims: Option<(u32, u32)>,
    pending: VecDeque<Result<Option<Frame>, TrackError>>,
    refuse_starts: usize,
    device_missing: bool,
    stopped: bool,
}

impl ScriptedTrack {
    fn ready(width: u32, height: u32) -> Self {
        let track = Self::default();
        track.inner.borrow_mut().dims = Some((width, height));
        track
    }

    fn push(&self, frame: Frame) {
        self.inner.borrow_mut().pending.push_back(Ok(Some(frame)));
    }

    fn push_result(&self, result: Result<Option<Frame>, TrackError>) {
        self.inner.borrow_mut().pending.push_back(result);
    }

    fn set_dims(&self, dims: Option<(u32, u32)>) {
        self.inner.borrow_mut().dims = dims;
    }

    fn is_stopped(&self) -> bool {
        self.inner.borrow().stopped
    }
}

impl Track for ScriptedTrack {
    fn label(&self) -> String {
        "scripted".to_string()
    }

    fn start(&mut self) -> Result<(), TrackError> {
        let mut script = self.inner.borrow_mut();
        if script.device_missing {
            return Err(TrackError::Device(anyhow::anyhow!("no such device")));
        }
        if script.refuse_starts > 0 {
            script.refuse_starts -= 1;
            return Err(TrackError::playback_rejected("autoplay blocked"));
        }
        Ok(())
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.inner.borrow().dims
    }

    fn read_frame(&mut self, into: &mut Frame) -> Result<bool, TrackError> {
        // Latest wins: drop everything but the newest queued frame.
        let mut script = self.inner.borrow_mut();
        let mut newest = Ok(None);
        while let Some(next) = script.pending.pop_front() {
            newest = next;
        }
        match newest? {
            Some(frame) => {
                into.copy_from(&frame);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn stop(&mut self) {
        self.inner.borrow_mut().stopped = true;
    }
}

fn new_loop() -> CompositorLoop<ScriptedTrack> {
    CompositorLoop::new(
        Box::new(ChromaKeyer::default()),
        Compositor::new(Background::solid(BG)),
    )
}

#[test]
fn idle_loop_waits_without_source() {
    let mut pipeline = new_loop();
    assert_eq!(pipeline.state(), ProcessingState::Idle);
    assert_eq!(pipeline.tick(), TickOutcome::Waiting);
    assert_eq!(pipeline.surface().dimensions(), (0, 0));
}

#[test]
fn backdrop_frame_is_fully_removed() {
    let track = ScriptedTrack::ready(2, 2);
    let mut pipeline = new_loop();
    pipeline.bind(track.clone()).unwrap();
    track.push(Frame::filled(2, 2, GREEN));

    assert_eq!(pipeline.tick(), TickOutcome::Composited { resized: true });

    assert_eq!(pipeline.state(), ProcessingState::Processing);
    let surface = pipeline.surface().image();
    assert_eq!(surface.dimensions(), (2, 2));
    assert!(surface.pixels().all(|p| *p == BG));
}

#[test]
fn distant_pixel_is_drawn_unchanged() {
    let track = ScriptedTrack::ready(1, 1);
    let mut pipeline = new_loop();
    pipeline.bind(track.clone()).unwrap();
    track.push(Frame::filled(1, 1, [50, 50, 50, 255]));

    pipeline.tick();

    assert_eq!(
        *pipeline.surface().image().get_pixel(0, 0),
        Rgb([50, 50, 50])
    );
}

#[test]
fn ramp_pixel_is_blended_with_background() {
    let track = ScriptedTrack::ready(1, 1);
    let mut pipeline = new_loop();
    pipeline.bind(track.clone()).unwrap();
    track.push(Frame::filled(1, 1, [140, 255, 155, 255]));

    pipeline.tick();

    // keyed to [140, 185, 155, 120], then drawn over BG
    let expected = Rgb([
        ((140 * 120 + 10 * 135 + 127) / 255) as u8,
        ((185 * 120 + 20 * 135 + 127) / 255) as u8,
        ((155 * 120 + 30 * 135 + 127) / 255) as u8,
    ]);
    assert_eq!(*pipeline.surface().image().get_pixel(0, 0), expected);
}

#[test]
fn waits_in_attached_until_metadata_loads() {
    let track = ScriptedTrack::default();
    let mut pipeline = new_loop();
    let states = Rc::new(RefCell::new(Vec::new()));
    let seen = states.clone();
    pipeline.on_state_change(move |state| seen.borrow_mut().push(state));

    pipeline.bind(track.clone()).unwrap();
    track.push(Frame::filled(1, 1, [50, 50, 50, 255]));

    for _ in 0..5 {
        assert_eq!(pipeline.tick(), TickOutcome::Waiting);
    }
    assert_eq!(pipeline.state(), ProcessingState::Attached);

    track.set_dims(Some((1, 1)));
    assert_eq!(pipeline.tick(), TickOutcome::Composited { resized: true });
    assert_eq!(
        *states.borrow(),
        vec![ProcessingState::Attached, ProcessingState::Processing]
    );
}

#[test]
fn detach_keeps_last_frame_and_halts() {
    let track = ScriptedTrack::ready(1, 1);
    let mut pipeline = new_loop();
    pipeline.bind(track.clone()).unwrap();
    track.push(Frame::filled(1, 1, [50, 50, 50, 255]));
    pipeline.tick();

    pipeline.detach();

    assert_eq!(pipeline.state(), ProcessingState::Stopped);
    assert_eq!(pipeline.source().state(), SourceState::Stopped);
    assert!(track.is_stopped());

    track.push(Frame::filled(1, 1, [200, 0, 0, 255]));
    assert_eq!(pipeline.tick(), TickOutcome::Halted);
    assert_eq!(
        *pipeline.surface().image().get_pixel(0, 0),
        Rgb([50, 50, 50])
    );
}

#[test]
fn mismatched_frame_never_reaches_surface() {
    let track = ScriptedTrack::ready(2, 2);
    let mut pipeline = new_loop();
    pipeline.bind(track.clone()).unwrap();
    track.push(Frame::filled(2, 2, [50, 50, 50, 255]));
    pipeline.tick();

    track.push(Frame::from_raw(3, 3, vec![255; 16]));
    assert_eq!(pipeline.tick(), TickOutcome::Rejected);

    assert_eq!(pipeline.state(), ProcessingState::Processing);
    assert_eq!(pipeline.surface().dimensions(), (2, 2));
    assert!(pipeline
        .surface()
        .image()
        .pixels()
        .all(|p| *p == Rgb([50, 50, 50])));
    assert_eq!(pipeline.stats().rejected, 1);
}

#[test]
fn invalid_first_frame_keeps_loop_attached() {
    let track = ScriptedTrack::ready(2, 2);
    let mut pipeline = new_loop();
    pipeline.bind(track.clone()).unwrap();
    track.push(Frame::from_raw(2, 2, vec![0; 3]));

    assert_eq!(pipeline.tick(), TickOutcome::Rejected);
    assert_eq!(pipeline.state(), ProcessingState::Attached);
}

#[test]
fn only_the_newest_frame_is_processed() {
    let track = ScriptedTrack::ready(1, 1);
    let mut pipeline = new_loop();
    pipeline.bind(track.clone()).unwrap();
    track.push(Frame::filled(1, 1, [200, 0, 0, 255]));
    track.push(Frame::filled(1, 1, [0, 0, 200, 255]));

    assert_eq!(pipeline.tick(), TickOutcome::Composited { resized: true });
    assert_eq!(pipeline.stats().composited, 1);
    assert_eq!(
        *pipeline.surface().image().get_pixel(0, 0),
        Rgb([0, 0, 200])
    );
}

#[test]
fn same_frame_is_not_composited_twice() {
    let track = ScriptedTrack::ready(1, 1);
    let mut pipeline = new_loop();
    pipeline.bind(track.clone()).unwrap();
    track.push(Frame::filled(1, 1, [50, 50, 50, 255]));

    pipeline.tick();
    assert_eq!(pipeline.tick(), TickOutcome::Unchanged);
    assert_eq!(pipeline.stats().composited, 1);
}

#[test]
fn decode_stall_keeps_previous_frame() {
    let track = ScriptedTrack::ready(1, 1);
    let mut pipeline = new_loop();
    pipeline.bind(track.clone()).unwrap();
    track.push(Frame::filled(1, 1, [50, 50, 50, 255]));
    pipeline.tick();

    track.push_result(Err(TrackError::decode("truncated packet")));
    assert_eq!(pipeline.tick(), TickOutcome::Unchanged);
    assert_eq!(pipeline.state(), ProcessingState::Processing);
}

#[test]
fn resize_happens_only_on_dimension_change() {
    let track = ScriptedTrack::ready(2, 2);
    let mut pipeline = new_loop();
    pipeline.bind(track.clone()).unwrap();

    track.push(Frame::filled(2, 2, [50, 50, 50, 255]));
    assert_eq!(pipeline.tick(), TickOutcome::Composited { resized: true });
    track.push(Frame::filled(2, 2, [60, 60, 60, 255]));
    assert_eq!(pipeline.tick(), TickOutcome::Composited { resized: false });
    track.push(Frame::filled(4, 1, [70, 70, 70, 255]));
    assert_eq!(pipeline.tick(), TickOutcome::Composited { resized: true });
    assert_eq!(pipeline.surface().dimensions(), (4, 1));
}

#[test]
fn rebinding_discards_previous_track_frame() {
    let first = ScriptedTrack::ready(1, 1);
    let second = ScriptedTrack::ready(1, 1);
    let mut pipeline = new_loop();
    pipeline.bind(first.clone()).unwrap();
    first.push(Frame::filled(1, 1, [50, 50, 50, 255]));
    pipeline.tick();

    pipeline.bind(second.clone()).unwrap();

    assert!(first.is_stopped());
    assert_eq!(pipeline.state(), ProcessingState::Attached);
    assert_eq!(pipeline.tick(), TickOutcome::Waiting);

    second.push(Frame::filled(1, 1, [90, 90, 90, 255]));
    assert_eq!(pipeline.tick(), TickOutcome::Composited { resized: false });
    assert_eq!(
        *pipeline.surface().image().get_pixel(0, 0),
        Rgb([90, 90, 90])
    );
}

#[test]
fn stopped_loop_cannot_be_rebound() {
    let mut pipeline = new_loop();
    pipeline.bind(ScriptedTrack::ready(1, 1)).unwrap();
    pipeline.stop();

    assert_eq!(
        pipeline.bind(ScriptedTrack::ready(1, 1)),
        Err(PipelineError::Stopped)
    );
    assert_eq!(pipeline.state(), ProcessingState::Stopped);
}

#[test]
fn stop_handle_cancels_next_tick() {
    let track = ScriptedTrack::ready(1, 1);
    let mut pipeline = new_loop();
    pipeline.bind(track.clone()).unwrap();
    let handle = pipeline.stop_handle();

    handle.stop();
    track.push(Frame::filled(1, 1, [50, 50, 50, 255]));

    assert_eq!(pipeline.tick(), TickOutcome::Halted);
    assert_eq!(pipeline.state(), ProcessingState::Stopped);
    assert_eq!(pipeline.stats().composited, 0);
}

#[test]
fn rejected_playback_defers_until_resumed() {
    let track = ScriptedTrack::ready(1, 1);
    track.inner.borrow_mut().refuse_starts = 1;
    let mut pipeline = new_loop();
    pipeline.bind(track.clone()).unwrap();
    track.push(Frame::filled(1, 1, [50, 50, 50, 255]));

    assert!(pipeline.source().is_start_deferred());
    assert_eq!(pipeline.tick(), TickOutcome::Waiting);
    assert_eq!(pipeline.state(), ProcessingState::Attached);

    assert!(pipeline.resume());
    assert_eq!(pipeline.tick(), TickOutcome::Composited { resized: true });
}

#[test]
fn device_failure_on_bind_stops_loop() {
    let track = ScriptedTrack::ready(1, 1);
    track.inner.borrow_mut().device_missing = true;
    let mut pipeline = new_loop();

    let err = pipeline.bind(track.clone()).unwrap_err();

    assert!(matches!(err, PipelineError::TrackStart(_)));
    assert!(track.is_stopped());
    assert_eq!(pipeline.state(), ProcessingState::Stopped);
    assert_eq!(pipeline.tick(), TickOutcome::Halted);
}

#[test]
fn ended_track_stops_loop() {
    let track = ScriptedTrack::ready(1, 1);
    let mut pipeline = new_loop();
    pipeline.bind(track.clone()).unwrap();
    track.push_result(Err(TrackError::Ended));

    assert_eq!(pipeline.tick(), TickOutcome::Halted);
    assert_eq!(pipeline.state(), ProcessingState::Stopped);
}

#[derive(Default)]
struct CollectSink {
    frames: Vec<RgbImage>,
}

impl OutputSink for CollectSink {
    fn write_frame(&mut self, frame: &RgbImage) -> anyhow::Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn resolution(&self) -> Option<(u32, u32)> {
        None
    }
}

#[test]
fn run_stops_at_frame_limit() {
    let frames = vec![
        Frame::filled(2, 1, GREEN),
        Frame::filled(2, 1, [50, 50, 50, 255]),
    ];
    let mut pipeline: CompositorLoop<StillTrack> = CompositorLoop::new(
        Box::new(ChromaKeyer::default()),
        Compositor::new(Background::solid(BG)),
    );
    pipeline
        .bind(StillTrack::from_frames("clip", frames, true))
        .unwrap();
    let mut sink = CollectSink::default();

    pipeline
        .run(&mut sink, FrameClock::from_fps(1000).with_max_frames(Some(3)))
        .unwrap();

    assert_eq!(sink.frames.len(), 3);
    assert!(sink.frames[0].pixels().all(|p| *p == BG));
    assert!(sink.frames[1].pixels().all(|p| *p == Rgb([50, 50, 50])));
    assert_eq!(pipeline.state(), ProcessingState::Stopped);
}

#[test]
fn run_ends_when_track_ends() {
    let mut pipeline: CompositorLoop<StillTrack> = CompositorLoop::new(
        Box::new(ChromaKeyer::default()),
        Compositor::default(),
    );
    pipeline
        .bind(StillTrack::from_frames(
            "clip",
            vec![Frame::filled(1, 1, [50, 50, 50, 255])],
            false,
        ))
        .unwrap();
    let mut sink = CollectSink::default();

    pipeline.run(&mut sink, FrameClock::from_fps(1000)).unwrap();

    assert_eq!(sink.frames.len(), 1);
    assert_eq!(pipeline.state(), ProcessingState::Stopped);
}

#[test]
fn run_retries_refused_playback() {
    let track = ScriptedTrack::ready(1, 1);
    track.inner.borrow_mut().refuse_starts = 2;
    let mut pipeline = new_loop();
    pipeline.bind(track.clone()).unwrap();
    track.push(Frame::filled(1, 1, [50, 50, 50, 255]));
    let mut sink = CollectSink::default();

    let clock = FrameClock::from_fps(1000)
        .with_max_frames(Some(1))
        .with_resume_backoff(Duration::ZERO);
    pipeline.run(&mut sink, clock).unwrap();

    assert_eq!(sink.frames.len(), 1);
    assert_eq!(track.inner.borrow().refuse_starts, 0);
}

#[test]
fn stop_handle_ends_run_after_current_frame() {
    let frames = vec![
        Frame::filled(1, 1, [50, 50, 50, 255]),
        Frame::filled(1, 1, [60, 60, 60, 255]),
    ];
    let mut pipeline: CompositorLoop<StillTrack> = CompositorLoop::new(
        Box::new(ChromaKeyer::default()),
        Compositor::default(),
    );
    let handle = pipeline.stop_handle();
    pipeline.on_state_change(move |state| {
        if state == ProcessingState::Processing {
            handle.stop();
        }
    });
    pipeline
        .bind(StillTrack::from_frames("loop", frames, true))
        .unwrap();
    let mut sink = CollectSink::default();

    pipeline.run(&mut sink, FrameClock::from_fps(1000)).unwrap();

    assert_eq!(sink.frames.len(), 1);
    assert_eq!(*sink.frames[0].get_pixel(0, 0), Rgb([50, 50, 50]));
    assert_eq!(pipeline.state(), ProcessingState::Stopped);
    assert_eq!(pipeline.stats().composited, 1);
}
