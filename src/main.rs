use anyhow::{Context, Result};
use clap::Parser;
use greenscreen::capture::{StillTrack, Track, WebcamTrack};
use greenscreen::composite::{Background, Compositor};
use greenscreen::keying::{self, BackdropColor, Keyer, KeyingParameters};
use greenscreen::output::{OutputSink, PngSequence, V4L2Output};
use greenscreen::pipeline::{CompositorLoop, FrameClock};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Capture resolution width
    #[arg(long, default_value_t = 1920)]
    capture_width: u32,

    /// Capture resolution height
    #[arg(long, default_value_t = 1080)]
    capture_height: u32,

    /// Read frames from a directory of images instead of the webcam
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Output v4l2loopback device path
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Output resolution width
    #[arg(long, default_value_t = 1280)]
    output_width: u32,

    /// Output resolution height
    #[arg(long, default_value_t = 720)]
    output_height: u32,

    /// Write PNG frames to this directory instead of the v4l2loopback device
    #[arg(long)]
    png_dir: Option<PathBuf>,

    /// Target frames per second
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    fps: u32,

    /// Stop after this many composited frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Background image drawn behind the subject (solid black if omitted)
    #[arg(long)]
    background: Option<PathBuf>,

    /// Corner darkening over the background image (0 disables)
    #[arg(long, default_value_t = 0.3)]
    vignette: f32,

    /// Backdrop color as R,G,B or #RRGGBB
    #[arg(long, default_value_t = BackdropColor::default())]
    key_color: BackdropColor,

    /// Color distance below which pixels are fully removed
    #[arg(long, default_value_t = KeyingParameters::default().low_threshold)]
    low_threshold: f64,

    /// Distance range over which alpha ramps back to opaque
    #[arg(long, default_value_t = KeyingParameters::default().smooth_range)]
    smooth_range: f64,

    /// Fraction of excess green removed from the subject
    #[arg(long, default_value_t = KeyingParameters::default().spill_factor)]
    spill_factor: f64,

    /// Alpha multiplier for partially transparent edge pixels
    #[arg(long, default_value_t = KeyingParameters::default().feather_factor)]
    feather_factor: f64,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn keying_parameters(&self) -> KeyingParameters {
        KeyingParameters {
            low_threshold: self.low_threshold,
            smooth_range: self.smooth_range,
            spill_factor: self.spill_factor,
            feather_factor: self.feather_factor,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("greenscreen starting");
    tracing::info!("Target FPS: {}", args.fps);

    let keyer = keying::create_default_keyer(args.key_color, args.keying_parameters())
        .context("Invalid keying configuration")?;
    let params = keyer.parameters();
    tracing::info!(
        "Keying {}: threshold={}, smooth={}, spill={}, feather={}",
        keyer.backdrop(),
        params.low_threshold,
        params.smooth_range,
        params.spill_factor,
        params.feather_factor
    );

    let background = match &args.background {
        Some(path) => Background::load(path)?.with_vignette(args.vignette),
        None => Background::default(),
    };

    let track: Box<dyn Track> = match &args.input_dir {
        Some(dir) => Box::new(
            StillTrack::load_dir(dir, args.max_frames.is_some())
                .context("Failed to initialize still frame input")?,
        ),
        None => Box::new(
            WebcamTrack::new(args.input_device, args.capture_width, args.capture_height)
                .context("Failed to initialize webcam capture")?,
        ),
    };

    let mut output: Box<dyn OutputSink> = match &args.png_dir {
        Some(dir) => Box::new(PngSequence::new(dir).context("Failed to initialize PNG output")?),
        None => Box::new(
            V4L2Output::new(&args.output_device, args.output_width, args.output_height)
                .context("Failed to initialize v4l2loopback output")?,
        ),
    };
    if let Some((width, height)) = output.resolution() {
        tracing::info!("Output: {}x{}", width, height);
    }

    let mut pipeline = CompositorLoop::new(keyer, Compositor::new(background));
    pipeline.on_state_change(|state| {
        if state.is_loading() {
            tracing::info!("Waiting for video stream...");
        }
    });
    pipeline.bind(track).context("Failed to start capture")?;

    let clock = FrameClock::from_fps(args.fps).with_max_frames(args.max_frames);
    tracing::info!("Press Ctrl+C to stop");
    pipeline.run(output.as_mut(), clock)?;

    Ok(())
}
