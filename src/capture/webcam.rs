use super::Track;
use crate::error::TrackError;
use crate::frame::Frame;
use anyhow::{Context, Result};
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

/// Webcam track backed by nokhwa.
///
/// `read_frame` blocks until the camera delivers its next frame, which makes the
/// camera itself the pacing source for the loop.
pub struct WebcamTrack {
    camera: Camera,
    device_index: u32,
    streaming: bool,
    dimensions: Option<(u32, u32)>,
}

impl WebcamTrack {
    pub fn new(device_index: u32, width: u32, height: u32) -> Result<Self> {
        tracing::info!(
            "Initializing webcam {} (requested {}x{})",
            device_index,
            width,
            height
        );

        let index = CameraIndex::Index(device_index);
        let requested =
            RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let camera = Camera::new(index, requested).context("Failed to open camera")?;

        tracing::info!("Webcam initialized successfully");

        Ok(Self {
            camera,
            device_index,
            streaming: false,
            dimensions: None,
        })
    }
}

impl Track for WebcamTrack {
    fn label(&self) -> String {
        format!("webcam {}", self.device_index)
    }

    fn start(&mut self) -> Result<(), TrackError> {
        if self.streaming {
            return Ok(());
        }
        self.camera
            .open_stream()
            .context("Failed to open camera stream")
            .map_err(TrackError::Device)?;
        self.streaming = true;

        let resolution = self.camera.resolution();
        tracing::info!(
            "Webcam stream open at {}x{}",
            resolution.width(),
            resolution.height()
        );
        Ok(())
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        if !self.streaming {
            return None;
        }
        let (width, height) = self.dimensions.unwrap_or_else(|| {
            let resolution = self.camera.resolution();
            (resolution.width(), resolution.height())
        });
        (width > 0 && height > 0).then_some((width, height))
    }

    fn read_frame(&mut self, into: &mut Frame) -> Result<bool, TrackError> {
        if !self.streaming {
            return Ok(false);
        }

        let buffer = self
            .camera
            .frame()
            .map_err(|e| TrackError::decode(e.to_string()))?;

        let resolution = buffer.resolution();
        let (width, height) = (resolution.width(), resolution.height());
        into.reshape(width, height);
        buffer
            .decode_image_to_buffer::<RgbAFormat>(into.data_mut())
            .map_err(|e| TrackError::decode(e.to_string()))?;

        self.dimensions = Some((width, height));
        Ok(true)
    }

    fn stop(&mut self) {
        if !self.streaming {
            return;
        }
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!("Failed to stop webcam stream: {}", e);
        }
        self.streaming = false;
        self.dimensions = None;
    }
}
