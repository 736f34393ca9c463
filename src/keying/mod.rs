pub mod chroma;
mod params;
pub mod spill;

pub use params::{BackdropColor, KeyingParameters, ParseColorError, FEATHER_MIN_ALPHA};

use crate::error::PipelineError;
use crate::frame::Frame;

/// Trait for keyers that turn a raw frame into a foreground with alpha.
pub trait Keyer {
    /// Rewrite `frame` in place. The frame has already been validated.
    fn key(&mut self, frame: &mut Frame);

    fn backdrop(&self) -> BackdropColor;

    fn parameters(&self) -> KeyingParameters;
}

/// Color-distance keyer: alpha pass, then spill and feather pass.
#[derive(Debug, Clone)]
pub struct ChromaKeyer {
    backdrop: BackdropColor,
    params: KeyingParameters,
}

impl ChromaKeyer {
    pub fn new(backdrop: BackdropColor, params: KeyingParameters) -> Result<Self, PipelineError> {
        params.validate()?;
        Ok(Self { backdrop, params })
    }
}

impl Default for ChromaKeyer {
    fn default() -> Self {
        Self {
            backdrop: BackdropColor::default(),
            params: KeyingParameters::default(),
        }
    }
}

impl Keyer for ChromaKeyer {
    fn key(&mut self, frame: &mut Frame) {
        let pixels = frame.data_mut();
        chroma::apply(pixels, self.backdrop, &self.params);
        spill::apply(pixels, &self.params);
    }

    fn backdrop(&self) -> BackdropColor {
        self.backdrop
    }

    fn parameters(&self) -> KeyingParameters {
        self.params
    }
}

/// Create the default keyer (chroma key with spill suppression)
pub fn create_default_keyer(
    backdrop: BackdropColor,
    params: KeyingParameters,
) -> Result<Box<dyn Keyer>, PipelineError> {
    Ok(Box::new(ChromaKeyer::new(backdrop, params)?))
}
