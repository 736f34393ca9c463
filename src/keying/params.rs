use crate::error::PipelineError;
use std::fmt;
use std::str::FromStr;

/// Alpha must sit strictly inside (`FEATHER_MIN_ALPHA`, 255) for feathering to apply.
pub const FEATHER_MIN_ALPHA: u8 = 30;

/// The solid color the subject is filmed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackdropColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BackdropColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for BackdropColor {
    fn default() -> Self {
        Self::new(0, 255, 155)
    }
}

impl fmt::Display for BackdropColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid color '{0}', expected R,G,B or #RRGGBB")]
pub struct ParseColorError(String);

/// Accepts `R,G,B` (decimal) or `#RRGGBB`.
impl FromStr for BackdropColor {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let trimmed = s.trim();

        if let Some(hex) = trimmed.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(err());
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
            return Ok(Self::new(channel(0)?, channel(2)?, channel(4)?));
        }

        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(err());
        }
        let channel = |p: &str| p.parse::<u8>().map_err(|_| err());
        Ok(Self::new(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
        ))
    }
}

/// Thresholds for the key and spill passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyingParameters {
    /// Color distance below which a pixel is fully removed.
    pub low_threshold: f64,
    /// Distance past `low_threshold` over which alpha ramps back to opaque.
    pub smooth_range: f64,
    /// Fraction of excess green removed from retained pixels.
    pub spill_factor: f64,
    /// Alpha multiplier for partially transparent pixels.
    pub feather_factor: f64,
}

impl Default for KeyingParameters {
    fn default() -> Self {
        Self {
            low_threshold: 110.0,
            smooth_range: 60.0,
            spill_factor: 0.7,
            feather_factor: 0.95,
        }
    }
}

impl KeyingParameters {
    /// Distance at and beyond which pixels keep their alpha.
    pub fn high_threshold(&self) -> f64 {
        self.low_threshold + self.smooth_range
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.low_threshold.is_finite() || self.low_threshold < 0.0 {
            return Err(PipelineError::invalid_parameters(format!(
                "low threshold must be a non-negative number, got {}",
                self.low_threshold
            )));
        }
        if !self.smooth_range.is_finite() || self.smooth_range <= 0.0 {
            return Err(PipelineError::invalid_parameters(format!(
                "smooth range must be positive, got {}",
                self.smooth_range
            )));
        }
        for (name, value) in [
            ("spill factor", self.spill_factor),
            ("feather factor", self.feather_factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::invalid_parameters(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}
