//! Publisher configuration
//!
//! A plain value object validated on construction and on every change.
//! The live copy is swapped atomically, so each analysed block sees one
//! consistent snapshot.

use crate::error::ConfigError;
use crate::spectrum::bands::{validate_frequency_range, BandMapper};
use crate::spectrum::loudness::LoudnessScale;
use crate::spectrum::windows::WindowType;

pub const DEFAULT_MAX_DB: f32 = 64.0;
pub const DEFAULT_MIN_DB: f32 = -28.0;
pub const DEFAULT_BAND_COUNT: usize = 150;
pub const DEFAULT_MIN_FREQUENCY: f32 = 125.0;
pub const DEFAULT_MAX_FREQUENCY: f32 = 8000.0;

/// Spectrum publisher configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumConfig {
    /// Magnitude in dB that maps to full scale (1.0)
    pub max_db: f32,

    /// Magnitude in dB that maps to 0.0
    pub min_db: f32,

    /// Number of equal-width bands between the frequency limits
    pub band_count: usize,

    /// Lower edge of the analysed range in Hz
    pub min_frequency: f32,

    /// Upper edge of the analysed range in Hz
    pub max_frequency: f32,

    /// Window applied to each block before the transform
    pub window: WindowType,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            max_db: DEFAULT_MAX_DB,
            min_db: DEFAULT_MIN_DB,
            band_count: DEFAULT_BAND_COUNT,
            min_frequency: DEFAULT_MIN_FREQUENCY,
            max_frequency: DEFAULT_MAX_FREQUENCY,
            window: WindowType::Hann,
        }
    }
}

impl SpectrumConfig {
    /// Check every field constraint
    ///
    /// Frequencies are not checked against Nyquist here since the sample
    /// rate arrives with each block; bands above Nyquist read as silence.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_db.is_finite() && self.max_db.is_finite() && self.min_db < self.max_db) {
            return Err(ConfigError::DbRange {
                min: self.min_db,
                max: self.max_db,
            });
        }
        if self.band_count == 0 {
            return Err(ConfigError::ZeroBands);
        }
        validate_frequency_range(self.min_frequency, self.max_frequency)
    }

    pub fn with_db_range(self, min_db: f32, max_db: f32) -> Result<Self, ConfigError> {
        let next = Self {
            min_db,
            max_db,
            ..self
        };
        next.validate().map(|_| next)
    }

    pub fn with_band_count(self, band_count: usize) -> Result<Self, ConfigError> {
        let next = Self { band_count, ..self };
        next.validate().map(|_| next)
    }

    pub fn with_frequency_range(
        self,
        min_frequency: f32,
        max_frequency: f32,
    ) -> Result<Self, ConfigError> {
        let next = Self {
            min_frequency,
            max_frequency,
            ..self
        };
        next.validate().map(|_| next)
    }

    pub fn with_window(self, window: WindowType) -> Self {
        Self { window, ..self }
    }

    /// dB span mapped onto [0, 1]
    pub fn headroom(&self) -> f32 {
        self.max_db - self.min_db
    }

    pub fn loudness_scale(&self) -> LoudnessScale {
        LoudnessScale::new(self.min_db, self.max_db)
    }

    pub fn band_mapper(&self) -> Result<BandMapper, ConfigError> {
        BandMapper::new(self.min_frequency, self.max_frequency, self.band_count)
    }
}
