//! Error types for the spectrum pipeline

use thiserror::Error;

/// Rejected configuration change.
///
/// Returned synchronously by the setters; the previous configuration
/// stays in force.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("band count must be at least 1")]
    ZeroBands,

    #[error("frequency range must satisfy 0 <= min < max (got {min} Hz .. {max} Hz)")]
    FrequencyRange { min: f32, max: f32 },

    #[error("dB range must satisfy min < max (got {min} dB .. {max} dB)")]
    DbRange { min: f32, max: f32 },
}

/// Errors produced by the analysis stages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpectrumError {
    #[error("need at least 2 samples, got {0}")]
    InvalidInput(usize),

    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f32),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("transform failed: {0}")]
    Transform(String),
}
