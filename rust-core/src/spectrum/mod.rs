//! Spectral analysis: windowing, transform, banding and loudness

pub mod analysis;
pub mod bands;
pub mod fft;
pub mod loudness;
pub mod windows;

pub use analysis::{AnalysisOutput, SpectrumAnalyzer};
pub use bands::BandMapper;
pub use fft::{realized_size, Radix2Transform, RealFftTransform, SpectralTransform};
pub use loudness::LoudnessScale;
pub use windows::{generate_window, WindowType};
