//! FFT Publisher - Real-time Loudness Spectrum Core
//!
//! Turns blocks of mono float samples into a normalized average loudness and
//! a vector of linear-frequency band magnitudes, published to any number of
//! consumer threads without blocking the audio thread.

pub mod audio;
pub mod config;
pub mod error;
pub mod publish;
pub mod spectrum;

pub use audio::SampleFeed;
pub use config::SpectrumConfig;
pub use error::{ConfigError, SpectrumError};
pub use publish::{SpectrumControl, SpectrumEvent, SpectrumFrame, SpectrumPublisher, Subscription};
pub use spectrum::{Radix2Transform, RealFftTransform, SpectralTransform, WindowType};
