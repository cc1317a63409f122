//! Spectrum publisher: owns configuration, runs the analyzer, emits results
//!
//! The audio thread owns a [`SpectrumPublisher`] and calls `consume` per
//! block. Other threads hold a [`SpectrumControl`] to reconfigure, toggle
//! and subscribe. `consume` takes no locks: configuration is an `ArcSwap`
//! snapshot and publication is a non-blocking channel send.

use super::hub::{
    SpectrumEvent, SpectrumFrame, SpectrumHub, Subscription, DEFAULT_SUBSCRIBER_CAPACITY,
};
use crate::config::SpectrumConfig;
use crate::error::{ConfigError, SpectrumError};
use crate::spectrum::analysis::SpectrumAnalyzer;
use crate::spectrum::fft::{RealFftTransform, SpectralTransform};
use crate::spectrum::windows::WindowType;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

struct Shared {
    config: ArcSwap<SpectrumConfig>,
    enabled: AtomicBool,
    hub: SpectrumHub,
    /// Serializes read-modify-write setters; never touched by `consume`
    writer: Mutex<()>,
}

/// Thread-safe handle for configuring a publisher and subscribing to it
#[derive(Clone)]
pub struct SpectrumControl {
    shared: Arc<Shared>,
}

impl SpectrumControl {
    fn new(config: SpectrumConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config: ArcSwap::from_pointee(config),
                enabled: AtomicBool::new(true),
                hub: SpectrumHub::new(),
                writer: Mutex::new(()),
            }),
        }
    }

    /// Current configuration snapshot
    pub fn config(&self) -> Arc<SpectrumConfig> {
        self.shared.config.load_full()
    }

    /// Replace the whole configuration
    pub fn set_config(&self, config: SpectrumConfig) -> Result<(), ConfigError> {
        self.update(|_| Ok(config))
    }

    /// Apply `change` to the current configuration and validate the result
    ///
    /// On error the configuration is left untouched.
    pub fn update<F>(&self, change: F) -> Result<(), ConfigError>
    where
        F: FnOnce(SpectrumConfig) -> Result<SpectrumConfig, ConfigError>,
    {
        // A poisoned guard protects no data, so recover it
        let _guard = self
            .shared
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let current = SpectrumConfig::clone(&self.shared.config.load());
        let next = change(current)?;
        next.validate()?;

        debug!(
            bands = next.band_count,
            min_hz = next.min_frequency,
            max_hz = next.max_frequency,
            min_db = next.min_db,
            max_db = next.max_db,
            window = ?next.window,
            "spectrum configuration updated"
        );
        self.shared.config.store(Arc::new(next));
        Ok(())
    }

    pub fn set_max_db(&self, max_db: f32) -> Result<(), ConfigError> {
        self.update(|c| {
            let min_db = c.min_db;
            c.with_db_range(min_db, max_db)
        })
    }

    pub fn set_min_db(&self, min_db: f32) -> Result<(), ConfigError> {
        self.update(|c| {
            let max_db = c.max_db;
            c.with_db_range(min_db, max_db)
        })
    }

    pub fn set_db_range(&self, min_db: f32, max_db: f32) -> Result<(), ConfigError> {
        self.update(|c| c.with_db_range(min_db, max_db))
    }

    pub fn set_band_count(&self, band_count: usize) -> Result<(), ConfigError> {
        self.update(|c| c.with_band_count(band_count))
    }

    pub fn set_min_frequency(&self, min_frequency: f32) -> Result<(), ConfigError> {
        self.update(|c| {
            let max_frequency = c.max_frequency;
            c.with_frequency_range(min_frequency, max_frequency)
        })
    }

    pub fn set_max_frequency(&self, max_frequency: f32) -> Result<(), ConfigError> {
        self.update(|c| {
            let min_frequency = c.min_frequency;
            c.with_frequency_range(min_frequency, max_frequency)
        })
    }

    pub fn set_frequency_range(
        &self,
        min_frequency: f32,
        max_frequency: f32,
    ) -> Result<(), ConfigError> {
        self.update(|c| c.with_frequency_range(min_frequency, max_frequency))
    }

    pub fn set_window(&self, window: WindowType) -> Result<(), ConfigError> {
        self.update(|c| Ok(c.with_window(window)))
    }

    /// Enable or disable analysis; disabled publishers ignore `consume`
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.shared.enabled.swap(enabled, Ordering::AcqRel);
        if was != enabled {
            debug!(enabled, "spectrum publisher toggled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Acquire)
    }

    /// Publish an all-zero band vector of the current band count
    ///
    /// No average-loudness value is emitted.
    pub fn end(&self) {
        let band_count = self.shared.config.load().band_count;
        let band_magnitudes: Arc<[f32]> = Arc::from(vec![0.0; band_count]);
        self.shared.hub.publish(SpectrumEvent::Cleared { band_magnitudes });
    }

    /// Disable and immediately publish zeroed bands
    pub fn disable(&self) {
        self.set_enabled(false);
        self.end();
    }

    pub fn subscribe(&self) -> Subscription {
        self.shared.hub.subscribe(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    pub fn subscribe_with_capacity(&self, capacity: usize) -> Subscription {
        self.shared.hub.subscribe(capacity)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.hub.subscriber_count()
    }
}

/// Converts sample blocks into published loudness spectra
pub struct SpectrumPublisher<T: SpectralTransform = RealFftTransform> {
    control: SpectrumControl,
    analyzer: SpectrumAnalyzer<T>,
}

impl SpectrumPublisher<RealFftTransform> {
    /// Publisher with the default configuration and `realfft` backend
    pub fn new() -> Self {
        Self {
            control: SpectrumControl::new(SpectrumConfig::default()),
            analyzer: SpectrumAnalyzer::new(),
        }
    }

    pub fn with_config(config: SpectrumConfig) -> Result<Self, ConfigError> {
        Self::with_transform(config, RealFftTransform::new())
    }
}

impl Default for SpectrumPublisher<RealFftTransform> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SpectralTransform> SpectrumPublisher<T> {
    /// Publisher with a specific transform backend
    pub fn with_transform(config: SpectrumConfig, transform: T) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            control: SpectrumControl::new(config),
            analyzer: SpectrumAnalyzer::with_transform(transform),
        })
    }

    /// Handle for other threads
    pub fn control(&self) -> SpectrumControl {
        self.control.clone()
    }

    /// Analyze one block and publish the result
    ///
    /// Disabled publishers, blocks shorter than 2 frames and invalid sample
    /// rates are skipped silently.
    ///
    /// # Arguments
    /// * `samples` - Mono PCM block
    /// * `frame_count` - Frames to use; clamped to `samples.len()` and
    ///   truncated to a power of two
    /// * `sample_rate` - Sample rate of the block in Hz
    ///
    /// # Returns
    /// Whether a frame was published
    pub fn consume(&mut self, samples: &[f32], frame_count: usize, sample_rate: f32) -> bool {
        if !self.control.is_enabled() {
            return false;
        }

        let frames = frame_count.min(samples.len());
        let config = self.control.shared.config.load();

        match self.analyzer.analyze(&samples[..frames], sample_rate, &config) {
            Ok(output) => {
                let frame = SpectrumFrame {
                    average_loudness: output.average_loudness,
                    band_magnitudes: Arc::from(output.band_magnitudes),
                };
                self.control.shared.hub.publish(SpectrumEvent::Frame(frame));
                true
            }
            Err(e) => {
                skip_block(&e);
                false
            }
        }
    }

    /// See [`SpectrumControl::end`]
    pub fn end(&self) {
        self.control.end();
    }

    /// See [`SpectrumControl::disable`]
    pub fn disable(&self) {
        self.control.disable();
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.control.set_enabled(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.control.is_enabled()
    }

    pub fn subscribe(&self) -> Subscription {
        self.control.subscribe()
    }

    pub fn config(&self) -> Arc<SpectrumConfig> {
        self.control.config()
    }

    /// Raw bin magnitudes of the last analysed block
    pub fn bin_magnitudes(&self) -> &[f32] {
        self.analyzer.bin_magnitudes()
    }
}

fn skip_block(error: &SpectrumError) {
    trace!(%error, "skipping sample block");
}
