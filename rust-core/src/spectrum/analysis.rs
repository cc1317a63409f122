//! Per-block spectrum analysis
//!
//! Window -> transform -> bands and average -> loudness scale. All working
//! buffers live here and are resized only when the block size or band count
//! changes.

use super::fft::{num_bins, realized_size, RealFftTransform, SpectralTransform};
use super::windows::{apply_window_inplace, fill_window, WindowType};
use crate::config::SpectrumConfig;
use crate::error::SpectrumError;

/// Result of analysing one block, borrowed from the analyzer
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOutput<'a> {
    /// Normalized loudness of all bins in the configured frequency range
    pub average_loudness: f32,

    /// Normalized loudness per band, lowest frequency first
    pub band_magnitudes: &'a [f32],

    /// Transform length actually used (largest power of two <= frames)
    pub realized_size: usize,

    /// Spacing between bins in Hz
    pub bin_hz: f32,
}

/// Reusable spectrum analyzer
pub struct SpectrumAnalyzer<T: SpectralTransform = RealFftTransform> {
    transform: T,
    window: Vec<f32>,
    window_type: Option<WindowType>,
    input: Vec<f32>,
    magnitudes: Vec<f32>,
    bands: Vec<f32>,
}

impl SpectrumAnalyzer<RealFftTransform> {
    pub fn new() -> Self {
        Self::with_transform(RealFftTransform::new())
    }
}

impl Default for SpectrumAnalyzer<RealFftTransform> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SpectralTransform> SpectrumAnalyzer<T> {
    /// Create an analyzer around a specific transform backend
    pub fn with_transform(transform: T) -> Self {
        Self {
            transform,
            window: Vec::new(),
            window_type: None,
            input: Vec::new(),
            magnitudes: Vec::new(),
            bands: Vec::new(),
        }
    }

    /// Backend name, for logs
    pub fn transform_name(&self) -> &'static str {
        self.transform.name()
    }

    /// Raw bin magnitudes from the most recent block (DC..=Nyquist)
    pub fn bin_magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Analyze `samples` with one configuration snapshot
    ///
    /// # Arguments
    /// * `samples` - Mono block, truncated to the largest power of two that fits
    /// * `sample_rate` - Sample rate in Hz
    /// * `config` - Configuration snapshot used for the whole block
    ///
    /// # Returns
    /// Average loudness and bands, borrowed until the next call
    ///
    /// # Errors
    /// * `InvalidInput` - fewer than 2 samples
    /// * `InvalidSampleRate` - rate not positive and finite
    pub fn analyze(
        &mut self,
        samples: &[f32],
        sample_rate: f32,
        config: &SpectrumConfig,
    ) -> Result<AnalysisOutput<'_>, SpectrumError> {
        let n = realized_size(samples.len())?;
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(SpectrumError::InvalidSampleRate(sample_rate));
        }
        let mapper = config.band_mapper()?;
        let scale = config.loudness_scale();

        if self.window.len() != n || self.window_type != Some(config.window) {
            fill_window(config.window, &mut self.window, n);
            self.window_type = Some(config.window);
        }

        self.input.clear();
        self.input.extend_from_slice(&samples[..n]);
        apply_window_inplace(&mut self.input, &self.window);

        self.magnitudes.resize(num_bins(n), 0.0);
        self.transform.magnitudes(&mut self.input, &mut self.magnitudes)?;

        let bin_hz = sample_rate / n as f32;
        let average_loudness = scale.normalize(mapper.average_magnitude(&self.magnitudes, bin_hz));

        self.bands.resize(mapper.band_count(), 0.0);
        mapper.map(&self.magnitudes, bin_hz, &mut self.bands);
        scale.normalize_inplace(&mut self.bands);

        Ok(AnalysisOutput {
            average_loudness,
            band_magnitudes: &self.bands,
            realized_size: n,
            bin_hz,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::fft::Radix2Transform;
    use std::f32::consts::PI;

    fn sine(freq_hz: f32, sample_rate: f32, frames: usize, amplitude: f32) -> Vec<f32> {
        (0..frames)
            .map(|n| amplitude * (2.0 * PI * freq_hz * n as f32 / sample_rate).sin())
            .collect()
    }

    fn peak_index(values: &[f32]) -> usize {
        values
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn test_analyzer_reference_tone() {
        let config = SpectrumConfig::default();
        let mut analyzer = SpectrumAnalyzer::new();
        let signal = sine(1000.0, 44100.0, 1024, 1.0);

        let out = analyzer.analyze(&signal, 44100.0, &config).unwrap();

        assert_eq!(out.realized_size, 1024);
        assert_eq!(out.band_magnitudes.len(), 150);
        assert!(out.average_loudness > 0.5, "average {}", out.average_loudness);

        let expected = config.band_mapper().unwrap().band_for_frequency(1000.0).unwrap();
        assert_eq!(peak_index(out.band_magnitudes), expected);
    }

    #[test]
    fn test_tone_concentrates_in_its_band() {
        let config = SpectrumConfig::default();
        let mut analyzer = SpectrumAnalyzer::new();
        let signal = sine(1000.0, 44100.0, 1024, 1.0);
        let out = analyzer.analyze(&signal, 44100.0, &config).unwrap();

        let peak_band = peak_index(out.band_magnitudes);
        let peak = out.band_magnitudes[peak_band];
        for (j, &value) in out.band_magnitudes.iter().enumerate() {
            if j.abs_diff(peak_band) >= 5 {
                assert!(value < peak - 0.3, "band {} = {} vs peak {}", j, value, peak);
            }
        }
    }

    #[test]
    fn test_silence_is_zero() {
        let config = SpectrumConfig::default();
        let mut analyzer = SpectrumAnalyzer::new();
        let out = analyzer.analyze(&vec![0.0; 1024], 44100.0, &config).unwrap();

        assert_eq!(out.average_loudness, 0.0);
        assert!(out.band_magnitudes.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_tone_beats_silence_in_its_band() {
        let config = SpectrumConfig::default().with_band_count(20).unwrap();
        let mapper = config.band_mapper().unwrap();
        let band = 7;
        let centre = mapper.band_center(band);

        let mut analyzer = SpectrumAnalyzer::new();
        let tone = analyzer
            .analyze(&sine(centre, 48000.0, 2048, 0.5), 48000.0, &config)
            .unwrap()
            .band_magnitudes[band];
        let silent = analyzer
            .analyze(&vec![0.0; 2048], 48000.0, &config)
            .unwrap()
            .band_magnitudes[band];

        assert!(tone > silent);
    }

    #[test]
    fn test_values_stay_in_unit_range() {
        let config = SpectrumConfig::default().with_db_range(-90.0, 0.0).unwrap();
        let mut analyzer = SpectrumAnalyzer::new();

        // Loud square-ish wave drives many bins past max_db
        let signal: Vec<f32> = (0..4096).map(|n| if n % 64 < 32 { 10.0 } else { -10.0 }).collect();
        let out = analyzer.analyze(&signal, 48000.0, &config).unwrap();

        assert!((0.0..=1.0).contains(&out.average_loudness));
        assert!(out.band_magnitudes.iter().all(|b| (0.0..=1.0).contains(b)));
        assert!(out.band_magnitudes.iter().any(|&b| b == 1.0));
    }

    #[test]
    fn test_truncates_to_power_of_two() {
        let config = SpectrumConfig::default();
        let mut analyzer = SpectrumAnalyzer::new();
        let out = analyzer
            .analyze(&sine(440.0, 48000.0, 1500, 1.0), 48000.0, &config)
            .unwrap();

        assert_eq!(out.realized_size, 1024);
        assert!((out.bin_hz - 46.875).abs() < 1e-4);
        assert_eq!(analyzer.bin_magnitudes().len(), 513);
    }

    #[test]
    fn test_rejects_bad_input() {
        let config = SpectrumConfig::default();
        let mut analyzer = SpectrumAnalyzer::new();

        assert!(matches!(
            analyzer.analyze(&[0.5], 44100.0, &config),
            Err(SpectrumError::InvalidInput(1))
        ));
        assert!(matches!(
            analyzer.analyze(&[], 44100.0, &config),
            Err(SpectrumError::InvalidInput(0))
        ));
        assert!(matches!(
            analyzer.analyze(&[0.0; 64], 0.0, &config),
            Err(SpectrumError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            analyzer.analyze(&[0.0; 64], f32::NAN, &config),
            Err(SpectrumError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn test_band_count_follows_config() {
        let mut analyzer = SpectrumAnalyzer::new();
        let signal = sine(1000.0, 44100.0, 1024, 1.0);

        for count in [150, 8, 300] {
            let config = SpectrumConfig::default().with_band_count(count).unwrap();
            let out = analyzer.analyze(&signal, 44100.0, &config).unwrap();
            assert_eq!(out.band_magnitudes.len(), count);
        }
    }

    #[test]
    fn test_radix2_backend_matches() {
        let config = SpectrumConfig::default();
        let signal = sine(1000.0, 44100.0, 1024, 1.0);

        let mut fast = SpectrumAnalyzer::new();
        let mut slow = SpectrumAnalyzer::with_transform(Radix2Transform::new());
        assert_eq!(slow.transform_name(), "radix2");

        let a = fast.analyze(&signal, 44100.0, &config).unwrap().band_magnitudes.to_vec();
        let b = slow.analyze(&signal, 44100.0, &config).unwrap().band_magnitudes.to_vec();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-2);
        }
    }
}
