//! Linear frequency bands over transform bins
//!
//! Splits [min_frequency, max_frequency) into equal-width bands in ascending
//! order (band 0 is the lowest) and reduces each band to a single magnitude.

use crate::error::ConfigError;

/// Check `0 <= min < max`, both finite
pub fn validate_frequency_range(min: f32, max: f32) -> Result<(), ConfigError> {
    if min.is_finite() && max.is_finite() && min >= 0.0 && min < max {
        Ok(())
    } else {
        Err(ConfigError::FrequencyRange { min, max })
    }
}

/// Maps bin magnitudes onto equal-width linear bands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandMapper {
    min_frequency: f32,
    max_frequency: f32,
    band_count: usize,
}

impl BandMapper {
    /// Split `[min_frequency, max_frequency)` into `band_count` equal bands
    ///
    /// # Arguments
    /// * `min_frequency` - Lower edge of band 0 in Hz
    /// * `max_frequency` - Upper edge of the last band in Hz
    /// * `band_count` - Number of bands, at least 1
    ///
    /// # Errors
    /// * `ZeroBands` - `band_count` is 0
    /// * `FrequencyRange` - not `0 <= min < max`
    pub fn new(
        min_frequency: f32,
        max_frequency: f32,
        band_count: usize,
    ) -> Result<Self, ConfigError> {
        if band_count == 0 {
            return Err(ConfigError::ZeroBands);
        }
        validate_frequency_range(min_frequency, max_frequency)?;

        Ok(Self {
            min_frequency,
            max_frequency,
            band_count,
        })
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// Width of every band in Hz
    pub fn band_width(&self) -> f32 {
        (self.max_frequency - self.min_frequency) / self.band_count as f32
    }

    /// Half-open span `[low, high)` of band `band` in Hz
    pub fn band_range(&self, band: usize) -> (f32, f32) {
        let width = self.band_width();
        let low = self.min_frequency + band as f32 * width;
        (low, low + width)
    }

    pub fn band_center(&self, band: usize) -> f32 {
        let (low, high) = self.band_range(band);
        0.5 * (low + high)
    }

    /// Band whose span contains `frequency`, if any
    pub fn band_for_frequency(&self, frequency: f32) -> Option<usize> {
        if frequency < self.min_frequency || frequency >= self.max_frequency {
            return None;
        }
        let band = ((frequency - self.min_frequency) / self.band_width()) as usize;
        Some(band.min(self.band_count - 1))
    }

    /// Reduce `magnitudes` (bins 0..=N/2 spaced `bin_hz` apart) into `bands`
    ///
    /// Each band takes the peak bin inside its span. A band too narrow to
    /// hold a bin interpolates linearly between the bins around its centre.
    /// Bands starting above Nyquist are 0.
    ///
    /// # Arguments
    /// * `magnitudes` - Raw bin magnitudes, DC first
    /// * `bin_hz` - Spacing between bins (`sample_rate / N`)
    /// * `bands` - Output; `min(bands.len(), band_count)` values are written
    pub fn map(&self, magnitudes: &[f32], bin_hz: f32, bands: &mut [f32]) {
        if magnitudes.is_empty() || !(bin_hz > 0.0) {
            bands.fill(0.0);
            return;
        }

        let last_bin = magnitudes.len() - 1;
        let nyquist = last_bin as f32 * bin_hz;

        for (j, out) in bands.iter_mut().enumerate().take(self.band_count) {
            let (low, high) = self.band_range(j);
            if low > nyquist {
                *out = 0.0;
                continue;
            }

            let mut k = (low / bin_hz).ceil() as usize;
            let mut peak: Option<f32> = None;
            while k <= last_bin && (k as f32 * bin_hz) < high {
                let m = magnitudes[k];
                peak = Some(peak.map_or(m, |p| p.max(m)));
                k += 1;
            }

            *out = match peak {
                Some(p) => p,
                None => interpolate(magnitudes, (0.5 * (low + high)) / bin_hz),
            };
        }
    }

    /// Power-mean magnitude of every bin whose frequency lies in
    /// `[min_frequency, max_frequency]`
    ///
    /// Squared magnitudes are averaged and the root is returned, so the
    /// result is in the same unit as the bins.
    ///
    /// # Returns
    /// Average magnitude, or 0 if no bin is in range
    pub fn average_magnitude(&self, magnitudes: &[f32], bin_hz: f32) -> f32 {
        if magnitudes.is_empty() || !(bin_hz > 0.0) {
            return 0.0;
        }

        let last_bin = magnitudes.len() - 1;
        let first = (self.min_frequency / bin_hz).ceil() as usize;

        let mut sum = 0.0f64;
        let mut count = 0usize;
        let mut k = first;
        while k <= last_bin && (k as f32 * bin_hz) <= self.max_frequency {
            let m = magnitudes[k] as f64;
            sum += m * m;
            count += 1;
            k += 1;
        }

        if count == 0 {
            0.0
        } else {
            (sum / count as f64).sqrt() as f32
        }
    }
}

/// Linear interpolation at fractional bin `position`, clamped to the last bin
fn interpolate(magnitudes: &[f32], position: f32) -> f32 {
    let last_bin = magnitudes.len() - 1;
    let k0 = (position.floor() as usize).min(last_bin);
    let k1 = (k0 + 1).min(last_bin);
    let frac = (position - k0 as f32).clamp(0.0, 1.0);
    magnitudes[k0] + (magnitudes[k1] - magnitudes[k0]) * frac
}
