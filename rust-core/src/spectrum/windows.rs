//! Window functions for spectral analysis
//!
//! Applied to each block before the forward transform to reduce spectral leakage

use std::f32::consts::PI;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    /// Hann window: w[n] = 0.5*(1 - cos(2πn/(N-1)))
    /// Sidelobe attenuation: ~31 dB, rolls off quickly
    #[default]
    Hann,

    /// Hamming window: w[n] = 0.54 - 0.46*cos(2πn/(N-1))
    Hamming,

    /// Blackman window: w[n] = 0.42 - 0.5*cos(2πn/(N-1)) + 0.08*cos(4πn/(N-1))
    Blackman,

    /// Rectangular window (no windowing)
    Rectangular,
}

impl WindowType {
    /// Coefficient at index `n` of an `length`-point window.
    ///
    /// A single-point window is defined as `[1.0]`.
    #[inline]
    pub fn coefficient(&self, n: usize, length: usize) -> f32 {
        if length <= 1 {
            return 1.0;
        }

        let phase = 2.0 * PI * n as f32 / (length - 1) as f32;
        let w = match self {
            WindowType::Hann => 0.5 * (1.0 - phase.cos()),
            WindowType::Hamming => 0.54 - 0.46 * phase.cos(),
            WindowType::Blackman => 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos(),
            WindowType::Rectangular => 1.0,
        };

        // Blackman dips a hair below zero at the edges in f32
        w.clamp(0.0, 1.0)
    }

    /// Coherent gain (mean coefficient) of a window of this kind
    ///
    /// The magnitude of an on-bin sinusoid of amplitude A is
    /// `A * N * coherent_gain / 2`.
    pub fn coherent_gain(&self, length: usize) -> f32 {
        if length == 0 {
            return 0.0;
        }
        let sum: f32 = (0..length).map(|n| self.coefficient(n, length)).sum();
        sum / length as f32
    }
}

/// Generate window coefficients
///
/// # Arguments
/// * `window_type` - Type of window function
/// * `length` - Number of samples (N)
///
/// # Returns
/// Vector of window coefficients w[n] for n = 0..N-1
pub fn generate_window(window_type: WindowType, length: usize) -> Vec<f32> {
    let mut window = Vec::with_capacity(length);
    fill_window(window_type, &mut window, length);
    window
}

/// Regenerate `window` in place for a new length, reusing its allocation
pub fn fill_window(window_type: WindowType, window: &mut Vec<f32>, length: usize) {
    window.clear();
    window.extend((0..length).map(|n| window_type.coefficient(n, length)));
}

/// Multiply `signal` by `window` sample by sample
///
/// Extra samples on either side are left untouched.
pub fn apply_window_inplace(signal: &mut [f32], window: &[f32]) {
    for (s, w) in signal.iter_mut().zip(window.iter()) {
        *s *= w;
    }
}
