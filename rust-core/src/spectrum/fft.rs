//! Forward transform backends
//!
//! Both backends take a power-of-two block of real samples and produce raw
//! magnitudes |X[k]| for k = 0..=N/2. No 2/N scaling is applied; the
//! loudness scale downstream is calibrated for unnormalized magnitudes.

use crate::error::SpectrumError;
use num_complex::Complex32;
use realfft::{num_complex::Complex, RealFftPlanner, RealToComplex};
use std::f32::consts::PI;
use std::sync::Arc;
use tracing::debug;

/// Largest power of two that fits in `frames`
///
/// Blocks are truncated, never zero-padded, so the realized size is always
/// <= the frame count handed in by the caller.
///
/// # Arguments
/// * `frames` - Frames available in the block
///
/// # Returns
/// Transform length N, or `InvalidInput` when fewer than 2 frames
pub fn realized_size(frames: usize) -> Result<usize, SpectrumError> {
    if frames < 2 {
        return Err(SpectrumError::InvalidInput(frames));
    }
    if frames.is_power_of_two() {
        Ok(frames)
    } else {
        Ok(frames.next_power_of_two() >> 1)
    }
}

/// Number of bins (DC through Nyquist) for a transform of size `n`
#[inline]
pub fn num_bins(n: usize) -> usize {
    n / 2 + 1
}

/// Pluggable real-to-complex forward transform
pub trait SpectralTransform: Send {
    /// Compute magnitudes of `input` into `output`
    ///
    /// `input.len()` must be a power of two >= 2 and `output.len()` must be
    /// `input.len() / 2 + 1`. `input` may be used as scratch and is left in
    /// an unspecified state.
    fn magnitudes(&mut self, input: &mut [f32], output: &mut [f32]) -> Result<(), SpectrumError>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

fn check_lengths(input: &[f32], output: &[f32]) -> Result<usize, SpectrumError> {
    let n = input.len();
    if n < 2 {
        return Err(SpectrumError::InvalidInput(n));
    }
    if !n.is_power_of_two() {
        return Err(SpectrumError::Transform(format!(
            "size {} is not a power of two",
            n
        )));
    }
    if output.len() != num_bins(n) {
        return Err(SpectrumError::Transform(format!(
            "output holds {} bins, expected {}",
            output.len(),
            num_bins(n)
        )));
    }
    Ok(n)
}

/// Transform backed by `realfft`
///
/// Re-plans only when the block size changes; the output and scratch
/// buffers are reused between calls.
#[derive(Default)]
pub struct RealFftTransform {
    r2c: Option<Arc<dyn RealToComplex<f32>>>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl RealFftTransform {
    pub fn new() -> Self {
        Self::default()
    }

    fn prepare(&mut self, n: usize) -> Arc<dyn RealToComplex<f32>> {
        match &self.r2c {
            Some(r2c) if r2c.len() == n => Arc::clone(r2c),
            _ => {
                let mut planner = RealFftPlanner::<f32>::new();
                let r2c = planner.plan_fft_forward(n);
                self.spectrum = r2c.make_output_vec();
                self.scratch = r2c.make_scratch_vec();
                self.r2c = Some(Arc::clone(&r2c));
                debug!(size = n, "planned realfft transform");
                r2c
            }
        }
    }
}

impl SpectralTransform for RealFftTransform {
    fn magnitudes(&mut self, input: &mut [f32], output: &mut [f32]) -> Result<(), SpectrumError> {
        let n = check_lengths(input, output)?;
        let r2c = self.prepare(n);

        r2c.process_with_scratch(input, &mut self.spectrum, &mut self.scratch)
            .map_err(|e| SpectrumError::Transform(e.to_string()))?;

        for (mag, c) in output.iter_mut().zip(self.spectrum.iter()) {
            *mag = c.norm();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "realfft"
    }
}

/// Iterative radix-2 Cooley-Tukey transform with no external FFT library
#[derive(Default)]
pub struct Radix2Transform {
    size: usize,
    buffer: Vec<Complex32>,
    /// e^{-2πik/N} for k in 0..N/2
    twiddles: Vec<Complex32>,
}

impl Radix2Transform {
    pub fn new() -> Self {
        Self::default()
    }

    fn prepare(&mut self, n: usize) {
        if self.size == n {
            return;
        }
        self.twiddles = (0..n / 2)
            .map(|k| Complex32::from_polar(1.0, -2.0 * PI * k as f32 / n as f32))
            .collect();
        self.buffer = vec![Complex32::new(0.0, 0.0); n];
        self.size = n;
        debug!(size = n, "prepared radix-2 twiddles");
    }

    fn forward(&mut self) {
        let n = self.size;
        let bits = n.trailing_zeros();

        // Bit-reversal permutation
        for i in 0..n {
            let j = i.reverse_bits() >> (usize::BITS - bits);
            if j > i {
                self.buffer.swap(i, j);
            }
        }

        let mut len = 2;
        while len <= n {
            let half = len / 2;
            let stride = n / len;
            for start in (0..n).step_by(len) {
                for k in 0..half {
                    let w = self.twiddles[k * stride];
                    let a = self.buffer[start + k];
                    let b = self.buffer[start + k + half] * w;
                    self.buffer[start + k] = a + b;
                    self.buffer[start + k + half] = a - b;
                }
            }
            len <<= 1;
        }
    }
}

impl SpectralTransform for Radix2Transform {
    fn magnitudes(&mut self, input: &mut [f32], output: &mut [f32]) -> Result<(), SpectrumError> {
        let n = check_lengths(input, output)?;
        self.prepare(n);

        for (slot, &x) in self.buffer.iter_mut().zip(input.iter()) {
            *slot = Complex32::new(x, 0.0);
        }
        self.forward();

        for (mag, c) in output.iter_mut().zip(self.buffer.iter()) {
            *mag = c.norm();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "radix2"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::windows::{generate_window, WindowType};

    fn sine(bin: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * bin * i as f32 / n as f32).sin())
            .collect()
    }

    fn run(transform: &mut dyn SpectralTransform, signal: &[f32]) -> Vec<f32> {
        let mut input = signal.to_vec();
        let mut output = vec![0.0; num_bins(signal.len())];
        transform.magnitudes(&mut input, &mut output).unwrap();
        output
    }

    #[test]
    fn test_realized_size() {
        assert_eq!(realized_size(1024).unwrap(), 1024);
        assert_eq!(realized_size(1000).unwrap(), 512);
        assert_eq!(realized_size(3).unwrap(), 2);
        assert_eq!(realized_size(2).unwrap(), 2);
        assert_eq!(realized_size(1), Err(SpectrumError::InvalidInput(1)));
        assert_eq!(realized_size(0), Err(SpectrumError::InvalidInput(0)));
    }

    #[test]
    fn test_fft_dc_signal() {
        let mut fft = RealFftTransform::new();
        let spectrum = run(&mut fft, &vec![1.0; 256]);

        assert_eq!(spectrum.len(), 129);
        // DC bin holds the sum of samples
        assert!((spectrum[0] - 256.0).abs() < 1e-3);
        assert!(spectrum[10] < 1e-3);
    }

    #[test]
    fn test_fft_sine_wave_with_hann() {
        let n = 1024;
        let mut signal = sine(64.0, n);
        let window = generate_window(WindowType::Hann, n);
        for (s, w) in signal.iter_mut().zip(window.iter()) {
            *s *= w;
        }

        let mut fft = RealFftTransform::new();
        let spectrum = run(&mut fft, &signal);

        let (peak_bin, &peak_mag) = spectrum
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .unwrap();

        assert_eq!(peak_bin, 64);
        // A * N * coherent_gain / 2 = 1024 * 0.5 / 2
        assert!(peak_mag > 250.0 && peak_mag < 260.0);
    }

    #[test]
    fn test_backends_agree() {
        let n = 512;
        let signal: Vec<f32> = (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                0.7 * (2.0 * PI * 13.0 * t).sin() + 0.2 * (2.0 * PI * 101.5 * t).cos() + 0.05
            })
            .collect();

        let fast = run(&mut RealFftTransform::new(), &signal);
        let slow = run(&mut Radix2Transform::new(), &signal);

        assert_eq!(fast.len(), slow.len());
        for (a, b) in fast.iter().zip(slow.iter()) {
            assert!((a - b).abs() < 1e-2, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_replans_on_size_change() {
        let mut fft = Radix2Transform::new();
        let small = run(&mut fft, &sine(4.0, 64));
        let large = run(&mut fft, &sine(4.0, 256));

        assert_eq!(small.len(), 33);
        assert_eq!(large.len(), 129);
        assert!((small[4] - 32.0).abs() < 1e-3);
        assert!((large[4] - 128.0).abs() < 1e-2);
    }

    #[test]
    fn test_rejects_bad_lengths() {
        let mut fft = RealFftTransform::new();

        let mut input = vec![0.0; 1];
        let mut output = vec![0.0; 1];
        assert_eq!(
            fft.magnitudes(&mut input, &mut output),
            Err(SpectrumError::InvalidInput(1))
        );

        let mut input = vec![0.0; 12];
        let mut output = vec![0.0; 7];
        assert!(matches!(
            fft.magnitudes(&mut input, &mut output),
            Err(SpectrumError::Transform(_))
        ));

        let mut input = vec![0.0; 16];
        let mut output = vec![0.0; 8];
        assert!(matches!(
            Radix2Transform::new().magnitudes(&mut input, &mut output),
            Err(SpectrumError::Transform(_))
        ));
    }
}
