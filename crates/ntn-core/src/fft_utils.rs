//! FFT utilities for spectrum measurements
//!
//! Thin wrapper around `rustfft` with plan and scratch reuse. The testbed
//! uses it for the IQ-imbalance calibration (image-rejection measurement)
//! and for OFDM-like waveform synthesis, where a tone or subcarrier set is
//! located by its spectral bin.

use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

use crate::types::IQSample;

/// FFT processor with cached forward/inverse plans
pub struct FftProcessor {
    /// FFT size
    size: usize,
    /// Forward FFT instance
    fft_forward: Arc<dyn Fft<f64>>,
    /// Inverse FFT instance
    fft_inverse: Arc<dyn Fft<f64>>,
    /// Scratch buffer for FFT operations
    scratch: Vec<Complex64>,
}

impl fmt::Debug for FftProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftProcessor")
            .field("size", &self.size)
            .finish()
    }
}

impl FftProcessor {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft_forward = planner.plan_fft_forward(size);
        let fft_inverse = planner.plan_fft_inverse(size);
        let scratch_len = fft_forward
            .get_inplace_scratch_len()
            .max(fft_inverse.get_inplace_scratch_len());
        let scratch = vec![Complex64::new(0.0, 0.0); scratch_len];

        Self {
            size,
            fft_forward,
            fft_inverse,
            scratch,
        }
    }

    /// Get the FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Compute the forward FFT in-place
    pub fn fft_inplace(&mut self, buffer: &mut [Complex64]) {
        assert_eq!(buffer.len(), self.size);
        self.fft_forward
            .process_with_scratch(buffer, &mut self.scratch);
    }

    /// Compute the forward FFT, returning a new buffer
    ///
    /// Input shorter than the FFT size is zero-padded.
    pub fn fft(&mut self, input: &[IQSample]) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = input.to_vec();
        buffer.resize(self.size, Complex64::new(0.0, 0.0));
        self.fft_inplace(&mut buffer);
        buffer
    }

    /// Compute the inverse FFT in-place (normalized by 1/N)
    pub fn ifft_inplace(&mut self, buffer: &mut [Complex64]) {
        assert_eq!(buffer.len(), self.size);
        self.fft_inverse
            .process_with_scratch(buffer, &mut self.scratch);

        let scale = 1.0 / self.size as f64;
        for sample in buffer.iter_mut() {
            *sample *= scale;
        }
    }

    /// Compute the inverse FFT, returning a new buffer
    pub fn ifft(&mut self, input: &[Complex64]) -> Vec<Complex64> {
        let mut buffer = input.to_vec();
        buffer.resize(self.size, Complex64::new(0.0, 0.0));
        self.ifft_inplace(&mut buffer);
        buffer
    }

    /// Find the peak in an FFT magnitude spectrum
    ///
    /// Returns (bin_index, magnitude)
    pub fn find_peak(spectrum: &[Complex64]) -> (usize, f64) {
        let mut max_idx = 0;
        let mut max_mag = 0.0;

        for (i, &sample) in spectrum.iter().enumerate() {
            let mag = sample.norm();
            if mag > max_mag {
                max_mag = mag;
                max_idx = i;
            }
        }

        (max_idx, max_mag)
    }

    /// FFT shift - move zero frequency to the center
    pub fn fft_shift<T: Clone>(spectrum: &[T]) -> Vec<T> {
        let n = spectrum.len();
        let mid = n / 2;
        let mut shifted = Vec::with_capacity(n);
        shifted.extend_from_slice(&spectrum[mid..]);
        shifted.extend_from_slice(&spectrum[..mid]);
        shifted
    }
}

/// Bin-center frequencies for an N-point FFT at the given sample rate
///
/// Matches the usual DFT layout: bins 0..N/2 are non-negative frequencies,
/// bins above N/2 wrap to negative frequencies.
pub fn fft_frequencies(n: usize, sample_rate: f64) -> Vec<f64> {
    let step = sample_rate / n as f64;
    (0..n)
        .map(|k| {
            if k <= (n - 1) / 2 {
                k as f64 * step
            } else {
                (k as f64 - n as f64) * step
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::complex_ops;

    #[test]
    fn test_tone_lands_in_expected_bin() {
        let n = 1024;
        let fs = 1024.0;
        // 100 Hz tone at 1024 Hz over 1024 samples: exactly bin 100
        let tone: Vec<IQSample> = (0..n).map(|i| complex_ops::cis(100.0, i, fs)).collect();
        let mut proc = FftProcessor::new(n);
        let spectrum = proc.fft(&tone);
        let (peak, _) = FftProcessor::find_peak(&spectrum);
        assert_eq!(peak, 100);
    }

    #[test]
    fn test_fft_ifft_roundtrip() {
        let n = 256;
        let input: Vec<IQSample> = (0..n)
            .map(|i| Complex64::new((i as f64 * 0.1).sin(), (i as f64 * 0.07).cos()))
            .collect();
        let mut proc = FftProcessor::new(n);
        let spectrum = proc.fft(&input);
        let output = proc.ifft(&spectrum);
        for (a, b) in input.iter().zip(output.iter()) {
            assert!((a - b).norm() < 1e-9);
        }
    }

    #[test]
    fn test_fft_frequencies_layout() {
        let freqs = fft_frequencies(8, 8000.0);
        assert_eq!(freqs[0], 0.0);
        assert_eq!(freqs[1], 1000.0);
        assert_eq!(freqs[3], 3000.0);
        assert_eq!(freqs[4], -4000.0);
        assert_eq!(freqs[7], -1000.0);
    }

    #[test]
    fn test_fft_shift() {
        let v = vec![0, 1, 2, 3, 4, 5];
        assert_eq!(FftProcessor::fft_shift(&v), vec![3, 4, 5, 0, 1, 2]);
    }
}
