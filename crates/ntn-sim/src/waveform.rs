//! Test waveform generation
//!
//! Reference signals the testbed drives through radios and channels: a
//! single complex tone at a frequency offset (calibration, Doppler
//! measurements) and an OFDM-like wideband signal built from random QPSK
//! subcarriers (link-level loss measurements over the full bandwidth).

use ntn_core::fft_utils::FftProcessor;
use ntn_core::types::{complex_ops, Complex, IQBuffer};
use rand::rngs::StdRng;
use rand::Rng;

/// Complex tone at `freq_offset_hz` from the carrier
pub fn test_tone(
    freq_offset_hz: f64,
    num_samples: usize,
    sample_rate: f64,
    amplitude: f64,
) -> IQBuffer {
    (0..num_samples)
        .map(|n| complex_ops::cis(freq_offset_hz, n, sample_rate) * amplitude)
        .collect()
}

/// OFDM-like wideband signal from random QPSK subcarriers
///
/// Draws one QPSK symbol per subcarrier, zero-pads to the output length,
/// and inverse-transforms to the time domain at half amplitude.
pub fn ofdm_signal(num_subcarriers: usize, num_samples: usize, rng: &mut StdRng) -> IQBuffer {
    if num_samples == 0 {
        return Vec::new();
    }

    let scale = 1.0 / 2.0_f64.sqrt();
    let mut spectrum = vec![Complex::new(0.0, 0.0); num_samples];
    for bin in spectrum.iter_mut().take(num_subcarriers.min(num_samples)) {
        let i = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let q = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        *bin = Complex::new(i * scale, q * scale);
    }

    let mut proc = FftProcessor::new(num_samples);
    let time_signal = proc.ifft(&spectrum);

    time_signal.iter().map(|&s| s * 0.5).collect()
}
