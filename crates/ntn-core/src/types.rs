//! Core types for complex baseband processing
//!
//! Everything in the testbed moves buffers of complex I/Q samples around:
//! the in-phase (real) component tracks the reference carrier, the
//! quadrature (imaginary) component is 90° out of phase. Together they
//! carry both amplitude and phase, which is what the channel and
//! impairment models operate on.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Type alias for complex numbers using f64 precision
pub type Complex = Complex64;

/// A single I/Q sample point
pub type IQSample = Complex64;

/// A buffer of I/Q samples
pub type IQBuffer = Vec<IQSample>;

/// Helper functions for working with complex samples
pub mod complex_ops {
    use super::*;

    /// Create a complex number from magnitude and phase
    #[inline]
    pub fn from_polar(magnitude: f64, phase: f64) -> Complex {
        Complex::new(magnitude * phase.cos(), magnitude * phase.sin())
    }

    /// Compute the power (magnitude squared) of a complex number
    #[inline]
    pub fn power(c: Complex) -> f64 {
        c.norm_sqr()
    }

    /// Compute the average power of a signal
    pub fn average_power(samples: &[IQSample]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().map(|s| power(*s)).sum::<f64>() / samples.len() as f64
    }

    /// Normalize samples to unit power
    pub fn normalize(samples: &mut [IQSample]) {
        let avg_power = average_power(samples);
        if avg_power > 0.0 {
            let scale = 1.0 / avg_power.sqrt();
            for s in samples.iter_mut() {
                *s *= scale;
            }
        }
    }

    /// Generate a complex exponential (cisoid) at given frequency
    ///
    /// Returns e^(j*2*π*f*t) where t = sample_idx / sample_rate. This is
    /// the building block for tones, Doppler rotation, and CFO.
    #[inline]
    pub fn cis(frequency: f64, sample_idx: usize, sample_rate: f64) -> Complex {
        let t = sample_idx as f64 / sample_rate;
        let phase = 2.0 * PI * frequency * t;
        Complex::new(phase.cos(), phase.sin())
    }
}

/// Signal statistics for analysis and debugging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalStats {
    pub num_samples: usize,
    pub average_power: f64,
    pub peak_power: f64,
    pub dc_offset: Complex,
}

impl SignalStats {
    pub fn compute(samples: &[IQSample]) -> Self {
        let num_samples = samples.len();
        if num_samples == 0 {
            return Self {
                num_samples: 0,
                average_power: 0.0,
                peak_power: 0.0,
                dc_offset: Complex::new(0.0, 0.0),
            };
        }

        let average_power = complex_ops::average_power(samples);
        let peak_power = samples
            .iter()
            .map(|s| complex_ops::power(*s))
            .fold(0.0_f64, f64::max);

        let dc_offset = samples.iter().copied().sum::<Complex>() / num_samples as f64;

        Self {
            num_samples,
            average_power,
            peak_power,
            dc_offset,
        }
    }
}
