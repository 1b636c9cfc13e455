//! Interchangeable sample-array backends
//!
//! The channel and impairment models are written against a single
//! `SampleBackend` trait covering the bulk array operations they need:
//! allocation, elementwise multiply, scaling, delay shifting, FFT, and
//! Gaussian sampling. Two implementations exist - a scalar CPU backend and
//! a rayon data-parallel backend - and one is selected once at startup.
//! Algorithmic code holds an `Arc<dyn SampleBackend>` and never branches
//! on which implementation is behind it.
//!
//! ## Example
//!
//! ```rust
//! use ntn_core::backend::{select_backend, BackendKind};
//! use ntn_core::types::Complex;
//!
//! let backend = select_backend(BackendKind::Cpu);
//! let a = vec![Complex::new(1.0, 0.0); 8];
//! let b = vec![Complex::new(0.0, 1.0); 8];
//! let out = backend.multiply(&a, &b);
//! assert_eq!(out.len(), 8);
//! ```

use std::str::FromStr;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::fft_utils::FftProcessor;
use crate::types::{Complex, IQBuffer, IQSample};

/// Which backend implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Scalar CPU loops
    #[default]
    Cpu,
    /// Rayon data-parallel CPU
    Rayon,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(BackendKind::Cpu),
            "rayon" | "parallel" => Ok(BackendKind::Rayon),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Bulk operations on complex sample buffers
///
/// All operations allocate fresh output buffers; inputs are never mutated.
pub trait SampleBackend: Send + Sync {
    /// Backend name for state reporting ("cpu", "rayon")
    fn name(&self) -> &'static str;

    /// Allocate a zero-filled buffer
    fn zeros(&self, len: usize) -> IQBuffer;

    /// Elementwise complex multiply of two equal-length buffers
    fn multiply(&self, a: &[IQSample], b: &[IQSample]) -> IQBuffer;

    /// Scale every sample by a real factor
    fn scale(&self, samples: &[IQSample], factor: f64) -> IQBuffer;

    /// Right-shift by `delay` samples, zero-filling the head and keeping
    /// the original length. A delay of zero copies; a delay at or beyond
    /// the buffer length yields all zeros.
    fn delay(&self, samples: &[IQSample], delay: usize) -> IQBuffer;

    /// Forward FFT of the full buffer
    fn fft(&self, samples: &[IQSample]) -> IQBuffer;

    /// Inverse FFT of the full buffer (normalized)
    fn ifft(&self, samples: &[IQSample]) -> IQBuffer;

    /// Draw `len` real Gaussian samples N(0, std²) from the caller's RNG
    ///
    /// Sequential in both implementations so that a seeded RNG produces
    /// identical streams regardless of backend.
    fn random_normal(&self, std: f64, len: usize, rng: &mut StdRng) -> Vec<f64>;
}

/// Select a backend implementation once at startup
pub fn select_backend(kind: BackendKind) -> Arc<dyn SampleBackend> {
    match kind {
        BackendKind::Cpu => Arc::new(CpuBackend),
        BackendKind::Rayon => Arc::new(RayonBackend),
    }
}

fn delay_shift(samples: &[IQSample], delay: usize) -> IQBuffer {
    let len = samples.len();
    if delay == 0 {
        return samples.to_vec();
    }
    let mut out = vec![Complex::new(0.0, 0.0); len];
    if delay < len {
        out[delay..].copy_from_slice(&samples[..len - delay]);
    }
    out
}

fn draw_normal(std: f64, len: usize, rng: &mut StdRng) -> Vec<f64> {
    if std <= 0.0 {
        return vec![0.0; len];
    }
    let dist = Normal::new(0.0, std).unwrap();
    (0..len).map(|_| dist.sample(rng)).collect()
}

/// Scalar CPU backend
#[derive(Debug, Clone, Copy)]
pub struct CpuBackend;

impl SampleBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn zeros(&self, len: usize) -> IQBuffer {
        vec![Complex::new(0.0, 0.0); len]
    }

    fn multiply(&self, a: &[IQSample], b: &[IQSample]) -> IQBuffer {
        debug_assert_eq!(a.len(), b.len());
        a.iter().zip(b.iter()).map(|(x, y)| x * y).collect()
    }

    fn scale(&self, samples: &[IQSample], factor: f64) -> IQBuffer {
        samples.iter().map(|&s| s * factor).collect()
    }

    fn delay(&self, samples: &[IQSample], delay: usize) -> IQBuffer {
        delay_shift(samples, delay)
    }

    fn fft(&self, samples: &[IQSample]) -> IQBuffer {
        if samples.is_empty() {
            return Vec::new();
        }
        FftProcessor::new(samples.len()).fft(samples)
    }

    fn ifft(&self, samples: &[IQSample]) -> IQBuffer {
        if samples.is_empty() {
            return Vec::new();
        }
        FftProcessor::new(samples.len()).ifft(samples)
    }

    fn random_normal(&self, std: f64, len: usize, rng: &mut StdRng) -> Vec<f64> {
        draw_normal(std, len, rng)
    }
}

/// Rayon data-parallel backend
///
/// Elementwise operations fan out across the thread pool; FFT and random
/// sampling stay sequential (rustfft is already vectorized, and parallel
/// draws would break seed reproducibility).
#[derive(Debug, Clone, Copy)]
pub struct RayonBackend;

impl SampleBackend for RayonBackend {
    fn name(&self) -> &'static str {
        "rayon"
    }

    fn zeros(&self, len: usize) -> IQBuffer {
        vec![Complex::new(0.0, 0.0); len]
    }

    fn multiply(&self, a: &[IQSample], b: &[IQSample]) -> IQBuffer {
        debug_assert_eq!(a.len(), b.len());
        a.par_iter().zip(b.par_iter()).map(|(x, y)| x * y).collect()
    }

    fn scale(&self, samples: &[IQSample], factor: f64) -> IQBuffer {
        samples.par_iter().map(|&s| s * factor).collect()
    }

    fn delay(&self, samples: &[IQSample], delay: usize) -> IQBuffer {
        delay_shift(samples, delay)
    }

    fn fft(&self, samples: &[IQSample]) -> IQBuffer {
        if samples.is_empty() {
            return Vec::new();
        }
        FftProcessor::new(samples.len()).fft(samples)
    }

    fn ifft(&self, samples: &[IQSample]) -> IQBuffer {
        if samples.is_empty() {
            return Vec::new();
        }
        FftProcessor::new(samples.len()).ifft(samples)
    }

    fn random_normal(&self, std: f64, len: usize, rng: &mut StdRng) -> Vec<f64> {
        draw_normal(std, len, rng)
    }
}
