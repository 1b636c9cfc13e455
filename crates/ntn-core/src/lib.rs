//! # ntn-core
//!
//! Backend-agnostic numeric foundation for the NTN software testbed:
//! complex I/Q sample types, interchangeable sample-array backends,
//! FFT utilities, closed-form link math, and logging setup.
//!
//! The simulation engine itself (channel emulation, platform motion,
//! hardware impairments) lives in the `ntn-sim` crate and is written
//! entirely against the types and traits defined here.

pub mod backend;
pub mod fft_utils;
pub mod link;
pub mod observe;
pub mod types;

pub use backend::{select_backend, BackendKind, SampleBackend};
pub use fft_utils::{fft_frequencies, FftProcessor};
pub use types::{Complex, IQBuffer, IQSample};
