//! Simulated radio device configuration
//!
//! Configuration, impairment profile, and report types for the software
//! USRP stand-ins. The behavior (TX/RX chains, loopback, calibration)
//! lives in [`crate::radio`].

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::SimError;

/// Simulated device family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// High-end networked SDR
    X310,
    /// Bus-powered portable SDR
    B210,
}

impl FromStr for DeviceClass {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x310" => Ok(DeviceClass::X310),
            "b210" => Ok(DeviceClass::B210),
            other => Err(SimError::UnknownDeviceClass(other.to_string())),
        }
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::X310 => write!(f, "x310"),
            DeviceClass::B210 => write!(f, "b210"),
        }
    }
}

/// Which gain stage a gain update applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GainDirection {
    Tx,
    Rx,
    #[default]
    Both,
}

/// Radio configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioConfig {
    /// Center frequency in Hz
    pub center_freq_hz: f64,
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Analog bandwidth in Hz
    pub bandwidth_hz: f64,
    /// Transmit gain in dB
    pub tx_gain_db: f64,
    /// Receive gain in dB
    pub rx_gain_db: f64,
    /// Device family
    pub device_class: DeviceClass,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self::x310()
    }
}

impl RadioConfig {
    /// X310 preset
    pub fn x310() -> Self {
        Self {
            center_freq_hz: 1.8e9,
            sample_rate: 30.72e6,
            bandwidth_hz: 30.0e6,
            tx_gain_db: 20.0,
            rx_gain_db: 30.0,
            device_class: DeviceClass::X310,
        }
    }

    /// B210 preset
    pub fn b210() -> Self {
        Self {
            center_freq_hz: 1.8e9,
            sample_rate: 30.72e6,
            bandwidth_hz: 30.0e6,
            tx_gain_db: 0.0,
            rx_gain_db: 40.0,
            device_class: DeviceClass::B210,
        }
    }

    /// Preset for a device class
    pub fn for_class(class: DeviceClass) -> Self {
        match class {
            DeviceClass::X310 => Self::x310(),
            DeviceClass::B210 => Self::b210(),
        }
    }
}

/// Fixed-per-device analog non-idealities
///
/// Drawn once at device construction from the device's own RNG; the only
/// later mutations are the explicit calibration operations, which
/// overwrite fields with corrective estimates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpairmentProfile {
    /// DC offset on the in-phase rail
    pub dc_offset_i: f64,
    /// DC offset on the quadrature rail
    pub dc_offset_q: f64,
    /// I-rail gain relative to Q (1.0 = balanced)
    pub iq_gain_imbalance: f64,
    /// Per-sample phase noise standard deviation in radians
    pub phase_noise_std: f64,
    /// Uncorrected carrier frequency offset in Hz
    pub frequency_offset_hz: f64,
}

impl ImpairmentProfile {
    /// Draw one device's impairments
    pub fn draw(rng: &mut StdRng) -> Self {
        Self {
            dc_offset_i: Normal::new(0.0, 0.01).unwrap().sample(rng),
            dc_offset_q: Normal::new(0.0, 0.01).unwrap().sample(rng),
            iq_gain_imbalance: Normal::new(1.0, 0.02).unwrap().sample(rng),
            phase_noise_std: 0.01,
            frequency_offset_hz: Normal::new(0.0, 50.0).unwrap().sample(rng),
        }
    }

    /// A perfect radio, useful as a test fixture
    pub fn ideal() -> Self {
        Self {
            dc_offset_i: 0.0,
            dc_offset_q: 0.0,
            iq_gain_imbalance: 1.0,
            phase_noise_std: 0.0,
            frequency_offset_hz: 0.0,
        }
    }
}

/// Device summary for observability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_class: DeviceClass,
    pub mode: String,
    pub center_freq_hz: f64,
    pub sample_rate: f64,
    pub bandwidth_hz: f64,
    pub tx_gain_db: f64,
    pub rx_gain_db: f64,
    pub impairments: ImpairmentProfile,
}

/// DC-offset calibration result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcCalibration {
    /// Measured mean on the I rail
    pub measured_dc_i: f64,
    /// Measured mean on the Q rail
    pub measured_dc_q: f64,
    pub corrected: bool,
}

/// IQ-imbalance calibration result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqCalibration {
    /// Signal-to-image power ratio observed through loopback
    pub image_rejection_db: f64,
    /// True when the imbalance was reset to unity
    pub corrected: bool,
}
