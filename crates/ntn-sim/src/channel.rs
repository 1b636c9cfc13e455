//! NTN channel emulator
//!
//! Software replacement for hardware channel emulator boxes. Models the
//! propagation path between a ground station and a satellite or HAPS
//! platform: free-space and atmospheric loss, rain attenuation,
//! propagation delay, tap-delay-line multipath, Doppler shift, and
//! thermal noise.
//!
//! ## Usage
//!
//! ```rust
//! use ntn_core::backend::{select_backend, BackendKind};
//! use ntn_core::types::Complex;
//! use ntn_sim::channel::{ChannelConfig, NtnChannel};
//!
//! let backend = select_backend(BackendKind::Cpu);
//! let mut channel = NtnChannel::with_seed(ChannelConfig::awgn_only(), backend, 42).unwrap();
//!
//! let tx: Vec<Complex> = vec![Complex::new(1.0, 0.0); 1000];
//! let rx = channel.apply_channel(&tx);
//! assert_eq!(rx.len(), 1000);
//! ```

use ntn_core::backend::SampleBackend;
use ntn_core::link::{self, SPEED_OF_LIGHT};
use ntn_core::types::{complex_ops, IQBuffer, IQSample};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal, Uniform};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{SimError, SimResult};
use crate::motion::MotionModel;

/// Satellite/platform orbit classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrbitClass {
    /// Geostationary (35,786 km)
    Geo,
    /// Low Earth Orbit (600-1200 km)
    Leo,
    /// Medium Earth Orbit (8,000-20,000 km)
    Meo,
    /// High Altitude Platform Station (20-50 km)
    Haps,
}

impl FromStr for OrbitClass {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "geo" => Ok(OrbitClass::Geo),
            "leo" => Ok(OrbitClass::Leo),
            "meo" => Ok(OrbitClass::Meo),
            "haps" => Ok(OrbitClass::Haps),
            other => Err(SimError::UnknownOrbitClass(other.to_string())),
        }
    }
}

/// 3GPP-style NTN channel models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelModel {
    /// AWGN only, no multipath
    Awgn,
    /// Tap Delay Line A (sparse)
    TdlA,
    /// Tap Delay Line B (moderate)
    TdlB,
    /// Tap Delay Line C (dense)
    TdlC,
    /// Tap Delay Line D, paired with Doppler
    TdlD,
    /// Tap Delay Line E, paired with strong Doppler
    TdlE,
}

impl FromStr for ChannelModel {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "awgn" => Ok(ChannelModel::Awgn),
            "tdl_a" => Ok(ChannelModel::TdlA),
            "tdl_b" => Ok(ChannelModel::TdlB),
            "tdl_c" => Ok(ChannelModel::TdlC),
            "tdl_d" => Ok(ChannelModel::TdlD),
            "tdl_e" => Ok(ChannelModel::TdlE),
            other => Err(SimError::UnknownChannelModel(other.to_string())),
        }
    }
}

/// Channel configuration, immutable after construction except through
/// the explicit mutators on [`NtnChannel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Orbit class of the platform
    pub orbit: OrbitClass,
    /// Multipath model
    pub model: ChannelModel,
    /// Carrier center frequency in Hz
    pub center_freq_hz: f64,
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Slant distance to the platform in km
    pub distance_km: f64,
    /// Elevation angle in degrees, [0, 90]
    pub elevation_deg: f64,
    /// Receiver noise figure in dB
    pub noise_figure_db: f64,
    /// Apply Doppler shift
    pub doppler: bool,
    /// Apply rain attenuation
    pub rain: bool,
    /// Apply atmospheric loss
    pub atmospheric_loss: bool,
    /// Scintillation toggle (reported but not applied)
    pub scintillation: bool,
    /// Add thermal noise
    pub thermal_noise: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            orbit: OrbitClass::Geo,
            model: ChannelModel::TdlA,
            center_freq_hz: 2.0e9,
            sample_rate: 30.72e6,
            distance_km: 35_786.0,
            elevation_deg: 45.0,
            noise_figure_db: 5.0,
            doppler: true,
            rain: true,
            atmospheric_loss: true,
            scintillation: false,
            thermal_noise: true,
        }
    }
}

impl ChannelConfig {
    /// GEO satellite link (35,786 km, sparse multipath)
    pub fn geo(elevation_deg: f64) -> Self {
        Self {
            orbit: OrbitClass::Geo,
            model: ChannelModel::TdlA,
            distance_km: 35_786.0,
            elevation_deg,
            ..Default::default()
        }
    }

    /// LEO satellite link (600-1200 km, strong time-varying Doppler)
    pub fn leo(altitude_km: f64) -> Self {
        Self {
            orbit: OrbitClass::Leo,
            model: ChannelModel::TdlD,
            distance_km: altitude_km,
            elevation_deg: 45.0,
            ..Default::default()
        }
    }

    /// MEO satellite link (8,000-20,000 km)
    pub fn meo(altitude_km: f64) -> Self {
        Self {
            orbit: OrbitClass::Meo,
            model: ChannelModel::TdlB,
            distance_km: altitude_km,
            elevation_deg: 45.0,
            ..Default::default()
        }
    }

    /// HAPS link (20-50 km, minimal multipath, negligible Doppler)
    pub fn haps(altitude_km: f64, elevation_deg: f64) -> Self {
        Self {
            orbit: OrbitClass::Haps,
            model: ChannelModel::Awgn,
            distance_km: altitude_km,
            elevation_deg,
            doppler: false,
            ..Default::default()
        }
    }

    /// Minimal AWGN-only channel for bench testing
    pub fn awgn_only() -> Self {
        Self {
            orbit: OrbitClass::Geo,
            model: ChannelModel::Awgn,
            distance_km: 1.0,
            doppler: false,
            rain: false,
            atmospheric_loss: false,
            ..Default::default()
        }
    }

    /// Check construction invariants
    pub fn validate(&self) -> SimResult<()> {
        if !(0.0..=90.0).contains(&self.elevation_deg) {
            return Err(SimError::InvalidElevation(self.elevation_deg));
        }
        if self.distance_km <= 0.0 {
            return Err(SimError::InvalidDistance(self.distance_km));
        }
        Ok(())
    }
}

/// Satellite position and velocity state
///
/// Created once per channel, mutated only by the motion model's update
/// and the elevation mutator. Latitude/longitude are placeholders for a
/// future ephemeris-driven model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteState {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
    pub velocity_ms: f64,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub doppler_hz: f64,
}

impl SatelliteState {
    fn init(config: &ChannelConfig, rng: &mut StdRng) -> Self {
        let (altitude_km, velocity_ms, doppler_std) = match config.orbit {
            // Stationary relative to ground, residual oscillator Doppler only
            OrbitClass::Geo => (35_786.0, 0.0, 15.0),
            OrbitClass::Leo => (600.0 + rng.gen_range(0.0..600.0), 7_500.0, 37_500.0),
            OrbitClass::Meo => (8_000.0 + rng.gen_range(0.0..12_000.0), 4_000.0, 15_000.0),
            OrbitClass::Haps => (20.0 + rng.gen_range(0.0..30.0), 50.0, 2.0),
        };

        Self {
            latitude_deg: 0.0,
            longitude_deg: 0.0,
            altitude_km,
            velocity_ms,
            elevation_deg: config.elevation_deg,
            azimuth_deg: 180.0,
            doppler_hz: Normal::new(0.0, doppler_std).unwrap().sample(rng),
        }
    }
}

/// One multipath tap: excess delay and linear gain
///
/// The tap set is fixed per channel model; the phase applied to each tap
/// is re-drawn on every `apply_channel` call to model time-varying fading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultipathTap {
    pub delay_s: f64,
    pub gain: f64,
}

impl MultipathTap {
    const fn new(delay_s: f64, gain: f64) -> Self {
        Self { delay_s, gain }
    }
}

/// Tap delays and gains per channel model, total tap power ~1
fn multipath_taps(model: ChannelModel) -> Vec<MultipathTap> {
    match model {
        ChannelModel::Awgn => vec![MultipathTap::new(0.0, 1.0)],
        ChannelModel::TdlA => vec![
            MultipathTap::new(0.0, 0.8),
            MultipathTap::new(50e-9, 0.15),
            MultipathTap::new(120e-9, 0.05),
        ],
        ChannelModel::TdlB => vec![
            MultipathTap::new(0.0, 0.7),
            MultipathTap::new(30e-9, 0.2),
            MultipathTap::new(80e-9, 0.07),
            MultipathTap::new(150e-9, 0.02),
            MultipathTap::new(300e-9, 0.01),
        ],
        ChannelModel::TdlC => vec![
            MultipathTap::new(0.0, 0.6),
            MultipathTap::new(20e-9, 0.25),
            MultipathTap::new(50e-9, 0.1),
            MultipathTap::new(100e-9, 0.03),
            MultipathTap::new(200e-9, 0.015),
            MultipathTap::new(400e-9, 0.004),
            MultipathTap::new(600e-9, 0.001),
        ],
        // D and E share one moderate set and rely on strong Doppler
        ChannelModel::TdlD | ChannelModel::TdlE => vec![
            MultipathTap::new(0.0, 0.75),
            MultipathTap::new(40e-9, 0.18),
            MultipathTap::new(100e-9, 0.05),
            MultipathTap::new(250e-9, 0.02),
        ],
    }
}

/// Read-only channel state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    pub orbit: OrbitClass,
    pub model: ChannelModel,
    pub distance_km: f64,
    pub path_loss_db: f64,
    /// One-way propagation delay
    pub propagation_delay_ms: f64,
    /// Round-trip time, 2x the one-way delay
    pub round_trip_ms: f64,
    pub doppler_shift_hz: f64,
    pub doppler_rate_hz_s: f64,
    pub rain_rate_mm_hr: f64,
    pub atmospheric_loss_db: f64,
    pub elevation_angle_deg: f64,
    pub multipath_taps: usize,
    pub backend: String,
}

/// Software channel emulator for one NTN link
pub struct NtnChannel {
    config: ChannelConfig,
    backend: Arc<dyn SampleBackend>,
    rng: StdRng,
    satellite: SatelliteState,
    motion: MotionModel,
    taps: Vec<MultipathTap>,
    path_loss_db: f64,
    propagation_delay_s: f64,
    atmospheric_loss_db: f64,
    rain_rate_mm_hr: f64,
    doppler_rate_hz_s: f64,
}

impl NtnChannel {
    /// Create a channel with entropy seeding
    pub fn new(config: ChannelConfig, backend: Arc<dyn SampleBackend>) -> SimResult<Self> {
        Self::build(config, backend, StdRng::from_entropy())
    }

    /// Create a channel with a fixed seed for reproducible runs
    pub fn with_seed(
        config: ChannelConfig,
        backend: Arc<dyn SampleBackend>,
        seed: u64,
    ) -> SimResult<Self> {
        Self::build(config, backend, StdRng::seed_from_u64(seed))
    }

    fn build(
        config: ChannelConfig,
        backend: Arc<dyn SampleBackend>,
        mut rng: StdRng,
    ) -> SimResult<Self> {
        config.validate()?;

        let satellite = SatelliteState::init(&config, &mut rng);
        let motion = MotionModel::for_orbit(config.orbit);
        let taps = multipath_taps(config.model);

        // Base rain rate with exponential jitter, overridable later
        let rain_rate_mm_hr = if config.rain {
            5.0 + Exp::new(0.5).unwrap().sample(&mut rng)
        } else {
            0.0
        };

        let mut channel = Self {
            propagation_delay_s: config.distance_km * 1000.0 / SPEED_OF_LIGHT,
            config,
            backend,
            rng,
            satellite,
            motion,
            taps,
            path_loss_db: 0.0,
            atmospheric_loss_db: 0.0,
            rain_rate_mm_hr,
            doppler_rate_hz_s: 0.0,
        };
        channel.recompute_path_loss();

        tracing::info!(
            orbit = ?channel.config.orbit,
            distance_km = channel.config.distance_km,
            path_loss_db = channel.path_loss_db,
            delay_ms = channel.propagation_delay_s * 1000.0,
            backend = channel.backend.name(),
            "channel emulator initialized"
        );

        Ok(channel)
    }

    /// Current configuration
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Current satellite state
    pub fn satellite(&self) -> &SatelliteState {
        &self.satellite
    }

    /// Total static path loss in dB
    pub fn path_loss_db(&self) -> f64 {
        self.path_loss_db
    }

    /// One-way propagation delay in seconds
    pub fn propagation_delay_s(&self) -> f64 {
        self.propagation_delay_s
    }

    /// Recompute path loss from distance, frequency, elevation, and rain
    fn recompute_path_loss(&mut self) {
        let mut loss =
            link::fspl_db(self.config.distance_km * 1000.0, self.config.center_freq_hz);

        if self.config.atmospheric_loss {
            // ITU-R P.676 elevation-scaled approximation
            let elevation_rad = self.satellite.elevation_deg.to_radians();
            let atm = 0.2 / elevation_rad.sin();
            self.atmospheric_loss_db = atm;
            loss += atm;
        } else {
            self.atmospheric_loss_db = 0.0;
        }

        if self.config.rain {
            loss += self.rain_attenuation_db();
        }

        self.path_loss_db = loss;
    }

    /// ITU-R P.838 power-law rain attenuation over an elevation-scaled
    /// effective path (rain height ~3 km)
    fn rain_attenuation_db(&self) -> f64 {
        let freq_ghz = self.config.center_freq_hz / 1e9;
        let k = 0.0000387 * freq_ghz.powf(2.03);
        let alpha = 0.958 * freq_ghz.powf(-0.195);

        let gamma_db_per_km = k * self.rain_rate_mm_hr.powf(alpha);
        let elevation_rad = self.satellite.elevation_deg.to_radians();
        let path_length_km = 3.0 / elevation_rad.sin();

        gamma_db_per_km * path_length_km
    }

    /// Apply the full channel transform to a buffer of TX samples.
    ///
    /// Consumes the input by value semantics (a fresh output buffer is
    /// produced at every stage). A buffer shorter than the propagation
    /// delay comes out fully zeroed; that is the documented edge case,
    /// not an error.
    pub fn apply_channel(&mut self, tx_samples: &[IQSample]) -> IQBuffer {
        if tx_samples.is_empty() {
            return Vec::new();
        }

        // 1. Path loss as linear amplitude scaling
        let path_loss_linear = 10.0_f64.powf(-self.path_loss_db / 20.0);
        let mut samples = self.backend.scale(tx_samples, path_loss_linear);

        // 2. Propagation delay
        let delay_samples =
            (self.propagation_delay_s * self.config.sample_rate).round() as usize;
        samples = self.backend.delay(&samples, delay_samples);

        // 3. Multipath fading
        samples = self.apply_multipath(&samples);

        // 4. Doppler shift
        if self.config.doppler {
            samples = self.apply_doppler(&samples);
        }

        // 5. Thermal noise
        if self.config.thermal_noise {
            samples = self.add_noise(&samples);
        }

        samples
    }

    fn apply_multipath(&mut self, samples: &[IQSample]) -> IQBuffer {
        // Single zero-delay tap: no multipath
        if self.taps.len() == 1 && self.taps[0].delay_s == 0.0 {
            return samples.to_vec();
        }

        let phase_dist = Uniform::new(0.0, 2.0 * PI);
        let mut output = self.backend.zeros(samples.len());

        for tap in &self.taps {
            let delay_samples = (tap.delay_s * self.config.sample_rate).round() as usize;

            // Fresh phase per tap per application: time-varying fading
            let phase = phase_dist.sample(&mut self.rng);
            let complex_gain = complex_ops::from_polar(tap.gain, phase);

            let delayed = self.backend.delay(samples, delay_samples);
            for (out, &s) in output.iter_mut().zip(delayed.iter()) {
                *out += s * complex_gain;
            }
        }

        output
    }

    fn apply_doppler(&mut self, samples: &[IQSample]) -> IQBuffer {
        let doppler_hz = self.satellite.doppler_hz;
        if doppler_hz.abs() < 0.1 {
            return samples.to_vec();
        }

        let rotation: IQBuffer = (0..samples.len())
            .map(|n| complex_ops::cis(doppler_hz, n, self.config.sample_rate))
            .collect();
        self.backend.multiply(samples, &rotation)
    }

    fn add_noise(&mut self, samples: &[IQSample]) -> IQBuffer {
        let noise_power =
            link::thermal_noise_power(self.config.sample_rate, self.config.noise_figure_db);
        let noise_std = (noise_power / 2.0).sqrt();

        let noise_i = self
            .backend
            .random_normal(noise_std, samples.len(), &mut self.rng);
        let noise_q = self
            .backend
            .random_normal(noise_std, samples.len(), &mut self.rng);

        samples
            .iter()
            .zip(noise_i.iter().zip(noise_q.iter()))
            .map(|(&s, (&i, &q))| s + IQSample::new(i, q))
            .collect()
    }

    /// Set the rain rate and recompute path loss.
    ///
    /// Range checking happens at the engine boundary; the channel itself
    /// treats a negative rate as a caller contract violation.
    pub fn set_rain_rate(&mut self, rain_rate_mm_hr: f64) {
        self.rain_rate_mm_hr = rain_rate_mm_hr;
        self.recompute_path_loss();
        tracing::info!(
            rain_rate_mm_hr,
            path_loss_db = self.path_loss_db,
            "rain rate updated"
        );
    }

    /// Set the elevation angle and recompute path loss.
    ///
    /// Range checking happens at the engine boundary.
    pub fn set_elevation_angle(&mut self, elevation_deg: f64) {
        self.satellite.elevation_deg = elevation_deg;
        self.config.elevation_deg = elevation_deg;
        self.recompute_path_loss();
        tracing::info!(
            elevation_deg,
            path_loss_db = self.path_loss_db,
            "elevation updated"
        );
    }

    /// Advance the platform motion to `elapsed_s` seconds since loop start
    /// and refresh the derived loss/delay figures.
    pub fn update_platform(&mut self, elapsed_s: f64) {
        self.doppler_rate_hz_s = self
            .motion
            .update(&mut self.satellite, elapsed_s, &mut self.rng);
        self.propagation_delay_s = self.config.distance_km * 1000.0 / SPEED_OF_LIGHT;
        self.recompute_path_loss();
    }

    /// Produce a read-only state snapshot
    pub fn state(&self) -> ChannelState {
        ChannelState {
            orbit: self.config.orbit,
            model: self.config.model,
            distance_km: self.config.distance_km,
            path_loss_db: self.path_loss_db,
            propagation_delay_ms: self.propagation_delay_s * 1000.0,
            round_trip_ms: self.propagation_delay_s * 2000.0,
            doppler_shift_hz: self.satellite.doppler_hz,
            doppler_rate_hz_s: self.doppler_rate_hz_s,
            rain_rate_mm_hr: self.rain_rate_mm_hr,
            atmospheric_loss_db: self.atmospheric_loss_db,
            elevation_angle_deg: self.satellite.elevation_deg,
            multipath_taps: self.taps.len(),
            backend: self.backend.name().to_string(),
        }
    }
}
