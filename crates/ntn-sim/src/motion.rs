//! Platform motion models
//!
//! Drives the time evolution of a channel's Doppler state. Each orbit
//! class maps to one closed motion variant, chosen once at channel
//! construction: quasi-static platforms (GEO, HAPS) random-walk within a
//! clamp, orbiting platforms (LEO, MEO) follow a sinusoidal Doppler
//! profile that is a pure function of elapsed time.

use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::channel::{OrbitClass, SatelliteState};

/// LEO orbital period (~90 minutes)
pub const LEO_ORBITAL_PERIOD_S: f64 = 90.0 * 60.0;
/// MEO orbital period (~6 hours)
pub const MEO_ORBITAL_PERIOD_S: f64 = 6.0 * 3600.0;
/// Peak LEO Doppler at a 2 GHz carrier
pub const LEO_MAX_DOPPLER_HZ: f64 = 37_500.0;
/// Peak MEO Doppler
pub const MEO_MAX_DOPPLER_HZ: f64 = 15_000.0;

/// Doppler evolution law for one platform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MotionModel {
    /// Bounded Gaussian random walk (quasi-static platforms)
    RandomWalk {
        /// Per-update step standard deviation in Hz
        step_std_hz: f64,
        /// Doppler excursion limit in Hz
        clamp_hz: f64,
    },
    /// Sinusoidal Doppler over one orbital pass
    Sinusoidal {
        /// Orbital period in seconds
        period_s: f64,
        /// Peak Doppler amplitude in Hz
        max_doppler_hz: f64,
    },
}

impl MotionModel {
    /// Select the motion law for an orbit class
    pub fn for_orbit(orbit: OrbitClass) -> Self {
        match orbit {
            OrbitClass::Geo => MotionModel::RandomWalk {
                step_std_hz: 0.5,
                clamp_hz: 20.0,
            },
            OrbitClass::Haps => MotionModel::RandomWalk {
                step_std_hz: 0.1,
                clamp_hz: 5.0,
            },
            OrbitClass::Leo => MotionModel::Sinusoidal {
                period_s: LEO_ORBITAL_PERIOD_S,
                max_doppler_hz: LEO_MAX_DOPPLER_HZ,
            },
            OrbitClass::Meo => MotionModel::Sinusoidal {
                period_s: MEO_ORBITAL_PERIOD_S,
                max_doppler_hz: MEO_MAX_DOPPLER_HZ,
            },
        }
    }

    /// Advance the platform's Doppler state to `elapsed_s` seconds.
    ///
    /// The only mutator of `SatelliteState::doppler_hz`. Returns the
    /// instantaneous Doppler rate in Hz/s (zero for random-walk
    /// platforms). Sinusoidal variants are pure in `elapsed_s`; random
    /// walks integrate one clamped step per call from the channel's RNG.
    pub fn update(&self, state: &mut SatelliteState, elapsed_s: f64, rng: &mut StdRng) -> f64 {
        match *self {
            MotionModel::RandomWalk {
                step_std_hz,
                clamp_hz,
            } => {
                let step = Normal::new(0.0, step_std_hz).unwrap().sample(rng);
                state.doppler_hz = (state.doppler_hz + step).clamp(-clamp_hz, clamp_hz);
                0.0
            }
            MotionModel::Sinusoidal {
                period_s,
                max_doppler_hz,
            } => {
                let phase = (elapsed_s / period_s) * 2.0 * PI;
                state.doppler_hz = max_doppler_hz * phase.sin();
                max_doppler_hz * (2.0 * PI / period_s) * phase.cos()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn test_state() -> SatelliteState {
        SatelliteState {
            latitude_deg: 0.0,
            longitude_deg: 0.0,
            altitude_km: 600.0,
            velocity_ms: 7500.0,
            elevation_deg: 45.0,
            azimuth_deg: 180.0,
            doppler_hz: 0.0,
        }
    }

    #[test]
    fn test_leo_quarter_period_hits_peak() {
        let model = MotionModel::for_orbit(OrbitClass::Leo);
        let mut state = test_state();
        let mut rng = StdRng::seed_from_u64(0);

        model.update(&mut state, LEO_ORBITAL_PERIOD_S / 4.0, &mut rng);

        let err = (state.doppler_hz.abs() - LEO_MAX_DOPPLER_HZ).abs() / LEO_MAX_DOPPLER_HZ;
        assert!(err < 0.05, "doppler = {} Hz", state.doppler_hz);
    }

    #[test]
    fn test_leo_rate_is_derivative() {
        let model = MotionModel::for_orbit(OrbitClass::Leo);
        let mut state = test_state();
        let mut rng = StdRng::seed_from_u64(0);

        // At t=0 the rate is maximal, at quarter period it crosses zero
        let rate_start = model.update(&mut state, 0.0, &mut rng);
        let rate_quarter = model.update(&mut state, LEO_ORBITAL_PERIOD_S / 4.0, &mut rng);
        assert!(rate_start > 0.0);
        assert!(rate_quarter.abs() < rate_start * 0.01);
    }

    #[test]
    fn test_sinusoidal_reproducible() {
        let model = MotionModel::for_orbit(OrbitClass::Meo);
        let mut a = test_state();
        let mut b = test_state();
        let mut rng = StdRng::seed_from_u64(0);

        model.update(&mut a, 1234.5, &mut rng);
        model.update(&mut b, 1234.5, &mut rng);
        assert_eq!(a.doppler_hz, b.doppler_hz);
    }

    #[test]
    fn test_geo_walk_stays_clamped() {
        let model = MotionModel::for_orbit(OrbitClass::Geo);
        let mut state = test_state();
        let mut rng = StdRng::seed_from_u64(99);

        for i in 0..10_000 {
            model.update(&mut state, i as f64, &mut rng);
            assert!(
                state.doppler_hz.abs() <= 20.0,
                "walk escaped clamp: {}",
                state.doppler_hz
            );
        }
    }

    #[test]
    fn test_haps_walk_stays_clamped() {
        let model = MotionModel::for_orbit(OrbitClass::Haps);
        let mut state = test_state();
        let mut rng = StdRng::seed_from_u64(7);

        for i in 0..10_000 {
            model.update(&mut state, i as f64, &mut rng);
            assert!(state.doppler_hz.abs() <= 5.0);
        }
    }

    #[test]
    fn test_walk_rate_is_zero() {
        let model = MotionModel::for_orbit(OrbitClass::Geo);
        let mut state = test_state();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(model.update(&mut state, 10.0, &mut rng), 0.0);
    }
}
