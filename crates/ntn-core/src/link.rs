//! Link math: path loss, thermal noise, and dB conversions
//!
//! Closed-form RF arithmetic shared by the channel emulator and the
//! simulated radios. All functions are pure; stateful modeling (fading,
//! Doppler evolution) lives in `ntn-sim`.

use crate::types::IQSample;

/// Speed of light in m/s
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Boltzmann constant in J/K
pub const BOLTZMANN: f64 = 1.380_649e-23;

/// Standard noise reference temperature in kelvin
pub const T0_KELVIN: f64 = 290.0;

/// Free-space path loss in dB given distance and frequency
///
/// FSPL = 20·log10(d) + 20·log10(f) + 20·log10(4π/c)
pub fn fspl_db(distance_m: f64, frequency_hz: f64) -> f64 {
    if distance_m <= 0.0 || frequency_hz <= 0.0 {
        return 0.0;
    }
    20.0 * (4.0 * std::f64::consts::PI * distance_m * frequency_hz / SPEED_OF_LIGHT).log10()
}

/// Thermal noise power in watts over a bandwidth, for a given noise figure
///
/// N = k·T0·B·F with F the linear noise figure.
pub fn thermal_noise_power(bandwidth_hz: f64, noise_figure_db: f64) -> f64 {
    BOLTZMANN * T0_KELVIN * bandwidth_hz * db_to_linear_power(noise_figure_db)
}

/// Convert a dB power ratio to linear
#[inline]
pub fn db_to_linear_power(db: f64) -> f64 {
    10.0_f64.powf(db / 10.0)
}

/// Convert a dB value to a linear amplitude (voltage) ratio
#[inline]
pub fn db_to_linear_amplitude(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert a linear power ratio to dB
#[inline]
pub fn linear_power_to_db(linear: f64) -> f64 {
    10.0 * (linear + 1e-30).log10()
}

/// Mean power of a buffer expressed in dBm (1.0 = 0 dBW reference)
pub fn power_dbm(samples: &[IQSample]) -> f64 {
    let mean: f64 = if samples.is_empty() {
        0.0
    } else {
        samples.iter().map(|s| s.norm_sqr()).sum::<f64>() / samples.len() as f64
    };
    10.0 * (mean + 1e-10).log10() + 30.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Complex;

    #[test]
    fn test_fspl_geo_l_band() {
        // 35,786 km at 1.5 GHz is the canonical GEO figure
        let loss = fspl_db(35_786_000.0, 1.5e9);
        assert!((loss - 187.05).abs() < 0.5, "FSPL = {loss} dB");
    }

    #[test]
    fn test_fspl_haps() {
        // 30 km at 2 GHz
        let loss = fspl_db(30_000.0, 2.0e9);
        assert!((loss - 128.0).abs() < 0.5, "FSPL = {loss} dB");
    }

    #[test]
    fn test_fspl_degenerate_inputs() {
        assert_eq!(fspl_db(0.0, 1e9), 0.0);
        assert_eq!(fspl_db(1000.0, 0.0), 0.0);
    }

    #[test]
    fn test_thermal_noise_power() {
        // kTB at 30.72 MHz with 5 dB NF: ~3.9e-13 W
        let p = thermal_noise_power(30.72e6, 5.0);
        assert!(p > 1e-13 && p < 1e-12, "noise power = {p}");
    }

    #[test]
    fn test_db_roundtrip() {
        let lin = db_to_linear_power(13.0);
        assert!((linear_power_to_db(lin) - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_power_dbm_unit_tone() {
        let samples = vec![Complex::new(1.0, 0.0); 1000];
        // Unit power = 0 dBW = 30 dBm
        assert!((power_dbm(&samples) - 30.0).abs() < 1e-6);
    }
}
