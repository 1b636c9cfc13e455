//! End-to-end link testbed
//!
//! Composes one full transmit → channel → receive cycle out of two
//! simulated radios and a channel emulator, and reports measured versus
//! expected figures so waveform tests can verify the link budget without
//! instruments.

use ntn_core::link;
use ntn_core::types::{IQBuffer, IQSample};
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelState, NtnChannel};
use crate::radio::SoftwareRadio;

/// Measured results of one transmit/propagate/receive cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub num_samples: usize,
    /// Power into the channel (after the TX impairment chain) in dBm
    pub tx_power_dbm: f64,
    /// Power out of the channel (before the RX impairment chain) in dBm
    pub rx_power_dbm: f64,
    /// Loss observed across the channel
    pub measured_loss_db: f64,
    /// Static loss the channel was configured to apply
    pub expected_loss_db: f64,
    pub delay_ms: f64,
    pub doppler_hz: f64,
    pub channel: ChannelState,
}

/// One TX radio, one channel, one RX radio
pub struct LinkTestbed {
    tx: SoftwareRadio,
    rx: SoftwareRadio,
    channel: NtnChannel,
}

impl LinkTestbed {
    pub fn new(tx: SoftwareRadio, rx: SoftwareRadio, channel: NtnChannel) -> Self {
        Self { tx, rx, channel }
    }

    /// Run one cycle: TX impairments → channel → RX impairments.
    ///
    /// Loss is measured at the channel boundary (TX-chain output against
    /// channel output) so radio gains do not pollute the comparison with
    /// the configured path loss.
    pub fn run_cycle(&mut self, samples: &[IQSample]) -> (IQBuffer, CycleReport) {
        let impaired = self.tx.apply_tx_chain(samples);
        let propagated = self.channel.apply_channel(&impaired);
        let received = self.rx.apply_rx_chain(&propagated);

        let tx_power_dbm = link::power_dbm(&impaired);
        let rx_power_dbm = link::power_dbm(&propagated);
        let state = self.channel.state();

        let report = CycleReport {
            num_samples: received.len(),
            tx_power_dbm,
            rx_power_dbm,
            measured_loss_db: tx_power_dbm - rx_power_dbm,
            expected_loss_db: state.path_loss_db,
            delay_ms: state.propagation_delay_ms,
            doppler_hz: state.doppler_shift_hz,
            channel: state,
        };

        tracing::debug!(
            measured_loss_db = report.measured_loss_db,
            expected_loss_db = report.expected_loss_db,
            "link cycle complete"
        );

        (received, report)
    }

    /// Transmit-side radio
    pub fn tx(&mut self) -> &mut SoftwareRadio {
        &mut self.tx
    }

    /// Receive-side radio
    pub fn rx(&mut self) -> &mut SoftwareRadio {
        &mut self.rx
    }

    /// The channel between them
    pub fn channel_mut(&mut self) -> &mut NtnChannel {
        &mut self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelConfig, ChannelModel, OrbitClass};
    use crate::device::{ImpairmentProfile, RadioConfig};
    use crate::waveform;
    use ntn_core::backend::{select_backend, BackendKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Radio with no gain and no impairments: a transparent chain
    fn transparent_radio(sample_rate: f64, seed: u64) -> SoftwareRadio {
        let mut config = RadioConfig::x310();
        config.tx_gain_db = 0.0;
        config.rx_gain_db = 0.0;
        config.sample_rate = sample_rate;
        SoftwareRadio::with_profile(config, ImpairmentProfile::ideal(), seed)
    }

    #[test]
    fn test_geo_scenario_link_budget() {
        // 35,786 km GEO at 1.5 GHz, AWGN-only, every stochastic effect off
        let config = ChannelConfig {
            orbit: OrbitClass::Geo,
            model: ChannelModel::Awgn,
            center_freq_hz: 1.5e9,
            sample_rate: 1.0e4,
            distance_km: 35_786.0,
            elevation_deg: 45.0,
            noise_figure_db: 5.0,
            doppler: false,
            rain: false,
            atmospheric_loss: false,
            scintillation: false,
            thermal_noise: false,
        };
        let backend = select_backend(BackendKind::Cpu);
        let channel = NtnChannel::with_seed(config, backend, 1).unwrap();

        let mut testbed = LinkTestbed::new(
            transparent_radio(1.0e4, 2),
            transparent_radio(1.0e4, 3),
            channel,
        );

        // Long enough that the ~1194-sample delay head is negligible
        let tx_signal = vec![IQSample::new(1.0, 0.0); 120_000];
        let (rx_signal, report) = testbed.run_cycle(&tx_signal);

        assert_eq!(rx_signal.len(), 120_000);
        assert!(
            (report.measured_loss_db - 187.1).abs() < 0.5,
            "measured loss = {} dB",
            report.measured_loss_db
        );
        assert!(
            (report.delay_ms - 119.4).abs() < 0.2,
            "delay = {} ms",
            report.delay_ms
        );
        // One-way delay, with the round trip reported alongside
        assert!((report.channel.round_trip_ms - 2.0 * report.delay_ms).abs() < 1e-9);
    }

    #[test]
    fn test_haps_scenario_delay_and_loss() {
        // 30 km HAPS at 60° elevation, 2 GHz
        let mut config = ChannelConfig::haps(30.0, 60.0);
        config.thermal_noise = false;
        config.rain = false;
        config.sample_rate = 1.0e6;
        let backend = select_backend(BackendKind::Cpu);
        let channel = NtnChannel::with_seed(config, backend, 4).unwrap();

        let mut testbed = LinkTestbed::new(
            transparent_radio(1.0e6, 5),
            transparent_radio(1.0e6, 6),
            channel,
        );

        let tx_signal = vec![IQSample::new(0.7, 0.0); 100_000];
        let (_, report) = testbed.run_cycle(&tx_signal);

        // Delay is ~100 µs, loss dominated by the ~128 dB free-space term
        assert!(
            report.delay_ms > 0.01 && report.delay_ms < 1.0,
            "delay = {} ms",
            report.delay_ms
        );
        assert!(
            (report.measured_loss_db - 128.0).abs() < 1.5,
            "loss = {} dB",
            report.measured_loss_db
        );
    }

    #[test]
    fn test_cycle_with_impaired_radios_keeps_length() {
        let mut config = ChannelConfig::leo(600.0);
        config.sample_rate = 1.0e6;
        let backend = select_backend(BackendKind::Cpu);
        let channel = NtnChannel::with_seed(config, backend, 7).unwrap();

        let mut radio_config = RadioConfig::x310();
        radio_config.sample_rate = 1.0e6;
        let mut testbed = LinkTestbed::new(
            SoftwareRadio::with_seed(radio_config.clone(), 8),
            SoftwareRadio::with_seed(radio_config, 9),
            channel,
        );

        let mut rng = StdRng::seed_from_u64(10);
        let tx_signal = waveform::ofdm_signal(256, 4096, &mut rng);
        let (rx_signal, report) = testbed.run_cycle(&tx_signal);

        assert_eq!(rx_signal.len(), 4096);
        assert_eq!(report.num_samples, 4096);
        assert_eq!(report.channel.multipath_taps, 4);
    }
}
