//! Simulation engine facade
//!
//! Owns every live channel and device behind opaque handles and exposes
//! the operations the remote-dispatch layer maps onto named commands.
//! All validation happens here, at the call boundary: out-of-range
//! elevation, negative rain rate, and stale handles come back as typed
//! errors and never mutate state.
//!
//! Each channel can run one motion-update loop: a background thread that
//! periodically advances the platform state and recomputes the derived
//! loss/delay figures. Cancellation is cooperative (a stop flag checked
//! between ticks), so the channel is always left with a complete
//! last-computed state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use ntn_core::backend::{select_backend, BackendKind, SampleBackend};
use ntn_core::types::{IQBuffer, IQSample};
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelConfig, ChannelState, NtnChannel};
use crate::device::{
    DcCalibration, DeviceClass, DeviceInfo, GainDirection, IqCalibration, RadioConfig,
};
use crate::error::{SimError, SimResult};
use crate::radio::SoftwareRadio;

/// Opaque identifier of a live channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelHandle(u64);

/// Opaque identifier of a live device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceHandle(u64);

struct MotionLoop {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

struct ChannelEntry {
    channel: Arc<Mutex<NtnChannel>>,
    motion: Option<MotionLoop>,
}

/// Registry of simulated channels and radios
pub struct Engine {
    backend: Arc<dyn SampleBackend>,
    channels: HashMap<u64, ChannelEntry>,
    devices: HashMap<u64, SoftwareRadio>,
    next_channel_id: u64,
    next_device_id: u64,
}

impl Engine {
    /// Create an engine on the given backend (selected once, used by
    /// every channel created afterwards)
    pub fn new(kind: BackendKind) -> Self {
        let backend = select_backend(kind);
        tracing::info!(backend = backend.name(), "simulation engine started");
        Self {
            backend,
            channels: HashMap::new(),
            devices: HashMap::new(),
            next_channel_id: 0,
            next_device_id: 0,
        }
    }

    /// Name of the sample backend in use
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // ---- channels -------------------------------------------------------

    /// Create a channel from a validated configuration
    pub fn create_channel(&mut self, config: ChannelConfig) -> SimResult<ChannelHandle> {
        let channel = NtnChannel::new(config, Arc::clone(&self.backend))?;
        Ok(self.insert_channel(channel))
    }

    /// Create a channel with a fixed RNG seed (reproducible runs)
    pub fn create_channel_seeded(
        &mut self,
        config: ChannelConfig,
        seed: u64,
    ) -> SimResult<ChannelHandle> {
        let channel = NtnChannel::with_seed(config, Arc::clone(&self.backend), seed)?;
        Ok(self.insert_channel(channel))
    }

    fn insert_channel(&mut self, channel: NtnChannel) -> ChannelHandle {
        let id = self.next_channel_id;
        self.next_channel_id += 1;
        self.channels.insert(
            id,
            ChannelEntry {
                channel: Arc::new(Mutex::new(channel)),
                motion: None,
            },
        );
        ChannelHandle(id)
    }

    /// Tear down a channel, stopping its motion loop if one is running
    pub fn delete_channel(&mut self, handle: ChannelHandle) -> SimResult<()> {
        let mut entry = self
            .channels
            .remove(&handle.0)
            .ok_or(SimError::ChannelNotFound(handle.0))?;
        if let Some(motion) = entry.motion.take() {
            stop_loop(handle.0, motion);
        }
        Ok(())
    }

    /// Handles of all live channels
    pub fn list_channels(&self) -> Vec<ChannelHandle> {
        let mut ids: Vec<u64> = self.channels.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(ChannelHandle).collect()
    }

    fn channel(&self, handle: ChannelHandle) -> SimResult<&Arc<Mutex<NtnChannel>>> {
        self.channels
            .get(&handle.0)
            .map(|entry| &entry.channel)
            .ok_or(SimError::ChannelNotFound(handle.0))
    }

    /// Run a buffer through a channel
    pub fn apply_channel(
        &self,
        handle: ChannelHandle,
        tx_samples: &[IQSample],
    ) -> SimResult<IQBuffer> {
        let channel = self.channel(handle)?;
        Ok(channel.lock().unwrap().apply_channel(tx_samples))
    }

    /// Set a channel's rain rate; negative rates fail validation
    pub fn set_rain_rate(&self, handle: ChannelHandle, rain_rate_mm_hr: f64) -> SimResult<()> {
        if rain_rate_mm_hr < 0.0 {
            return Err(SimError::InvalidRainRate(rain_rate_mm_hr));
        }
        let channel = self.channel(handle)?;
        channel.lock().unwrap().set_rain_rate(rain_rate_mm_hr);
        Ok(())
    }

    /// Set a channel's elevation angle; values outside [0, 90] fail
    /// validation and leave the channel untouched
    pub fn set_elevation_angle(&self, handle: ChannelHandle, elevation_deg: f64) -> SimResult<()> {
        if !(0.0..=90.0).contains(&elevation_deg) {
            return Err(SimError::InvalidElevation(elevation_deg));
        }
        let channel = self.channel(handle)?;
        channel.lock().unwrap().set_elevation_angle(elevation_deg);
        Ok(())
    }

    /// Read-only channel state snapshot
    pub fn get_channel_state(&self, handle: ChannelHandle) -> SimResult<ChannelState> {
        let channel = self.channel(handle)?;
        let state = channel.lock().unwrap().state();
        Ok(state)
    }

    /// Start the periodic motion-update loop for a channel.
    ///
    /// The loop advances platform state at `update_rate_hz` until
    /// `duration_s` elapses or the loop is stopped. One loop per channel.
    pub fn start_motion_loop(
        &mut self,
        handle: ChannelHandle,
        duration_s: f64,
        update_rate_hz: f64,
    ) -> SimResult<()> {
        if update_rate_hz <= 0.0 {
            return Err(SimError::InvalidUpdateRate(update_rate_hz));
        }

        let entry = self
            .channels
            .get_mut(&handle.0)
            .ok_or(SimError::ChannelNotFound(handle.0))?;

        if let Some(motion) = &entry.motion {
            if !motion.thread.is_finished() {
                return Err(SimError::MotionLoopRunning(handle.0));
            }
            // Previous loop ran to completion; reap it before restarting
            if let Some(finished) = entry.motion.take() {
                stop_loop(handle.0, finished);
            }
        }

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let channel = Arc::clone(&entry.channel);
        let interval = Duration::from_secs_f64(1.0 / update_rate_hz);

        let thread = std::thread::spawn(move || {
            let start = Instant::now();
            loop {
                if stop_flag.load(Ordering::Relaxed) {
                    break;
                }
                let elapsed = start.elapsed().as_secs_f64();
                if elapsed >= duration_s {
                    break;
                }
                channel.lock().unwrap().update_platform(elapsed);
                std::thread::sleep(interval);
            }
        });

        entry.motion = Some(MotionLoop { stop, thread });
        tracing::info!(
            channel = handle.0,
            duration_s,
            update_rate_hz,
            "motion loop started"
        );
        Ok(())
    }

    /// Stop a channel's motion loop; fails if none was started
    pub fn stop_motion_loop(&mut self, handle: ChannelHandle) -> SimResult<()> {
        let entry = self
            .channels
            .get_mut(&handle.0)
            .ok_or(SimError::ChannelNotFound(handle.0))?;

        let motion = entry
            .motion
            .take()
            .ok_or(SimError::MotionLoopNotRunning(handle.0))?;
        stop_loop(handle.0, motion);
        Ok(())
    }

    // ---- devices --------------------------------------------------------

    /// Create a device of the given class with its preset configuration
    pub fn create_device(&mut self, class: DeviceClass) -> DeviceHandle {
        self.insert_device(SoftwareRadio::new(RadioConfig::for_class(class)))
    }

    /// Create a device with a fixed impairment seed
    pub fn create_device_seeded(&mut self, class: DeviceClass, seed: u64) -> DeviceHandle {
        self.insert_device(SoftwareRadio::with_seed(RadioConfig::for_class(class), seed))
    }

    fn insert_device(&mut self, radio: SoftwareRadio) -> DeviceHandle {
        let id = self.next_device_id;
        self.next_device_id += 1;
        self.devices.insert(id, radio);
        DeviceHandle(id)
    }

    /// Tear down a device
    pub fn delete_device(&mut self, handle: DeviceHandle) -> SimResult<()> {
        self.devices
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(SimError::DeviceNotFound(handle.0))
    }

    /// Handles of all live devices
    pub fn list_devices(&self) -> Vec<DeviceHandle> {
        let mut ids: Vec<u64> = self.devices.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().map(DeviceHandle).collect()
    }

    fn device_mut(&mut self, handle: DeviceHandle) -> SimResult<&mut SoftwareRadio> {
        self.devices
            .get_mut(&handle.0)
            .ok_or(SimError::DeviceNotFound(handle.0))
    }

    /// Retune a device
    pub fn set_frequency(&mut self, handle: DeviceHandle, freq_hz: f64) -> SimResult<()> {
        self.device_mut(handle)?.set_frequency(freq_hz);
        Ok(())
    }

    /// Set a device's gain on one or both chains
    pub fn set_gain(
        &mut self,
        handle: DeviceHandle,
        gain_db: f64,
        direction: GainDirection,
    ) -> SimResult<()> {
        let radio = self.device_mut(handle)?;
        match direction {
            GainDirection::Tx => radio.set_tx_gain(gain_db),
            GainDirection::Rx => radio.set_rx_gain(gain_db),
            GainDirection::Both => {
                radio.set_tx_gain(gain_db);
                radio.set_rx_gain(gain_db);
            }
        }
        Ok(())
    }

    /// Queue samples on a device's transmit path
    pub fn transmit(&mut self, handle: DeviceHandle, samples: &[IQSample]) -> SimResult<usize> {
        Ok(self.device_mut(handle)?.transmit(samples))
    }

    /// Receive samples from a device
    pub fn receive(&mut self, handle: DeviceHandle, num_samples: usize) -> SimResult<IQBuffer> {
        Ok(self.device_mut(handle)?.receive(num_samples))
    }

    /// Run DC-offset calibration on a device
    pub fn calibrate_dc_offset(&mut self, handle: DeviceHandle) -> SimResult<DcCalibration> {
        Ok(self.device_mut(handle)?.calibrate_dc_offset())
    }

    /// Run IQ-imbalance calibration on a device
    pub fn calibrate_iq_imbalance(&mut self, handle: DeviceHandle) -> SimResult<IqCalibration> {
        Ok(self.device_mut(handle)?.calibrate_iq_imbalance())
    }

    /// Device summary
    pub fn get_device_info(&self, handle: DeviceHandle) -> SimResult<DeviceInfo> {
        self.devices
            .get(&handle.0)
            .map(|radio| radio.device_info())
            .ok_or(SimError::DeviceNotFound(handle.0))
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        for (id, entry) in self.channels.iter_mut() {
            if let Some(motion) = entry.motion.take() {
                stop_loop(*id, motion);
            }
        }
    }
}

/// Signal a motion loop to stop and wait for its final tick
fn stop_loop(channel_id: u64, motion: MotionLoop) {
    motion.stop.store(true, Ordering::Relaxed);
    if motion.thread.join().is_err() {
        tracing::warn!(channel = channel_id, "motion loop thread panicked");
    } else {
        tracing::info!(channel = channel_id, "motion loop stopped");
    }
}
