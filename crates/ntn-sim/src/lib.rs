//! # ntn-sim
//!
//! Software replacement for the RF test equipment used to validate
//! non-terrestrial (satellite/HAPS) radio links. Produces, propagates,
//! and impairs complex baseband sample streams so waveform and protocol
//! testing can run without satellite hardware or channel emulator boxes
//! in the loop.
//!
//! ## Signal chain
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌──────────────┐
//! │   TX radio   │───►│   NTN channel    │───►│   RX radio   │
//! │  gain, DC,   │    │ path loss, delay,│    │  gain, CFO,  │
//! │  IQ imbal.,  │    │ multipath,       │    │  phase noise │
//! │  phase noise │    │ Doppler, noise   │    │              │
//! └──────────────┘    └──────────────────┘    └──────────────┘
//! ```
//!
//! [`channel::NtnChannel`] models the propagation path, driven over time
//! by [`motion::MotionModel`]. [`radio::SoftwareRadio`] models one
//! transceiver's analog non-idealities and calibration. [`testbed::LinkTestbed`]
//! composes one full cycle; [`engine::Engine`] owns live instances behind
//! handles for the remote-dispatch layer.

pub mod channel;
pub mod device;
pub mod engine;
pub mod error;
pub mod motion;
pub mod radio;
pub mod testbed;
pub mod waveform;

pub use channel::{ChannelConfig, ChannelModel, ChannelState, NtnChannel, OrbitClass};
pub use device::{DeviceClass, GainDirection, ImpairmentProfile, RadioConfig};
pub use engine::{ChannelHandle, DeviceHandle, Engine};
pub use error::{SimError, SimResult};
pub use motion::MotionModel;
pub use radio::SoftwareRadio;
pub use testbed::{CycleReport, LinkTestbed};
