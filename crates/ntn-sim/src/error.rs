//! Error taxonomy for the simulation engine
//!
//! Everything here is a typed, immediately-reportable failure: validation
//! of caller input, lookup of a handle that does not exist, or misuse of
//! the motion-update loop. Numeric edge cases (empty buffers, delays past
//! the end of a buffer, negligible Doppler) are defined behavior, not
//! errors.

/// Result type for engine operations
pub type SimResult<T> = Result<T, SimError>;

/// Errors reported by the simulation engine
#[derive(Debug, Clone, thiserror::Error)]
pub enum SimError {
    #[error("elevation angle {0}° out of range, must be within [0, 90]")]
    InvalidElevation(f64),

    #[error("rain rate {0} mm/hr must be non-negative")]
    InvalidRainRate(f64),

    #[error("distance {0} km must be positive")]
    InvalidDistance(f64),

    #[error("update rate {0} Hz must be positive")]
    InvalidUpdateRate(f64),

    #[error("unknown orbit class: {0}. Use 'geo', 'leo', 'meo', or 'haps'")]
    UnknownOrbitClass(String),

    #[error("unknown channel model: {0}. Use 'awgn' or 'tdl_a'..'tdl_e'")]
    UnknownChannelModel(String),

    #[error("unknown device class: {0}. Use 'x310' or 'b210'")]
    UnknownDeviceClass(String),

    #[error("channel {0} not found")]
    ChannelNotFound(u64),

    #[error("device {0} not found")]
    DeviceNotFound(u64),

    #[error("motion loop already running for channel {0}")]
    MotionLoopRunning(u64),

    #[error("no motion loop running for channel {0}")]
    MotionLoopNotRunning(u64),
}
