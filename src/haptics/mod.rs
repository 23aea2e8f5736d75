//! Haptic output abstraction
//!
//! The rest of the tester talks to the rumble motors only through
//! [`HapticDevice`]. The gilrs backend in [`crate::gamepad`] implements it for
//! real hardware; tests substitute a recording device.
//!
//! ```text
//! ManualModeController ─┐
//!                       ├─► HapticDevice ──► left (strong) / right (weak) motor
//! WarningTask ──────────┘
//! ```
//!
//! There is no lock around the device. Whoever commands last owns the motors.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors returned by a rumble command after the device has been connected
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HapticError {
    /// The device thread is gone or the gamepad was unplugged
    #[error("Haptic device disconnected")]
    Disconnected,

    /// The gamepad does not expose force feedback
    #[error("Force feedback not supported by this gamepad")]
    Unsupported,
}

/// Rejected intensity value
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("Intensity {0} is outside 0.0..=1.0")]
pub struct InvalidIntensity(pub f32);

/// Motor intensity in `0.0..=1.0`
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Intensity(f32);

impl Intensity {
    pub const OFF: Intensity = Intensity(0.0);
    pub const FULL: Intensity = Intensity(1.0);

    pub fn new(value: f32) -> Result<Self, InvalidIntensity> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidIntensity(value))
        }
    }

    /// Clamps into range, NaN becomes zero
    pub fn saturating(value: f32) -> Self {
        if value.is_nan() {
            Self::OFF
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    /// Converts an operator percentage (0-100)
    pub fn from_percent(percent: f32) -> Result<Self, InvalidIntensity> {
        if (0.0..=100.0).contains(&percent) {
            Ok(Self(percent / 100.0))
        } else {
            Err(InvalidIntensity(percent / 100.0))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Force feedback magnitude as used by gilrs effects
    pub fn magnitude(self) -> u16 {
        (self.0 * u16::MAX as f32).round() as u16
    }
}

impl TryFrom<f32> for Intensity {
    type Error = InvalidIntensity;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Intensity> for f32 {
    fn from(intensity: Intensity) -> Self {
        intensity.0
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}%", self.0 * 100.0)
    }
}

/// A single motor command
///
/// `duration_ms == 0` keeps the motors running until the next command or
/// [`HapticDevice::stop`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RumbleCommand {
    pub left: Intensity,
    pub right: Intensity,
    pub duration_ms: u32,
}

impl RumbleCommand {
    pub fn timed(left: Intensity, right: Intensity, duration_ms: u32) -> Self {
        Self {
            left,
            right,
            duration_ms,
        }
    }

    /// Both motors at `intensity` until stopped
    pub fn sustained(intensity: Intensity) -> Self {
        Self::timed(intensity, intensity, 0)
    }

    pub fn is_sustained(&self) -> bool {
        self.duration_ms == 0
    }
}

impl fmt::Display for RumbleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sustained() {
            write!(f, "L={} R={} sustained", self.left, self.right)
        } else {
            write!(f, "L={} R={} for {}ms", self.left, self.right, self.duration_ms)
        }
    }
}

/// Handle to the two rumble motors of the connected controller
///
/// Both calls must tolerate redundant use: `stop` without a prior
/// `set_motors` is a successful no-op.
pub trait HapticDevice: Send + Sync {
    fn set_motors(&self, command: RumbleCommand) -> Result<(), HapticError>;

    fn stop(&self) -> Result<(), HapticError>;
}
