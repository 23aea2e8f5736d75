//! Gamepad subsystem backed by gilrs
//!
//! A single OS thread owns the `Gilrs` context. It serves both directions:
//!
//! 1. [`backend`] - pumps gilrs events and applies rumble requests
//! 2. [`session`] - async-side handles: [`GamepadRumble`] and [`GamepadEvents`]
//! 3. [`effects`] - force feedback effect construction
//!
//! # Architecture
//!
//! ```text
//!                 RumbleRequest                     ButtonEvent
//! GamepadRumble ──────────────► [gamepad thread] ──────────────► GamepadEvents
//!  (HapticDevice)  (mpsc)         owns Gilrs          (mpsc)      (InputSource)
//! ```
//!
//! Requests are applied in arrival order, so the motors follow whichever
//! caller commanded last.

pub mod backend;
pub mod effects;
pub mod session;

pub use session::{GamepadEvents, GamepadRumble, GamepadSession};

use serde::{Deserialize, Serialize};

/// Settings for the gamepad thread
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GamepadSettings {
    /// How long to wait for a gamepad to show up before giving up
    pub connect_timeout_ms: u64,

    /// Sleep between two passes over the request queue and gilrs events
    pub pump_interval_ms: u64,
}

impl Default for GamepadSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 1500,
            pump_interval_ms: 2,
        }
    }
}

/// Description of the selected gamepad
#[derive(Clone, Debug)]
pub struct GamepadInfo {
    pub name: String,
    pub ff_supported: bool,
}

/// Errors raised while bringing the gamepad up
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Failed to initialize gilrs: {0}")]
    Init(String),

    #[error("No controllers found")]
    NoGamepad,

    #[error("Failed to spawn gamepad thread: {0}")]
    ThreadSpawn(String),

    #[error("Gamepad thread terminated unexpectedly")]
    ThreadGone,
}
