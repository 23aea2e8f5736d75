//! Manual mode: button presses drive the rumble motors live
//!
//! # Button mapping
//!
//! | Button        | Pressed                         | Released        |
//! |---------------|---------------------------------|-----------------|
//! | Confirm (A)   | sustained rumble                | stop            |
//! | Secondary (X) | start warning pattern (once)    | -               |
//! | Cancel (B)    | stop everything, leave          | -               |
//!
//! # Concurrency
//!
//! ```text
//! ManualModeController (foreground poll loop, one tick per `tick_ms`)
//!     │  engage()                       release()
//!     ▼                                    │
//! WarningFlag (Arc<AtomicBool>) ◄──────────┘
//!     │  read at the top of each cycle
//!     ▼
//! WarningTask (tokio task: on 500ms, off 200ms, repeat)
//! ```
//!
//! Cancellation is cooperative. After the flag drops the task may still be in
//! its active window and issue one late `stop()`; see [`warning`].

pub mod controller;
pub mod flag;
pub mod warning;

pub use controller::{ManualExit, ManualModeController, ManualSummary};
pub use flag::WarningFlag;
pub use warning::{TaskExit, WarningPattern, WarningTask};

use crate::haptics::Intensity;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the manual mode loop
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualSettings {
    /// Sleep between two polls of the input source
    pub tick_ms: u64,

    /// Intensity used while Confirm is held
    pub sustained_intensity: Intensity,

    /// How long to wait for the warning task on exit. 0 leaves it detached.
    pub join_grace_ms: u64,

    pub warning: WarningPattern,
}

impl Default for ManualSettings {
    fn default() -> Self {
        Self {
            tick_ms: 20,
            sustained_intensity: Intensity::saturating(0.75),
            join_grace_ms: 800,
            warning: WarningPattern::default(),
        }
    }
}

impl ManualSettings {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn join_grace(&self) -> Duration {
        Duration::from_millis(self.join_grace_ms)
    }
}
