//! Warning pattern task
//!
//! Repeats `set_motors(full, full, 2000ms)`, 500ms, `stop()`, 200ms while the
//! [`WarningFlag`] is set. The flag is only checked at the top of a cycle, so
//! after it is cleared the task can still finish the cycle it is in. That
//! bounds the trailing activity to one `stop()` and at most ~0.7s.

use crate::haptics::{HapticDevice, Intensity, RumbleCommand};
use crate::manual::WarningFlag;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// Shape of one warning cycle
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningPattern {
    pub intensity: Intensity,

    /// Duration sent with each `set_motors`
    pub command_ms: u32,

    /// Time between `set_motors` and `stop`
    pub active_ms: u64,

    /// Quiet gap after `stop` before the flag is checked again
    pub quiet_ms: u64,
}

impl Default for WarningPattern {
    fn default() -> Self {
        Self {
            intensity: Intensity::FULL,
            command_ms: 2000,
            active_ms: 500,
            quiet_ms: 200,
        }
    }
}

impl WarningPattern {
    pub fn command(&self) -> RumbleCommand {
        RumbleCommand::timed(self.intensity, self.intensity, self.command_ms)
    }

    /// Longest time the task may keep running after the flag is cleared
    pub fn cycle(&self) -> Duration {
        Duration::from_millis(self.active_ms + self.quiet_ms)
    }
}

/// How a warning task ended from the controller's point of view
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskExit {
    /// Finished within the grace period after `cycles` cycles
    Stopped { cycles: u32 },
    /// Still running when the grace period ran out; left detached
    TimedOut,
    /// Not awaited at all
    Detached,
    Panicked,
}

/// Handle to a running warning pattern
#[derive(Debug)]
pub struct WarningTask {
    handle: JoinHandle<u32>,
}

impl WarningTask {
    /// Starts the pattern on a tokio task without waiting for its first cycle
    pub fn spawn(device: Arc<dyn HapticDevice>, flag: WarningFlag, pattern: WarningPattern) -> Self {
        info!("Starting warning pattern: {}", pattern.command());
        let handle = tokio::spawn(run_pattern(device, flag, pattern));
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits up to `grace` for the task to observe the cleared flag
    ///
    /// A zero grace does not wait. On timeout the task keeps running on its
    /// own and a warning is logged.
    pub async fn finish(self, grace: Duration) -> TaskExit {
        if grace.is_zero() {
            debug!("Leaving warning task detached");
            return TaskExit::Detached;
        }

        match timeout(grace, self.handle).await {
            Ok(Ok(cycles)) => {
                debug!("Warning task stopped after {} cycles", cycles);
                TaskExit::Stopped { cycles }
            }
            Ok(Err(e)) => {
                error!("Warning task panicked: {}", e);
                TaskExit::Panicked
            }
            Err(_) => {
                warn!(
                    "Warning task did not stop within {:?}, leaving it detached",
                    grace
                );
                TaskExit::TimedOut
            }
        }
    }
}

async fn run_pattern(device: Arc<dyn HapticDevice>, flag: WarningFlag, pattern: WarningPattern) -> u32 {
    let active = Duration::from_millis(pattern.active_ms);
    let quiet = Duration::from_millis(pattern.quiet_ms);
    let mut cycles = 0;

    while flag.is_set() {
        if let Err(e) = device.set_motors(pattern.command()) {
            warn!("Warning pulse failed: {}", e);
        }
        sleep(active).await;

        if let Err(e) = device.stop() {
            warn!("Warning stop failed: {}", e);
        }
        sleep(quiet).await;

        cycles += 1;
    }

    cycles
}
