use crate::haptics::{HapticDevice, HapticError, RumbleCommand};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Plays `command`, waits `hold` and stops the motors
///
/// The hold ends early when `shutdown` fires. The stop is attempted even if
/// starting the rumble failed.
pub async fn play_for(
    device: &dyn HapticDevice,
    command: RumbleCommand,
    hold: Duration,
    shutdown: &CancellationToken,
) -> Result<(), HapticError> {
    info!("One-shot rumble {} held for {:?}", command, hold);
    let started = device.set_motors(command);
    if started.is_ok() {
        tokio::select! {
            _ = sleep(hold) => {}
            _ = shutdown.cancelled() => info!("One-shot rumble cut short by shutdown"),
        }
    }
    let stopped = device.stop();
    started.and(stopped)
}
