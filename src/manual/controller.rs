//! Manual mode controller
//!
//! Polls the input source once per tick, maps button transitions to rumble
//! commands and owns the lifecycle of the (single) warning task.

use crate::haptics::{HapticDevice, RumbleCommand};
use crate::input::{ButtonEvent, ButtonId, InputSource, Transition};
use crate::manual::{ManualSettings, TaskExit, WarningFlag, WarningTask};
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why manual mode returned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManualExit {
    /// Cancel (B) was pressed
    Cancelled,
    /// Process shutdown was requested (Ctrl-C)
    Shutdown,
}

/// What happened during one manual mode session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManualSummary {
    pub exit: ManualExit,
    pub events_handled: usize,
    pub warning_activations: usize,
    /// `None` when warning mode was never entered
    pub warning_exit: Option<TaskExit>,
}

enum Flow {
    Continue,
    Exit,
}

pub struct ManualModeController {
    device: Arc<dyn HapticDevice>,
    settings: ManualSettings,
    flag: WarningFlag,
    warning: Option<WarningTask>,
    // Confirm is held and the sustained rumble was sent
    sustained: bool,
}

impl ManualModeController {
    pub fn new(device: Arc<dyn HapticDevice>, settings: ManualSettings) -> Self {
        Self {
            device,
            settings,
            flag: WarningFlag::new(),
            warning: None,
            sustained: false,
        }
    }

    /// Flag of the current (or last) manual mode session
    pub fn warning_flag(&self) -> &WarningFlag {
        &self.flag
    }

    /// Runs manual mode until Cancel is pressed or `shutdown` fires
    ///
    /// On return the warning flag is cleared and the motors were told to
    /// stop. The warning task, if any, is awaited for at most `join_grace_ms`.
    pub async fn enter<I>(&mut self, input: &mut I, shutdown: &CancellationToken) -> ManualSummary
    where
        I: InputSource + ?Sized,
    {
        // Fresh flag per session so a straggling task from a previous one
        // can never see it set again
        self.flag = WarningFlag::new();
        self.sustained = false;

        let stale = input.poll();
        if !stale.is_empty() {
            debug!("Discarding {} events queued before manual mode", stale.len());
        }

        info!("Entering manual mode");
        let tick = self.settings.tick();
        let mut events_handled = 0;
        let mut warning_activations = 0;

        let exit = 'poll: loop {
            for event in input.poll() {
                events_handled += 1;
                match self.handle_event(&event, &mut warning_activations) {
                    Flow::Continue => {}
                    Flow::Exit => break 'poll ManualExit::Cancelled,
                }
            }

            tokio::select! {
                _ = sleep(tick) => {}
                _ = shutdown.cancelled() => break 'poll ManualExit::Shutdown,
            }
        };

        let warning_exit = self.leave().await;
        let summary = ManualSummary {
            exit,
            events_handled,
            warning_activations,
            warning_exit,
        };
        info!("Leaving manual mode: {:?}", summary);
        summary
    }

    fn handle_event(&mut self, event: &ButtonEvent, warning_activations: &mut usize) -> Flow {
        debug!(
            "Manual mode event: {} {:?} at {}",
            event.button,
            event.transition,
            event.timestamp.format("%H:%M:%S.%3f")
        );

        match (event.button, event.transition) {
            (ButtonId::Confirm, Transition::Pressed) => {
                if self.sustained {
                    debug!("Sustained rumble already running");
                } else {
                    self.sustained = true;
                    self.command(RumbleCommand::sustained(self.settings.sustained_intensity));
                }
            }
            (ButtonId::Confirm, Transition::Released) => {
                self.sustained = false;
                self.stop_motors();
            }
            (ButtonId::Secondary, Transition::Pressed) => {
                if self.start_warning() {
                    *warning_activations += 1;
                }
            }
            (ButtonId::Cancel, Transition::Pressed) => return Flow::Exit,
            (button, transition) => debug!("No action for {} {:?}", button, transition),
        }

        Flow::Continue
    }

    // Returns whether a new task was started
    fn start_warning(&mut self) -> bool {
        if !self.flag.engage() {
            debug!("Warning mode already active");
            return false;
        }

        self.warning = Some(WarningTask::spawn(
            self.device.clone(),
            self.flag.clone(),
            self.settings.warning,
        ));
        true
    }

    async fn leave(&mut self) -> Option<TaskExit> {
        self.flag.release();
        self.sustained = false;
        self.stop_motors();

        let task = self.warning.take()?;
        if task.is_finished() {
            debug!("Warning task already finished");
        } else {
            debug!(
                "Warning task may run for up to {:?} more",
                self.settings.warning.cycle()
            );
        }
        Some(task.finish(self.settings.join_grace()).await)
    }

    fn command(&self, command: RumbleCommand) {
        debug!("Rumble: {}", command);
        if let Err(e) = self.device.set_motors(command) {
            warn!("Rumble command failed: {}", e);
        }
    }

    fn stop_motors(&self) {
        if let Err(e) = self.device.stop() {
            warn!("Rumble stop failed: {}", e);
        }
    }
}
