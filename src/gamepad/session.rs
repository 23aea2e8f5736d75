//! Async-side handles for the gamepad thread
//!
//! [`GamepadSession::connect`] starts the thread and waits for it to report the
//! selected gamepad. Rumble goes in through [`GamepadRumble`], button events
//! come out through [`GamepadEvents`].

use crate::gamepad::backend::{GamepadBackend, RumbleRequest};
use crate::gamepad::{DeviceError, GamepadInfo, GamepadSettings};
use crate::haptics::{HapticDevice, HapticError, RumbleCommand};
use crate::input::{ButtonEvent, InputSource};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Sends rumble requests to the gamepad thread
#[derive(Clone, Debug)]
pub struct GamepadRumble {
    requests: mpsc::UnboundedSender<RumbleRequest>,
    ff_supported: bool,
}

impl GamepadRumble {
    pub fn new(requests: mpsc::UnboundedSender<RumbleRequest>, ff_supported: bool) -> Self {
        Self {
            requests,
            ff_supported,
        }
    }

    fn send(&self, request: RumbleRequest) -> Result<(), HapticError> {
        self.requests.send(request).map_err(|e| {
            debug!("Rumble request dropped, gamepad thread gone: {:?}", e.0);
            HapticError::Disconnected
        })
    }
}

impl HapticDevice for GamepadRumble {
    fn set_motors(&self, command: RumbleCommand) -> Result<(), HapticError> {
        if !self.ff_supported {
            return Err(HapticError::Unsupported);
        }
        self.send(RumbleRequest::Play(command))
    }

    fn stop(&self) -> Result<(), HapticError> {
        self.send(RumbleRequest::Stop)
    }
}

/// Button events forwarded by the gamepad thread
#[derive(Debug)]
pub struct GamepadEvents {
    receiver: mpsc::UnboundedReceiver<ButtonEvent>,
}

impl GamepadEvents {
    pub fn new(receiver: mpsc::UnboundedReceiver<ButtonEvent>) -> Self {
        Self { receiver }
    }
}

impl InputSource for GamepadEvents {
    fn poll(&mut self) -> Vec<ButtonEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Running gamepad thread plus the handles needed to talk to it
pub struct GamepadSession {
    info: GamepadInfo,
    rumble: Arc<GamepadRumble>,
    thread: Option<JoinHandle<()>>,
}

impl GamepadSession {
    /// Spawns the gamepad thread and waits until a gamepad is selected
    ///
    /// # Errors
    ///
    /// * [`DeviceError::Init`] - gilrs could not be initialized
    /// * [`DeviceError::NoGamepad`] - nothing connected within `connect_timeout_ms`
    /// * [`DeviceError::ThreadSpawn`] / [`DeviceError::ThreadGone`] - thread failures
    pub async fn connect(
        settings: GamepadSettings,
    ) -> Result<(Self, GamepadEvents), DeviceError> {
        info!("Connecting to gamepad with settings: {:?}", settings);

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        // Gilrs is created on the thread that uses it
        let thread = std::thread::Builder::new()
            .name("gamepad".into())
            .spawn(move || {
                let connected = GamepadBackend::create(settings, request_rx, event_tx)
                    .and_then(|backend| backend.initialize());

                match connected {
                    Ok((backend, info)) => {
                        if ready_tx.send(Ok(info)).is_err() {
                            warn!("Connect caller went away before the gamepad was ready");
                            return;
                        }
                        backend.run();
                    }
                    Err(e) => {
                        error!("Failed to bring up gamepad: {}", e);
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| DeviceError::ThreadSpawn(e.to_string()))?;

        let info = ready_rx.await.map_err(|_| DeviceError::ThreadGone)??;
        info!(
            "Gamepad ready: {} (force feedback: {})",
            info.name, info.ff_supported
        );

        let rumble = Arc::new(GamepadRumble::new(request_tx, info.ff_supported));
        let session = Self {
            info,
            rumble,
            thread: Some(thread),
        };
        Ok((session, GamepadEvents::new(event_rx)))
    }

    pub fn info(&self) -> &GamepadInfo {
        &self.info
    }

    pub fn rumble(&self) -> Arc<GamepadRumble> {
        self.rumble.clone()
    }

    /// Stops the motors and joins the gamepad thread
    pub async fn close(mut self) {
        if self.rumble.send(RumbleRequest::Shutdown).is_err() {
            debug!("Gamepad thread already stopped");
        }

        if let Some(thread) = self.thread.take() {
            match tokio::task::spawn_blocking(move || thread.join()).await {
                Ok(Ok(())) => info!("Gamepad thread joined"),
                Ok(Err(_)) => error!("Gamepad thread panicked"),
                Err(e) => error!("Failed to join gamepad thread: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haptics::Intensity;
    use crate::input::ButtonId;

    #[test]
    fn rumble_calls_become_requests_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let rumble = GamepadRumble::new(tx, true);
        let command = RumbleCommand::sustained(Intensity::FULL);

        rumble.set_motors(command).unwrap();
        rumble.stop().unwrap();
        rumble.stop().unwrap();

        assert_eq!(rx.try_recv().unwrap(), RumbleRequest::Play(command));
        assert_eq!(rx.try_recv().unwrap(), RumbleRequest::Stop);
        assert_eq!(rx.try_recv().unwrap(), RumbleRequest::Stop);
    }

    #[test]
    fn rumble_reports_disconnect_once_thread_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        let rumble = GamepadRumble::new(tx, true);
        drop(rx);

        assert_eq!(rumble.stop(), Err(HapticError::Disconnected));
        assert_eq!(
            rumble.set_motors(RumbleCommand::sustained(Intensity::FULL)),
            Err(HapticError::Disconnected)
        );
    }

    #[test]
    fn pad_without_force_feedback_rejects_rumble_but_accepts_stop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let rumble = GamepadRumble::new(tx, false);

        assert_eq!(
            rumble.set_motors(RumbleCommand::sustained(Intensity::FULL)),
            Err(HapticError::Unsupported)
        );
        assert_eq!(rumble.stop(), Ok(()));
        assert_eq!(rx.try_recv().unwrap(), RumbleRequest::Stop);
    }

    #[test]
    fn poll_drains_pending_events_in_arrival_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut events = GamepadEvents::new(rx);
        assert!(events.poll().is_empty());

        tx.send(ButtonEvent::pressed(ButtonId::Confirm)).unwrap();
        tx.send(ButtonEvent::released(ButtonId::Confirm)).unwrap();
        tx.send(ButtonEvent::pressed(ButtonId::Cancel)).unwrap();

        let polled: Vec<_> = events
            .poll()
            .into_iter()
            .map(|e| (e.button, e.transition))
            .collect();
        assert_eq!(
            polled,
            vec![
                (ButtonId::Confirm, crate::input::Transition::Pressed),
                (ButtonId::Confirm, crate::input::Transition::Released),
                (ButtonId::Cancel, crate::input::Transition::Pressed),
            ]
        );
        assert!(events.poll().is_empty());
    }
}
