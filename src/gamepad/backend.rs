use crate::gamepad::effects::build_effect;
use crate::gamepad::{DeviceError, GamepadInfo, GamepadSettings};
use crate::haptics::RumbleCommand;
use crate::input::{ButtonEvent, ButtonId};
use gilrs::ff::Effect;
use gilrs::{Button, Event, EventType, GamepadId, Gilrs};
use statum::{machine, state};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

/// Requests sent from the async side to the gamepad thread
#[derive(Debug, Clone, PartialEq)]
pub enum RumbleRequest {
    Play(RumbleCommand),
    Stop,
    Shutdown,
}

// Backend states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum BackendState {
    Initializing,
    Connected,
}

#[machine]
pub struct GamepadBackend<S: BackendState> {
    // Gilrs context
    gilrs: Gilrs,

    // Gamepad that receives rumble and whose buttons are forwarded
    active_gamepad: Option<GamepadId>,

    settings: GamepadSettings,

    requests: mpsc::UnboundedReceiver<RumbleRequest>,

    events: mpsc::UnboundedSender<ButtonEvent>,

    // Effect currently owning the motors
    current_effect: Option<Effect>,
}

impl GamepadBackend<Initializing> {
    pub fn create(
        settings: GamepadSettings,
        requests: mpsc::UnboundedReceiver<RumbleRequest>,
        events: mpsc::UnboundedSender<ButtonEvent>,
    ) -> Result<Self, DeviceError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(DeviceError::Init(e.to_string()));
            }
        };

        Ok(Self::new(gilrs, None, settings, requests, events, None))
    }

    /// Waits for the first gamepad and transitions to `Connected`
    pub fn initialize(mut self) -> Result<(GamepadBackend<Connected>, GamepadInfo), DeviceError> {
        let deadline = Instant::now() + Duration::from_millis(self.settings.connect_timeout_ms);

        let info = loop {
            let found = self.gilrs.gamepads().next().map(|(id, gamepad)| {
                (
                    id,
                    GamepadInfo {
                        name: gamepad.name().to_string(),
                        ff_supported: gamepad.is_ff_supported(),
                    },
                )
            });

            if let Some((id, info)) = found {
                info!("Selected gamepad: {} ({})", info.name, id);
                self.active_gamepad = Some(id);
                break info;
            }

            if Instant::now() >= deadline {
                warn!(
                    "No gamepad connected after {}ms",
                    self.settings.connect_timeout_ms
                );
                return Err(DeviceError::NoGamepad);
            }

            // Hotplugged pads only show up in gamepads() once their event was pumped
            while self.gilrs.next_event().is_some() {}
            std::thread::sleep(Duration::from_millis(self.settings.pump_interval_ms));
        };

        if !info.ff_supported {
            warn!("{} does not report force feedback support", info.name);
        }

        Ok((self.transition(), info))
    }
}

impl GamepadBackend<Connected> {
    /// Runs until a `Shutdown` request arrives or every rumble handle is dropped
    pub fn run(mut self) {
        info!("Gamepad thread running");
        let interval = Duration::from_millis(self.settings.pump_interval_ms);

        loop {
            if !self.apply_requests() {
                break;
            }
            self.forward_events();
            std::thread::sleep(interval);
        }

        self.stop_effect();
        info!("Gamepad thread finished");
    }

    // Returns false once the thread should exit
    fn apply_requests(&mut self) -> bool {
        loop {
            match self.requests.try_recv() {
                Ok(RumbleRequest::Play(command)) => self.play(command),
                Ok(RumbleRequest::Stop) => self.stop_effect(),
                Ok(RumbleRequest::Shutdown) => {
                    debug!("Shutdown requested");
                    return false;
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => {
                    debug!("All rumble handles dropped");
                    return false;
                }
            }
        }
    }

    fn play(&mut self, command: RumbleCommand) {
        let Some(id) = self.active_gamepad else {
            warn!("Rumble requested without an active gamepad");
            return;
        };

        // Dropping the old effect releases the motors before the new one starts
        self.current_effect = None;

        match build_effect(&mut self.gilrs, id, &command) {
            Ok(effect) => match effect.play() {
                Ok(()) => {
                    debug!("Playing rumble {}", command);
                    self.current_effect = Some(effect);
                }
                Err(e) => warn!("Failed to play rumble {}: {}", command, e),
            },
            Err(e) => warn!("Failed to build rumble effect {}: {}", command, e),
        }
    }

    fn stop_effect(&mut self) {
        if let Some(effect) = self.current_effect.take() {
            if let Err(e) = effect.stop() {
                warn!("Failed to stop rumble: {}", e);
            } else {
                debug!("Rumble stopped");
            }
        }
    }

    fn forward_events(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            if self.active_gamepad != Some(id) {
                debug!("Skipping event from non-active gamepad: {:?}", id);
                continue;
            }

            match event {
                EventType::Disconnected => {
                    warn!("Controller disconnected, rumble commands will fail");
                }
                EventType::Connected => info!("Controller reconnected"),
                other => {
                    if let Some(button_event) = convert_event(other) {
                        debug!(
                            "Button event: {} {:?} at {}",
                            button_event.button,
                            button_event.transition,
                            button_event.timestamp.format("%H:%M:%S.%3f")
                        );
                        if self.events.send(button_event).is_err() {
                            debug!("Event receiver dropped");
                        }
                    }
                }
            }
        }
    }
}

fn convert_event(event: EventType) -> Option<ButtonEvent> {
    match event {
        EventType::ButtonPressed(button, _) => map_button(button).map(ButtonEvent::pressed),
        EventType::ButtonReleased(button, _) => map_button(button).map(ButtonEvent::released),
        _ => None,
    }
}

// Fixed layout: A / B / X
pub fn map_button(button: Button) -> Option<ButtonId> {
    match button {
        Button::South => Some(ButtonId::Confirm),
        Button::East => Some(ButtonId::Cancel),
        Button::West => Some(ButtonId::Secondary),
        _ => None,
    }
}
