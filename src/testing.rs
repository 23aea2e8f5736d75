//! Test doubles for the haptic device and the input source

use crate::haptics::{HapticDevice, HapticError, RumbleCommand};
use crate::input::{ButtonEvent, ButtonId, InputSource, Transition};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HapticCall {
    SetMotors(RumbleCommand),
    Stop,
}

/// Records every call with the (tokio) time it happened
#[derive(Debug, Default)]
pub struct RecordingHaptics {
    calls: Mutex<Vec<(Instant, HapticCall)>>,
}

impl RecordingHaptics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn timeline(&self) -> Vec<(Instant, HapticCall)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<HapticCall> {
        self.timeline().into_iter().map(|(_, call)| call).collect()
    }

    fn record(&self, call: HapticCall) {
        self.calls.lock().unwrap().push((Instant::now(), call));
    }
}

impl HapticDevice for RecordingHaptics {
    fn set_motors(&self, command: RumbleCommand) -> Result<(), HapticError> {
        self.record(HapticCall::SetMotors(command));
        Ok(())
    }

    fn stop(&self) -> Result<(), HapticError> {
        self.record(HapticCall::Stop);
        Ok(())
    }
}

/// Device that rejects every call, like an unplugged pad
#[derive(Debug, Default)]
pub struct FailingHaptics {
    attempts: AtomicUsize,
}

impl FailingHaptics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl HapticDevice for FailingHaptics {
    fn set_motors(&self, _command: RumbleCommand) -> Result<(), HapticError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(HapticError::Disconnected)
    }

    fn stop(&self) -> Result<(), HapticError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(HapticError::Disconnected)
    }
}

/// Input source that releases events once their offset has elapsed
///
/// Offsets are measured from construction. Events at offset zero are already
/// pending when manual mode is entered.
#[derive(Debug)]
pub struct ScriptedInput {
    start: Instant,
    script: VecDeque<(Duration, ButtonId, Transition)>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            script: VecDeque::new(),
        }
    }

    pub fn press(mut self, at_ms: u64, button: ButtonId) -> Self {
        self.script
            .push_back((Duration::from_millis(at_ms), button, Transition::Pressed));
        self
    }

    pub fn release(mut self, at_ms: u64, button: ButtonId) -> Self {
        self.script
            .push_back((Duration::from_millis(at_ms), button, Transition::Released));
        self
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Vec<ButtonEvent> {
        let elapsed = self.start.elapsed();
        let mut due = Vec::new();
        while let Some((at, button, transition)) = self.script.front().copied() {
            if at > elapsed {
                break;
            }
            self.script.pop_front();
            due.push(ButtonEvent::new(button, transition));
        }
        due
    }
}
