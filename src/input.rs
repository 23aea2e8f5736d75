//! Button events consumed by manual mode

use chrono::{DateTime, Local};
use std::fmt;

/// Buttons that manual mode reacts to
///
/// Labels follow the Xbox face-button layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonId {
    /// A
    Confirm,
    /// B
    Cancel,
    /// X
    Secondary,
}

impl ButtonId {
    pub fn label(self) -> &'static str {
        match self {
            ButtonId::Confirm => "A",
            ButtonId::Cancel => "B",
            ButtonId::Secondary => "X",
        }
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Pressed,
    Released,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ButtonEvent {
    pub button: ButtonId,
    pub transition: Transition,
    pub timestamp: DateTime<Local>,
}

impl ButtonEvent {
    pub fn new(button: ButtonId, transition: Transition) -> Self {
        Self {
            button,
            transition,
            timestamp: Local::now(),
        }
    }

    pub fn pressed(button: ButtonId) -> Self {
        Self::new(button, Transition::Pressed)
    }

    pub fn released(button: ButtonId) -> Self {
        Self::new(button, Transition::Released)
    }
}

/// Non-blocking queue of button events
pub trait InputSource: Send {
    /// Everything pending since the last call, in arrival order. Empty when idle.
    fn poll(&mut self) -> Vec<ButtonEvent>;
}
