//! Force feedback effects for rumble commands
//!
//! Left intensity drives the strong (low frequency) motor, right intensity
//! the weak one. A timed command plays once for its duration; a sustained
//! command loops a fixed-length slice until it is replaced or stopped.

use crate::haptics::RumbleCommand;
use gilrs::ff::{self, BaseEffect, BaseEffectType, Effect, EffectBuilder, Repeat, Replay, Ticks};
use gilrs::{GamepadId, Gilrs};

/// Slice length looped for sustained rumble
const SUSTAIN_SLICE_MS: u32 = 1000;

/// Playback timing derived from a command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectTiming {
    Once { play_for_ms: u32 },
    Looping { slice_ms: u32 },
}

impl EffectTiming {
    pub fn for_command(command: &RumbleCommand) -> Self {
        if command.is_sustained() {
            EffectTiming::Looping {
                slice_ms: SUSTAIN_SLICE_MS,
            }
        } else {
            EffectTiming::Once {
                play_for_ms: command.duration_ms,
            }
        }
    }

    fn play_for(self) -> Ticks {
        match self {
            EffectTiming::Once { play_for_ms } => Ticks::from_ms(play_for_ms),
            EffectTiming::Looping { slice_ms } => Ticks::from_ms(slice_ms),
        }
    }

    fn repeat(self) -> Repeat {
        match self {
            EffectTiming::Once { play_for_ms } => Repeat::For(Ticks::from_ms(play_for_ms)),
            EffectTiming::Looping { .. } => Repeat::Infinitely,
        }
    }
}

/// Builds a dual-motor effect bound to `gamepad`. The caller still has to play it.
pub fn build_effect(
    gilrs: &mut Gilrs,
    gamepad: GamepadId,
    command: &RumbleCommand,
) -> Result<Effect, ff::Error> {
    let timing = EffectTiming::for_command(command);
    let scheduling = Replay {
        play_for: timing.play_for(),
        ..Default::default()
    };

    EffectBuilder::new()
        .add_effect(BaseEffect {
            kind: BaseEffectType::Strong {
                magnitude: command.left.magnitude(),
            },
            scheduling,
            envelope: Default::default(),
        })
        .add_effect(BaseEffect {
            kind: BaseEffectType::Weak {
                magnitude: command.right.magnitude(),
            },
            scheduling,
            envelope: Default::default(),
        })
        .gamepads(&[gamepad])
        .repeat(timing.repeat())
        .finish(gilrs)
}
