//! Console shell around the rumble tests
//!
//! ```text
//! === Controller Rumble Test ===
//! 1. Custom rumble test
//! 2. Quick test (75% intensity)
//! 3. Manual mode
//! 4. Stop rumble
//! q. Quit
//! ```

pub mod oneshot;
pub mod prompt;

pub use prompt::Console;

use crate::config::QuickTestConfig;
use crate::haptics::{HapticDevice, HapticError, RumbleCommand};
use crate::input::{ButtonId, InputSource};
use crate::manual::{ManualExit, ManualModeController};
use colored::Colorize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuChoice {
    CustomTest,
    QuickTest,
    ManualMode,
    StopRumble,
    Quit,
}

impl MenuChoice {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "1" => Some(MenuChoice::CustomTest),
            "2" => Some(MenuChoice::QuickTest),
            "3" => Some(MenuChoice::ManualMode),
            "4" => Some(MenuChoice::StopRumble),
            "q" => Some(MenuChoice::Quit),
            _ => None,
        }
    }
}

/// Whether the menu loop keeps going after an action
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Quit,
}

pub struct Menu {
    device: Arc<dyn HapticDevice>,
    input: Box<dyn InputSource>,
    controller: ManualModeController,
    quick_test: QuickTestConfig,
    shutdown: CancellationToken,
}

impl Menu {
    pub fn new(
        device: Arc<dyn HapticDevice>,
        input: Box<dyn InputSource>,
        controller: ManualModeController,
        quick_test: QuickTestConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            device,
            input,
            controller,
            quick_test,
            shutdown,
        }
    }

    /// Shows the menu until the operator quits, stdin closes or shutdown fires
    pub async fn run(&mut self, console: &mut Console) {
        loop {
            show_menu(&self.quick_test);
            let Some(answer) = console.read_line().await else {
                info!("Operator input closed");
                break;
            };

            let step = match MenuChoice::parse(&answer) {
                Some(choice) => self.dispatch(choice, console).await,
                None => {
                    println!("{}", "Invalid choice!".red());
                    Step::Continue
                }
            };

            if step == Step::Quit || self.shutdown.is_cancelled() {
                break;
            }
        }
    }

    pub async fn dispatch(&mut self, choice: MenuChoice, console: &mut Console) -> Step {
        info!("Menu choice: {:?}", choice);
        match choice {
            MenuChoice::CustomTest => self.custom_test(console).await,
            MenuChoice::QuickTest => {
                self.quick_test().await;
                Step::Continue
            }
            MenuChoice::ManualMode => self.manual_mode().await,
            MenuChoice::StopRumble => {
                self.stop_rumble();
                Step::Continue
            }
            MenuChoice::Quit => Step::Quit,
        }
    }

    async fn custom_test(&mut self, console: &mut Console) -> Step {
        let Some(left) = console.ask_intensity("left motor ").await else {
            return Step::Quit;
        };
        let Some(right) = console.ask_intensity("right motor ").await else {
            return Step::Quit;
        };
        let Some(duration) = console.ask_duration().await else {
            return Step::Quit;
        };

        println!("\n{}", "Running custom rumble test...".blue());
        let duration_ms = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        let command = RumbleCommand::timed(left, right, duration_ms);
        let result =
            oneshot::play_for(self.device.as_ref(), command, duration, &self.shutdown).await;
        self.report(result);
        Step::Continue
    }

    async fn quick_test(&mut self) {
        println!(
            "\n{}",
            format!(
                "Running quick test ({} intensity for {:.1} seconds)...",
                self.quick_test.intensity,
                self.quick_test.duration().as_secs_f32()
            )
            .blue()
        );
        let result = oneshot::play_for(
            self.device.as_ref(),
            self.quick_test.command(),
            self.quick_test.duration(),
            &self.shutdown,
        )
        .await;
        self.report(result);
    }

    async fn manual_mode(&mut self) -> Step {
        show_manual_legend();
        let summary = self
            .controller
            .enter(self.input.as_mut(), &self.shutdown)
            .await;

        match summary.exit {
            ManualExit::Cancelled => {
                println!("{}", "Exited manual mode".green());
                Step::Continue
            }
            ManualExit::Shutdown => Step::Quit,
        }
    }

    fn stop_rumble(&self) {
        match self.device.stop() {
            Ok(()) => println!("\n{}", "Rumble stopped".green()),
            Err(e) => println!("\n{} {}", "Failed to stop rumble:".red(), e),
        }
    }

    fn report(&self, result: Result<(), HapticError>) {
        if let Err(e) = result {
            warn!("Rumble test failed: {}", e);
            println!("{} {}", "Rumble test failed:".red(), e);
        }
    }
}

fn show_menu(quick_test: &QuickTestConfig) {
    println!("\n{}", "=== Controller Rumble Test ===".blue());
    println!("1. Custom rumble test");
    println!("2. Quick test ({} intensity)", quick_test.intensity);
    println!("3. Manual mode");
    println!("4. Stop rumble");
    println!("q. Quit");
    print!("\nChoice: ");
    let _ = std::io::Write::flush(&mut std::io::stdout());
}

pub fn show_manual_legend() {
    println!("\n{}", "=== Manual Mode ===".blue());
    println!(
        "Hold {} for sustained rumble",
        ButtonId::Confirm.label().green()
    );
    println!(
        "Press {} for the warning pattern",
        ButtonId::Secondary.label().green()
    );
    println!("Press {} to leave manual mode", ButtonId::Cancel.label().red());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haptics::Intensity;
    use crate::manual::ManualSettings;
    use crate::testing::{HapticCall, RecordingHaptics, ScriptedInput};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::{sleep, Instant};

    fn menu(device: Arc<RecordingHaptics>, input: ScriptedInput) -> Menu {
        menu_with_shutdown(device, input, CancellationToken::new())
    }

    fn menu_with_shutdown(
        device: Arc<RecordingHaptics>,
        input: ScriptedInput,
        shutdown: CancellationToken,
    ) -> Menu {
        let controller = ManualModeController::new(device.clone(), ManualSettings::default());
        Menu::new(
            device,
            Box::new(input),
            controller,
            QuickTestConfig::default(),
            shutdown,
        )
    }

    fn console(input: &'static str) -> Console {
        console_with_shutdown(input, CancellationToken::new()).0
    }

    // The sender is handed back so the console stays open past the script
    fn console_with_shutdown(
        input: &'static str,
        shutdown: CancellationToken,
    ) -> (Console, mpsc::UnboundedSender<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        for line in input.lines() {
            tx.send(line.to_string()).unwrap();
        }
        (Console::new(rx, shutdown), tx)
    }

    #[test]
    fn parses_choices_case_insensitively() {
        assert_eq!(MenuChoice::parse("1"), Some(MenuChoice::CustomTest));
        assert_eq!(MenuChoice::parse(" 2 "), Some(MenuChoice::QuickTest));
        assert_eq!(MenuChoice::parse("3"), Some(MenuChoice::ManualMode));
        assert_eq!(MenuChoice::parse("4"), Some(MenuChoice::StopRumble));
        assert_eq!(MenuChoice::parse("Q"), Some(MenuChoice::Quit));
        assert_eq!(MenuChoice::parse("5"), None);
        assert_eq!(MenuChoice::parse(""), None);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_test_uses_entered_values() {
        let device = RecordingHaptics::new();
        let mut menu = menu(device.clone(), ScriptedInput::new());
        let mut console = console("1\nx\n25\n100\n0.5\nq\n");

        menu.run(&mut console).await;

        let expected = RumbleCommand::timed(
            Intensity::new(0.25).unwrap(),
            Intensity::FULL,
            500,
        );
        assert_eq!(
            device.calls(),
            vec![HapticCall::SetMotors(expected), HapticCall::Stop]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn quick_test_and_stop() {
        let device = RecordingHaptics::new();
        let mut menu = menu(device.clone(), ScriptedInput::new());
        let mut console = console("2\nnope\n4\n");

        menu.run(&mut console).await;

        assert_eq!(
            device.calls(),
            vec![
                HapticCall::SetMotors(QuickTestConfig::default().command()),
                HapticCall::Stop,
                HapticCall::Stop,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn manual_mode_returns_to_menu_on_cancel() {
        let device = RecordingHaptics::new();
        let input = ScriptedInput::new()
            .press(10, ButtonId::Confirm)
            .press(50, ButtonId::Cancel);
        let mut menu = menu(device.clone(), input);

        let step = menu
            .dispatch(MenuChoice::ManualMode, &mut console(""))
            .await;

        assert_eq!(step, Step::Continue);
        assert_eq!(
            device.calls(),
            vec![
                HapticCall::SetMotors(RumbleCommand::sustained(Intensity::saturating(0.75))),
                HapticCall::Stop,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_custom_test_stops_and_leaves_the_menu() {
        let device = RecordingHaptics::new();
        let shutdown = CancellationToken::new();
        let mut menu = menu_with_shutdown(device.clone(), ScriptedInput::new(), shutdown.clone());
        let (mut console, _input) = console_with_shutdown("1\n50\n50\n3600\n", shutdown.clone());

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        menu.run(&mut console).await;

        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(device.calls().last(), Some(&HapticCall::Stop));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_while_waiting_for_a_choice_leaves_the_menu() {
        let device = RecordingHaptics::new();
        let shutdown = CancellationToken::new();
        let mut menu = menu_with_shutdown(device.clone(), ScriptedInput::new(), shutdown.clone());
        let (mut console, _input) = console_with_shutdown("", shutdown.clone());

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        menu.run(&mut console).await;

        assert!(device.calls().is_empty());
    }
}
