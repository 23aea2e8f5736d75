pub mod config;
pub mod gamepad;
pub mod haptics;
pub mod input;
pub mod manual;
pub mod menu;

#[cfg(test)]
mod testing;

use crate::config::TesterConfig;
use crate::gamepad::GamepadSession;
use crate::haptics::HapticDevice;
use crate::manual::ManualModeController;
use crate::menu::{Console, Menu, MenuChoice};
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "rumble-tester", version)]
#[command(about = "Exercise the rumble motors of a connected controller")]
struct Cli {
    /// Configuration file (defaults to <config dir>/rumble-tester/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides log.level from the configuration
    #[arg(long)]
    log_level: Option<String>,

    /// Go straight to manual mode and exit when it ends
    #[arg(long)]
    manual: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup()?;

    let config = TesterConfig::load(cli.config.as_deref())?;
    let level = cli.log_level.as_deref().unwrap_or(&config.log.level);
    setup_logging(level)?;
    info!("Starting rumble tester with {:?}", config);

    let shutdown = CancellationToken::new();
    watch_ctrl_c(shutdown.clone());

    let (session, events) = match GamepadSession::connect(config.gamepad.clone()).await {
        Ok(connected) => connected,
        Err(e) => {
            error!("Failed to connect controller: {}", e);
            println!("{}", format!("{}!", e).red());
            println!("Please connect a controller and try again.");
            return Ok(ExitCode::FAILURE);
        }
    };
    println!(
        "{}",
        format!("Connected to: {}", session.info().name).green()
    );

    let device: Arc<dyn HapticDevice> = session.rumble();
    let controller = ManualModeController::new(device.clone(), config.manual.clone());
    let mut menu = Menu::new(
        device.clone(),
        Box::new(events),
        controller,
        config.quick_test,
        shutdown.clone(),
    );
    let mut console = Console::stdin(shutdown.clone())?;

    if cli.manual {
        menu.dispatch(MenuChoice::ManualMode, &mut console).await;
    } else {
        menu.run(&mut console).await;
    }

    if shutdown.is_cancelled() {
        println!("\nExiting...");
    }
    if let Err(e) = device.stop() {
        warn!("Failed to stop rumble during cleanup: {}", e);
    }
    session.close().await;
    info!("Rumble tester finished");
    Ok(ExitCode::SUCCESS)
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    Ok(())
}

fn setup_logging(level: &str) -> Result<()> {
    let level: Level = level
        .parse()
        .map_err(|_| eyre!("Unknown log level: {}", level))?;

    // stderr keeps the log out of the menu on stdout
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn watch_ctrl_c(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}
