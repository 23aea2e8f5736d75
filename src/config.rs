use crate::gamepad::GamepadSettings;
use crate::haptics::{Intensity, RumbleCommand};
use crate::manual::ManualSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const CONFIG_DIR: &str = "rumble-tester";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct TesterConfig {
    pub log: LogConfig,
    pub gamepad: GamepadSettings,
    pub manual: ManualSettings,
    pub quick_test: QuickTestConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct LogConfig {
    /// trace, debug, info, warn or error
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Menu option 2
#[derive(Deserialize, Serialize, Clone, Copy, Debug)]
#[serde(default)]
pub struct QuickTestConfig {
    pub intensity: Intensity,
    pub duration_ms: u32,
}

impl Default for QuickTestConfig {
    fn default() -> Self {
        Self {
            intensity: Intensity::saturating(0.75),
            duration_ms: 2000,
        }
    }
}

impl QuickTestConfig {
    pub fn command(&self) -> RumbleCommand {
        RumbleCommand::timed(self.intensity, self.intensity, self.duration_ms)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms as u64)
    }
}

impl TesterConfig {
    /// `<config dir>/rumble-tester/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push(CONFIG_DIR);
            path.push(CONFIG_FILE);
            path
        })
    }

    /// Loads `path`, or the default location when `None`
    ///
    /// An explicit path has to exist. A missing file at the default location
    /// yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    debug!("No configuration file, using defaults");
                    Self::default()
                }
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.manual.tick_ms == 0 {
            return Err(ConfigError::Invalid("manual.tick_ms must be > 0".into()));
        }
        if self.gamepad.pump_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "gamepad.pump_interval_ms must be > 0".into(),
            ));
        }
        if self.quick_test.duration_ms == 0 {
            return Err(ConfigError::Invalid(
                "quick_test.duration_ms must be > 0".into(),
            ));
        }
        let warning = &self.manual.warning;
        if warning.active_ms == 0 && warning.quiet_ms == 0 {
            return Err(ConfigError::Invalid(
                "manual.warning needs a non-zero active_ms or quiet_ms".into(),
            ));
        }
        if self.log.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.log.level
            )));
        }
        Ok(())
    }
}
