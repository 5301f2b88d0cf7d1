//! Configuration for the update session controller.

use crate::error::{Result, UpdateError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Controller timing and scheduling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Whether the controller schedules background (silent) checks.
    ///
    /// When `false` only user-requested checks run.
    pub auto_check: bool,
    /// Delay before the first background check, in seconds.
    ///
    /// Keeps the check from competing with application startup I/O.
    pub startup_delay_secs: u64,
    /// Period between background checks, in seconds.
    pub check_interval_secs: u64,
    /// How long a notification stays visible, in seconds.
    pub notification_ttl_secs: u64,
    /// Capacity of the command channel between handles and the controller.
    pub command_capacity: usize,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            auto_check: true,
            startup_delay_secs: 3,
            check_interval_secs: 2 * 3600,
            notification_ttl_secs: 5,
            command_capacity: 32,
        }
    }
}

impl UpdateConfig {
    /// Warm-up delay before the first background check.
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    /// Period of the recurring background check.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Display lifetime of a notification.
    pub fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.notification_ttl_secs)
    }

    /// Reject settings the controller cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Config`] if the check interval or the
    /// notification lifetime is zero.
    pub fn validate(&self) -> Result<()> {
        if self.check_interval_secs == 0 {
            return Err(UpdateError::Config(
                "check_interval_secs must be greater than zero".to_owned(),
            ));
        }
        if self.notification_ttl_secs == 0 {
            return Err(UpdateError::Config(
                "notification_ttl_secs must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| UpdateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| UpdateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/update-session/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config)
                .join("update-session")
                .join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("update-session")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/update-session/config.toml")
        }
    }
}
