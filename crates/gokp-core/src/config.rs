//! Configuration file handling.
//!
//! Reads from `<config dir>/config.json`

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CLIPBOARD_TIMEOUT: u64 = 30;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Seconds a copied password stays on the clipboard.
    #[serde(rename = "clipboard-timeout", default = "default_clipboard_timeout")]
    pub clipboard_timeout: u64,
}

fn default_clipboard_timeout() -> u64 {
    DEFAULT_CLIPBOARD_TIMEOUT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clipboard_timeout: default_clipboard_timeout(),
        }
    }
}

/// Parse a user-supplied clipboard timeout. Only positive integers are accepted.
pub fn parse_clipboard_timeout(raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(seconds),
        _ => Err(Error::InvalidInput(format!(
            "Invalid clipboard timeout value '{raw}'. Must be a positive integer."
        ))),
    }
}

/// Reads and writes the config file at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load configuration from the config file.
    ///
    /// Creates a default config file if it doesn't exist.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            let config = Config::default();
            self.save(&config)?;
            tracing::info!("Config file not found, created defaults: {:?}", config);
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::io(format!("Failed to read config file {}", self.path.display()), e)
        })?;

        let config: Config = serde_json::from_str(&contents).map_err(|e| Error::Config {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        if config.clipboard_timeout == 0 {
            return Err(Error::Config {
                path: self.path.clone(),
                reason: "clipboard-timeout must be a positive integer".to_string(),
            });
        }

        tracing::debug!("Loaded config from {}: {:?}", self.path.display(), config);
        Ok(config)
    }

    /// Save configuration to the config file, four-space indented.
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::io(format!("Failed to create config directory {}", parent.display()), e)
            })?;
        }

        let mut contents = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut contents, formatter);
        config
            .serialize(&mut serializer)
            .map_err(|e| Error::Config {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        std::fs::write(&self.path, contents).map_err(|e| {
            Error::io(format!("Failed to write config file {}", self.path.display()), e)
        })?;
        tracing::info!("Config saved to {}", self.path.display());
        Ok(())
    }

    /// Validate `raw` and persist it as the new clipboard timeout.
    pub fn update_clipboard_timeout(&self, raw: &str) -> Result<Config> {
        let seconds = parse_clipboard_timeout(raw)?;
        let mut config = self.load()?;
        config.clipboard_timeout = seconds;
        self.save(&config)?;
        Ok(config)
    }

    /// Delete the config file. Returns `false` when there was nothing to delete.
    pub fn remove(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(
                format!("Failed to remove {}", self.path.display()),
                e,
            )),
        }
    }
}
