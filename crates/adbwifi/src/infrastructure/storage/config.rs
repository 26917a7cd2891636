//! TOML-based configuration for adbwifi.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\adbwifi\config.toml`
//! - Linux:    `~/.config/adbwifi/config.toml`
//! - macOS:    `~/Library/Application Support/adbwifi/config.toml`
//!
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [bridge]
//! adb_path = "adb"
//! tcpip_port = 5555
//! network_interface = "wlan0"
//! command_timeout_ms = 10000
//!
//! [connect]
//! settle_delay_ms = 1500
//! address_poll_attempts = 2
//! address_poll_interval_ms = 500
//!
//! [storage]
//! registry_path = "/home/me/devices.toml"
//! ```
//!
//! Every field has a `#[serde(default = "...")]` so the tool works before a
//! config file exists and keeps working when older files lack newer fields.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::orchestrator::OrchestratorConfig;
use crate::application::registry::StorageError;
use crate::infrastructure::bridge::AdbSettings;
use crate::infrastructure::storage::registry::default_registry_path;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub connect: ConnectConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// How the `adb` binary is invoked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// Program name (looked up on `PATH`) or absolute path.
    #[serde(default = "default_adb_path")]
    pub adb_path: String,
    /// Port passed to `adb tcpip` and appended to resolved addresses.
    #[serde(default = "default_tcpip_port")]
    pub tcpip_port: u16,
    /// Device interface queried for its IPv4 address.
    #[serde(default = "default_network_interface")]
    pub network_interface: String,
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

/// Timing of the USB-to-network connect sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectConfig {
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_address_poll_attempts")]
    pub address_poll_attempts: u32,
    #[serde(default = "default_address_poll_interval_ms")]
    pub address_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Overrides the registry location in the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_path: Option<PathBuf>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_adb_path() -> String {
    "adb".to_string()
}
fn default_tcpip_port() -> u16 {
    5555
}
fn default_network_interface() -> String {
    "wlan0".to_string()
}
fn default_command_timeout_ms() -> u64 {
    10_000
}
fn default_settle_delay_ms() -> u64 {
    1500
}
fn default_address_poll_attempts() -> u32 {
    2
}
fn default_address_poll_interval_ms() -> u64 {
    500
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            adb_path: default_adb_path(),
            tcpip_port: default_tcpip_port(),
            network_interface: default_network_interface(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            address_poll_attempts: default_address_poll_attempts(),
            address_poll_interval_ms: default_address_poll_interval_ms(),
        }
    }
}

impl AppConfig {
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            settle_delay: Duration::from_millis(self.connect.settle_delay_ms),
            address_poll_attempts: self.connect.address_poll_attempts,
            address_poll_interval: Duration::from_millis(self.connect.address_poll_interval_ms),
        }
    }

    pub fn adb_settings(&self) -> AdbSettings {
        AdbSettings {
            adb_path: PathBuf::from(&self.bridge.adb_path),
            tcpip_port: self.bridge.tcpip_port,
            network_interface: self.bridge.network_interface.clone(),
            command_timeout: Duration::from_millis(self.bridge.command_timeout_ms),
        }
    }

    /// The configured registry path, or the platform default.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoPlatformDataDir`] when no path is configured
    /// and the platform data directory is unknown.
    pub fn registry_path(&self) -> Result<PathBuf, StorageError> {
        match &self.storage.registry_path {
            Some(path) => Ok(path.clone()),
            None => default_registry_path(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("adbwifi").join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to `path`, creating the directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
