//! TOML-based configuration for the capture application.
//!
//! Reads and writes `AppConfig` from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\InputMirror\config.toml`
//! - Linux:    `~/.config/inputmirror/config.toml`
//! - macOS:    `~/Library/Application Support/InputMirror/config.toml`
//!
//! A `--config` path on the command line replaces the platform location.
//!
//! ```toml
//! [publish]
//! server_address = "10.0.0.2"
//! port = 24810
//! table = "KeyboardMouseEvents"
//!
//! [capture]
//! keys = ["w", "a", "s", "d", "space"]
//! toggle_key = "p"
//!
//! [signals]
//! max_pointer_speed = 1500.0
//! ```
//!
//! # Serde default values
//!
//! Every section and every field has a default, so a missing file, a missing
//! section, or a config written by an older version all load cleanly.
//! [`AppConfig::validate`] then rejects values that parse but make no sense.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mirror_core::protocol::messages::DEFAULT_TABLE_PORT;
use mirror_core::{HidKeyCode, Modifier, MouseButton, SignalLimits, TrackedSet};

use crate::application::translate_input::TranslatorSettings;

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

    /// The config parsed but a value is out of range or inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub signals: SignalsConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Where and as whom state is published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishConfig {
    /// Host name or IP address of the table server.
    #[serde(default = "default_server_address")]
    pub server_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Table the channels are written into.
    #[serde(default = "default_table")]
    pub table: String,
    /// Name this publisher identifies itself with.
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Connect plus handshake timeout.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// What is tracked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    /// Key names (`"q"`, `"1"`, `"space"`, ...).
    #[serde(default = "default_keys")]
    pub keys: Vec<String>,
    /// Subset of `ctrl`, `alt`, `shift`.
    #[serde(default = "default_modifiers")]
    pub modifiers: Vec<String>,
    /// Subset of `mouse_left`, `mouse_right`, `mouse_middle`.
    #[serde(default = "default_buttons")]
    pub buttons: Vec<String>,
    /// Key that pauses and resumes capture.  Must not be tracked.
    #[serde(default = "default_toggle_key")]
    pub toggle_key: String,
}

/// Normalization and decay tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalsConfig {
    /// Pointer speed (px/s) published as 1.0.
    #[serde(default = "default_max_pointer_speed")]
    pub max_pointer_speed: f64,
    /// Scroll speed (notches/s) published as 1.0.
    #[serde(default = "default_max_scroll_speed")]
    pub max_scroll_speed: f64,
    /// Continuous signals fall back to 0 after this long without an update.
    #[serde(default = "default_idle_threshold_ms")]
    pub idle_threshold_ms: u64,
}

/// Loop and process settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Render the live status block in the terminal.
    #[serde(default = "default_true")]
    pub show_status: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_server_address() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    DEFAULT_TABLE_PORT
}
fn default_table() -> String {
    "KeyboardMouseEvents".to_string()
}
fn default_client_name() -> String {
    "KeyboardMouseClient".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_keys() -> Vec<String> {
    "qwertasdfghzxcv12345".chars().map(String::from).collect()
}
fn default_modifiers() -> Vec<String> {
    Modifier::ALL.iter().map(|m| m.name().to_string()).collect()
}
fn default_buttons() -> Vec<String> {
    MouseButton::ALL.iter().map(|b| b.name().to_string()).collect()
}
fn default_toggle_key() -> String {
    "p".to_string()
}
fn default_max_pointer_speed() -> f64 {
    mirror_core::domain::normalize::DEFAULT_MAX_POINTER_SPEED
}
fn default_max_scroll_speed() -> f64 {
    mirror_core::domain::normalize::DEFAULT_MAX_SCROLL_SPEED
}
fn default_idle_threshold_ms() -> u64 {
    100
}
fn default_tick_rate_hz() -> u32 {
    60
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            server_address: default_server_address(),
            port: default_port(),
            table: default_table(),
            client_name: default_client_name(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            keys: default_keys(),
            modifiers: default_modifiers(),
            buttons: default_buttons(),
            toggle_key: default_toggle_key(),
        }
    }
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            max_pointer_speed: default_max_pointer_speed(),
            max_scroll_speed: default_max_scroll_speed(),
            idle_threshold_ms: default_idle_threshold_ms(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate_hz(),
            log_level: default_log_level(),
            show_status: default_true(),
        }
    }
}

// ── Derived settings and validation ───────────────────────────────────────────

impl AppConfig {
    /// Checks every value that the type system cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tracked = self.tracked_set()?;
        let toggle = self.toggle_key()?;
        if tracked.keys().contains(&toggle) {
            return Err(ConfigError::Invalid(format!(
                "toggle_key {:?} must not also be a tracked key",
                self.capture.toggle_key
            )));
        }

        for (name, value) in [
            ("max_pointer_speed", self.signals.max_pointer_speed),
            ("max_scroll_speed", self.signals.max_scroll_speed),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if self.runtime.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("tick_rate_hz must be at least 1".into()));
        }
        if self.publish.server_address.trim().is_empty() {
            return Err(ConfigError::Invalid("server_address must not be empty".into()));
        }
        if self.publish.table.trim().is_empty() {
            return Err(ConfigError::Invalid("table must not be empty".into()));
        }
        Ok(())
    }

    /// Builds the tracked identifier set from the `[capture]` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unknown names or duplicates.
    pub fn tracked_set(&self) -> Result<TrackedSet, ConfigError> {
        let keys = self
            .capture
            .keys
            .iter()
            .map(|name| {
                HidKeyCode::from_name(name)
                    .ok_or_else(|| ConfigError::Invalid(format!("unknown key name {name:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let modifiers = self
            .capture
            .modifiers
            .iter()
            .map(|name| {
                Modifier::from_name(name)
                    .ok_or_else(|| ConfigError::Invalid(format!("unknown modifier {name:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let buttons = self
            .capture
            .buttons
            .iter()
            .map(|name| {
                MouseButton::from_name(name)
                    .ok_or_else(|| ConfigError::Invalid(format!("unknown mouse button {name:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        TrackedSet::new(keys, modifiers, buttons).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Resolves the pause/resume key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the name is not a known key.
    pub fn toggle_key(&self) -> Result<HidKeyCode, ConfigError> {
        HidKeyCode::from_name(&self.capture.toggle_key).ok_or_else(|| {
            ConfigError::Invalid(format!("unknown toggle_key {:?}", self.capture.toggle_key))
        })
    }

    /// Validates the config and assembles the translator's startup settings.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::validate`].
    pub fn translator_settings(&self) -> Result<TranslatorSettings, ConfigError> {
        self.validate()?;
        Ok(TranslatorSettings {
            tracked: self.tracked_set()?,
            toggle_key: self.toggle_key()?,
            limits: self.signal_limits(),
            idle_threshold: self.idle_threshold(),
        })
    }

    pub fn signal_limits(&self) -> SignalLimits {
        SignalLimits {
            max_pointer_speed: self.signals.max_pointer_speed,
            max_scroll_speed: self.signals.max_scroll_speed,
        }
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_millis(self.signals.idle_threshold_ms)
    }

    /// Interval between ticks; a zero rate is treated as 1 Hz.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.runtime.tick_rate_hz.max(1)))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.publish.connect_timeout_ms)
    }

    /// `host:port` of the table server.
    pub fn server_endpoint(&self) -> String {
        format!("{}:{}", self.publish.server_address, self.publish.port)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Loads `AppConfig` from the platform config file.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Persists `config` to `path`, creating parent directories as needed.
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

/// Resolves the platform config directory, including the `InputMirror`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("InputMirror"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("inputmirror"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("InputMirror")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
