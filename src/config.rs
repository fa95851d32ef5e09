//! Settings file and effective poll configuration
//!
//! Settings live in `~/.config/vpn-indicator/settings.yaml` (or the file named by
//! `VPN_INDICATOR_CONFIG`). A missing file means defaults. The core never reads
//! [`Settings`] directly; it consumes the normalized [`PollConfiguration`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable overriding the settings file location
pub const CONFIG_ENV: &str = "VPN_INDICATOR_CONFIG";

pub const MIN_INTERVAL_SECS: u64 = 5;
pub const MAX_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_CHECK_INTERVAL: i64 = 10;

const SETTINGS_FILE: &str = "settings.yaml";

/// Where the monitored services come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DiscoveryMode {
  /// The configured `name|unit` list, managed through systemctl
  #[default]
  #[serde(rename = "static")]
  Static,
  /// WireGuard connections listed by `nmcli connection show`
  #[serde(rename = "nmcli")]
  ConnectionManagerQuery,
}

/// Clamp a stored interval into the supported range
pub fn clamp_interval(secs: i64) -> u64 {
  u64::try_from(secs).map_or(MIN_INTERVAL_SECS, |secs| secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS))
}

/// Settings location: explicit override, then `<config dir>/vpn-indicator`,
/// then `~/.config/vpn-indicator`
fn settings_path(overridden: Option<String>, config_dir: Option<PathBuf>, home_dir: Option<PathBuf>) -> PathBuf {
  if let Some(path) = overridden
    && !path.is_empty()
  {
    return PathBuf::from(path);
  }

  let Some(base) = config_dir.or_else(|| home_dir.map(|home| home.join(".config"))) else {
    tracing::warn!("No config or home directory, reading settings from the working directory");
    return PathBuf::from(SETTINGS_FILE);
  };
  base.join("vpn-indicator").join(SETTINGS_FILE)
}

/// Settings as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub discovery: DiscoveryMode,
  /// Static services as `name|identifier` entries
  pub services: Vec<String>,
  /// Wrap systemctl start/stop in `sudo -n`
  pub sudo: bool,
  /// Poll interval in seconds; clamped when turned into a [`PollConfiguration`]
  pub check_interval: i64,
  pub dark_theme: bool,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      discovery: DiscoveryMode::Static,
      services: Vec::new(),
      sudo: false,
      check_interval: DEFAULT_CHECK_INTERVAL,
      dark_theme: false,
    }
  }
}

impl Settings {
  /// Resolve the settings file path
  pub fn path() -> PathBuf {
    settings_path(std::env::var(CONFIG_ENV).ok(), dirs::config_dir(), dirs::home_dir())
  }

  /// Read settings from `path`; a missing file yields defaults
  pub fn load_from(path: &Path) -> Result<Self> {
    if !path.exists() {
      tracing::debug!("No settings at {}, using defaults", path.display());
      return Ok(Self::default());
    }

    let content =
      std::fs::read_to_string(path).with_context(|| format!("Failed to read settings at {}", path.display()))?;
    Self::from_yaml(&content).with_context(|| format!("Failed to parse settings at {}", path.display()))
  }

  /// Like [`Settings::load_from`], but logs failures and falls back to defaults
  pub fn load_or_default(path: &Path) -> Self {
    match Self::load_from(path) {
      Ok(settings) => settings,
      Err(e) => {
        tracing::warn!("{e:#}");
        Self::default()
      }
    }
  }

  pub fn from_yaml(content: &str) -> Result<Self> {
    if content.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(content)?)
  }

  pub fn poll_configuration(&self) -> PollConfiguration {
    PollConfiguration {
      interval_secs: clamp_interval(self.check_interval),
      use_sudo: self.sudo,
      discovery: self.discovery,
      dark_icon_theme: self.dark_theme,
      static_services: self.services.clone(),
    }
  }
}

/// Normalized configuration consumed by the indicator core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfiguration {
  interval_secs: u64,
  pub use_sudo: bool,
  pub discovery: DiscoveryMode,
  pub dark_icon_theme: bool,
  pub static_services: Vec<String>,
}

impl PollConfiguration {
  pub fn interval_secs(&self) -> u64 {
    self.interval_secs
  }

  pub fn interval(&self) -> Duration {
    Duration::from_secs(self.interval_secs)
  }

  /// Set the poll interval, clamped into the supported range
  #[must_use]
  pub fn with_interval(mut self, secs: i64) -> Self {
    self.interval_secs = clamp_interval(secs);
    self
  }

  #[must_use]
  pub fn with_discovery(mut self, discovery: DiscoveryMode) -> Self {
    self.discovery = discovery;
    self
  }

  #[must_use]
  pub fn with_services<I, S>(mut self, services: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.static_services = services.into_iter().map(Into::into).collect();
    self
  }

  #[must_use]
  pub fn with_sudo(mut self, use_sudo: bool) -> Self {
    self.use_sudo = use_sudo;
    self
  }
}

impl Default for PollConfiguration {
  fn default() -> Self {
    Settings::default().poll_configuration()
  }
}
