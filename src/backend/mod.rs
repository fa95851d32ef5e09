//! Backend command surfaces
//!
//! Two external tools own the real state of every monitored service:
//!
//! - `nmcli` - NetworkManager connections, addressed by UUID
//! - `systemctl` - systemd units such as `wg-quick@wg0`
//!
//! [`BackendKind`] picks the right command lines and output interpretation for
//! a service; the tool-specific details live in the submodules.

pub mod nmcli;
pub mod systemctl;

use crate::error::CommandError;
use crate::runner::CommandOutput;

/// Which external tool a service is managed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
  /// NetworkManager connection, identifier is the connection UUID
  ConnectionManager,
  /// systemd unit, identifier is the unit name
  ServiceManager,
}

impl BackendKind {
  /// Command that reports whether `identifier` is currently active
  pub fn status_command(self, identifier: &str) -> Vec<String> {
    match self {
      BackendKind::ConnectionManager => nmcli::active_command(identifier),
      BackendKind::ServiceManager => systemctl::status_command(identifier),
    }
  }

  /// Command that brings `identifier` up or down
  ///
  /// `use_sudo` only applies to systemd units; NetworkManager authorizes
  /// connection changes through polkit on its own.
  pub fn toggle_command(self, identifier: &str, active: bool, use_sudo: bool) -> Vec<String> {
    match self {
      BackendKind::ConnectionManager => nmcli::toggle_command(identifier, active),
      BackendKind::ServiceManager => systemctl::toggle_command(identifier, active, use_sudo),
    }
  }

  /// Interpret the output of [`BackendKind::status_command`]
  pub fn parse_status(self, output: &CommandOutput, argv: &[String]) -> Result<bool, CommandError> {
    match self {
      BackendKind::ConnectionManager => nmcli::parse_active(output, argv),
      BackendKind::ServiceManager => systemctl::parse_status(output, argv),
    }
  }
}

impl std::fmt::Display for BackendKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      BackendKind::ConnectionManager => write!(f, "nmcli"),
      BackendKind::ServiceManager => write!(f, "systemctl"),
    }
  }
}
