//! Service catalog
//!
//! Builds the list of monitored services for one configuration generation,
//! either from the static `name|identifier` list or by asking NetworkManager
//! for its WireGuard connections. Discovery problems never propagate: they are
//! logged and produce an empty catalog.

use std::collections::HashSet;

use crate::backend::{BackendKind, nmcli};
use crate::config::{DiscoveryMode, PollConfiguration};
use crate::error::CommandError;
use crate::runner::CommandRunner;

/// One monitored connection or unit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Service {
  /// Display label
  pub name: String,
  /// Opaque handle for the backend: connection UUID or unit name
  pub identifier: String,
  pub backend: BackendKind,
}

impl Service {
  pub fn new(name: impl Into<String>, identifier: impl Into<String>, backend: BackendKind) -> Self {
    Self {
      name: name.into(),
      identifier: identifier.into(),
      backend,
    }
  }

  /// Parse a static `name|identifier` entry
  ///
  /// An entry without `|` names the unit directly. Blank entries yield `None`.
  pub fn parse_entry(entry: &str) -> Option<Self> {
    let (name, identifier) = match entry.split_once('|') {
      Some((name, identifier)) => (name.trim(), identifier.trim()),
      None => (entry.trim(), entry.trim()),
    };

    if identifier.is_empty() {
      return None;
    }

    let name = if name.is_empty() { identifier } else { name };
    Some(Self::new(name, identifier, BackendKind::ServiceManager))
  }
}

/// Load the catalog for `config`
pub async fn load(config: &PollConfiguration, runner: &dyn CommandRunner) -> Vec<Service> {
  let services = match config.discovery {
    DiscoveryMode::Static => from_entries(&config.static_services),
    DiscoveryMode::ConnectionManagerQuery => match discover_connections(runner).await {
      Ok(services) => services,
      Err(e) => {
        tracing::warn!("Connection discovery failed, no services to monitor: {e}");
        Vec::new()
      }
    },
  };

  tracing::info!("Loaded {} services ({:?} discovery)", services.len(), config.discovery);
  services
}

/// Static entries in order, skipping blanks and repeated identifiers
pub fn from_entries(entries: &[String]) -> Vec<Service> {
  let mut seen = HashSet::new();
  let mut services = Vec::with_capacity(entries.len());

  for entry in entries {
    let Some(service) = Service::parse_entry(entry) else {
      tracing::debug!("Skipping empty service entry {entry:?}");
      continue;
    };
    if !seen.insert(service.identifier.clone()) {
      tracing::warn!("Ignoring duplicate service {}", service.identifier);
      continue;
    }
    services.push(service);
  }

  services
}

/// Ask NetworkManager for its WireGuard connections
pub async fn discover_connections(runner: &dyn CommandRunner) -> Result<Vec<Service>, CommandError> {
  let argv = nmcli::list_command();
  let output = runner.run(argv.clone()).await?.into_success(&argv)?;
  let connections = nmcli::parse_connection_table(&output.stdout_text())?;

  Ok(
    connections
      .into_iter()
      .filter(nmcli::Connection::is_vpn)
      .map(|c| Service::new(c.name, c.uuid, BackendKind::ConnectionManager))
      .collect(),
  )
}
