//! Presentation contract
//!
//! The indicator only ever writes to the presenter. User intents travel the
//! other way through [`super::IndicatorHandle`], so a state correction rendered
//! here can never loop back into a toggle.

use std::collections::HashMap;

use crate::catalog::Service;
use crate::config::PollConfiguration;

/// Render side of the indicator, driven from the control task
pub trait Presenter: Send + 'static {
  /// A new configuration generation took effect
  fn configuration_changed(&mut self, _config: &PollConfiguration) {}

  /// The catalog was replaced; every service starts out inactive
  fn catalog_changed(&mut self, _services: &[Service]) {}

  /// A successful status check for one service
  fn service_state_changed(&mut self, identifier: &str, active: bool);

  /// The aggregate value flipped (or was computed for the first time)
  fn aggregate_state_changed(&mut self, active: bool);
}

/// Panel icon for the aggregate state, e.g. `wireguard-active-dark`
pub fn icon_name(active: bool, dark_theme: bool) -> String {
  let status = if active { "active" } else { "paused" };
  let theme = if dark_theme { "dark" } else { "light" };
  format!("wireguard-{status}-{theme}")
}

/// Presenter that reports everything through `tracing`
#[derive(Debug, Default)]
pub struct LogPresenter {
  dark_theme: bool,
  names: HashMap<String, String>,
  rendered: HashMap<String, bool>,
}

impl LogPresenter {
  pub fn new() -> Self {
    Self::default()
  }

  fn label<'a>(&'a self, identifier: &'a str) -> &'a str {
    self.names.get(identifier).map_or(identifier, String::as_str)
  }
}

impl Presenter for LogPresenter {
  fn configuration_changed(&mut self, config: &PollConfiguration) {
    self.dark_theme = config.dark_icon_theme;
  }

  fn catalog_changed(&mut self, services: &[Service]) {
    self.names = services
      .iter()
      .map(|s| (s.identifier.clone(), s.name.clone()))
      .collect();
    self.rendered.clear();

    let names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
    tracing::info!("Monitoring {} services: {}", services.len(), names.join(", "));
  }

  fn service_state_changed(&mut self, identifier: &str, active: bool) {
    // Every successful check is rendered; only log actual switches
    if self.rendered.insert(identifier.to_string(), active) == Some(active) {
      return;
    }
    let state = if active { "up" } else { "down" };
    tracing::info!("{} is {state}", self.label(identifier));
  }

  fn aggregate_state_changed(&mut self, active: bool) {
    let icon = icon_name(active, self.dark_theme);
    if active {
      tracing::info!(icon = %icon, "VPN active");
    } else {
      tracing::info!(icon = %icon, "VPN inactive");
    }
  }
}
