//! Line commands accepted by the daemon front end
//!
//! One command per line on stdin:
//!
//! ```text
//! up <service>       switch a service on
//! down <service>     switch a service off
//! toggle <service>   flip a service relative to its last known state
//! refresh            poll every service now
//! reload             re-read the settings file
//! status             print the current snapshot
//! quit               stop the indicator
//! ```
//!
//! A service can be named by identifier or display name.

use std::str::FromStr;

use chrono::Local;
use thiserror::Error;

use crate::indicator::{IndicatorSnapshot, icon_name};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
  Up(String),
  Down(String),
  Toggle(String),
  Refresh,
  Reload,
  Status,
  Help,
  Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
  #[error("unknown command `{0}`, try `help`")]
  Unknown(String),

  #[error("`{0}` needs a service name or identifier")]
  MissingTarget(&'static str),

  #[error("`{0}` takes no arguments")]
  UnexpectedArgument(&'static str),

  #[error("no service named `{0}`")]
  UnknownService(String),
}

pub const HELP: &str = "commands: up <service>, down <service>, toggle <service>, refresh, reload, status, quit";

impl ControlCommand {
  /// Parse one input line; blank lines yield `None`
  pub fn parse(line: &str) -> Result<Option<Self>, ControlError> {
    let line = line.trim();
    if line.is_empty() {
      return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
      Some((verb, rest)) => (verb, rest.trim()),
      None => (line, ""),
    };
    let verb = verb.to_ascii_lowercase();

    let command = match verb.as_str() {
      "up" | "on" => Self::Up(target("up", rest)?),
      "down" | "off" => Self::Down(target("down", rest)?),
      "toggle" => Self::Toggle(target("toggle", rest)?),
      "refresh" => bare(Self::Refresh, "refresh", rest)?,
      "reload" => bare(Self::Reload, "reload", rest)?,
      "status" => bare(Self::Status, "status", rest)?,
      "help" | "?" => bare(Self::Help, "help", rest)?,
      "quit" | "exit" => bare(Self::Quit, "quit", rest)?,
      _ => return Err(ControlError::Unknown(verb)),
    };
    Ok(Some(command))
  }

  /// Resolve a switch command into the identifier and requested state
  ///
  /// Returns `Ok(None)` for commands that do not switch anything.
  pub fn switch_request(&self, snapshot: &IndicatorSnapshot) -> Result<Option<(String, bool)>, ControlError> {
    let (target, intent) = match self {
      Self::Up(target) => (target, Some(true)),
      Self::Down(target) => (target, Some(false)),
      Self::Toggle(target) => (target, None),
      _ => return Ok(None),
    };

    let state = snapshot
      .find(target)
      .ok_or_else(|| ControlError::UnknownService(target.clone()))?;
    let active = intent.unwrap_or(!state.active);
    Ok(Some((state.identifier().to_string(), active)))
  }
}

impl FromStr for ControlCommand {
  type Err = ControlError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)?.ok_or_else(|| ControlError::Unknown(String::new()))
  }
}

fn target(verb: &'static str, rest: &str) -> Result<String, ControlError> {
  if rest.is_empty() {
    return Err(ControlError::MissingTarget(verb));
  }
  Ok(rest.to_string())
}

fn bare(command: ControlCommand, verb: &'static str, rest: &str) -> Result<ControlCommand, ControlError> {
  if rest.is_empty() {
    Ok(command)
  } else {
    Err(ControlError::UnexpectedArgument(verb))
  }
}

/// Human readable report of `snapshot`, one line per service
pub fn status_lines(snapshot: &IndicatorSnapshot) -> Vec<String> {
  let aggregate = match snapshot.aggregate {
    Some(true) => "active",
    Some(false) => "inactive",
    None => "unknown",
  };
  let mut lines = vec![format!(
    "VPN {aggregate} ({}), {} services",
    icon_name(snapshot.is_active(), snapshot.dark_icon_theme),
    snapshot.services.len()
  )];

  for state in &snapshot.services {
    let status = if state.active { "up" } else { "down" };
    let checked = state.last_checked.map_or_else(
      || "never checked".to_string(),
      |at| format!("checked {}", at.with_timezone(&Local).format("%H:%M:%S")),
    );
    let toggling = if snapshot.toggling.iter().any(|id| id == state.identifier()) {
      ", switching"
    } else {
      ""
    };
    lines.push(format!(
      "  {} [{}] {status}, {checked}{toggling}",
      state.service.name,
      state.identifier()
    ));
  }

  lines
}
