//! VPN indicator daemon
//!
//! Runs the indicator with a logging presenter and takes control commands on
//! stdin until `quit`, SIGINT or SIGTERM. Settings file edits apply on their
//! own; SIGHUP or `reload` forces a re-read.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{SignalKind, signal};
use tracing_subscriber::EnvFilter;

use vpn_indicator::config::Settings;
use vpn_indicator::control::{self, ControlCommand, HELP};
use vpn_indicator::indicator::{Indicator, IndicatorHandle, LogPresenter};
use vpn_indicator::runner::SystemRunner;
use vpn_indicator::utils::find_binary;
use vpn_indicator::watcher::SettingsWatcher;

struct Frontend {
  handle: IndicatorHandle,
  settings_path: PathBuf,
}

impl Frontend {
  /// Returns false once the indicator is gone
  fn execute(&self, command: &ControlCommand) -> bool {
    match command {
      ControlCommand::Up(_) | ControlCommand::Down(_) | ControlCommand::Toggle(_) => {
        match command.switch_request(&self.handle.snapshot()) {
          Ok(Some((identifier, active))) => self.handle.request_toggle(identifier, active),
          Ok(None) => true,
          Err(e) => {
            tracing::warn!("{e}");
            true
          }
        }
      }
      ControlCommand::Refresh => self.handle.refresh(),
      ControlCommand::Reload => {
        let settings = Settings::load_or_default(&self.settings_path);
        tracing::info!("Reloaded settings from {}", self.settings_path.display());
        self.handle.reconfigure(settings.poll_configuration())
      }
      ControlCommand::Status => {
        for line in control::status_lines(&self.handle.snapshot()) {
          tracing::info!("{line}");
        }
        true
      }
      ControlCommand::Help => {
        tracing::info!("{HELP}");
        true
      }
      ControlCommand::Quit => false,
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let settings_path = Settings::path();
  let settings = Settings::load_or_default(&settings_path);
  tracing::info!("Using settings from {}", settings_path.display());

  for program in ["nmcli", "systemctl"] {
    if find_binary(program).is_none() {
      tracing::warn!("{program} not found, services using it will report inactive");
    }
  }

  let config = settings.poll_configuration();
  let indicator = Indicator::spawn(config.clone(), Arc::new(SystemRunner::new()), LogPresenter::new());

  let _watcher = match SettingsWatcher::spawn(settings_path.clone(), config, indicator.handle()) {
    Ok(watcher) => Some(watcher),
    Err(e) => {
      tracing::warn!("{e:#}; settings edits need `reload` or SIGHUP");
      None
    }
  };

  let frontend = Frontend {
    handle: indicator.handle(),
    settings_path,
  };

  let mut terminate = signal(SignalKind::terminate())?;
  let mut hangup = signal(SignalKind::hangup())?;
  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut stdin_open = true;

  loop {
    tokio::select! {
      line = lines.next_line(), if stdin_open => match line {
        Ok(Some(line)) => match ControlCommand::parse(&line) {
          Ok(Some(command)) => {
            if !frontend.execute(&command) {
              break;
            }
          }
          Ok(None) => {}
          Err(e) => tracing::warn!("{e}"),
        },
        Ok(None) => {
          tracing::debug!("stdin closed, running until interrupted");
          stdin_open = false;
        }
        Err(e) => {
          tracing::warn!("Failed to read stdin: {e}");
          stdin_open = false;
        }
      },
      _ = tokio::signal::ctrl_c() => {
        tracing::info!("Interrupted");
        break;
      }
      _ = hangup.recv() => {
        frontend.execute(&ControlCommand::Reload);
      }
      _ = terminate.recv() => {
        tracing::info!("Terminated");
        break;
      }
    }
  }

  indicator.shutdown().await;
  Ok(())
}
