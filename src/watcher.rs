//! Settings file watcher
//!
//! Watches the directory holding the settings file, since editors usually
//! replace the file instead of writing it in place. A burst of change events
//! collapses into one re-read, and the indicator is reconfigured only when the
//! effective configuration actually changed.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{PollConfiguration, Settings};
use crate::indicator::IndicatorHandle;

/// Quiet period after the last change event before the file is re-read
pub const SETTLE_DELAY: Duration = Duration::from_millis(250);

/// Live settings watch; dropping it stops watching
pub struct SettingsWatcher {
  _watcher: RecommendedWatcher,
  task: JoinHandle<()>,
}

impl SettingsWatcher {
  /// Watch `path` and push changes into `handle`
  ///
  /// `current` is the configuration the indicator is running with. The
  /// settings directory is created if it does not exist yet.
  pub fn spawn(path: PathBuf, current: PollConfiguration, handle: IndicatorHandle) -> Result<Self> {
    let file_name = path
      .file_name()
      .map(OsStr::to_os_string)
      .with_context(|| format!("Settings path {} has no file name", path.display()))?;
    let dir = match path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
      _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = RecommendedWatcher::new(
      move |res: notify::Result<Event>| {
        let _ = tx.send(res);
      },
      Config::default(),
    )
    .context("Failed to create settings watcher")?;
    watcher
      .watch(&dir, RecursiveMode::NonRecursive)
      .with_context(|| format!("Failed to watch {}", dir.display()))?;
    tracing::info!("Watching {} for changes", path.display());

    let task = tokio::spawn(watch_loop(rx, path, file_name, current, handle));
    Ok(Self {
      _watcher: watcher,
      task,
    })
  }
}

impl Drop for SettingsWatcher {
  fn drop(&mut self) {
    self.task.abort();
  }
}

async fn watch_loop(
  mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
  path: PathBuf,
  file_name: OsString,
  mut current: PollConfiguration,
  handle: IndicatorHandle,
) {
  while let Some(event) = events.recv().await {
    if !is_settings_change(&event, &file_name) {
      continue;
    }

    // An editor save is several events; wait until they stop
    loop {
      match tokio::time::timeout(SETTLE_DELAY, events.recv()).await {
        Ok(Some(_)) => {}
        Ok(None) => return,
        Err(_) => break,
      }
    }

    if let Some(config) = changed_configuration(&path, &current) {
      if !handle.reconfigure(config.clone()) {
        break;
      }
      current = config;
    }
  }

  tracing::debug!("Settings watcher stopped");
}

fn is_settings_change(event: &notify::Result<Event>, file_name: &OsStr) -> bool {
  match event {
    Ok(event) => {
      matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
      ) && event.paths.iter().any(|p| p.file_name() == Some(file_name))
    }
    Err(e) => {
      tracing::warn!("Settings watcher error: {e}");
      false
    }
  }
}

/// Re-read `path`; `None` when it is unreadable or nothing effective changed
///
/// A removed file means defaults, the same as at startup.
pub fn changed_configuration(path: &Path, current: &PollConfiguration) -> Option<PollConfiguration> {
  let settings = match Settings::load_from(path) {
    Ok(settings) => settings,
    Err(e) => {
      tracing::warn!("{e:#}, keeping current settings");
      return None;
    }
  };

  let config = settings.poll_configuration();
  if config == *current {
    tracing::debug!("Settings file touched without effective changes");
    return None;
  }
  tracing::info!("Settings changed, reloading");
  Some(config)
}
