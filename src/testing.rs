//! Test doubles for the command runner and the presentation layer

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::catalog::Service;
use crate::error::CommandError;
use crate::indicator::Presenter;
use crate::runner::{CommandOutput, CommandRunner};

pub(crate) type Reply = BoxFuture<'static, Result<CommandOutput, CommandError>>;

type Handler = Box<dyn Fn(&[String]) -> Reply + Send + Sync>;

pub(crate) fn reply(output: CommandOutput) -> Reply {
  Box::pin(async move { Ok(output) })
}

pub(crate) fn argv_of(parts: &[&str]) -> Vec<String> {
  parts.iter().map(ToString::to_string).collect()
}

/// Runner that records every argv and answers through a closure
pub(crate) struct ScriptedRunner {
  handler: Handler,
  calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
  pub(crate) fn new<F>(handler: F) -> Self
  where
    F: Fn(&[String]) -> Reply + Send + Sync + 'static,
  {
    Self {
      handler: Box::new(handler),
      calls: Mutex::new(Vec::new()),
    }
  }

  /// Every command fails to spawn
  pub(crate) fn failing() -> Self {
    Self::new(|argv| {
      let program = argv.first().cloned().unwrap_or_default();
      Box::pin(async move {
        Err(CommandError::Spawn {
          program,
          source: std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
        })
      })
    })
  }

  /// Runner backed by a [`FakeWorld`]
  pub(crate) fn world(world: &FakeWorld) -> Self {
    let world = world.clone();
    Self::new(move |argv| reply(world.respond(argv)))
  }

  pub(crate) fn calls(&self) -> Vec<Vec<String>> {
    self.calls.lock().clone()
  }

  /// Number of recorded calls that start with `prefix`
  pub(crate) fn count(&self, prefix: &[&str]) -> usize {
    self
      .calls
      .lock()
      .iter()
      .filter(|argv| argv.len() >= prefix.len() && argv.iter().zip(prefix).all(|(a, p)| a == p))
      .count()
  }
}

impl CommandRunner for ScriptedRunner {
  fn run(&self, argv: Vec<String>) -> BoxFuture<'static, Result<CommandOutput, CommandError>> {
    let reply = (self.handler)(&argv);
    self.calls.lock().push(argv);
    reply
  }
}

/// In-memory stand-in for NetworkManager and systemd
#[derive(Clone, Default)]
pub(crate) struct FakeWorld {
  connections: Arc<Mutex<Vec<(String, String)>>>,
  active: Arc<Mutex<HashMap<String, bool>>>,
}

impl FakeWorld {
  /// A world with WireGuard connections given as `(name, uuid)`
  pub(crate) fn with_connections(connections: &[(&str, &str)]) -> Self {
    let world = Self::default();
    *world.connections.lock() = connections
      .iter()
      .map(|(name, uuid)| ((*name).to_string(), (*uuid).to_string()))
      .collect();
    world
  }

  pub(crate) fn set_active(&self, identifier: &str, active: bool) {
    self.active.lock().insert(identifier.to_string(), active);
  }

  pub(crate) fn is_active(&self, identifier: &str) -> bool {
    self.active.lock().get(identifier).copied().unwrap_or(false)
  }

  fn table(&self) -> String {
    let mut table = format!("{:<20}{:<40}{:<11}{}\n", "NAME", "UUID", "TYPE", "DEVICE");
    table.push_str(&format!("{:<20}{:<40}{:<11}{}\n", "Wired", "uuid-eth", "ethernet", "enp3s0"));
    for (name, uuid) in self.connections.lock().iter() {
      table.push_str(&format!("{name:<20}{uuid:<40}{:<11}{}\n", "wireguard", "--"));
    }
    table
  }

  pub(crate) fn respond(&self, argv: &[String]) -> CommandOutput {
    let parts: Vec<&str> = argv.iter().map(String::as_str).collect();
    let parts = match parts.as_slice() {
      ["sudo", "-n", rest @ ..] => rest,
      all => all,
    };

    match parts {
      ["nmcli", "connection", "show"] => CommandOutput::new(self.table(), "", 0),
      ["nmcli", "connection", "show", "--active", "uuid", id] => {
        if self.is_active(id) {
          CommandOutput::new(format!("connection.uuid: {id}\n"), "", 0)
        } else {
          CommandOutput::new("", format!("Error: {id} - no such connection profile."), 10)
        }
      }
      ["nmcli", "connection", action @ ("up" | "down"), "uuid", id] => {
        self.set_active(id, *action == "up");
        CommandOutput::new("Connection successfully activated\n", "", 0)
      }
      ["systemctl", "status", "--no-pager", "--", unit] => {
        if self.is_active(unit) {
          CommandOutput::new(format!("{unit}\n     Active: active (exited)\n"), "", 0)
        } else {
          CommandOutput::new(format!("{unit}\n     Active: inactive (dead)\n"), "", 3)
        }
      }
      ["systemctl", action @ ("start" | "stop"), "--", unit] => {
        self.set_active(unit, *action == "start");
        CommandOutput::default()
      }
      other => CommandOutput::new("", format!("unexpected command {other:?}"), 127),
    }
  }
}

/// What the indicator asked the presentation layer to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Rendered {
  Catalog(Vec<String>),
  Service(String, bool),
  Aggregate(bool),
}

/// Presenter that forwards every render call over a channel
pub(crate) struct ChannelPresenter {
  tx: mpsc::UnboundedSender<Rendered>,
}

impl ChannelPresenter {
  pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Rendered>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }
}

impl Presenter for ChannelPresenter {
  fn catalog_changed(&mut self, services: &[Service]) {
    let ids = services.iter().map(|s| s.identifier.clone()).collect();
    let _ = self.tx.send(Rendered::Catalog(ids));
  }

  fn service_state_changed(&mut self, identifier: &str, active: bool) {
    let _ = self.tx.send(Rendered::Service(identifier.to_string(), active));
  }

  fn aggregate_state_changed(&mut self, active: bool) {
    let _ = self.tx.send(Rendered::Aggregate(active));
  }
}

/// Wait for the next render call
pub(crate) async fn next_rendered(rx: &mut mpsc::UnboundedReceiver<Rendered>) -> Rendered {
  tokio::time::timeout(Duration::from_secs(5), rx.recv())
    .await
    .expect("timed out waiting for a render call")
    .expect("presenter channel closed")
}

/// Collect render calls up to and including the first aggregate notification
pub(crate) async fn until_aggregate(rx: &mut mpsc::UnboundedReceiver<Rendered>) -> Vec<Rendered> {
  let mut rendered = Vec::new();
  loop {
    let event = next_rendered(rx).await;
    let done = matches!(event, Rendered::Aggregate(_));
    rendered.push(event);
    if done {
      return rendered;
    }
  }
}

/// Assert that nothing else gets rendered for a short while
pub(crate) async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<Rendered>) {
  if let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
    panic!("unexpected render call: {event:?}");
  }
}
