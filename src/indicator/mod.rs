//! Indicator control task
//!
//! [`Indicator`] owns a single tokio task holding every piece of mutable state:
//! the catalog generation, per-service states, the aggregate signal, running
//! checks and toggles, and the poll timer. Everything else talks to it through
//! messages:
//!
//! - [`IndicatorHandle`] sends user intents (toggle, reconfigure, refresh)
//! - spawned subprocess tasks report completions back as events
//! - the [`Presenter`] only receives render calls
//!
//! Every spawned command is tagged with the catalog generation it was issued
//! for. Once the catalog has been replaced its results are dropped.

mod presenter;
mod toggle;

pub use presenter::{LogPresenter, Presenter, icon_name};
pub use toggle::{ToggleDecision, ToggleTracker};

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::aggregate::AggregateSignal;
use crate::catalog::{self, Service};
use crate::config::PollConfiguration;
use crate::error::CommandError;
use crate::poller::{self, CheckOutcome, ServiceState};
use crate::runner::CommandRunner;

/// Read-only view of the indicator, refreshed by the control task
#[derive(Debug, Clone, Default)]
pub struct IndicatorSnapshot {
  pub generation: u64,
  pub services: Vec<ServiceState>,
  /// Last aggregate value sent to the presenter
  pub aggregate: Option<bool>,
  /// Identifiers with a toggle command in flight
  pub toggling: Vec<String>,
  pub dark_icon_theme: bool,
}

impl IndicatorSnapshot {
  /// Look a service up by identifier, falling back to its display name
  pub fn find(&self, target: &str) -> Option<&ServiceState> {
    self
      .services
      .iter()
      .find(|s| s.identifier() == target)
      .or_else(|| self.services.iter().find(|s| s.service.name == target))
  }

  pub fn is_active(&self) -> bool {
    self.aggregate.unwrap_or(false)
  }
}

#[derive(Debug)]
enum Request {
  Toggle { identifier: String, active: bool },
  Reconfigure(PollConfiguration),
  Refresh,
  Shutdown,
}

#[derive(Debug)]
enum Event {
  CatalogLoaded {
    generation: u64,
    services: Vec<Service>,
  },
  Checked {
    generation: u64,
    outcome: CheckOutcome,
  },
  CycleFinished {
    generation: u64,
  },
  ToggleFinished {
    generation: u64,
    identifier: String,
    result: Result<(), CommandError>,
  },
}

/// Cloneable sender side of a running [`Indicator`]
#[derive(Clone)]
pub struct IndicatorHandle {
  requests: mpsc::UnboundedSender<Request>,
  snapshot: Arc<RwLock<IndicatorSnapshot>>,
}

impl IndicatorHandle {
  /// Ask for `identifier` to be switched on or off
  ///
  /// Returns false once the indicator has stopped.
  pub fn request_toggle(&self, identifier: impl Into<String>, active: bool) -> bool {
    self.send(Request::Toggle {
      identifier: identifier.into(),
      active,
    })
  }

  /// Start a new configuration generation
  pub fn reconfigure(&self, config: PollConfiguration) -> bool {
    self.send(Request::Reconfigure(config))
  }

  /// Poll every service now, without touching the timer
  pub fn refresh(&self) -> bool {
    self.send(Request::Refresh)
  }

  pub fn snapshot(&self) -> IndicatorSnapshot {
    self.snapshot.read().clone()
  }

  pub fn is_active(&self) -> bool {
    self.snapshot.read().is_active()
  }

  pub fn is_running(&self) -> bool {
    !self.requests.is_closed()
  }

  fn send(&self, request: Request) -> bool {
    self.requests.send(request).is_ok()
  }
}

/// Owner of the control task; dropping it stops the task
pub struct Indicator {
  handle: IndicatorHandle,
  task: Option<JoinHandle<()>>,
}

impl Indicator {
  /// Start the control task and load the first catalog
  pub fn spawn<P: Presenter>(config: PollConfiguration, runner: Arc<dyn CommandRunner>, presenter: P) -> Self {
    let (requests_tx, requests_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let snapshot = Arc::new(RwLock::new(IndicatorSnapshot::default()));

    let controller = Controller {
      config,
      runner,
      presenter: Box::new(presenter),
      events: events_tx,
      shared: Arc::clone(&snapshot),
      generation: 0,
      catalog_ready: false,
      states: Vec::new(),
      signal: AggregateSignal::new(),
      checks: HashMap::new(),
      toggles: ToggleTracker::new(),
    };
    let task = tokio::spawn(controller.run(requests_rx, events_rx));

    Self {
      handle: IndicatorHandle {
        requests: requests_tx,
        snapshot,
      },
      task: Some(task),
    }
  }

  pub fn handle(&self) -> IndicatorHandle {
    self.handle.clone()
  }

  /// Stop the control task and wait for it to exit
  ///
  /// Commands already running are not cancelled; their results are discarded.
  pub async fn shutdown(mut self) {
    self.handle.send(Request::Shutdown);
    if let Some(task) = self.task.take()
      && let Err(e) = task.await
    {
      tracing::warn!("Indicator task ended abnormally: {e}");
    }
  }
}

impl Drop for Indicator {
  fn drop(&mut self) {
    if let Some(task) = self.task.take() {
      task.abort();
    }
  }
}

struct Controller {
  config: PollConfiguration,
  runner: Arc<dyn CommandRunner>,
  presenter: Box<dyn Presenter>,
  events: mpsc::UnboundedSender<Event>,
  shared: Arc<RwLock<IndicatorSnapshot>>,
  generation: u64,
  /// False between a reload and the arrival of its catalog
  catalog_ready: bool,
  states: Vec<ServiceState>,
  signal: AggregateSignal,
  /// Checks in flight, keyed by identifier. The flag marks a check that was
  /// issued before a toggle of the same service finished.
  checks: HashMap<String, bool>,
  toggles: ToggleTracker,
}

impl Controller {
  async fn run(mut self, mut requests: mpsc::UnboundedReceiver<Request>, mut events: mpsc::UnboundedReceiver<Event>) {
    self.reload();
    let mut ticker = self.ticker();

    loop {
      tokio::select! {
        request = requests.recv() => match request {
          Some(Request::Toggle { identifier, active }) => self.request_toggle(&identifier, active),
          Some(Request::Reconfigure(config)) => {
            self.config = config;
            self.reload();
            ticker = self.ticker();
          }
          Some(Request::Refresh) => self.start_cycle("refresh"),
          Some(Request::Shutdown) | None => break,
        },
        Some(event) = events.recv() => self.handle_event(event),
        _ = ticker.tick() => self.start_cycle("timer"),
      }
    }

    tracing::info!("Indicator stopped");
  }

  /// Periodic timer for the current configuration; the first tick is one full
  /// period away since every reload polls on its own
  fn ticker(&self) -> Interval {
    let period = self.config.interval();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::debug!("Polling every {}s", self.config.interval_secs());
    ticker
  }

  /// Begin a new generation and load its catalog in the background
  fn reload(&mut self) {
    self.generation += 1;
    self.catalog_ready = false;
    self.checks.clear();
    self.toggles.clear();
    self.presenter.configuration_changed(&self.config);
    self.publish();

    let generation = self.generation;
    let config = self.config.clone();
    let runner = Arc::clone(&self.runner);
    let events = self.events.clone();
    tokio::spawn(async move {
      let services = catalog::load(&config, runner.as_ref()).await;
      let _ = events.send(Event::CatalogLoaded { generation, services });
    });
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::CatalogLoaded { generation, services } if generation == self.generation => self.install_catalog(services),
      Event::Checked { generation, outcome } if generation == self.generation => self.apply_check(outcome),
      Event::CycleFinished { generation } if generation == self.generation => self.settle(),
      Event::ToggleFinished {
        generation,
        identifier,
        result,
      } if generation == self.generation => self.finish_toggle(&identifier, result),
      _ => tracing::debug!("Discarding result from a replaced catalog"),
    }
  }

  fn install_catalog(&mut self, services: Vec<Service>) {
    self.presenter.catalog_changed(&services);
    self.states = services.into_iter().map(ServiceState::new).collect();
    self.catalog_ready = true;
    self.publish();
    self.start_cycle("catalog loaded");
  }

  /// Check every service that does not already have a check running
  fn start_cycle(&mut self, reason: &str) {
    if !self.catalog_ready {
      tracing::debug!("Skipping {reason} poll while the catalog loads");
      return;
    }

    let services: Vec<Service> = self
      .states
      .iter()
      .filter(|s| !self.checks.contains_key(s.identifier()))
      .map(|s| s.service.clone())
      .collect();

    let busy = self.states.len() - services.len();
    if busy > 0 {
      tracing::debug!("{busy} checks from an earlier cycle are still running");
    }

    self.spawn_checks(services, reason);
  }

  fn spawn_checks(&mut self, services: Vec<Service>, reason: &str) {
    tracing::debug!("Polling {} services ({reason})", services.len());
    for service in &services {
      self.checks.insert(service.identifier.clone(), false);
    }

    let generation = self.generation;
    let runner = Arc::clone(&self.runner);
    let events = self.events.clone();
    tokio::spawn(async move {
      poller::poll_each(runner, services, |outcome| {
        let _ = events.send(Event::Checked { generation, outcome });
      })
      .await;
      let _ = events.send(Event::CycleFinished { generation });
    });
  }

  fn apply_check(&mut self, outcome: CheckOutcome) {
    let identifier = outcome.service.identifier.clone();
    let pending_toggle = self.toggles.is_pending(&identifier);

    if self.checks.remove(&identifier).unwrap_or(false) {
      tracing::debug!("Dropping status of {} taken before its toggle finished", outcome.service.name);
      if !pending_toggle {
        self.spawn_checks(vec![outcome.service], "recheck after toggle");
      }
      return;
    }

    if pending_toggle {
      tracing::debug!("Ignoring status of {} while it is being toggled", outcome.service.name);
      return;
    }

    let Some(state) = self.states.iter_mut().find(|s| s.service == outcome.service) else {
      return;
    };
    if let Some(active) = state.apply(&outcome) {
      self.presenter.service_state_changed(&identifier, active);
      self.publish();
    }
  }

  /// A cycle settled: recompute the aggregate from the full state collection
  fn settle(&mut self) {
    if let Some(active) = self.signal.update(&self.states) {
      tracing::debug!("Aggregate changed to {active}");
      self.presenter.aggregate_state_changed(active);
    }
    self.publish();
  }

  fn request_toggle(&mut self, identifier: &str, active: bool) {
    if !self.catalog_ready {
      tracing::warn!("Ignoring toggle of {identifier} while the catalog loads");
      return;
    }
    let Some(service) = self.find_service(identifier) else {
      tracing::warn!("Ignoring toggle of unknown service {identifier}");
      return;
    };

    let intent = if active { "on" } else { "off" };
    match self.toggles.request(identifier, active) {
      ToggleDecision::Issue => self.spawn_toggle(service, active),
      ToggleDecision::Queued => tracing::debug!("Switching {} {intent} after the running toggle", service.name),
      ToggleDecision::Duplicate => tracing::debug!("{} is already being switched {intent}", service.name),
    }
    self.publish();
  }

  fn spawn_toggle(&self, service: Service, active: bool) {
    let argv = service
      .backend
      .toggle_command(&service.identifier, active, self.config.use_sudo);
    tracing::info!("Switching {} {}", service.name, if active { "on" } else { "off" });

    let generation = self.generation;
    let runner = Arc::clone(&self.runner);
    let events = self.events.clone();
    let identifier = service.identifier;
    tokio::spawn(async move {
      let result = match runner.run(argv.clone()).await {
        Ok(output) => output.into_success(&argv).map(|_| ()),
        Err(e) => Err(e),
      };
      let _ = events.send(Event::ToggleFinished {
        generation,
        identifier,
        result,
      });
    });
  }

  /// Toggle outcomes are only logged; the follow-up poll decides what is shown
  fn finish_toggle(&mut self, identifier: &str, result: Result<(), CommandError>) {
    match result {
      Ok(()) => tracing::debug!("Toggle of {identifier} finished"),
      Err(e) => tracing::warn!("Toggle of {identifier} failed: {e}"),
    }

    if let Some(stale) = self.checks.get_mut(identifier) {
      *stale = true;
    }

    if let Some(next) = self.toggles.complete(identifier)
      && let Some(service) = self.find_service(identifier)
    {
      self.spawn_toggle(service, next);
    }

    self.start_cycle("toggle finished");
    self.publish();
  }

  fn find_service(&self, identifier: &str) -> Option<Service> {
    self
      .states
      .iter()
      .find(|s| s.identifier() == identifier)
      .map(|s| s.service.clone())
  }

  fn publish(&self) {
    let mut snapshot = self.shared.write();
    snapshot.generation = self.generation;
    snapshot.services.clone_from(&self.states);
    snapshot.aggregate = self.signal.current();
    snapshot.toggling = self.toggles.pending_ids();
    snapshot.dark_icon_theme = self.config.dark_icon_theme;
  }
}
