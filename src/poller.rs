//! Status polling
//!
//! A poll cycle runs one status check per service. The checks run concurrently
//! and every result is handed out the moment it lands, so a hung `systemctl`
//! for one unit never holds back the others. Callers that need the settled view
//! (the aggregate signal) wait for the whole cycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::FuturesUnordered;

use crate::catalog::Service;
use crate::error::CommandError;
use crate::runner::CommandRunner;

/// Last known state of one cataloged service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceState {
  pub service: Service,
  pub active: bool,
  /// `None` until the first successful check
  pub last_checked: Option<DateTime<Utc>>,
}

impl ServiceState {
  pub fn new(service: Service) -> Self {
    Self {
      service,
      active: false,
      last_checked: None,
    }
  }

  pub fn identifier(&self) -> &str {
    &self.service.identifier
  }

  /// Record a successful check
  pub fn record(&mut self, active: bool, checked_at: DateTime<Utc>) {
    self.active = active;
    self.last_checked = Some(checked_at);
  }

  /// Fold a check result into this state
  ///
  /// Returns the new value on success. A failed check is logged and keeps the
  /// last known state.
  pub fn apply(&mut self, outcome: &CheckOutcome) -> Option<bool> {
    match &outcome.result {
      Ok(active) => {
        self.record(*active, outcome.checked_at);
        Some(*active)
      }
      Err(e) => {
        tracing::warn!(
          "Status check for {} failed, keeping last known state: {e}",
          outcome.service.name
        );
        None
      }
    }
  }
}

/// Result of checking a single service
#[derive(Debug)]
pub struct CheckOutcome {
  pub service: Service,
  pub result: Result<bool, CommandError>,
  pub checked_at: DateTime<Utc>,
}

/// Run the backend status command for one service
pub async fn check_service(runner: &dyn CommandRunner, service: &Service) -> Result<bool, CommandError> {
  let argv = service.backend.status_command(&service.identifier);
  let output = runner.run(argv.clone()).await?;
  service.backend.parse_status(&output, &argv)
}

/// Check every service concurrently, calling `on_outcome` as each one finishes
///
/// Completion order is whatever the backends produce. Returns once all checks
/// have settled.
pub async fn poll_each<F>(runner: Arc<dyn CommandRunner>, services: Vec<Service>, mut on_outcome: F)
where
  F: FnMut(CheckOutcome),
{
  let mut pending: FuturesUnordered<_> = services
    .into_iter()
    .map(|service| {
      let runner = Arc::clone(&runner);
      async move {
        let result = check_service(runner.as_ref(), &service).await;
        CheckOutcome {
          service,
          result,
          checked_at: Utc::now(),
        }
      }
    })
    .collect();

  while let Some(outcome) = pending.next().await {
    on_outcome(outcome);
  }
}
