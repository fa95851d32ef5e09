//! Aggregate "anything active" signal

use crate::poller::ServiceState;

/// True when at least one service is active; false for an empty catalog
pub fn aggregate(states: &[ServiceState]) -> bool {
  states.iter().any(|state| state.active)
}

/// Tracks the last notified aggregate value
///
/// The value is recomputed from the full state collection every time and only
/// reported when it differs from what was last reported. Before the first
/// report the previous value is unknown, so the first computation always
/// reports.
#[derive(Debug, Default)]
pub struct AggregateSignal {
  last: Option<bool>,
}

impl AggregateSignal {
  pub fn new() -> Self {
    Self::default()
  }

  /// Recompute from `states`; returns the new value if it flipped
  pub fn update(&mut self, states: &[ServiceState]) -> Option<bool> {
    let active = aggregate(states);
    if self.last == Some(active) {
      return None;
    }
    self.last = Some(active);
    Some(active)
  }

  /// Last reported value, `None` before the first report
  pub fn current(&self) -> Option<bool> {
    self.last
  }
}
