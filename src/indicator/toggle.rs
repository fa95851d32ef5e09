//! In-flight toggle bookkeeping
//!
//! At most one toggle command per service runs at a time. A request that
//! arrives while one is running is parked (latest intent wins) and issued once
//! the running command completes.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleDecision {
  /// Nothing in flight for this service: run the command now
  Issue,
  /// Parked behind the running command
  Queued,
  /// Same intent as the running command; nothing to do
  Duplicate,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
  active: bool,
  queued: Option<bool>,
}

#[derive(Debug, Default)]
pub struct ToggleTracker {
  in_flight: HashMap<String, Slot>,
}

impl ToggleTracker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a request to switch `identifier` on or off
  pub fn request(&mut self, identifier: &str, active: bool) -> ToggleDecision {
    let Some(slot) = self.in_flight.get_mut(identifier) else {
      self.in_flight.insert(identifier.to_string(), Slot { active, queued: None });
      return ToggleDecision::Issue;
    };

    if slot.active == active {
      // Flipping back to the running intent cancels anything parked
      slot.queued = None;
      ToggleDecision::Duplicate
    } else {
      slot.queued = Some(active);
      ToggleDecision::Queued
    }
  }

  /// The running command for `identifier` finished
  ///
  /// Returns the parked intent, which is now in flight, if there was one.
  pub fn complete(&mut self, identifier: &str) -> Option<bool> {
    let slot = self.in_flight.remove(identifier)?;
    let next = slot.queued?;
    self.in_flight.insert(
      identifier.to_string(),
      Slot {
        active: next,
        queued: None,
      },
    );
    Some(next)
  }

  pub fn is_pending(&self, identifier: &str) -> bool {
    self.in_flight.contains_key(identifier)
  }

  /// Identifiers with a command in flight, sorted
  pub fn pending_ids(&self) -> Vec<String> {
    let mut ids: Vec<String> = self.in_flight.keys().cloned().collect();
    ids.sort();
    ids
  }

  pub fn clear(&mut self) {
    self.in_flight.clear();
  }
}
