//! Polling and toggle core for a VPN panel indicator
//!
//! The indicator watches a set of VPN-style connections through two external tools
//! and folds their state into a single "anything active" signal:
//!
//! - `catalog` - Discovers the monitored services (static list or `nmcli` query)
//! - `poller` - Fans out status checks and collects per-service results
//! - `aggregate` - Derives the aggregate signal and suppresses no-op notifications
//! - `indicator` - Owned control task tying polling, toggles and presentation together
//! - `backend` - Command lines and output parsing for `nmcli` and `systemctl`
//! - `runner` - Non-blocking subprocess execution behind a trait
//! - `config` - Settings file and the effective poll configuration
//! - `control` - Line commands accepted by the daemon front end
//! - `watcher` - Applies settings file edits to a running indicator

pub mod aggregate;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod control;
pub mod error;
pub mod indicator;
pub mod poller;
pub mod runner;
pub mod utils;
pub mod watcher;

#[cfg(test)]
pub(crate) mod testing;
