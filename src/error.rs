//! Errors raised while running backend commands

use std::time::Duration;

/// Failure modes of a single backend command
///
/// A non-zero exit is not an error by itself: each backend decides which exit
/// codes are valid answers and maps the rest to `Backend`.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
  /// The command could not be launched (missing binary, permissions, empty argv)
  #[error("failed to run `{program}`: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The command did not finish within the per-call timeout and was killed
  #[error("`{program}` did not finish within {timeout:?}")]
  Timeout { program: String, timeout: Duration },

  /// The command ran but reported a failure
  #[error("`{command}` exited with status {exit_code}: {stderr}")]
  Backend {
    command: String,
    exit_code: i32,
    stderr: String,
  },

  /// The command succeeded but its output had an unexpected shape
  #[error("unexpected output from `{command}`: {reason}")]
  Parse { command: String, reason: String },
}

impl CommandError {
  pub fn parse(command: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::Parse {
      command: command.into(),
      reason: reason.into(),
    }
  }
}
