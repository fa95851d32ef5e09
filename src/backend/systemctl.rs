//! systemd (`systemctl`) command lines and status parsing

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CommandError;
use crate::runner::CommandOutput;

pub const PROGRAM: &str = "systemctl";

/// Privilege wrapper; `-n` makes it fail instead of prompting for a password
const SUDO: [&str; 2] = ["sudo", "-n"];

/// Highest exit code `systemctl status` uses for a known unit (3 = not running)
const LAST_STATUS_EXIT: i32 = 3;

/// The `Active:` line of `systemctl status` for a running unit
static ACTIVE_MARKER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?m)^\s*Active:\s+active\b").expect("active marker regex is valid"));

/// `systemctl status --no-pager -- <unit>`
///
/// The unit comes from user settings; `--` keeps a name starting with `-` from
/// being read as an option.
pub fn status_command(unit: &str) -> Vec<String> {
  [PROGRAM, "status", "--no-pager", "--", unit]
    .iter()
    .map(ToString::to_string)
    .collect()
}

/// `[sudo -n] systemctl start|stop -- <unit>`
pub fn toggle_command(unit: &str, start: bool, use_sudo: bool) -> Vec<String> {
  let action = if start { "start" } else { "stop" };
  let mut argv: Vec<String> = Vec::with_capacity(6);
  if use_sudo {
    argv.extend(SUDO.iter().map(ToString::to_string));
  }
  argv.extend([PROGRAM, action, "--", unit].iter().map(ToString::to_string));
  argv
}

/// Whether status text reports the unit as active
pub fn is_active(status: &str) -> bool {
  ACTIVE_MARKER.is_match(status)
}

/// Interpret `systemctl status` output
///
/// Exit codes 0 to 3 are all valid answers for an existing unit. Anything else
/// without an active marker (for instance 4, "no such unit") is a backend error.
pub fn parse_status(output: &CommandOutput, argv: &[String]) -> Result<bool, CommandError> {
  let stdout = output.stdout_text();
  if is_active(&stdout) {
    return Ok(true);
  }

  if (0..=LAST_STATUS_EXIT).contains(&output.exit_code) {
    Ok(false)
  } else {
    Err(CommandError::Backend {
      command: argv.join(" "),
      exit_code: output.exit_code,
      stderr: output.stderr_text(),
    })
  }
}
