//! NetworkManager (`nmcli`) command lines and output parsing

use crate::error::CommandError;
use crate::runner::CommandOutput;

pub const PROGRAM: &str = "nmcli";

/// Connection type column value for WireGuard profiles
pub const VPN_TYPE: &str = "wireguard";

/// nmcli exit status for "connection, device, or access point does not exist"
const NO_SUCH_CONNECTION: i32 = 10;

/// A row of `nmcli connection show`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
  pub name: String,
  pub uuid: String,
  pub connection_type: String,
  /// `None` when nmcli prints `--` (not bound to a device)
  pub device: Option<String>,
}

impl Connection {
  pub fn is_vpn(&self) -> bool {
    self.connection_type == VPN_TYPE
  }
}

fn command(args: &[&str]) -> Vec<String> {
  std::iter::once(PROGRAM).chain(args.iter().copied()).map(ToString::to_string).collect()
}

/// `nmcli connection show`
pub fn list_command() -> Vec<String> {
  command(&["connection", "show"])
}

/// `nmcli connection show --active uuid <uuid>`
pub fn active_command(uuid: &str) -> Vec<String> {
  command(&["connection", "show", "--active", "uuid", uuid])
}

/// `nmcli connection up|down uuid <uuid>`
pub fn toggle_command(uuid: &str, up: bool) -> Vec<String> {
  let action = if up { "up" } else { "down" };
  command(&["connection", action, "uuid", uuid])
}

/// Any output from the active query means the connection is up
pub fn parse_active(output: &CommandOutput, argv: &[String]) -> Result<bool, CommandError> {
  if !output.stdout.iter().all(u8::is_ascii_whitespace) {
    return Ok(true);
  }

  if output.success() || output.exit_code == NO_SUCH_CONNECTION {
    Ok(false)
  } else {
    Err(CommandError::Backend {
      command: argv.join(" "),
      exit_code: output.exit_code,
      stderr: output.stderr_text(),
    })
  }
}

/// Character offset of a column title in the header line
fn column_start(header: &str, title: &str) -> Option<usize> {
  header.find(title).map(|byte| header[..byte].chars().count())
}

/// Slice a row between two character offsets and trim it
fn cell(chars: &[char], start: usize, end: Option<usize>) -> String {
  let end = end.unwrap_or(chars.len()).min(chars.len());
  if start >= end {
    return String::new();
  }
  chars[start..end].iter().collect::<String>().trim().to_string()
}

/// Parse the tabular output of `nmcli connection show`
///
/// Column boundaries come from where the `UUID`, `TYPE` and `DEVICE` titles
/// start in the header; the name column starts at 0. Rows are cut at those
/// character offsets, which copes with spaces inside connection names.
/// Output with no lines at all parses to an empty list.
pub fn parse_connection_table(output: &str) -> Result<Vec<Connection>, CommandError> {
  let list = list_command().join(" ");
  let mut lines = output.lines().skip_while(|line| line.trim().is_empty());

  let Some(header) = lines.next() else {
    return Ok(Vec::new());
  };

  let uuid_at = column_start(header, "UUID").ok_or_else(|| CommandError::parse(&list, "header has no UUID column"))?;
  let type_at = column_start(header, "TYPE").ok_or_else(|| CommandError::parse(&list, "header has no TYPE column"))?;
  if type_at <= uuid_at {
    return Err(CommandError::parse(&list, "TYPE column precedes UUID column"));
  }
  let device_at = column_start(header, "DEVICE").filter(|&at| at > type_at);

  let mut connections = Vec::new();
  for line in lines {
    if line.trim().is_empty() {
      continue;
    }

    let chars: Vec<char> = line.chars().collect();
    let name = cell(&chars, 0, Some(uuid_at));
    let uuid = cell(&chars, uuid_at, Some(type_at));
    let connection_type = cell(&chars, type_at, device_at);
    let device = device_at
      .map(|at| cell(&chars, at, None))
      .filter(|device| !device.is_empty() && device != "--");

    if uuid.is_empty() {
      tracing::debug!("Skipping nmcli row without UUID: {line:?}");
      continue;
    }

    connections.push(Connection {
      name,
      uuid,
      connection_type,
      device,
    });
  }

  Ok(connections)
}
