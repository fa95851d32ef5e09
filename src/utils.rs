//! Locating and preparing backend binaries

use std::path::{Path, PathBuf};

use tokio::process::Command;

/// System locations checked before falling back to PATH
const SYSTEM_PATHS: &[&str] = &["/usr/bin", "/usr/sbin", "/bin", "/sbin", "/usr/local/bin"];

/// Find a binary in the usual system locations, then on PATH
pub fn find_binary(name: &str) -> Option<PathBuf> {
  // Panel sessions often start with a trimmed PATH, so known locations come first
  for base in SYSTEM_PATHS {
    let path = Path::new(base).join(name);
    if path.exists() {
      return Some(path);
    }
  }

  if let Ok(path) = which::which(name) {
    return Some(path);
  }

  None
}

/// Resolve the program of an argv to something `Command` can launch
///
/// Explicit paths are kept as given. Bare names are looked up with [`find_binary`]
/// and left untouched when not found, so the spawn error names the missing tool.
pub fn resolve_program(program: &str) -> PathBuf {
  if program.contains('/') {
    return PathBuf::from(program);
  }
  find_binary(program).unwrap_or_else(|| PathBuf::from(program))
}

/// Create a non-interactive Command for a backend tool
///
/// Output is forced into the C locale: both the `nmcli` table headers and the
/// `systemctl status` marker are matched literally.
pub fn backend_cmd(program: &str) -> Command {
  let mut cmd = Command::new(resolve_program(program));
  cmd.env("LC_ALL", "C");
  cmd
}
