//! Non-blocking command execution
//!
//! Everything the core does to the outside world goes through [`CommandRunner`].
//! Commands are always an argv vector handed straight to the process spawner;
//! nothing is ever interpreted by a shell, so connection names and unit names
//! cannot inject arguments.

use std::process::Stdio;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::error::CommandError;
use crate::utils::backend_cmd;

/// Default upper bound for a single backend call
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit code reported when the child was terminated by a signal
pub const SIGNALED_EXIT_CODE: i32 = -1;

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  pub stdout: Vec<u8>,
  pub stderr: Vec<u8>,
  pub exit_code: i32,
}

impl CommandOutput {
  pub fn new(stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>, exit_code: i32) -> Self {
    Self {
      stdout: stdout.into(),
      stderr: stderr.into(),
      exit_code,
    }
  }

  pub fn success(&self) -> bool {
    self.exit_code == 0
  }

  pub fn stdout_text(&self) -> String {
    String::from_utf8_lossy(&self.stdout).into_owned()
  }

  pub fn stderr_text(&self) -> String {
    String::from_utf8_lossy(&self.stderr).trim().to_string()
  }

  /// Turn a non-zero exit into a [`CommandError::Backend`]
  pub fn into_success(self, argv: &[String]) -> Result<Self, CommandError> {
    if self.success() {
      Ok(self)
    } else {
      Err(CommandError::Backend {
        command: argv.join(" "),
        exit_code: self.exit_code,
        stderr: self.stderr_text(),
      })
    }
  }
}

/// Runs external commands without blocking the caller
///
/// The returned future owns everything it needs, so it can be moved into a
/// spawned task and awaited after the runner reference is gone.
pub trait CommandRunner: Send + Sync + 'static {
  fn run(&self, argv: Vec<String>) -> BoxFuture<'static, Result<CommandOutput, CommandError>>;
}

/// Runner backed by real child processes on the tokio runtime
#[derive(Debug, Clone)]
pub struct SystemRunner {
  timeout: Duration,
}

impl SystemRunner {
  pub fn new() -> Self {
    Self::with_timeout(DEFAULT_COMMAND_TIMEOUT)
  }

  pub fn with_timeout(timeout: Duration) -> Self {
    Self { timeout }
  }
}

impl Default for SystemRunner {
  fn default() -> Self {
    Self::new()
  }
}

impl CommandRunner for SystemRunner {
  fn run(&self, argv: Vec<String>) -> BoxFuture<'static, Result<CommandOutput, CommandError>> {
    let timeout = self.timeout;

    Box::pin(async move {
      let Some((program, args)) = argv.split_first() else {
        return Err(CommandError::Spawn {
          program: String::new(),
          source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line"),
        });
      };

      tracing::debug!("Running {}", argv.join(" "));

      let mut cmd = backend_cmd(program);
      cmd
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

      let child = cmd.spawn().map_err(|source| CommandError::Spawn {
        program: program.clone(),
        source,
      })?;

      // Dropping the wait future on timeout drops the child, which kills it
      match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
          let exit_code = output.status.code().unwrap_or(SIGNALED_EXIT_CODE);
          tracing::debug!("{program} exited with {exit_code}");
          Ok(CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code,
          })
        }
        Ok(Err(source)) => Err(CommandError::Spawn {
          program: program.clone(),
          source,
        }),
        Err(_) => Err(CommandError::Timeout {
          program: program.clone(),
          timeout,
        }),
      }
    })
  }
}
