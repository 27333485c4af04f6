//! Types shared by process execution.

use thiserror::Error;

/// Errors that can occur while running an external tool.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// The executable could not be found.
  #[error("unable to find '{command}'")]
  ToolNotFound { command: String },

  /// The command ran but exited unsuccessfully.
  #[error("command '{command}' failed with exit code {code:?}: {stderr}")]
  Failed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("empty command")]
  EmptyCommand,

  /// I/O error while spawning or reading from the process.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
  /// Exit code, `None` when the process was killed by a signal.
  pub status: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl Output {
  /// A successful run with the given stdout.
  pub fn stdout(text: impl Into<String>) -> Self {
    Self {
      status: Some(0),
      stdout: text.into(),
      stderr: String::new(),
    }
  }

  /// A successful run that only wrote to stderr.
  pub fn stderr(text: impl Into<String>) -> Self {
    Self {
      status: Some(0),
      stdout: String::new(),
      stderr: text.into(),
    }
  }

  /// A run that exited with `code`.
  pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
    Self {
      status: Some(code),
      stdout: String::new(),
      stderr: stderr.into(),
    }
  }

  pub fn success(&self) -> bool {
    self.status == Some(0)
  }
}
