//! External process execution.
//!
//! Toolchain probing and pkg-config lookups go through the [`Runner`] trait so
//! they can be scripted in tests. All execution is blocking; each probe is run
//! at most once per builder or package.

pub mod script;
pub mod types;

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::shell;

pub use script::ScriptedRunner;
pub use types::{ExecuteError, Output};

/// Runs external commands and locates executables.
pub trait Runner: fmt::Debug + Send + Sync {
  /// Run `command` to completion with `env` layered over the inherited
  /// environment. A non-zero exit is reported in [`Output::status`], not as
  /// an error.
  fn run(&self, command: &[String], env: &BTreeMap<String, String>) -> Result<Output, ExecuteError>;

  /// Locate `name` on the `PATH` from `env` (falling back to the process
  /// `PATH`).
  fn which(&self, name: &str, env: &BTreeMap<String, String>) -> Option<PathBuf> {
    find_executable(name, env)
  }
}

/// Runs commands with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
  fn run(&self, command: &[String], env: &BTreeMap<String, String>) -> Result<Output, ExecuteError> {
    let (program, args) = command.split_first().ok_or(ExecuteError::EmptyCommand)?;
    debug!(command = %program, args = ?args, "executing command");

    let output = Command::new(program).args(args).envs(env).output().map_err(|err| {
      if err.kind() == io::ErrorKind::NotFound {
        ExecuteError::ToolNotFound {
          command: program.clone(),
        }
      } else {
        ExecuteError::Io(err)
      }
    })?;

    let result = Output {
      status: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    debug!(command = %program, status = ?result.status, "command finished");
    Ok(result)
  }
}

/// Run `command` and require a successful exit.
pub fn run_checked(
  runner: &dyn Runner,
  command: &[String],
  env: &BTreeMap<String, String>,
) -> Result<Output, ExecuteError> {
  let output = runner.run(command, env)?;
  if !output.success() {
    return Err(ExecuteError::Failed {
      command: shell::join(command),
      code: output.status,
      stderr: output.stderr.trim().to_string(),
    });
  }
  Ok(output)
}

fn is_executable(path: &Path) -> bool {
  path.is_file()
}

/// Search `PATH` for `name`.
///
/// Names containing a directory separator are checked as-is. On Windows the
/// `.exe` suffix is tried as well.
pub fn find_executable(name: &str, env: &BTreeMap<String, String>) -> Option<PathBuf> {
  let suffixes: &[&str] = if cfg!(windows) { &["", ".exe"] } else { &[""] };

  if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
    return suffixes
      .iter()
      .map(|ext| PathBuf::from(format!("{name}{ext}")))
      .find(|p| is_executable(p));
  }

  let path_var = match env.get("PATH") {
    Some(value) => value.into(),
    None => std::env::var_os("PATH")?,
  };
  std::env::split_paths(&path_var)
    .flat_map(|dir| suffixes.iter().map(move |ext| dir.join(format!("{name}{ext}"))))
    .find(|p| is_executable(p))
}

/// Pick the first of `candidates` that can be found, as a split command line.
///
/// Each candidate may carry arguments (`"ccache gcc"`); only its first word is
/// looked up. When nothing is found the first candidate is assumed, with a
/// warning naming what was tried.
pub fn check_which(
  runner: &dyn Runner,
  candidates: &[String],
  env: &BTreeMap<String, String>,
  kind: &str,
) -> Result<Vec<String>, shell::ShellError> {
  let mut split = Vec::with_capacity(candidates.len());
  for candidate in candidates {
    let words = shell::split(candidate)?;
    if let Some(first) = words.first()
      && runner.which(first, env).is_some()
    {
      return Ok(words);
    }
    split.push(words);
  }

  let tried = candidates.iter().map(|c| format!("'{c}'")).collect::<Vec<_>>().join(", ");
  if candidates.len() > 1 {
    warn!(kind, tried = %tried, "unable to find {kind}; tried {tried}");
  } else {
    warn!(kind, tried = %tried, "unable to find {kind} {tried}");
  }
  Ok(split.into_iter().next().unwrap_or_default())
}
