//! A [`Runner`] that replays canned output instead of spawning processes.
//!
//! Commands are matched by their shell-joined text. Anything without a
//! scripted response exits with status 1, and programs marked missing fail
//! with [`ExecuteError::ToolNotFound`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::execute::{ExecuteError, Output, Runner};
use crate::shell;

/// A command that was run, with the environment it saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
  pub command: String,
  pub env: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
pub struct ScriptedRunner {
  responses: BTreeMap<String, Output>,
  missing: BTreeSet<String>,
  calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reply to `command` (written as a shell command line) with `output`.
  pub fn respond(mut self, command: &str, output: Output) -> Self {
    let key = shell::split(command)
      .map(|words| shell::join(&words))
      .unwrap_or_else(|_| command.to_string());
    self.responses.insert(key, output);
    self
  }

  /// Treat `program` as absent from `PATH`.
  pub fn missing(mut self, program: &str) -> Self {
    self.missing.insert(program.to_string());
    self
  }

  /// Every command run so far, in order.
  pub fn calls(&self) -> Vec<RecordedCall> {
    self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
  }
}

impl Runner for ScriptedRunner {
  fn run(&self, command: &[String], env: &BTreeMap<String, String>) -> Result<Output, ExecuteError> {
    let program = command.first().ok_or(ExecuteError::EmptyCommand)?;
    let key = shell::join(command);
    if let Ok(mut calls) = self.calls.lock() {
      calls.push(RecordedCall {
        command: key.clone(),
        env: env.clone(),
      });
    }

    if self.missing.contains(program) {
      return Err(ExecuteError::ToolNotFound {
        command: program.clone(),
      });
    }
    Ok(
      self
        .responses
        .get(&key)
        .cloned()
        .unwrap_or_else(|| Output::failed(1, format!("no scripted response for '{key}'"))),
    )
  }

  fn which(&self, name: &str, _env: &BTreeMap<String, String>) -> Option<PathBuf> {
    (!self.missing.contains(name)).then(|| PathBuf::from(name))
  }
}
