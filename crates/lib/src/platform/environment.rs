//! The configuration snapshot a generation run works against.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::execute::{self, ExecuteError, Output, Runner, SystemRunner};
use crate::packages::{UsageSource, UsageTable};
use crate::platform::{Platform, PlatformError};
use crate::shell::{self, ShellError};

/// Host and target platforms, captured environment variables, and the
/// collaborators used to probe tools and look up package usage.
///
/// Variables live in a `BTreeMap` so anything derived from them iterates in
/// a stable order.
#[derive(Debug, Clone)]
pub struct Environment {
  pub host: Platform,
  pub target: Platform,
  target_triple: Option<String>,
  pub variables: BTreeMap<String, String>,
  runner: Arc<dyn Runner>,
  usage: Arc<dyn UsageSource>,
}

impl Environment {
  /// A native (non-cross) environment with the system runner and no usage
  /// descriptors.
  pub fn new(host: Platform, variables: BTreeMap<String, String>) -> Self {
    Self {
      host,
      target: host,
      target_triple: None,
      variables,
      runner: Arc::new(SystemRunner),
      usage: Arc::new(UsageTable::default()),
    }
  }

  /// Capture the current process environment.
  ///
  /// Returns `None` when the running platform is not supported.
  pub fn from_process() -> Option<Self> {
    Some(Self::new(Platform::current()?, std::env::vars().collect()))
  }

  pub fn with_target(mut self, target: Platform) -> Self {
    self.target = target;
    self.target_triple = None;
    self
  }

  /// Target a platform given as a triple, keeping the triple's own spelling
  /// (vendor and ABI) for tools that take it verbatim.
  pub fn with_target_triple(mut self, triple: &str) -> Result<Self, PlatformError> {
    self.target = Platform::parse(triple)?;
    self.target_triple = Some(triple.trim().to_string());
    Ok(self)
  }

  /// The target triple as given, or the canonical one for the target.
  pub fn target_triple(&self) -> String {
    match &self.target_triple {
      Some(triple) => triple.clone(),
      None => self.target.triple(),
    }
  }

  pub fn with_runner(mut self, runner: Arc<dyn Runner>) -> Self {
    self.runner = runner;
    self
  }

  pub fn with_usage(mut self, usage: Arc<dyn UsageSource>) -> Self {
    self.usage = usage;
    self
  }

  pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.variables.insert(name.into(), value.into());
    self
  }

  pub fn runner(&self) -> &dyn Runner {
    self.runner.as_ref()
  }

  pub fn usage(&self) -> &dyn UsageSource {
    self.usage.as_ref()
  }

  pub fn is_cross(&self) -> bool {
    self.host != self.target
  }

  pub fn getvar(&self, name: &str) -> Option<&str> {
    self.variables.get(name).map(String::as_str)
  }

  pub fn getvar_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
    self.getvar(name).unwrap_or(default)
  }

  /// Split a flags variable into words; unset variables yield nothing.
  pub fn split_var(&self, name: &str) -> Result<Vec<String>, ShellError> {
    self.split_var_or(name, "")
  }

  pub fn split_var_or(&self, name: &str, default: &str) -> Result<Vec<String>, ShellError> {
    shell::split(self.getvar_or(name, default))
  }

  /// A `PATH`-style directory list from a variable.
  pub fn path_list(&self, name: &str) -> Vec<PathBuf> {
    match self.getvar(name) {
      Some(value) if !value.is_empty() => std::env::split_paths(value).collect(),
      _ => Vec::new(),
    }
  }

  /// Run a command and require it to succeed.
  pub fn execute(&self, command: &[String]) -> Result<Output, ExecuteError> {
    execute::run_checked(self.runner(), command, &self.variables)
  }

  /// Run a command, accepting any exit status.
  pub fn execute_any(&self, command: &[String]) -> Result<Output, ExecuteError> {
    self.runner.run(command, &self.variables)
  }

  /// Resolve the first available command among `candidates`.
  pub fn check_which(&self, candidates: &[String], kind: &str) -> Result<Vec<String>, ShellError> {
    execute::check_which(self.runner(), candidates, &self.variables, kind)
  }
}
