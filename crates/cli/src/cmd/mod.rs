mod generate;
mod package;
mod probe;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};

use buildgen_lib::packages::UsageTable;
use buildgen_lib::platform::Environment;

pub use generate::cmd_generate;
pub use package::cmd_package;
pub use probe::cmd_probe;

/// Options shared by every subcommand.
pub struct Config {
  pub target: Option<String>,
  pub usage: Option<PathBuf>,
}

impl Config {
  /// The process environment with the requested target and usage file.
  pub fn environment(&self) -> Result<Environment> {
    let mut env = Environment::from_process().ok_or_else(|| anyhow!("unsupported host platform"))?;
    if let Some(triple) = &self.target {
      env = env
        .with_target_triple(triple)
        .with_context(|| format!("Invalid target '{triple}'"))?;
    }
    if let Some(path) = &self.usage {
      let table = UsageTable::load(path).with_context(|| format!("Failed to load usage file {}", path.display()))?;
      env = env.with_usage(Arc::new(table));
    }
    Ok(env)
  }
}
