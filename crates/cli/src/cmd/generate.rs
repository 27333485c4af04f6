//! Implementation of the `buildgen generate` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use buildgen_lib::generate::{BuildGraph, generate};

use super::Config;
use crate::output::{print_stat, print_success};

/// Write `<builddir>/Makefile` for the graph at `graph_path`.
///
/// Sources are looked up relative to `srcdir`, which defaults to the
/// directory holding the graph file.
pub fn cmd_generate(config: &Config, graph_path: &Path, builddir: &Path, srcdir: Option<&Path>) -> Result<()> {
  let graph = BuildGraph::load(graph_path).with_context(|| format!("Failed to load {}", graph_path.display()))?;
  let env = config.environment()?;

  let srcdir = match srcdir {
    Some(dir) => dir.to_path_buf(),
    None => graph_path
      .parent()
      .filter(|dir| !dir.as_os_str().is_empty())
      .map(Path::to_path_buf)
      .unwrap_or_else(|| PathBuf::from(".")),
  };
  let srcdir = std::path::absolute(&srcdir).with_context(|| format!("Invalid source directory {}", srcdir.display()))?;

  debug!(srcdir = %srcdir.display(), builddir = %builddir.display(), "generating");
  let generated = generate(&env, &graph, &srcdir.display().to_string()).context("Failed to generate build files")?;
  let makefile = generated
    .write_to(builddir)
    .with_context(|| format!("Failed to write to {}", builddir.display()))?;

  print_success(&format!("Wrote {}", makefile.display()));
  print_stat("Targets", &graph.nodes.len().to_string());
  if !generated.files.is_empty() {
    print_stat("Generated sources", &generated.files.len().to_string());
  }
  Ok(())
}
