mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use buildgen_lib::packages::PackageKind;
use buildgen_lib::toolchain::Language;

/// buildgen - Makefile generator for C and C++ projects
#[derive(Parser)]
#[command(name = "buildgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Target triple to build for (default: the host)
  #[arg(long, global = true)]
  target: Option<String>,

  /// JSON file describing how to find packages
  #[arg(long, global = true)]
  usage: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Generate a Makefile from a build graph
  Generate {
    /// Path to the build graph (JSON)
    graph: PathBuf,

    /// Build directory the Makefile is written to
    #[arg(short = 'o', long, default_value = ".")]
    builddir: PathBuf,

    /// Source directory (default: the graph file's directory)
    #[arg(long)]
    srcdir: Option<PathBuf>,
  },

  /// Show the toolchain detected for a language
  Probe {
    #[arg(long, default_value = "c")]
    lang: Language,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Resolve a package and print its options as JSON
  Package {
    name: String,

    #[arg(long, default_value = "c")]
    lang: Language,

    #[arg(long, default_value = "any")]
    kind: PackageKind,

    /// Submodule of the package to request (repeatable)
    #[arg(long = "submodule")]
    submodules: Vec<String>,

    /// Version requirement, e.g. ">=1.2"
    #[arg(long = "version-req")]
    version: Option<String>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let config = cmd::Config {
    target: cli.target,
    usage: cli.usage,
  };

  match cli.command {
    Commands::Generate {
      graph,
      builddir,
      srcdir,
    } => cmd::cmd_generate(&config, &graph, &builddir, srcdir.as_deref()),
    Commands::Probe { lang, json } => cmd::cmd_probe(&config, lang, json),
    Commands::Package {
      name,
      lang,
      kind,
      submodules,
      version,
    } => cmd::cmd_package(&config, &name, &submodules, lang, kind, version.as_deref()),
  }
}
