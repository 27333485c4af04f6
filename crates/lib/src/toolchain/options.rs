//! Typed compile and link options.
//!
//! Options are an ordered list of intents. Each toolchain family turns them
//! into its own flags, so callers never assemble flag strings by hand.

use serde::{Deserialize, Serialize};

use crate::path::BuildPath;

/// Compiler warning verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningLevel {
  Disable,
  Default,
  All,
  Extra,
}

/// A precompiled header in use by a compile step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pch {
  /// The header the PCH was built from.
  pub header: BuildPath,
  /// The compiled PCH artifact.
  pub artifact: BuildPath,
  /// Companion object that must be linked alongside users of the PCH.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub object: Option<BuildPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompileOption {
  IncludeDir {
    path: BuildPath,
    #[serde(default)]
    system: bool,
  },
  Define {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
  },
  PchUse(Pch),
  Pthread,
  Warning {
    level: WarningLevel,
  },
  WarningsAsErrors,
  Raw {
    value: String,
  },
}

impl CompileOption {
  pub fn include_dir(path: BuildPath) -> Self {
    Self::IncludeDir { path, system: false }
  }

  pub fn system_include_dir(path: BuildPath) -> Self {
    Self::IncludeDir { path, system: true }
  }

  pub fn define(name: impl Into<String>, value: Option<&str>) -> Self {
    Self::Define {
      name: name.into(),
      value: value.map(str::to_string),
    }
  }

  pub fn raw(value: impl Into<String>) -> Self {
    Self::Raw { value: value.into() }
  }
}

/// How a resolved library file is expected to link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryKind {
  Shared,
  Static,
  /// Could be static or an import library; only known at link time.
  Unknown,
}

/// A library reference in a link step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Library {
  /// A library file found on disk or built by this project.
  File { path: BuildPath, kind: LibraryKind },
  /// A library known only by name (`-lname`).
  Named { name: String },
  /// A library whose every object must be linked.
  WholeArchive { library: Box<Library> },
  /// A macOS framework, optionally with a suffix.
  Framework {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    suffix: Option<String>,
  },
}

impl Library {
  pub fn file(path: BuildPath, kind: LibraryKind) -> Self {
    Self::File { path, kind }
  }

  pub fn named(name: impl Into<String>) -> Self {
    Self::Named { name: name.into() }
  }

  pub fn whole_archive(self) -> Self {
    Self::WholeArchive {
      library: Box::new(self),
    }
  }

  pub fn framework(name: impl Into<String>) -> Self {
    Self::Framework {
      name: name.into(),
      suffix: None,
    }
  }

  /// The on-disk path, if this refers to a file.
  pub fn path(&self) -> Option<&BuildPath> {
    match self {
      Self::File { path, .. } => Some(path),
      Self::WholeArchive { library } => library.path(),
      Self::Named { .. } | Self::Framework { .. } => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkOption {
  Library { library: Library },
  LibDir { path: BuildPath },
  Pthread,
  Raw { value: String },
}

impl LinkOption {
  pub fn lib(library: Library) -> Self {
    Self::Library { library }
  }

  pub fn lib_dir(path: BuildPath) -> Self {
    Self::LibDir { path }
  }

  pub fn raw(value: impl Into<String>) -> Self {
    Self::Raw { value: value.into() }
  }
}

/// Flags recognized by a tool's `parse_args`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedArgs {
  pub includes: Vec<String>,
  pub defines: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub warning_level: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub warnings_as_errors: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pch_use: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pch_create: Option<String>,
  pub lib_dirs: Vec<String>,
  pub libraries: Vec<String>,
  pub extra: Vec<String>,
}
