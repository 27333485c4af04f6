//! The build graph a front end hands to the generator.
//!
//! Nodes are listed in dependency order; a node may only refer to nodes that
//! appear before it. Source and header paths are relative to the source
//! directory, node names are relative to the build directory.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::generate::GenerateError;
use crate::packages::PackageKind;
use crate::toolchain::{CompileOption, Language, LinkOption};

/// A header whose `#define` holds a package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHeader {
  pub header: String,
  #[serde(rename = "macro")]
  pub macro_name: String,
}

/// A dependency on an external package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRequest {
  pub name: String,
  /// A semver requirement; any version when absent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  #[serde(default)]
  pub kind: PackageKind,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub submodules: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version_header: Option<VersionHeader>,
}

impl PackageRequest {
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      version: None,
      kind: PackageKind::Any,
      submodules: Vec::new(),
      version_header: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFile {
  /// Output name without extension.
  pub name: String,
  pub source: String,
  /// Taken from the source extension when absent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lang: Option<Language>,
  #[serde(default)]
  pub options: Vec<CompileOption>,
  #[serde(default)]
  pub packages: Vec<PackageRequest>,
  /// Header to precompile and use for this object.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pch: Option<String>,
}

/// How a library node is linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryLink {
  #[default]
  Shared,
  Static,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
  pub name: String,
  /// Names of `object_file` nodes.
  pub objects: Vec<String>,
  /// Names of `library` nodes linked into this one.
  #[serde(default)]
  pub libs: Vec<String>,
  #[serde(default)]
  pub packages: Vec<PackageRequest>,
  #[serde(default)]
  pub options: Vec<LinkOption>,
  /// Ignored for executables.
  #[serde(default)]
  pub link: LibraryLink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phony {
  pub name: String,
  #[serde(default)]
  pub deps: Vec<String>,
}

/// An arbitrary command run every time its target is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
  pub name: String,
  pub commands: Vec<Vec<String>>,
  #[serde(default)]
  pub deps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
  ObjectFile(ObjectFile),
  Executable(Link),
  Library(Link),
  Phony(Phony),
  Command(Command),
}

impl Node {
  pub fn name(&self) -> &str {
    match self {
      Self::ObjectFile(node) => &node.name,
      Self::Executable(node) | Self::Library(node) => &node.name,
      Self::Phony(node) => &node.name,
      Self::Command(node) => &node.name,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildGraph {
  pub nodes: Vec<Node>,
}

impl BuildGraph {
  pub fn load(path: &Path) -> Result<Self, GenerateError> {
    let text = fs::read_to_string(path)?;
    Self::from_json(&text).map_err(|err| match err {
      GenerateError::Graph { reason, .. } => GenerateError::Graph {
        source_name: path.display().to_string(),
        reason,
      },
      other => other,
    })
  }

  pub fn from_json(text: &str) -> Result<Self, GenerateError> {
    serde_json::from_str(text).map_err(|err| GenerateError::Graph {
      source_name: "<graph>".to_string(),
      reason: err.to_string(),
    })
  }
}
