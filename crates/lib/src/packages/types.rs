//! Package values and the usage descriptors that drive resolution.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::packages::PackageError;
use crate::platform::ObjectFormat;
use crate::toolchain::{CompileOption, LinkOption};

/// Which kinds of library file a request accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
  #[default]
  Any,
  Shared,
  Static,
}

impl PackageKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Any => "any",
      Self::Shared => "shared",
      Self::Static => "static",
    }
  }

  pub fn allows_shared(&self) -> bool {
    matches!(self, Self::Any | Self::Shared)
  }

  pub fn allows_static(&self) -> bool {
    matches!(self, Self::Any | Self::Static)
  }
}

impl FromStr for PackageKind {
  type Err = PackageError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "any" => Ok(Self::Any),
      "shared" => Ok(Self::Shared),
      "static" => Ok(Self::Static),
      other => Err(PackageError::InvalidKind(other.to_string())),
    }
  }
}

impl fmt::Display for PackageKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// A resolved dependency, ready to merge into a target's options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
  pub name: String,
  pub submodules: Vec<String>,
  pub format: ObjectFormat,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub version: Option<Version>,
  pub compile_options: Vec<CompileOption>,
  pub link_options: Vec<LinkOption>,
}

/// A library named in a path usage: a plain name or a framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LibraryUsage {
  Name(String),
  Framework { framework: String },
}

/// Search data for the path-search strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathUsage {
  /// Libraries are selected by the headers themselves (MSVC `#pragma
  /// comment(lib)`); only library directories are passed to the linker.
  pub auto_link: bool,
  pub headers: Vec<String>,
  pub libraries: Vec<LibraryUsage>,
  pub include_path: Vec<PathBuf>,
  pub library_path: Vec<PathBuf>,
}

/// How a package should be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Usage {
  PkgConfig {
    pcfiles: Vec<String>,
    #[serde(default)]
    path: Vec<PathBuf>,
    #[serde(default)]
    extra_args: Vec<String>,
  },
  Path(PathUsage),
  /// pkg-config first, then path search.
  System(PathUsage),
}

impl Usage {
  /// Anchor relative search paths at `base`.
  fn rebase(mut self, base: &Path) -> Self {
    let fix = |paths: &mut Vec<PathBuf>| {
      for path in paths.iter_mut() {
        if path.is_relative() {
          *path = base.join(&*path);
        }
      }
    };
    match &mut self {
      Self::PkgConfig { path, .. } => fix(path),
      Self::Path(usage) | Self::System(usage) => {
        fix(&mut usage.include_path);
        fix(&mut usage.library_path);
      }
    }
    self
  }
}

/// Supplies usage descriptors by package name.
pub trait UsageSource: fmt::Debug + Send + Sync {
  fn usage(&self, name: &str, submodules: &[String]) -> Result<Usage, PackageError>;
}

const USAGE_TYPES: [&str; 3] = ["pkg-config", "path", "system"];

/// Usage descriptors read from a JSON object keyed by package name.
///
/// Packages without an entry resolve with `system` usage, searching for a
/// library of the package's own name.
#[derive(Debug, Clone, Default)]
pub struct UsageTable {
  entries: BTreeMap<String, serde_json::Value>,
  base: Option<PathBuf>,
}

impl UsageTable {
  /// Load a usage file. Relative paths inside it are taken relative to the
  /// file's directory.
  pub fn load(path: &Path) -> Result<Self, PackageError> {
    let text = fs::read_to_string(path)?;
    let base = path.parent().map(Path::to_path_buf);
    Self::from_json(&text, base).map_err(|err| match err {
      PackageError::Metadata { reason, .. } => PackageError::Metadata {
        source_name: path.display().to_string(),
        reason,
      },
      other => other,
    })
  }

  pub fn from_json(text: &str, base: Option<PathBuf>) -> Result<Self, PackageError> {
    let entries = serde_json::from_str(text).map_err(|err| PackageError::Metadata {
      source_name: "<usage>".to_string(),
      reason: err.to_string(),
    })?;
    Ok(Self { entries, base })
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl UsageSource for UsageTable {
  fn usage(&self, name: &str, _submodules: &[String]) -> Result<Usage, PackageError> {
    let Some(entry) = self.entries.get(name) else {
      return Ok(Usage::System(PathUsage {
        libraries: vec![LibraryUsage::Name(name.to_string())],
        ..PathUsage::default()
      }));
    };

    let kind = entry.get("type").and_then(|t| t.as_str()).unwrap_or_default();
    if !USAGE_TYPES.contains(&kind) {
      return Err(PackageError::UnsupportedUsage {
        name: name.to_string(),
        kind: kind.to_string(),
      });
    }

    let usage: Usage = serde_json::from_value(entry.clone()).map_err(|err| PackageError::Metadata {
      source_name: name.to_string(),
      reason: err.to_string(),
    })?;
    Ok(match &self.base {
      Some(base) => usage.rebase(base),
      None => usage,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_entries_default_to_system() {
    let table = UsageTable::default();
    assert_eq!(
      table.usage("zlib", &[]).unwrap(),
      Usage::System(PathUsage {
        libraries: vec![LibraryUsage::Name("zlib".to_string())],
        ..PathUsage::default()
      })
    );
  }

  #[test]
  fn path_usage_parses_libraries_and_frameworks() {
    let table = UsageTable::from_json(
      r#"{"foo": {"type": "path", "include_path": ["/opt/foo/include"],
                  "libraries": ["foo", {"framework": "Cocoa"}]}}"#,
      None,
    )
    .unwrap();
    let Usage::Path(usage) = table.usage("foo", &[]).unwrap() else {
      panic!("expected path usage");
    };
    assert_eq!(usage.include_path, vec![PathBuf::from("/opt/foo/include")]);
    assert_eq!(
      usage.libraries,
      vec![
        LibraryUsage::Name("foo".to_string()),
        LibraryUsage::Framework {
          framework: "Cocoa".to_string()
        },
      ]
    );
    assert!(!usage.auto_link);
  }

  #[test]
  fn unknown_usage_type_is_rejected() {
    let table = UsageTable::from_json(r#"{"foo": {"type": "conan"}}"#, None).unwrap();
    let err = table.usage("foo", &[]).unwrap_err();
    assert!(matches!(err, PackageError::UnsupportedUsage { ref kind, .. } if kind == "conan"));
    assert!(err.to_string().contains("foo"));
  }

  #[test]
  fn relative_paths_are_anchored_at_the_usage_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("usage.json");
    fs::write(
      &file,
      r#"{"bar": {"type": "pkg-config", "pcfiles": ["bar"], "path": ["pkgconfig"]}}"#,
    )
    .unwrap();

    let table = UsageTable::load(&file).unwrap();
    assert_eq!(
      table.usage("bar", &[]).unwrap(),
      Usage::PkgConfig {
        pcfiles: vec!["bar".to_string()],
        path: vec![dir.path().join("pkgconfig")],
        extra_args: Vec::new(),
      }
    );
  }

  #[test]
  fn malformed_file_names_the_source() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("usage.json");
    fs::write(&file, "[1, 2").unwrap();
    let err = UsageTable::load(&file).unwrap_err();
    assert!(err.to_string().contains("usage.json"));
  }

  #[test]
  fn package_kind_parsing() {
    assert_eq!("static".parse::<PackageKind>().unwrap(), PackageKind::Static);
    assert!("both".parse::<PackageKind>().is_err());
    assert!(PackageKind::Any.allows_shared() && PackageKind::Any.allows_static());
    assert!(!PackageKind::Shared.allows_static());
  }
}
