//! Build paths anchored to a symbolic root.
//!
//! Paths in generated build files are rarely absolute: sources live under the
//! source directory, outputs under the build directory, installed files under
//! one of the install roots. Keeping the root symbolic lets the backend decide
//! at render time whether it becomes a variable reference or nothing at all.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The base a [`BuildPath`] is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Root {
  Absolute,
  SrcDir,
  BuildDir,
  Prefix,
  BinDir,
  LibDir,
  IncludeDir,
}

impl Root {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Absolute => "absolute",
      Self::SrcDir => "srcdir",
      Self::BuildDir => "builddir",
      Self::Prefix => "prefix",
      Self::BinDir => "bindir",
      Self::LibDir => "libdir",
      Self::IncludeDir => "includedir",
    }
  }

  /// Install roots are the ones only meaningful at install time.
  pub fn is_install_root(&self) -> bool {
    matches!(self, Self::Prefix | Self::BinDir | Self::LibDir | Self::IncludeDir)
  }
}

impl fmt::Display for Root {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// A path made of a [`Root`] and a `/`-separated suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildPath {
  pub root: Root,
  pub suffix: String,
}

impl BuildPath {
  pub fn new(suffix: impl Into<String>, root: Root) -> Self {
    let suffix = suffix.into();
    let suffix = if root == Root::Absolute {
      suffix
    } else {
      suffix.trim_start_matches("./").trim_end_matches('/').to_string()
    };
    Self { root, suffix }
  }

  pub fn absolute(path: impl Into<String>) -> Self {
    Self::new(path, Root::Absolute)
  }

  pub fn srcdir(suffix: impl Into<String>) -> Self {
    Self::new(suffix, Root::SrcDir)
  }

  pub fn builddir(suffix: impl Into<String>) -> Self {
    Self::new(suffix, Root::BuildDir)
  }

  /// Append a component, inserting a separator when needed.
  pub fn append(&self, component: &str) -> Self {
    let suffix = if self.suffix.is_empty() {
      component.to_string()
    } else if self.suffix.ends_with('/') {
      format!("{}{}", self.suffix, component)
    } else {
      format!("{}/{}", self.suffix, component)
    };
    Self { root: self.root, suffix }
  }

  /// The final component of the suffix.
  pub fn basename(&self) -> &str {
    self.suffix.rsplit('/').next().unwrap_or("")
  }

  /// The path with its last component removed.
  pub fn parent(&self) -> Self {
    let suffix = match self.suffix.rfind('/') {
      Some(0) => "/".to_string(),
      Some(idx) => self.suffix[..idx].to_string(),
      None => String::new(),
    };
    Self { root: self.root, suffix }
  }

  /// Replace (or add) the extension of the final component.
  pub fn with_extension(&self, ext: &str) -> Self {
    let base = self.basename();
    let stem_len = match base.rfind('.') {
      Some(idx) if idx > 0 => idx,
      _ => base.len(),
    };
    let cut = self.suffix.len() - base.len() + stem_len;
    Self {
      root: self.root,
      suffix: format!("{}{}", &self.suffix[..cut], ext),
    }
  }

  /// Move the path to a different root, keeping its suffix.
  pub fn reroot(&self, root: Root) -> Self {
    Self::new(self.suffix.clone(), root)
  }
}

impl fmt::Display for BuildPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.root {
      Root::Absolute => write!(f, "{}", self.suffix),
      root if self.suffix.is_empty() => write!(f, "${{{}}}", root),
      root => write!(f, "${{{}}}/{}", root, self.suffix),
    }
  }
}
