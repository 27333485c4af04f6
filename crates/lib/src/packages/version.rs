//! Version detection for packages found by path search.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use regex::Regex;
use semver::Version;

use crate::packages::PackageError;
use crate::packages::search::find_header;
use crate::versioning::parse_lenient;

/// Reads a package's version from the headers it was resolved to.
pub trait VersionProbe: fmt::Debug + Send + Sync {
  /// Detect the version using only `include_dirs`, the directories the
  /// package's compile options actually point at.
  fn probe(&self, include_dirs: &[PathBuf]) -> Result<Version, PackageError>;
}

/// A version string stored in a `#define` inside a header, such as
/// `BOOST_LIB_VERSION "1_82"` in `boost/version.hpp`.
///
/// Underscores in the value are read as dots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMacroVersion {
  header: String,
  macro_name: String,
}

impl HeaderMacroVersion {
  pub fn new(header: impl Into<String>, macro_name: impl Into<String>) -> Self {
    Self {
      header: header.into(),
      macro_name: macro_name.into(),
    }
  }

  pub fn boost() -> Self {
    Self::new("boost/version.hpp", "BOOST_LIB_VERSION")
  }

  fn error(&self, reason: impl Into<String>) -> PackageError {
    PackageError::VersionProbe {
      header: self.header.clone(),
      reason: reason.into(),
    }
  }
}

impl VersionProbe for HeaderMacroVersion {
  fn probe(&self, include_dirs: &[PathBuf]) -> Result<Version, PackageError> {
    let dir = find_header(&self.header, include_dirs)?.ok_or_else(|| self.error("header not found"))?;
    let text = fs::read_to_string(dir.join(&self.header))?;

    let pattern = format!(r#"^\s*#\s*define\s+{}\s+"([\d_.]+)""#, regex::escape(&self.macro_name));
    let re = Regex::new(&pattern).map_err(|err| self.error(err.to_string()))?;

    text
      .lines()
      .find_map(|line| re.captures(line))
      .and_then(|caps| parse_lenient(&caps[1].replace('_', ".")))
      .ok_or_else(|| self.error(format!("unable to parse {}", self.macro_name)))
  }
}
