//! Lenient version extraction from tool output.

use std::sync::LazyLock;

use regex::Regex;
use semver::{Version, VersionReq};

static VERSION: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)+").expect("version pattern is a valid regex"));

/// Parse a dotted version with any number of components.
///
/// Missing components are zero and components past the third are dropped, so
/// `1.2` becomes `1.2.0` and `19.29.30133.0` becomes `19.29.30133`.
pub fn parse_lenient(text: &str) -> Option<Version> {
  let found = VERSION.find(text)?;
  let mut parts = found.as_str().split('.').map(|p| p.parse::<u64>().ok());
  let major = parts.next().flatten()?;
  let minor = parts.next().flatten().unwrap_or(0);
  let patch = parts.next().flatten().unwrap_or(0);
  Some(Version::new(major, minor, patch))
}

/// Find the first version number in a tool's banner.
pub fn detect_version(output: &str) -> Option<Version> {
  output.lines().find_map(parse_lenient)
}

/// Whether `version` satisfies `required`, treating pre-release versions like
/// their release.
pub fn satisfies(version: &Version, required: &VersionReq) -> bool {
  if required.matches(version) {
    return true;
  }
  let mut release = version.clone();
  release.pre = semver::Prerelease::EMPTY;
  required.matches(&release)
}
