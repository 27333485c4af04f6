use std::fmt;

/// Operating system variants a build can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
  Linux,
  MacOs,
  Windows,
}

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Find the OS named anywhere in the vendor/system part of a triple.
  pub fn from_triple_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> Option<Self> {
    parts.into_iter().find_map(|part| match part {
      "linux" => Some(Self::Linux),
      "darwin" | "apple" | "macos" => Some(Self::MacOs),
      "windows" | "win32" | "mingw32" | "msvc" => Some(Self::Windows),
      _ => None,
    })
  }

  /// Returns the lowercase string identifier for this OS
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "darwin",
      Self::Windows => "windows",
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
