pub mod arch;
pub mod environment;
pub mod os;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use arch::Arch;
pub use environment::Environment;
pub use os::Os;

/// Errors from parsing a platform triple.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
  #[error("unknown architecture in triple '{0}'")]
  UnknownArch(String),

  #[error("unknown operating system in triple '{0}'")]
  UnknownOs(String),
}

/// Binary format produced by a platform's native toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectFormat {
  Elf,
  MachO,
  Coff,
}

impl ObjectFormat {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Elf => "elf",
      Self::MachO => "mach-o",
      Self::Coff => "coff",
    }
  }
}

impl fmt::Display for ObjectFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Platform identifier combining architecture and OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  /// Create a new platform identifier
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  /// Detect the current platform at runtime
  ///
  /// Returns `None` if the OS or architecture is not supported
  pub fn current() -> Option<Self> {
    Some(Self {
      arch: Arch::current()?,
      os: Os::current()?,
    })
  }

  /// Parse a target triple such as `x86_64-unknown-linux-gnu` or `i686-w64-mingw32`.
  pub fn parse(triple: &str) -> Result<Self, PlatformError> {
    let mut parts = triple.trim().split('-');
    let arch = parts
      .next()
      .and_then(Arch::parse)
      .ok_or_else(|| PlatformError::UnknownArch(triple.to_string()))?;
    let os = Os::from_triple_parts(parts).ok_or_else(|| PlatformError::UnknownOs(triple.to_string()))?;
    Ok(Self { arch, os })
  }

  /// Returns the canonical target triple (e.g., "aarch64-apple-darwin")
  pub fn triple(&self) -> String {
    match self.os {
      Os::Linux => format!("{}-unknown-linux-gnu", self.arch),
      Os::MacOs => format!("{}-apple-darwin", self.arch),
      Os::Windows => format!("{}-pc-windows-msvc", self.arch),
    }
  }

  pub fn family(&self) -> &'static str {
    match self.os {
      Os::Windows => "windows",
      Os::Linux | Os::MacOs => "posix",
    }
  }

  pub fn object_format(&self) -> ObjectFormat {
    match self.os {
      Os::Linux => ObjectFormat::Elf,
      Os::MacOs => ObjectFormat::MachO,
      Os::Windows => ObjectFormat::Coff,
    }
  }

  pub fn executable_ext(&self) -> &'static str {
    match self.os {
      Os::Windows => ".exe",
      Os::Linux | Os::MacOs => "",
    }
  }

  pub fn shared_library_ext(&self) -> &'static str {
    match self.os {
      Os::Linux => ".so",
      Os::MacOs => ".dylib",
      Os::Windows => ".dll",
    }
  }

  /// Platforms whose shared libraries are linked through a separate import library.
  pub fn has_import_library(&self) -> bool {
    self.os == Os::Windows
  }

  /// Conventional system header directories.
  pub fn include_dirs(&self) -> Vec<PathBuf> {
    match self.os {
      Os::Windows => Vec::new(),
      Os::Linux | Os::MacOs => vec![PathBuf::from("/usr/local/include"), PathBuf::from("/usr/include")],
    }
  }

  /// Conventional system library directories.
  pub fn lib_dirs(&self) -> Vec<PathBuf> {
    match self.os {
      Os::Windows => Vec::new(),
      Os::Linux | Os::MacOs => vec![
        PathBuf::from("/usr/local/lib"),
        PathBuf::from("/lib"),
        PathBuf::from("/usr/lib"),
      ],
    }
  }
}

impl FromStr for Platform {
  type Err = PlatformError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}
