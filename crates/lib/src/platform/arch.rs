use std::fmt;
use std::str::FromStr;

/// CPU architecture variants recognized in target triples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  X86_64,
  X86,
  Aarch64,
  Arm,
}

impl Arch {
  /// Detect the current CPU architecture at runtime
  pub fn current() -> Option<Self> {
    Self::parse(std::env::consts::ARCH)
  }

  /// Parse the architecture component of a triple.
  ///
  /// Any `i?86` spelling is treated as 32-bit x86.
  pub fn parse(name: &str) -> Option<Self> {
    match name {
      "x86_64" | "amd64" | "x64" => Some(Self::X86_64),
      "x86" | "i386" | "i486" | "i586" | "i686" => Some(Self::X86),
      "aarch64" | "arm64" => Some(Self::Aarch64),
      name if name.starts_with("arm") => Some(Self::Arm),
      _ => None,
    }
  }

  /// Returns the triple spelling for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::X86 => "i686",
      Self::Aarch64 => "aarch64",
      Self::Arm => "arm",
    }
  }
}

impl FromStr for Arch {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s).ok_or_else(|| format!("unknown architecture '{s}'"))
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
