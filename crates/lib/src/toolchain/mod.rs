//! Compiler and linker toolchains.
//!
//! A [`Builder`] bundles everything needed to build one source language on
//! the target platform: the detected compiler brand and version, a compiler,
//! an optional precompiled-header compiler, one linker per [`LinkMode`] and a
//! package resolver. Two families exist, Unix-style `cc` and MSVC; the
//! family is picked once from the compiler command and never changes.

pub mod cc;
pub mod msvc;
pub mod options;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::execute::ExecuteError;
use crate::packages::PackageResolver;
use crate::path::BuildPath;
use crate::platform::{Arch, Environment, ObjectFormat, Platform};
use crate::safe_str::Fragment;
use crate::shell::{self, ShellError};

pub use options::{CompileOption, Library, LibraryKind, LinkOption, ParsedArgs, Pch, WarningLevel};

/// Errors raised while probing or using a toolchain.
#[derive(Debug, Error)]
pub enum ToolchainError {
  #[error("unable to find {kind} '{command}'")]
  ToolNotFound { kind: String, command: String },

  #[error("probing '{command}' failed: {reason}")]
  ProbeFailed { command: String, reason: String },

  #[error("{linker} linker cannot link {langs} objects of format {format}")]
  LinkCompatibility {
    linker: String,
    format: ObjectFormat,
    langs: String,
  },

  #[error("{flavor} does not support {feature}")]
  UnsupportedFeature { flavor: Flavor, feature: String },

  #[error("no linker for link mode '{mode}'")]
  MissingLinkMode { mode: LinkMode },

  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error(transparent)]
  Shell(#[from] ShellError),
}

/// Source languages with a native toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
  #[serde(rename = "c")]
  C,
  #[serde(rename = "c++")]
  Cxx,
}

impl Language {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::C => "c",
      Self::Cxx => "c++",
    }
  }

  /// Environment and Make variable naming the compiler.
  pub fn compiler_var(&self) -> &'static str {
    match self {
      Self::C => "CC",
      Self::Cxx => "CXX",
    }
  }

  /// Environment and Make variable holding the compiler flags.
  pub fn flags_var(&self) -> &'static str {
    match self {
      Self::C => "CFLAGS",
      Self::Cxx => "CXXFLAGS",
    }
  }

  /// Preferred extension for generated source files.
  pub fn source_ext(&self) -> &'static str {
    match self {
      Self::C => ".c",
      Self::Cxx => ".cpp",
    }
  }

  /// Guess the language of a source file from its extension.
  pub fn from_extension(path: &str) -> Option<Self> {
    let ext = path.rsplit_once('.').map(|(_, ext)| ext)?;
    match ext {
      "c" => Some(Self::C),
      "cc" | "cpp" | "cxx" | "c++" | "C" => Some(Self::Cxx),
      _ => None,
    }
  }

  /// Compiler commands tried when the environment names none.
  pub fn default_compilers(&self, host: &Platform) -> Vec<String> {
    let mut names: Vec<&str> = Vec::new();
    if host.family() == "windows" {
      names.extend(["cl", "clang-cl"]);
    }
    match self {
      Self::C => names.extend(["cc", "gcc", "clang"]),
      Self::Cxx => names.extend(["c++", "g++", "clang++"]),
    }
    names.into_iter().map(str::to_string).collect()
  }
}

impl FromStr for Language {
  type Err = ToolchainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "c" => Ok(Self::C),
      "c++" | "cxx" | "cpp" => Ok(Self::Cxx),
      other => Err(ToolchainError::InvalidArgument(format!("unknown language '{other}'"))),
    }
  }
}

impl fmt::Display for Language {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Detected compiler identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Brand {
  Gcc,
  Clang,
  Msvc,
  Unknown,
}

impl Brand {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Gcc => "gcc",
      Self::Clang => "clang",
      Self::Msvc => "msvc",
      Self::Unknown => "unknown",
    }
  }
}

impl fmt::Display for Brand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Command-line dialect of a toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
  Cc,
  Msvc,
}

impl Flavor {
  /// Pick the dialect from the compiler command's program name.
  pub fn for_command(command: &[String]) -> Self {
    let Some(program) = command.first() else {
      return Self::Cc;
    };
    let base = program.rsplit(['/', '\\']).next().unwrap_or(program);
    let stem = base.strip_suffix(".exe").unwrap_or(base);
    if matches!(stem.to_ascii_lowercase().as_str(), "cl" | "clang-cl") {
      Self::Msvc
    } else {
      Self::Cc
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Cc => "cc",
      Self::Msvc => "msvc",
    }
  }

  /// Arguments that make the compiler print its identity.
  pub fn check_args(&self) -> &'static [&'static str] {
    match self {
      Self::Cc => &["--version"],
      Self::Msvc => &["/?"],
    }
  }
}

impl fmt::Display for Flavor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Kind of artifact a link step produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
  Executable,
  SharedLibrary,
  StaticLibrary,
  Raw,
}

impl LinkMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Executable => "executable",
      Self::SharedLibrary => "shared_library",
      Self::StaticLibrary => "static_library",
      Self::Raw => "raw",
    }
  }
}

impl FromStr for LinkMode {
  type Err = ToolchainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "executable" => Ok(Self::Executable),
      "shared_library" => Ok(Self::SharedLibrary),
      "static_library" => Ok(Self::StaticLibrary),
      "raw" => Ok(Self::Raw),
      other => Err(ToolchainError::InvalidArgument(format!("unknown link mode '{other}'"))),
    }
  }
}

impl fmt::Display for LinkMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// A source file generated at configure time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
  pub path: BuildPath,
  pub contents: String,
}

/// Turns one source file into object output.
pub trait Compiler: fmt::Debug + Send + Sync {
  fn flavor(&self) -> Flavor;

  fn lang(&self) -> Language;

  /// Make variable holding the command.
  fn command_var(&self) -> &'static str {
    self.lang().compiler_var()
  }

  fn command(&self) -> &[String];

  /// Make variable holding the global flags.
  fn flags_var(&self) -> &'static str {
    self.lang().flags_var()
  }

  fn global_flags(&self) -> &[String];

  /// Number of files a single invocation produces.
  fn num_outputs(&self) -> usize {
    1
  }

  fn accepts_pch(&self) -> bool;

  /// Whether the compiler can write a Make-style dependency file.
  fn supports_depfile(&self) -> bool;

  /// Assemble the command line for one invocation.
  fn call(
    &self,
    cmd: Fragment,
    input: Fragment,
    outputs: &[Fragment],
    depfile: Option<Fragment>,
    args: Vec<Fragment>,
  ) -> Vec<Fragment>;

  /// Flags for a list of options.
  fn args(&self, options: &[CompileOption]) -> Result<Vec<Fragment>, ToolchainError>;

  /// Flags that create a precompiled header from `header`. `injected` is set
  /// when the header is compiled through a generated wrapper source.
  fn pch_args(&self, _header: &BuildPath, _injected: bool) -> Vec<Fragment> {
    Vec::new()
  }

  /// A wrapper source this family needs to build a PCH from `header`.
  fn pch_wrapper(&self, _header: &BuildPath) -> Option<GeneratedFile> {
    None
  }

  fn parse_args(&self, args: &[String]) -> ParsedArgs;

  /// Files produced when compiling to `name` (without extension).
  fn output_files(&self, name: &str) -> Vec<BuildPath>;

  /// Objects that must be linked alongside the output, given its options.
  fn extra_objects(&self, _options: &[CompileOption]) -> Vec<BuildPath> {
    Vec::new()
  }
}

/// Turns objects and libraries into a final artifact.
pub trait Linker: fmt::Debug + Send + Sync {
  fn flavor(&self) -> Flavor;

  fn mode(&self) -> LinkMode;

  /// Short tool name used in diagnostics.
  fn name(&self) -> &'static str;

  fn command_var(&self) -> &'static str;

  fn command(&self) -> &[String];

  fn flags_var(&self) -> Option<&'static str>;

  fn global_flags(&self) -> &[String];

  fn libs_var(&self) -> Option<&'static str> {
    None
  }

  fn global_libs(&self) -> &[String] {
    &[]
  }

  /// Whether this linker can combine objects of `format` compiled from
  /// `langs`.
  fn can_link(&self, format: ObjectFormat, langs: &BTreeSet<Language>) -> bool;

  fn num_outputs(&self) -> usize {
    1
  }

  fn call(
    &self,
    cmd: Fragment,
    inputs: Vec<Fragment>,
    outputs: &[Fragment],
    libs: Vec<Fragment>,
    args: Vec<Fragment>,
  ) -> Vec<Fragment>;

  fn args(&self, options: &[LinkOption]) -> Result<Vec<Fragment>, ToolchainError>;

  fn libs(&self, _options: &[LinkOption]) -> Result<Vec<Fragment>, ToolchainError> {
    Ok(Vec::new())
  }

  fn parse_args(&self, args: &[String]) -> ParsedArgs;

  /// Files produced when linking to `name` (without extension or prefix).
  fn output_files(&self, name: &str) -> Vec<BuildPath>;
}

/// Flags forcing a gcc-style compiler to emit code for `target` when its
/// default is `native`.
pub fn arch_flags(target: Arch, native: Option<Arch>) -> Vec<String> {
  if Some(target) == native {
    return Vec::new();
  }
  match target {
    Arch::X86_64 => vec!["-m64".to_string()],
    Arch::X86 if native != Some(Arch::X86) => vec!["-m32".to_string()],
    _ => Vec::new(),
  }
}

/// Everything needed to build one language.
#[derive(Debug)]
pub struct Builder {
  lang: Language,
  brand: Brand,
  version: Option<Version>,
  object_format: ObjectFormat,
  flavor: Flavor,
  compiler: Box<dyn Compiler>,
  pch_compiler: Option<Box<dyn Compiler>>,
  linkers: BTreeMap<LinkMode, Box<dyn Linker>>,
  packages: PackageResolver,
}

/// The parts a toolchain family assembles into a [`Builder`].
#[derive(Debug)]
pub struct BuilderParts {
  pub lang: Language,
  pub brand: Brand,
  pub version: Option<Version>,
  pub object_format: ObjectFormat,
  pub flavor: Flavor,
  pub compiler: Box<dyn Compiler>,
  pub pch_compiler: Option<Box<dyn Compiler>>,
  pub linkers: BTreeMap<LinkMode, Box<dyn Linker>>,
  pub packages: PackageResolver,
}

impl Builder {
  pub fn from_parts(parts: BuilderParts) -> Self {
    Self {
      lang: parts.lang,
      brand: parts.brand,
      version: parts.version,
      object_format: parts.object_format,
      flavor: parts.flavor,
      compiler: parts.compiler,
      pch_compiler: parts.pch_compiler,
      linkers: parts.linkers,
      packages: parts.packages,
    }
  }

  /// Find and probe the compiler for `lang`.
  ///
  /// The command comes from the language's environment variable (`CC`,
  /// `CXX`) or the first default that exists on `PATH`.
  pub fn detect(env: &Environment, lang: Language) -> Result<Self, ToolchainError> {
    let candidates = match env.getvar(lang.compiler_var()) {
      Some(value) => vec![value.to_string()],
      None => lang.default_compilers(&env.host),
    };
    let command = env.check_which(&candidates, &format!("{lang} compiler"))?;
    if command.is_empty() {
      return Err(ToolchainError::InvalidArgument(format!(
        "empty {} command",
        lang.compiler_var()
      )));
    }
    let flavor = Flavor::for_command(&command);

    let mut probe = command.clone();
    probe.extend(flavor.check_args().iter().map(|a| a.to_string()));
    let output = env.execute(&probe).map_err(|err| probe_error(&command, &format!("{lang} compiler"), err))?;
    // MSVC prints its banner to stderr.
    let banner = format!("{}{}", output.stdout, output.stderr);

    Self::from_probe(env, lang, command, &banner)
  }

  /// Build from an already-probed compiler command and its banner.
  pub fn from_probe(
    env: &Environment,
    lang: Language,
    command: Vec<String>,
    version_output: &str,
  ) -> Result<Self, ToolchainError> {
    let builder = match Flavor::for_command(&command) {
      Flavor::Cc => cc::build(env, lang, command, version_output)?,
      Flavor::Msvc => msvc::build(env, lang, command, version_output)?,
    };
    info!(
      lang = %builder.lang,
      brand = %builder.brand,
      version = ?builder.version.as_ref().map(ToString::to_string),
      "detected builder"
    );
    Ok(builder)
  }

  pub fn lang(&self) -> Language {
    self.lang
  }

  pub fn brand(&self) -> Brand {
    self.brand
  }

  pub fn version(&self) -> Option<&Version> {
    self.version.as_ref()
  }

  pub fn object_format(&self) -> ObjectFormat {
    self.object_format
  }

  pub fn flavor(&self) -> Flavor {
    self.flavor
  }

  /// MSVC selects libraries through `#pragma comment(lib)`.
  pub fn auto_link(&self) -> bool {
    self.flavor == Flavor::Msvc
  }

  /// Whether one library can be built both shared and static from the same
  /// objects.
  pub fn can_dual_link(&self) -> bool {
    self.flavor == Flavor::Cc
  }

  pub fn compiler(&self) -> &dyn Compiler {
    self.compiler.as_ref()
  }

  pub fn pch_compiler(&self) -> Option<&dyn Compiler> {
    self.pch_compiler.as_deref()
  }

  pub fn linker(&self, mode: LinkMode) -> Result<&dyn Linker, ToolchainError> {
    self
      .linkers
      .get(&mode)
      .map(|l| l.as_ref())
      .ok_or(ToolchainError::MissingLinkMode { mode })
  }

  /// The linker for `mode`, checked against the objects it will combine.
  pub fn linker_for(
    &self,
    mode: LinkMode,
    format: ObjectFormat,
    langs: &BTreeSet<Language>,
  ) -> Result<&dyn Linker, ToolchainError> {
    let linker = self.linker(mode)?;
    if !linker.can_link(format, langs) {
      return Err(ToolchainError::LinkCompatibility {
        linker: format!("{} {}", self.lang, linker.name()),
        format,
        langs: langs.iter().map(Language::as_str).collect::<Vec<_>>().join(", "),
      });
    }
    Ok(linker)
  }

  pub fn link_modes(&self) -> impl Iterator<Item = LinkMode> + '_ {
    self.linkers.keys().copied()
  }

  pub fn packages(&self) -> &PackageResolver {
    &self.packages
  }
}

pub(crate) fn probe_error(command: &[String], kind: &str, err: ExecuteError) -> ToolchainError {
  match err {
    ExecuteError::ToolNotFound { command } => ToolchainError::ToolNotFound {
      kind: kind.to_string(),
      command,
    },
    other => ToolchainError::ProbeFailed {
      command: shell::join(command),
      reason: other.to_string(),
    },
  }
}

/// `command` with `extra` appended.
pub(crate) fn with_args(command: &[String], extra: &[&str]) -> Vec<String> {
  command.iter().cloned().chain(extra.iter().map(|a| a.to_string())).collect()
}

/// Split a word list into fragments.
pub(crate) fn raw_words(words: &[String]) -> Vec<Fragment> {
  words.iter().map(Fragment::from).collect()
}

/// A build-directory output named `{prefix}{base}{ext}` beside `name`'s
/// directory.
pub(crate) fn output_path(name: &str, prefix: &str, ext: &str) -> BuildPath {
  match name.rsplit_once('/') {
    Some((dir, base)) => BuildPath::builddir(format!("{dir}/{prefix}{base}{ext}")),
    None => BuildPath::builddir(format!("{prefix}{name}{ext}")),
  }
}

/// `flag` immediately followed by a path, as one shell word.
pub(crate) fn flag_path(flag: &str, path: &BuildPath) -> Fragment {
  Fragment::raw(flag) + Fragment::from(path.clone())
}

/// Consume the value of a flag given either joined (`-Ifoo`) or as the next
/// argument (`-I foo`).
pub(crate) fn flag_value<'a>(arg: &'a str, flag: &str, rest: &mut impl Iterator<Item = &'a String>) -> Option<String> {
  let tail = arg.strip_prefix(flag)?;
  if tail.is_empty() {
    rest.next().cloned()
  } else {
    Some(tail.to_string())
  }
}

/// Languages a linker for `lang` accepts objects from.
pub(crate) fn allowed_langs(lang: Language) -> BTreeSet<Language> {
  match lang {
    Language::C => BTreeSet::from([Language::C]),
    Language::Cxx => BTreeSet::from([Language::C, Language::Cxx]),
  }
}
