//! Package resolution.
//!
//! A package's usage descriptor picks the strategy: `pkg-config` queries a
//! single `.pc` file, `path` searches header and library directories, and
//! `system` tries pkg-config before falling back to path search. Every
//! failed attempt is kept so the final error can list what was tried.

pub mod pkg_config;
pub mod search;
pub mod types;
pub mod version;

use std::fmt;
use std::path::PathBuf;

use semver::VersionReq;
use thiserror::Error;
use tracing::{info, warn};

use crate::execute::ExecuteError;
use crate::path::BuildPath;
use crate::platform::{Environment, ObjectFormat};
use crate::shell::ShellError;
use crate::toolchain::{CompileOption, Flavor, Language, Library, LinkOption};
use crate::versioning::satisfies;

pub use types::{LibraryUsage, Package, PackageKind, PathUsage, Usage, UsageSource, UsageTable};
pub use version::{HeaderMacroVersion, VersionProbe};

/// A resolution strategy, as named in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  PkgConfig,
  PathSearch,
}

impl fmt::Display for Strategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::PkgConfig => write!(f, "pkg-config"),
      Self::PathSearch => write!(f, "path-search"),
    }
  }
}

fn format_attempts(attempts: &[(Strategy, String)]) -> String {
  attempts
    .iter()
    .map(|(strategy, reason)| format!("{strategy}: {reason}"))
    .collect::<Vec<_>>()
    .join("; ")
}

#[derive(Debug, Error)]
pub enum PackageError {
  #[error("unable to resolve package '{name}' ({})", format_attempts(.attempts))]
  Resolution {
    name: String,
    attempts: Vec<(Strategy, String)>,
  },

  #[error("unable to find header '{0}'")]
  HeaderNotFound(String),

  #[error("unable to find library '{0}'")]
  LibraryNotFound(String),

  #[error("package '{0}' requires auto-link")]
  AutoLinkRequired(String),

  #[error("expected an absolute path, got '{path}'")]
  NotAbsolute { path: String },

  #[error("unsupported usage '{kind}' for package '{name}'")]
  UnsupportedUsage { name: String, kind: String },

  #[error("package '{name}' version {found} does not satisfy '{required}'")]
  VersionMismatch {
    name: String,
    found: String,
    required: String,
  },

  #[error("unable to detect version from '{header}': {reason}")]
  VersionProbe { header: String, reason: String },

  #[error("invalid usage metadata in {source_name}: {reason}")]
  Metadata { source_name: String, reason: String },

  #[error("invalid package kind '{0}'; expected any, shared or static")]
  InvalidKind(String),

  #[error(transparent)]
  Execute(#[from] ExecuteError),

  #[error(transparent)]
  Shell(#[from] ShellError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl PackageError {
  /// Errors that move the cascade on to its next strategy. Contract
  /// violations and malformed metadata always surface.
  pub fn is_recoverable(&self) -> bool {
    matches!(
      self,
      Self::Resolution { .. }
        | Self::HeaderNotFound(_)
        | Self::LibraryNotFound(_)
        | Self::AutoLinkRequired(_)
        | Self::VersionMismatch { .. }
        | Self::VersionProbe { .. }
        | Self::Execute(_)
        | Self::Io(_)
    )
  }
}

/// Finds headers, libraries and whole packages for one builder.
#[derive(Debug, Clone)]
pub struct PackageResolver {
  env: Environment,
  lang: Language,
  flavor: Flavor,
  object_format: ObjectFormat,
  include_dirs: Vec<PathBuf>,
  lib_dirs: Vec<PathBuf>,
}

impl PackageResolver {
  pub fn new(
    env: &Environment,
    lang: Language,
    flavor: Flavor,
    object_format: ObjectFormat,
    include_dirs: Vec<PathBuf>,
    lib_dirs: Vec<PathBuf>,
  ) -> Self {
    Self {
      env: env.clone(),
      lang,
      flavor,
      object_format,
      include_dirs,
      lib_dirs,
    }
  }

  pub fn lang(&self) -> Language {
    self.lang
  }

  /// Default header search directories.
  pub fn include_dirs(&self) -> &[PathBuf] {
    &self.include_dirs
  }

  /// Default library search directories.
  pub fn lib_dirs(&self) -> &[PathBuf] {
    &self.lib_dirs
  }

  /// The directory containing header `name`. An empty or missing `dirs`
  /// searches the defaults.
  pub fn header(&self, name: &str, dirs: Option<&[PathBuf]>) -> Result<PathBuf, PackageError> {
    let dirs = match dirs {
      Some(dirs) if !dirs.is_empty() => dirs,
      _ => &self.include_dirs,
    };
    search::find_header(name, dirs)?.ok_or_else(|| PackageError::HeaderNotFound(name.to_string()))
  }

  /// The library file for `name`. An empty or missing `dirs` searches the
  /// defaults.
  pub fn library(&self, name: &str, kind: PackageKind, dirs: Option<&[PathBuf]>) -> Result<Library, PackageError> {
    let dirs = match dirs {
      Some(dirs) if !dirs.is_empty() => dirs,
      _ => &self.lib_dirs,
    };
    let candidates = search::library_candidates(name, kind, &self.env.target, self.flavor);
    let (path, kind) =
      search::find_library(&candidates, dirs)?.ok_or_else(|| PackageError::LibraryNotFound(name.to_string()))?;
    Ok(Library::file(BuildPath::absolute(path.display().to_string()), kind))
  }

  /// Resolve `name` with the strategy its usage descriptor selects.
  pub fn resolve(
    &self,
    name: &str,
    submodules: &[String],
    version: &VersionReq,
    kind: PackageKind,
    probe: Option<&dyn VersionProbe>,
  ) -> Result<Package, PackageError> {
    let usage = self.env.usage().usage(name, submodules)?;

    match usage {
      Usage::PkgConfig {
        pcfiles,
        path,
        extra_args,
      } => {
        let [pcfile] = pcfiles.as_slice() else {
          return Err(PackageError::Resolution {
            name: name.to_string(),
            attempts: vec![(
              Strategy::PkgConfig,
              format!("expected exactly one pkg-config file, found {}", pcfiles.len()),
            )],
          });
        };
        let query = pkg_config::Query {
          name,
          pcfile,
          submodules,
          format: self.object_format,
          version,
          kind,
          path: &path,
          extra_args: &extra_args,
        };
        pkg_config::resolve(&self.env, &query).map_err(|err| single_attempt(name, Strategy::PkgConfig, err))
      }
      Usage::Path(usage) => self
        .resolve_path(name, submodules, &usage, version, kind, probe)
        .map_err(|err| single_attempt(name, Strategy::PathSearch, err)),
      Usage::System(usage) => {
        let query = pkg_config::Query {
          name,
          pcfile: name,
          submodules,
          format: self.object_format,
          version,
          kind,
          path: &[],
          extra_args: &[],
        };
        let mut attempts = Vec::new();
        match pkg_config::resolve(&self.env, &query) {
          Ok(package) => return Ok(package),
          Err(err) if err.is_recoverable() => {
            warn!(package = name, error = %err, "pkg-config lookup failed; falling back to path search");
            attempts.push((Strategy::PkgConfig, err.to_string()));
          }
          Err(err) => return Err(err),
        }
        match self.resolve_path(name, submodules, &usage, version, kind, probe) {
          Ok(package) => Ok(package),
          Err(err) if err.is_recoverable() => {
            attempts.push((Strategy::PathSearch, err.to_string()));
            Err(PackageError::Resolution {
              name: name.to_string(),
              attempts,
            })
          }
          Err(err) => Err(err),
        }
      }
    }
  }

  fn resolve_path(
    &self,
    name: &str,
    submodules: &[String],
    usage: &PathUsage,
    version: &VersionReq,
    kind: PackageKind,
    probe: Option<&dyn VersionProbe>,
  ) -> Result<Package, PackageError> {
    let auto_link = self.flavor == Flavor::Msvc && usage.auto_link;
    if usage.auto_link && !auto_link {
      return Err(PackageError::AutoLinkRequired(name.to_string()));
    }

    let mut compile_options = Vec::new();
    let mut include_dirs: Vec<PathBuf> = Vec::new();
    if usage.headers.is_empty() {
      for dir in &usage.include_path {
        search::require_absolute(dir)?;
        include_dirs.push(dir.clone());
      }
    } else {
      for header in &usage.headers {
        let dir = self.header(header, Some(&usage.include_path))?;
        if !include_dirs.contains(&dir) {
          include_dirs.push(dir);
        }
      }
    }
    compile_options.extend(
      include_dirs
        .iter()
        .map(|dir| CompileOption::system_include_dir(BuildPath::absolute(dir.display().to_string()))),
    );

    let mut link_options = Vec::new();
    let mut found_lib_path = None;
    if auto_link {
      for dir in &usage.library_path {
        search::require_absolute(dir)?;
        link_options.push(LinkOption::lib_dir(BuildPath::absolute(dir.display().to_string())));
      }
      found_lib_path = usage.library_path.first().map(|dir| dir.display().to_string());
    } else {
      for library in &usage.libraries {
        match library {
          LibraryUsage::Framework { framework } => link_options.push(LinkOption::lib(Library::framework(framework))),
          LibraryUsage::Name(lib) if lib == "pthread" => {
            compile_options.push(CompileOption::Pthread);
            link_options.push(LinkOption::Pthread);
          }
          LibraryUsage::Name(lib) => {
            let library = self.library(lib, kind, Some(&usage.library_path))?;
            if found_lib_path.is_none() {
              found_lib_path = library.path().map(|path| path.parent().suffix);
            }
            link_options.push(LinkOption::lib(library));
          }
        }
      }
    }

    let found_version = match probe {
      Some(probe) => {
        let found = probe.probe(&include_dirs)?;
        if !satisfies(&found, version) {
          return Err(PackageError::VersionMismatch {
            name: name.to_string(),
            found: found.to_string(),
            required: version.to_string(),
          });
        }
        Some(found)
      }
      None => None,
    };

    let version_note = found_version.as_ref().map(|v| format!(" version {v}")).unwrap_or_default();
    let path_note = found_lib_path.map(|p| format!(" in {p}")).unwrap_or_default();
    info!(package = name, "found package '{name}'{version_note} via path-search{path_note}");

    Ok(Package {
      name: name.to_string(),
      submodules: submodules.to_vec(),
      format: self.object_format,
      version: found_version,
      compile_options,
      link_options,
    })
  }
}

/// Name the package and strategy in a recoverable single-strategy failure.
fn single_attempt(name: &str, strategy: Strategy, err: PackageError) -> PackageError {
  match err {
    PackageError::Resolution { .. } => err,
    err if err.is_recoverable() => PackageError::Resolution {
      name: name.to_string(),
      attempts: vec![(strategy, err.to_string())],
    },
    err => err,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;
  use std::fs;
  use std::sync::Arc;

  use crate::execute::{Output, ScriptedRunner};
  use crate::platform::{Arch, Os, Platform};
  use crate::toolchain::LibraryKind;

  fn linux() -> Platform {
    Platform::new(Arch::X86_64, Os::Linux)
  }

  fn resolver(usage: &str, runner: ScriptedRunner, flavor: Flavor) -> PackageResolver {
    let env = Environment::new(linux(), BTreeMap::new())
      .with_runner(Arc::new(runner))
      .with_usage(Arc::new(UsageTable::from_json(usage, None).unwrap()));
    PackageResolver::new(&env, Language::C, flavor, ObjectFormat::Elf, Vec::new(), Vec::new())
  }

  fn no_pkg_config() -> ScriptedRunner {
    ScriptedRunner::new().missing("pkg-config")
  }

  #[test]
  fn include_path_without_headers_is_not_probed() {
    let resolver = resolver(
      r#"{"x": {"type": "path", "include_path": ["/opt/x/include"]}}"#,
      no_pkg_config(),
      Flavor::Cc,
    );
    let pkg = resolver
      .resolve("x", &[], &VersionReq::STAR, PackageKind::Any, None)
      .unwrap();
    assert_eq!(
      pkg.compile_options,
      vec![CompileOption::system_include_dir(BuildPath::absolute("/opt/x/include"))]
    );
    assert!(pkg.link_options.is_empty());
    assert_eq!(pkg.version, None);
  }

  #[test]
  fn pthread_and_frameworks_skip_file_search() {
    let resolver = resolver(
      r#"{"threads": {"type": "path", "libraries": ["pthread", {"framework": "Cocoa"}]}}"#,
      no_pkg_config(),
      Flavor::Cc,
    );
    let pkg = resolver
      .resolve("threads", &[], &VersionReq::STAR, PackageKind::Any, None)
      .unwrap();
    assert_eq!(pkg.compile_options, vec![CompileOption::Pthread]);
    assert_eq!(
      pkg.link_options,
      vec![LinkOption::Pthread, LinkOption::lib(Library::framework("Cocoa"))]
    );
  }

  #[test]
  fn path_usage_finds_headers_and_libraries() {
    let root = tempfile::tempdir().unwrap();
    let inc = root.path().join("include");
    let lib = root.path().join("lib");
    fs::create_dir_all(&inc).unwrap();
    fs::create_dir_all(&lib).unwrap();
    fs::write(inc.join("foo.h"), "").unwrap();
    fs::write(lib.join("libfoo.a"), "").unwrap();

    let usage = serde_json::json!({
      "foo": {
        "type": "path",
        "headers": ["foo.h"],
        "libraries": ["foo"],
        "include_path": [inc],
        "library_path": [lib],
      }
    });
    let resolver = resolver(&usage.to_string(), no_pkg_config(), Flavor::Cc);
    let pkg = resolver
      .resolve("foo", &[], &VersionReq::STAR, PackageKind::Any, None)
      .unwrap();

    assert_eq!(
      pkg.compile_options,
      vec![CompileOption::system_include_dir(BuildPath::absolute(inc.display().to_string()))]
    );
    assert_eq!(
      pkg.link_options,
      vec![LinkOption::lib(Library::file(
        BuildPath::absolute(lib.join("libfoo.a").display().to_string()),
        LibraryKind::Static
      ))]
    );
  }

  #[test]
  fn system_usage_prefers_pkg_config() {
    let runner = ScriptedRunner::new()
      .respond("pkg-config zlib --modversion", Output::stdout("1.3"))
      .respond("pkg-config zlib --cflags", Output::stdout(""))
      .respond("pkg-config zlib --libs", Output::stdout("-lz"));
    let resolver = resolver("{}", runner, Flavor::Cc);
    let pkg = resolver
      .resolve("zlib", &[], &VersionReq::STAR, PackageKind::Any, None)
      .unwrap();
    assert_eq!(pkg.link_options, vec![LinkOption::lib(Library::named("z"))]);
  }

  #[test]
  #[tracing_test::traced_test]
  fn fallback_to_path_search_is_logged() {
    let resolver = resolver(r#"{"m": {"type": "system", "libraries": []}}"#, no_pkg_config(), Flavor::Cc);
    resolver
      .resolve("m", &[], &VersionReq::STAR, PackageKind::Any, None)
      .unwrap();
    assert!(logs_contain("falling back to path search"));
    assert!(logs_contain("via path-search"));
  }

  #[test]
  fn system_usage_reports_every_attempt() {
    let resolver = resolver("{}", no_pkg_config(), Flavor::Cc);
    let dir = tempfile::tempdir().unwrap();
    let usage = PathUsage {
      libraries: vec![LibraryUsage::Name("nothere".to_string())],
      library_path: vec![dir.path().to_path_buf()],
      ..PathUsage::default()
    };
    let err = resolver
      .resolve_path("nothere", &[], &usage, &VersionReq::STAR, PackageKind::Any, None)
      .unwrap_err();
    assert!(matches!(err, PackageError::LibraryNotFound(_)));

    let err = resolver
      .resolve("nothere", &[], &VersionReq::STAR, PackageKind::Any, None)
      .unwrap_err();
    let PackageError::Resolution { name, attempts } = &err else {
      panic!("expected aggregated error, got {err}");
    };
    assert_eq!(name, "nothere");
    let strategies: Vec<Strategy> = attempts.iter().map(|(s, _)| *s).collect();
    assert_eq!(strategies, vec![Strategy::PkgConfig, Strategy::PathSearch]);
    assert!(err.to_string().contains("pkg-config: "));
    assert!(err.to_string().contains("path-search: unable to find library 'nothere'"));
  }

  #[test]
  fn pkg_config_usage_requires_one_file() {
    let resolver = resolver(
      r#"{"multi": {"type": "pkg-config", "pcfiles": ["a", "b"]}}"#,
      no_pkg_config(),
      Flavor::Cc,
    );
    let err = resolver
      .resolve("multi", &[], &VersionReq::STAR, PackageKind::Any, None)
      .unwrap_err();
    assert!(matches!(err, PackageError::Resolution { .. }));
    assert!(err.to_string().contains("multi"));
  }

  #[test]
  fn relative_search_dirs_are_never_swallowed() {
    let resolver = resolver(
      r#"{"rel": {"type": "system", "headers": ["rel.h"], "include_path": ["include"]}}"#,
      no_pkg_config(),
      Flavor::Cc,
    );
    let err = resolver
      .resolve("rel", &[], &VersionReq::STAR, PackageKind::Any, None)
      .unwrap_err();
    assert!(matches!(err, PackageError::NotAbsolute { .. }));
  }

  #[test]
  fn auto_link_depends_on_flavor() {
    let usage = r#"{"boost": {"type": "path", "auto_link": true,
                              "include_path": ["/opt/boost/include"],
                              "library_path": ["/opt/boost/lib"]}}"#;

    let cc = resolver(usage, no_pkg_config(), Flavor::Cc);
    let err = cc
      .resolve("boost", &[], &VersionReq::STAR, PackageKind::Any, None)
      .unwrap_err();
    assert!(err.to_string().contains("auto-link"));

    let msvc = resolver(usage, no_pkg_config(), Flavor::Msvc);
    let pkg = msvc
      .resolve("boost", &[], &VersionReq::STAR, PackageKind::Any, None)
      .unwrap();
    assert_eq!(
      pkg.link_options,
      vec![LinkOption::lib_dir(BuildPath::absolute("/opt/boost/lib"))]
    );
  }

  #[test]
  fn version_probe_sees_only_chosen_dirs() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("boost")).unwrap();
    fs::write(
      root.path().join("boost/version.hpp"),
      "#define BOOST_LIB_VERSION \"1_82\"\n",
    )
    .unwrap();

    let usage = serde_json::json!({
      "boost": {"type": "path", "include_path": [root.path()]}
    });
    let resolver = resolver(&usage.to_string(), no_pkg_config(), Flavor::Cc);
    let probe = HeaderMacroVersion::boost();

    let pkg = resolver
      .resolve(
        "boost",
        &[],
        &VersionReq::parse(">=1.80").unwrap(),
        PackageKind::Any,
        Some(&probe),
      )
      .unwrap();
    assert_eq!(pkg.version, Some(semver::Version::new(1, 82, 0)));

    let err = resolver
      .resolve(
        "boost",
        &[],
        &VersionReq::parse(">=1.83").unwrap(),
        PackageKind::Any,
        Some(&probe),
      )
      .unwrap_err();
    assert!(err.to_string().contains("1.82.0"));
  }
}
