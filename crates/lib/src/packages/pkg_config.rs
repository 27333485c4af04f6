//! Package resolution through `pkg-config`.

use std::path::PathBuf;

use semver::{Version, VersionReq};
use tracing::info;

use crate::packages::{Package, PackageError, PackageKind};
use crate::path::BuildPath;
use crate::platform::{Environment, ObjectFormat};
use crate::shell;
use crate::toolchain::{CompileOption, Library, LinkOption};
use crate::versioning::{parse_lenient, satisfies};

/// One pkg-config lookup.
#[derive(Debug, Clone)]
pub struct Query<'a> {
  /// Package name reported in the result and in errors.
  pub name: &'a str,
  /// The `.pc` module to query.
  pub pcfile: &'a str,
  pub submodules: &'a [String],
  pub format: ObjectFormat,
  pub version: &'a VersionReq,
  pub kind: PackageKind,
  /// Directories prepended to `PKG_CONFIG_PATH`.
  pub path: &'a [PathBuf],
  pub extra_args: &'a [String],
}

fn parse_version(text: &str) -> Option<Version> {
  let text = text.trim();
  parse_lenient(text).or_else(|| text.parse().ok().map(|major| Version::new(major, 0, 0)))
}

/// The environment pkg-config runs with, with the query's search path in
/// front of any inherited `PKG_CONFIG_PATH`.
fn query_env(env: &Environment, path: &[PathBuf]) -> Environment {
  if path.is_empty() {
    return env.clone();
  }
  let sep = if env.host.family() == "windows" { ";" } else { ":" };
  let mut dirs: Vec<String> = path.iter().map(|p| p.display().to_string()).collect();
  if let Some(existing) = env.getvar("PKG_CONFIG_PATH").filter(|v| !v.is_empty()) {
    dirs.push(existing.to_string());
  }
  env.clone().with_variable("PKG_CONFIG_PATH", dirs.join(sep))
}

fn run(env: &Environment, command: &[String], query: &Query<'_>, args: &[&str]) -> Result<Vec<String>, PackageError> {
  let mut full = command.to_vec();
  full.push(query.pcfile.to_string());
  full.extend(args.iter().map(|a| a.to_string()));
  full.extend(query.extra_args.iter().cloned());
  let output = env.execute(&full)?;
  Ok(shell::split(output.stdout.trim())?)
}

/// Turn `--cflags` output into compile options.
pub fn compile_options(words: &[String]) -> Vec<CompileOption> {
  let mut options = Vec::new();
  let mut iter = words.iter();
  while let Some(word) = iter.next() {
    let option = if word == "-pthread" {
      CompileOption::Pthread
    } else if let Some(dir) = take_value(word, "-I", &mut iter) {
      CompileOption::include_dir(BuildPath::absolute(dir))
    } else if let Some(define) = take_value(word, "-D", &mut iter) {
      match define.split_once('=') {
        Some((name, value)) => CompileOption::define(name, Some(value)),
        None => CompileOption::define(define, None),
      }
    } else {
      CompileOption::raw(word.clone())
    };
    options.push(option);
  }
  options
}

/// Turn `--libs` output into link options.
pub fn link_options(words: &[String]) -> Vec<LinkOption> {
  let mut options = Vec::new();
  let mut iter = words.iter();
  while let Some(word) = iter.next() {
    let option = if word == "-pthread" {
      LinkOption::Pthread
    } else if word == "-framework" {
      match iter.next() {
        Some(name) => LinkOption::lib(Library::framework(name.clone())),
        None => LinkOption::raw(word.clone()),
      }
    } else if let Some(dir) = take_value(word, "-L", &mut iter) {
      LinkOption::lib_dir(BuildPath::absolute(dir))
    } else if let Some(name) = take_value(word, "-l", &mut iter) {
      LinkOption::lib(Library::named(name))
    } else {
      LinkOption::raw(word.clone())
    };
    options.push(option);
  }
  options
}

fn take_value<'a>(word: &'a str, flag: &str, rest: &mut impl Iterator<Item = &'a String>) -> Option<String> {
  let tail = word.strip_prefix(flag)?;
  if tail.is_empty() {
    rest.next().cloned()
  } else {
    Some(tail.to_string())
  }
}

/// Resolve a package from its `.pc` file.
pub fn resolve(env: &Environment, query: &Query<'_>) -> Result<Package, PackageError> {
  let command = shell::split(env.getvar_or("PKG_CONFIG", "pkg-config"))?;
  let env = query_env(env, query.path);

  let reported = run(&env, &command, query, &["--modversion"])?.join(" ");
  let version = parse_version(&reported);
  match &version {
    Some(found) if satisfies(found, query.version) => {}
    _ if *query.version == VersionReq::STAR => {}
    _ => {
      return Err(PackageError::VersionMismatch {
        name: query.name.to_string(),
        found: reported,
        required: query.version.to_string(),
      });
    }
  }

  let cflags = run(&env, &command, query, &["--cflags"])?;
  let libs = if query.kind == PackageKind::Static {
    run(&env, &command, query, &["--libs", "--static"])?
  } else {
    run(&env, &command, query, &["--libs"])?
  };

  let note = version.as_ref().map(|v| format!(" version {v}")).unwrap_or_default();
  info!(package = query.name, "found package '{}'{note} via pkg-config", query.name);

  Ok(Package {
    name: query.name.to_string(),
    submodules: query.submodules.to_vec(),
    format: query.format,
    version,
    compile_options: compile_options(&cflags),
    link_options: link_options(&libs),
  })
}
