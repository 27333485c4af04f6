//! The Unix-style `cc` family (gcc, clang and compatibles).

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;
use tracing::{debug, info};

use crate::packages::{PackageResolver, search};
use crate::path::{BuildPath, Root};
use crate::platform::{Arch, Environment, ObjectFormat, Os, Platform};
use crate::safe_str::Fragment;
use crate::shell;
use crate::toolchain::{
  Brand, Builder, BuilderParts, CompileOption, Compiler, Flavor, Language, Library, LinkMode, LinkOption, Linker,
  ParsedArgs, ToolchainError, WarningLevel, allowed_langs, arch_flags, flag_path, flag_value, output_path,
  probe_error, with_args,
};
use crate::versioning::detect_version;

static LIB_NAME: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^lib(.+?)\.(?:so|a|dylib|dll\.a)$").expect("library name pattern is a valid regex"));

/// Identify the compiler from its `--version` banner, returning the flags
/// needed to hit the target architecture when cross-compiling.
fn parse_brand(
  env: &Environment,
  command: &[String],
  version_output: &str,
) -> Result<(Brand, Option<Version>, Vec<String>), ToolchainError> {
  if version_output.contains("Free Software Foundation") {
    let mut target_flags = Vec::new();
    if env.is_cross() {
      let probe = with_args(command, &["-dumpmachine"]);
      let output = env.execute(&probe).map_err(|err| probe_error(command, "compiler", err))?;
      let native = output.stdout.trim().split('-').next().and_then(Arch::parse);
      target_flags = arch_flags(env.target.arch, native);
    }
    Ok((Brand::Gcc, detect_version(version_output), target_flags))
  } else if version_output.contains("clang") {
    let target_flags = if env.is_cross() {
      vec!["-target".to_string(), env.target_triple()]
    } else {
      Vec::new()
    };
    Ok((Brand::Clang, detect_version(version_output), target_flags))
  } else {
    Ok((Brand::Unknown, None, Vec::new()))
  }
}

/// Infer `-fuse-ld=` from the extension of the `LD` variable.
fn fuse_ld_flag(env: &Environment, command: &[String]) -> Option<String> {
  let ld = env.getvar("LD")?;
  let tail = Path::new(ld).extension()?.to_str()?;
  if matches!(tail, "bfd" | "gold") {
    info!(command = %shell::join(command), "setting `-fuse-ld={tail}`");
    Some(format!("-fuse-ld={tail}"))
  } else {
    None
  }
}

/// Find the real linker from the verbose output of a test link.
///
/// Lines mentioning `--version` start with the linker invocation. `collect2`
/// is gcc's wrapper, used only when no real linker line follows it.
fn find_raw_ld(env: &Environment, command: &[String], ldflags: &[String]) -> Option<Vec<String>> {
  let mut probe = command.to_vec();
  probe.extend(ldflags.iter().cloned());
  probe.extend(["-v".to_string(), "-Wl,--version".to_string()]);

  let output = match env.execute_any(&probe) {
    Ok(output) => output,
    Err(err) => {
      debug!(error = %err, "unable to probe for ld");
      return None;
    }
  };

  let mut found = None;
  let programs = output
    .stderr
    .lines()
    .filter(|line| line.contains("--version"))
    .filter_map(|line| shell::split(line).ok()?.into_iter().next());
  for program in programs {
    let is_collect2 = Path::new(&program).file_name().and_then(|n| n.to_str()) == Some("collect2");
    found = Some(program);
    if !is_collect2 {
      break;
    }
  }
  found.map(|program| vec![program])
}

/// Header search directories reported by `cc -E -Wp,-v`.
fn compiler_include_dirs(env: &Environment, command: &[String], lang: Language) -> Vec<PathBuf> {
  let probe = with_args(command, &["-x", lang.as_str(), "-E", "-Wp,-v", "/dev/null"]);
  let Ok(output) = env.execute_any(&probe) else {
    return Vec::new();
  };

  output
    .stderr
    .lines()
    .skip_while(|line| !line.starts_with("#include <...> search starts here:"))
    .skip(1)
    .take_while(|line| !line.starts_with("End of search list."))
    .map(|line| PathBuf::from(line.trim().trim_end_matches(" (framework directory)")))
    .collect()
}

/// Library search directories reported by `cc -print-search-dirs`.
fn compiler_lib_dirs(env: &Environment, command: &[String], ldflags: &[String]) -> Vec<PathBuf> {
  let mut probe = command.to_vec();
  probe.extend(ldflags.iter().cloned());
  probe.push("-print-search-dirs".to_string());
  let Ok(output) = env.execute(&probe) else {
    return Vec::new();
  };

  output
    .stdout
    .lines()
    .find_map(|line| line.strip_prefix("libraries: ="))
    .map(|dirs| std::env::split_paths(dirs).collect())
    .unwrap_or_default()
}

/// Construct a `cc`-family builder from a probed compiler command.
pub fn build(
  env: &Environment,
  lang: Language,
  command: Vec<String>,
  version_output: &str,
) -> Result<Builder, ToolchainError> {
  let (brand, version, target_flags) = parse_brand(env, &command, version_output)?;
  let object_format = env.target.object_format();

  let mut cflags = target_flags.clone();
  cflags.extend(env.split_var("CPPFLAGS")?);
  cflags.extend(env.split_var(lang.flags_var())?);

  let mut ldflags = target_flags;
  ldflags.extend(fuse_ld_flag(env, &command));
  ldflags.extend(env.split_var("LDFLAGS")?);
  let ldlibs = env.split_var("LDLIBS")?;

  let ar_candidates = [env.getvar_or("AR", "ar").to_string()];
  let ar_command = env.check_which(&ar_candidates, "static linker")?;
  let arflags = env.split_var_or("ARFLAGS", "cr")?;

  let compiler = CcCompiler::new(lang, command.clone(), cflags.clone(), false);
  let pch_compiler: Option<Box<dyn Compiler>> = match brand {
    Brand::Gcc | Brand::Clang => Some(Box::new(CcCompiler::new(lang, command.clone(), cflags, true))),
    _ => None,
  };

  let mut linkers: BTreeMap<LinkMode, Box<dyn Linker>> = BTreeMap::new();
  for mode in [LinkMode::Executable, LinkMode::SharedLibrary] {
    linkers.insert(
      mode,
      Box::new(CcLinker {
        lang,
        mode,
        command: command.clone(),
        flags: ldflags.clone(),
        libs: ldlibs.clone(),
        target: env.target,
        object_format,
      }),
    );
  }
  linkers.insert(
    LinkMode::StaticLibrary,
    Box::new(ArLinker {
      command: ar_command,
      flags: arflags,
      object_format,
    }),
  );
  if let Some(ld_command) = find_raw_ld(env, &command, &ldflags) {
    linkers.insert(
      LinkMode::Raw,
      Box::new(LdLinker {
        command: ld_command,
        object_format,
        target: env.target,
      }),
    );
  }

  let include_dirs = search::existing_unique(
    env
      .path_list("CPATH")
      .into_iter()
      .chain(compiler_include_dirs(env, &command, lang))
      .chain(env.host.include_dirs()),
  );
  let lib_dirs = search::existing_unique(
    env
      .path_list("LIBRARY_PATH")
      .into_iter()
      .chain(compiler_lib_dirs(env, &command, &ldflags))
      .chain(env.host.lib_dirs()),
  );
  let packages = PackageResolver::new(env, lang, Flavor::Cc, object_format, include_dirs, lib_dirs);

  Ok(Builder::from_parts(BuilderParts {
    lang,
    brand,
    version,
    object_format,
    flavor: Flavor::Cc,
    compiler: Box::new(compiler),
    pch_compiler,
    linkers,
    packages,
  }))
}

/// A gcc-style compiler, or its precompiled-header counterpart.
#[derive(Debug, Clone)]
pub struct CcCompiler {
  lang: Language,
  command: Vec<String>,
  flags: Vec<String>,
  pch: bool,
}

impl CcCompiler {
  pub fn new(lang: Language, command: Vec<String>, flags: Vec<String>, pch: bool) -> Self {
    Self {
      lang,
      command,
      flags,
      pch,
    }
  }
}

impl Compiler for CcCompiler {
  fn flavor(&self) -> Flavor {
    Flavor::Cc
  }

  fn lang(&self) -> Language {
    self.lang
  }

  fn command(&self) -> &[String] {
    &self.command
  }

  fn global_flags(&self) -> &[String] {
    &self.flags
  }

  fn accepts_pch(&self) -> bool {
    !self.pch
  }

  fn supports_depfile(&self) -> bool {
    true
  }

  fn call(
    &self,
    cmd: Fragment,
    input: Fragment,
    outputs: &[Fragment],
    depfile: Option<Fragment>,
    args: Vec<Fragment>,
  ) -> Vec<Fragment> {
    let mut result = vec![cmd];
    result.extend(args);
    if let Some(depfile) = depfile {
      result.extend([Fragment::raw("-MMD"), Fragment::raw("-MF"), depfile]);
    }
    result.extend([Fragment::raw("-c"), input]);
    if let Some(output) = outputs.first() {
      result.extend([Fragment::raw("-o"), output.clone()]);
    }
    result
  }

  fn args(&self, options: &[CompileOption]) -> Result<Vec<Fragment>, ToolchainError> {
    let mut args = Vec::new();
    for option in options {
      match option {
        CompileOption::IncludeDir { path, system: true } => {
          args.extend([Fragment::raw("-isystem"), Fragment::from(path.clone())]);
        }
        CompileOption::IncludeDir { path, system: false } => args.push(flag_path("-I", path)),
        CompileOption::Define { name, value: Some(value) } => args.push(Fragment::raw(format!("-D{name}={value}"))),
        CompileOption::Define { name, value: None } => args.push(Fragment::raw(format!("-D{name}"))),
        CompileOption::PchUse(pch) if self.accepts_pch() => {
          // gcc finds `x.gch` when asked to include `x`.
          args.extend([Fragment::raw("-include"), Fragment::from(pch.artifact.with_extension(""))]);
        }
        CompileOption::PchUse(_) => {}
        CompileOption::Pthread => args.push(Fragment::raw("-pthread")),
        CompileOption::Warning { level } => match level {
          WarningLevel::Disable => args.push(Fragment::raw("-w")),
          WarningLevel::Default => {}
          WarningLevel::All => args.push(Fragment::raw("-Wall")),
          WarningLevel::Extra => args.extend([Fragment::raw("-Wall"), Fragment::raw("-Wextra")]),
        },
        CompileOption::WarningsAsErrors => args.push(Fragment::raw("-Werror")),
        CompileOption::Raw { value } => args.push(Fragment::raw(value.clone())),
      }
    }
    Ok(args)
  }

  fn parse_args(&self, args: &[String]) -> ParsedArgs {
    let mut parsed = ParsedArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
      match arg.as_str() {
        "-w" => parsed.warning_level = Some("disable".to_string()),
        "-Wall" => parsed.warning_level = Some("all".to_string()),
        "-Wextra" => parsed.warning_level = Some("extra".to_string()),
        "-Werror" => parsed.warnings_as_errors = Some(true),
        "-Wno-error" => parsed.warnings_as_errors = Some(false),
        "-include" => parsed.pch_use = iter.next().cloned(),
        arg => {
          if let Some(dir) = flag_value(arg, "-I", &mut iter) {
            parsed.includes.push(dir);
          } else if let Some(define) = flag_value(arg, "-D", &mut iter) {
            parsed.defines.push(define);
          } else {
            parsed.extra.push(arg.to_string());
          }
        }
      }
    }
    parsed
  }

  fn output_files(&self, name: &str) -> Vec<BuildPath> {
    let ext = if self.pch { ".gch" } else { ".o" };
    vec![BuildPath::builddir(format!("{name}{ext}"))]
  }
}

/// `-lname` for an external `lib{name}.*` file, the path itself otherwise.
fn library_word(path: &BuildPath) -> Fragment {
  if path.root == Root::Absolute
    && let Some(caps) = LIB_NAME.captures(path.basename())
  {
    return Fragment::raw(format!("-l{}", &caps[1]));
  }
  Fragment::from(path.clone())
}

/// The `-L` directory needed to find `path` by name, if any.
fn library_dir(path: &BuildPath) -> Option<BuildPath> {
  (path.root == Root::Absolute && LIB_NAME.is_match(path.basename())).then(|| path.parent())
}

fn lib_dir_args(options: &[LinkOption]) -> Vec<Fragment> {
  let mut dirs: Vec<BuildPath> = Vec::new();
  for option in options {
    let dir = match option {
      LinkOption::LibDir { path } => Some(path.clone()),
      LinkOption::Library { library } => library.path().and_then(library_dir),
      _ => None,
    };
    if let Some(dir) = dir
      && !dirs.contains(&dir)
    {
      dirs.push(dir);
    }
  }
  dirs.iter().map(|dir| flag_path("-L", dir)).collect()
}

/// Links executables and shared libraries through the compiler driver.
#[derive(Debug, Clone)]
pub struct CcLinker {
  lang: Language,
  mode: LinkMode,
  command: Vec<String>,
  flags: Vec<String>,
  libs: Vec<String>,
  target: Platform,
  object_format: ObjectFormat,
}

impl CcLinker {
  fn link_lib(&self, library: &Library) -> Result<Vec<Fragment>, ToolchainError> {
    match library {
      Library::File { path, .. } => Ok(vec![library_word(path)]),
      Library::Named { name } => Ok(vec![Fragment::raw(format!("-l{name}"))]),
      Library::WholeArchive { library } if self.target.os == Os::MacOs => match library.path() {
        Some(path) => Ok(vec![flag_path("-Wl,-force_load,", path)]),
        None => Err(ToolchainError::UnsupportedFeature {
          flavor: Flavor::Cc,
          feature: "whole-archive of a library without a path".to_string(),
        }),
      },
      Library::WholeArchive { library } => {
        let mut words = vec![Fragment::raw("-Wl,--whole-archive")];
        words.extend(self.link_lib(library)?);
        words.push(Fragment::raw("-Wl,--no-whole-archive"));
        Ok(words)
      }
      Library::Framework { name, suffix } if self.target.os == Os::MacOs => {
        let name = match suffix {
          Some(suffix) => format!("{name},{suffix}"),
          None => name.clone(),
        };
        Ok(vec![Fragment::raw("-framework"), Fragment::raw(name)])
      }
      Library::Framework { .. } => Err(ToolchainError::UnsupportedFeature {
        flavor: Flavor::Cc,
        feature: format!("frameworks on {}", self.target.os),
      }),
    }
  }
}

impl Linker for CcLinker {
  fn flavor(&self) -> Flavor {
    Flavor::Cc
  }

  fn mode(&self) -> LinkMode {
    self.mode
  }

  fn name(&self) -> &'static str {
    "cc"
  }

  fn command_var(&self) -> &'static str {
    self.lang.compiler_var()
  }

  fn command(&self) -> &[String] {
    &self.command
  }

  fn flags_var(&self) -> Option<&'static str> {
    Some("LDFLAGS")
  }

  fn global_flags(&self) -> &[String] {
    &self.flags
  }

  fn libs_var(&self) -> Option<&'static str> {
    Some("LDLIBS")
  }

  fn global_libs(&self) -> &[String] {
    &self.libs
  }

  fn can_link(&self, format: ObjectFormat, langs: &BTreeSet<Language>) -> bool {
    format == self.object_format && allowed_langs(self.lang).is_superset(langs)
  }

  fn num_outputs(&self) -> usize {
    if self.mode == LinkMode::SharedLibrary && self.target.has_import_library() {
      2
    } else {
      1
    }
  }

  fn call(
    &self,
    cmd: Fragment,
    inputs: Vec<Fragment>,
    outputs: &[Fragment],
    libs: Vec<Fragment>,
    args: Vec<Fragment>,
  ) -> Vec<Fragment> {
    let mut result = vec![cmd];
    if self.mode == LinkMode::SharedLibrary {
      result.push(Fragment::raw("-shared"));
    }
    result.extend(args);
    result.extend(inputs);
    result.extend(libs);
    if let Some(output) = outputs.first() {
      result.extend([Fragment::raw("-o"), output.clone()]);
    }
    if let Some(import_lib) = outputs.get(1) {
      result.push(Fragment::raw("-Wl,--out-implib=") + import_lib.clone());
    }
    result
  }

  fn args(&self, options: &[LinkOption]) -> Result<Vec<Fragment>, ToolchainError> {
    let mut args = lib_dir_args(options);
    for option in options {
      match option {
        LinkOption::Pthread => args.push(Fragment::raw("-pthread")),
        LinkOption::Raw { value } => args.push(Fragment::raw(value.clone())),
        LinkOption::Library { .. } | LinkOption::LibDir { .. } => {}
      }
    }
    Ok(args)
  }

  fn libs(&self, options: &[LinkOption]) -> Result<Vec<Fragment>, ToolchainError> {
    let mut libs = Vec::new();
    for option in options {
      if let LinkOption::Library { library } = option {
        libs.extend(self.link_lib(library)?);
      }
    }
    Ok(libs)
  }

  fn parse_args(&self, args: &[String]) -> ParsedArgs {
    let mut parsed = ParsedArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
      if let Some(dir) = flag_value(arg, "-L", &mut iter) {
        parsed.lib_dirs.push(dir);
      } else if let Some(lib) = flag_value(arg, "-l", &mut iter) {
        parsed.libraries.push(lib);
      } else {
        parsed.extra.push(arg.clone());
      }
    }
    parsed
  }

  fn output_files(&self, name: &str) -> Vec<BuildPath> {
    match self.mode {
      LinkMode::SharedLibrary if self.target.has_import_library() => {
        let dll = output_path(name, "lib", self.target.shared_library_ext());
        let import_lib = dll.with_extension(".dll.a");
        vec![dll, import_lib]
      }
      LinkMode::SharedLibrary => vec![output_path(name, "lib", self.target.shared_library_ext())],
      _ => vec![BuildPath::builddir(format!("{name}{}", self.target.executable_ext()))],
    }
  }
}

/// Creates static archives with `ar`.
#[derive(Debug, Clone)]
pub struct ArLinker {
  command: Vec<String>,
  flags: Vec<String>,
  object_format: ObjectFormat,
}

impl Linker for ArLinker {
  fn flavor(&self) -> Flavor {
    Flavor::Cc
  }

  fn mode(&self) -> LinkMode {
    LinkMode::StaticLibrary
  }

  fn name(&self) -> &'static str {
    "ar"
  }

  fn command_var(&self) -> &'static str {
    "AR"
  }

  fn command(&self) -> &[String] {
    &self.command
  }

  fn flags_var(&self) -> Option<&'static str> {
    Some("ARFLAGS")
  }

  fn global_flags(&self) -> &[String] {
    &self.flags
  }

  fn can_link(&self, format: ObjectFormat, _langs: &BTreeSet<Language>) -> bool {
    format == self.object_format
  }

  fn call(
    &self,
    cmd: Fragment,
    inputs: Vec<Fragment>,
    outputs: &[Fragment],
    _libs: Vec<Fragment>,
    args: Vec<Fragment>,
  ) -> Vec<Fragment> {
    let mut result = vec![cmd];
    result.extend(args);
    result.extend(outputs.first().cloned());
    result.extend(inputs);
    result
  }

  fn args(&self, options: &[LinkOption]) -> Result<Vec<Fragment>, ToolchainError> {
    Ok(
      options
        .iter()
        .filter_map(|option| match option {
          LinkOption::Raw { value } => Some(Fragment::raw(value.clone())),
          _ => None,
        })
        .collect(),
    )
  }

  fn parse_args(&self, args: &[String]) -> ParsedArgs {
    ParsedArgs {
      extra: args.to_vec(),
      ..ParsedArgs::default()
    }
  }

  fn output_files(&self, name: &str) -> Vec<BuildPath> {
    vec![output_path(name, "lib", ".a")]
  }
}

/// Drives the system linker directly, for partial links and the like.
#[derive(Debug, Clone)]
pub struct LdLinker {
  command: Vec<String>,
  object_format: ObjectFormat,
  target: Platform,
}

impl Linker for LdLinker {
  fn flavor(&self) -> Flavor {
    Flavor::Cc
  }

  fn mode(&self) -> LinkMode {
    LinkMode::Raw
  }

  fn name(&self) -> &'static str {
    "ld"
  }

  fn command_var(&self) -> &'static str {
    "LD"
  }

  fn command(&self) -> &[String] {
    &self.command
  }

  fn flags_var(&self) -> Option<&'static str> {
    None
  }

  fn global_flags(&self) -> &[String] {
    &[]
  }

  fn can_link(&self, format: ObjectFormat, _langs: &BTreeSet<Language>) -> bool {
    format == self.object_format
  }

  fn call(
    &self,
    cmd: Fragment,
    inputs: Vec<Fragment>,
    outputs: &[Fragment],
    libs: Vec<Fragment>,
    args: Vec<Fragment>,
  ) -> Vec<Fragment> {
    let mut result = vec![cmd];
    result.extend(args);
    result.extend(inputs);
    result.extend(libs);
    if let Some(output) = outputs.first() {
      result.extend([Fragment::raw("-o"), output.clone()]);
    }
    result
  }

  fn args(&self, options: &[LinkOption]) -> Result<Vec<Fragment>, ToolchainError> {
    let mut args = lib_dir_args(options);
    args.extend(options.iter().filter_map(|option| match option {
      LinkOption::Raw { value } => Some(Fragment::raw(value.clone())),
      _ => None,
    }));
    Ok(args)
  }

  fn libs(&self, options: &[LinkOption]) -> Result<Vec<Fragment>, ToolchainError> {
    let mut libs = Vec::new();
    for option in options {
      let LinkOption::Library { library } = option else {
        continue;
      };
      match library {
        Library::File { path, .. } => libs.push(library_word(path)),
        Library::Named { name } => libs.push(Fragment::raw(format!("-l{name}"))),
        Library::WholeArchive { library } => {
          let Some(path) = library.path() else {
            return Err(ToolchainError::UnsupportedFeature {
              flavor: Flavor::Cc,
              feature: "whole-archive of a library without a path".to_string(),
            });
          };
          libs.extend([
            Fragment::raw("--whole-archive"),
            Fragment::from(path.clone()),
            Fragment::raw("--no-whole-archive"),
          ]);
        }
        Library::Framework { .. } => {
          return Err(ToolchainError::UnsupportedFeature {
            flavor: Flavor::Cc,
            feature: format!("frameworks with ld on {}", self.target.os),
          });
        }
      }
    }
    Ok(libs)
  }

  fn parse_args(&self, args: &[String]) -> ParsedArgs {
    ParsedArgs {
      extra: args.to_vec(),
      ..ParsedArgs::default()
    }
  }

  fn output_files(&self, name: &str) -> Vec<BuildPath> {
    vec![BuildPath::builddir(name)]
  }
}
