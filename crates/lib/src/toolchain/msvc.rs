//! The MSVC family (`cl`, `clang-cl`, `link` and `lib`).

use std::collections::{BTreeMap, BTreeSet};

use semver::Version;

use crate::packages::{PackageResolver, search};
use crate::path::{BuildPath, Root};
use crate::platform::{Environment, ObjectFormat};
use crate::safe_str::Fragment;
use crate::shell;
use crate::toolchain::{
  Brand, Builder, BuilderParts, CompileOption, Compiler, Flavor, GeneratedFile, Language, Library, LinkMode,
  LinkOption, Linker, ParsedArgs, ToolchainError, WarningLevel, allowed_langs, flag_path, flag_value, output_path,
};
use crate::versioning::detect_version;

fn parse_brand(version_output: &str) -> (Brand, Option<Version>) {
  if version_output.contains("Microsoft (R)") {
    (Brand::Msvc, detect_version(version_output))
  } else {
    (Brand::Unknown, None)
  }
}

/// The directory (with trailing separator) holding the `cl` program in
/// `command`, so `link` and `lib` can be looked up beside it.
fn tool_origin(command: &[String]) -> Option<&str> {
  let program = command
    .iter()
    .rev()
    .find(|word| Flavor::for_command(std::slice::from_ref(*word)) == Flavor::Msvc)?;
  let idx = program.rfind(['/', '\\'])?;
  Some(&program[..=idx])
}

fn sibling_tool(env: &Environment, var: &str, origin: Option<&str>, name: &str) -> String {
  match env.getvar(var) {
    Some(value) => value.to_string(),
    None => shell::quote(&format!("{}{name}", origin.unwrap_or(""))),
  }
}

/// Construct an MSVC builder from a probed `cl` command.
pub fn build(
  env: &Environment,
  lang: Language,
  command: Vec<String>,
  version_output: &str,
) -> Result<Builder, ToolchainError> {
  let (brand, version) = parse_brand(version_output);
  let object_format = env.target.object_format();

  let mut cflags = vec!["/nologo".to_string()];
  cflags.extend(env.split_var("CPPFLAGS")?);
  cflags.extend(env.split_var(lang.flags_var())?);

  let mut ldflags = vec!["/nologo".to_string()];
  ldflags.extend(env.split_var("LDFLAGS")?);
  let ldlibs = env.split_var("LDLIBS")?;

  let mut libflags = vec!["/nologo".to_string()];
  libflags.extend(env.split_var("LIBFLAGS")?);

  let origin = tool_origin(&command);
  let link_command = env.check_which(&[sibling_tool(env, "VCLINK", origin, "link")], "dynamic linker")?;
  let lib_command = env.check_which(&[sibling_tool(env, "VCLIB", origin, "lib")], "static linker")?;

  let mut linkers: BTreeMap<LinkMode, Box<dyn Linker>> = BTreeMap::new();
  for mode in [LinkMode::Executable, LinkMode::SharedLibrary] {
    linkers.insert(
      mode,
      Box::new(MsvcLinker {
        lang,
        mode,
        command: link_command.clone(),
        flags: ldflags.clone(),
        libs: ldlibs.clone(),
        object_format,
      }),
    );
  }
  linkers.insert(
    LinkMode::StaticLibrary,
    Box::new(MsvcStaticLinker {
      command: lib_command,
      flags: libflags,
      object_format,
    }),
  );

  let include_dirs = search::existing_unique(
    env
      .path_list("CPATH")
      .into_iter()
      .chain(env.path_list("INCLUDE"))
      .chain(env.host.include_dirs()),
  );
  let lib_dirs = search::existing_unique(
    env
      .path_list("LIBRARY_PATH")
      .into_iter()
      .chain(env.path_list("LIB"))
      .chain(env.host.lib_dirs()),
  );
  let packages = PackageResolver::new(env, lang, Flavor::Msvc, object_format, include_dirs, lib_dirs);

  Ok(Builder::from_parts(BuilderParts {
    lang,
    brand,
    version,
    object_format,
    flavor: Flavor::Msvc,
    compiler: Box::new(MsvcCompiler::new(lang, command.clone(), cflags.clone(), false)),
    pch_compiler: Some(Box::new(MsvcCompiler::new(lang, command, cflags, true))),
    linkers,
    packages,
  }))
}

/// `cl` compiling objects, or creating a precompiled header when `pch` is
/// set. A PCH build writes both the `.pch` and the object holding its
/// definitions.
#[derive(Debug, Clone)]
pub struct MsvcCompiler {
  lang: Language,
  command: Vec<String>,
  flags: Vec<String>,
  pch: bool,
}

impl MsvcCompiler {
  pub fn new(lang: Language, command: Vec<String>, flags: Vec<String>, pch: bool) -> Self {
    Self {
      lang,
      command,
      flags,
      pch,
    }
  }
}

impl Compiler for MsvcCompiler {
  fn flavor(&self) -> Flavor {
    Flavor::Msvc
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

  fn num_outputs(&self) -> usize {
    if self.pch { 2 } else { 1 }
  }

  fn accepts_pch(&self) -> bool {
    !self.pch
  }

  fn supports_depfile(&self) -> bool {
    false
  }

  fn call(
    &self,
    cmd: Fragment,
    input: Fragment,
    outputs: &[Fragment],
    _depfile: Option<Fragment>,
    args: Vec<Fragment>,
  ) -> Vec<Fragment> {
    let mut result = vec![cmd];
    result.extend(args);
    result.extend([Fragment::raw("/c"), input]);
    if self.pch {
      if let [pch, object, ..] = outputs {
        result.push(Fragment::raw("/Fo") + object.clone());
        result.push(Fragment::raw("/Fp") + pch.clone());
      }
    } else if let Some(object) = outputs.first() {
      result.push(Fragment::raw("/Fo") + object.clone());
    }
    result
  }

  fn args(&self, options: &[CompileOption]) -> Result<Vec<Fragment>, ToolchainError> {
    let mut args = Vec::new();
    for option in options {
      match option {
        CompileOption::IncludeDir { path, .. } => args.push(flag_path("/I", path)),
        CompileOption::Define { name, value: Some(value) } => args.push(Fragment::raw(format!("/D{name}={value}"))),
        CompileOption::Define { name, value: None } => args.push(Fragment::raw(format!("/D{name}"))),
        CompileOption::PchUse(pch) if self.accepts_pch() => {
          args.push(Fragment::raw(format!("/Yu{}", pch.header.basename())));
          args.push(flag_path("/Fp", &pch.artifact));
        }
        CompileOption::PchUse(_) => {}
        // Threading is always available with the MSVC runtime.
        CompileOption::Pthread => {}
        CompileOption::Warning { level } => match level {
          WarningLevel::Disable => args.push(Fragment::raw("/W0")),
          WarningLevel::Default => {}
          WarningLevel::All => args.push(Fragment::raw("/W3")),
          WarningLevel::Extra => args.push(Fragment::raw("/W4")),
        },
        CompileOption::WarningsAsErrors => args.push(Fragment::raw("/WX")),
        CompileOption::Raw { value } => args.push(Fragment::raw(value.clone())),
      }
    }
    Ok(args)
  }

  fn pch_args(&self, header: &BuildPath, injected: bool) -> Vec<Fragment> {
    let mut args = Vec::new();
    if injected {
      args.push(flag_path("/I", &header.parent()));
    }
    args.push(Fragment::raw(format!("/Yc{}", header.basename())));
    args
  }

  fn pch_wrapper(&self, header: &BuildPath) -> Option<GeneratedFile> {
    Some(GeneratedFile {
      path: header.with_extension(self.lang.source_ext()).reroot(Root::BuildDir),
      contents: format!("#include \"{}\"\n", header.basename()),
    })
  }

  fn parse_args(&self, args: &[String]) -> ParsedArgs {
    let mut parsed = ParsedArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
      match arg.as_str() {
        "/W0" => parsed.warning_level = Some("disable".to_string()),
        "/W1" | "/W2" => parsed.warning_level = Some("default".to_string()),
        "/W3" => parsed.warning_level = Some("all".to_string()),
        "/W4" | "/Wall" => parsed.warning_level = Some("extra".to_string()),
        "/WX" => parsed.warnings_as_errors = Some(true),
        "/WX-" => parsed.warnings_as_errors = Some(false),
        arg => {
          if let Some(header) = arg.strip_prefix("/Yu") {
            parsed.pch_use = Some(header.to_string());
          } else if let Some(header) = arg.strip_prefix("/Yc") {
            parsed.pch_create = Some(header.to_string());
          } else if let Some(dir) = flag_value(arg, "/I", &mut iter) {
            parsed.includes.push(dir);
          } else if let Some(define) = flag_value(arg, "/D", &mut iter) {
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
    let object = BuildPath::builddir(format!("{name}.obj"));
    if self.pch {
      vec![BuildPath::builddir(format!("{name}.pch")), object]
    } else {
      vec![object]
    }
  }

  fn extra_objects(&self, options: &[CompileOption]) -> Vec<BuildPath> {
    options
      .iter()
      .filter_map(|option| match option {
        CompileOption::PchUse(pch) => pch.object.clone(),
        _ => None,
      })
      .collect()
  }
}

/// `link` producing executables and DLLs.
#[derive(Debug, Clone)]
pub struct MsvcLinker {
  lang: Language,
  mode: LinkMode,
  command: Vec<String>,
  flags: Vec<String>,
  libs: Vec<String>,
  object_format: ObjectFormat,
}

impl Linker for MsvcLinker {
  fn flavor(&self) -> Flavor {
    Flavor::Msvc
  }

  fn mode(&self) -> LinkMode {
    self.mode
  }

  fn name(&self) -> &'static str {
    "link"
  }

  fn command_var(&self) -> &'static str {
    "VCLINK"
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
    if self.mode == LinkMode::SharedLibrary { 2 } else { 1 }
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
      result.push(Fragment::raw("/DLL"));
    }
    result.extend(args);
    result.extend(inputs);
    result.extend(libs);
    if let Some(output) = outputs.first() {
      result.push(Fragment::raw("/OUT:") + output.clone());
    }
    if let Some(import_lib) = outputs.get(1) {
      result.push(Fragment::raw("/IMPLIB:") + import_lib.clone());
    }
    result
  }

  fn args(&self, options: &[LinkOption]) -> Result<Vec<Fragment>, ToolchainError> {
    let mut dirs: Vec<BuildPath> = Vec::new();
    let mut raw = Vec::new();
    for option in options {
      let dir = match option {
        LinkOption::LibDir { path } => Some(path.clone()),
        LinkOption::Library { library } => library
          .path()
          .filter(|path| path.root == Root::Absolute)
          .map(BuildPath::parent),
        LinkOption::Raw { value } => {
          raw.push(Fragment::raw(value.clone()));
          None
        }
        LinkOption::Pthread => None,
      };
      if let Some(dir) = dir
        && !dirs.contains(&dir)
      {
        dirs.push(dir);
      }
    }
    let mut args: Vec<Fragment> = dirs.iter().map(|dir| flag_path("/LIBPATH:", dir)).collect();
    args.extend(raw);
    Ok(args)
  }

  fn libs(&self, options: &[LinkOption]) -> Result<Vec<Fragment>, ToolchainError> {
    let mut libs = Vec::new();
    for option in options {
      let LinkOption::Library { library } = option else {
        continue;
      };
      match library {
        Library::File { path, .. } if path.root == Root::Absolute => libs.push(Fragment::raw(path.basename())),
        Library::File { path, .. } => libs.push(Fragment::from(path.clone())),
        Library::Named { name } => libs.push(Fragment::raw(format!("{name}.lib"))),
        Library::WholeArchive { .. } => {
          return Err(ToolchainError::UnsupportedFeature {
            flavor: Flavor::Msvc,
            feature: "whole-archive".to_string(),
          });
        }
        Library::Framework { .. } => {
          return Err(ToolchainError::UnsupportedFeature {
            flavor: Flavor::Msvc,
            feature: "frameworks".to_string(),
          });
        }
      }
    }
    Ok(libs)
  }

  fn parse_args(&self, args: &[String]) -> ParsedArgs {
    let mut parsed = ParsedArgs::default();
    for arg in args {
      if let Some(dir) = arg.strip_prefix("/LIBPATH:") {
        parsed.lib_dirs.push(dir.to_string());
      } else if let Some(lib) = arg.strip_suffix(".lib") {
        parsed.libraries.push(lib.to_string());
      } else {
        parsed.extra.push(arg.clone());
      }
    }
    parsed
  }

  fn output_files(&self, name: &str) -> Vec<BuildPath> {
    match self.mode {
      LinkMode::SharedLibrary => vec![output_path(name, "", ".dll"), output_path(name, "", ".lib")],
      _ => vec![output_path(name, "", ".exe")],
    }
  }
}

/// `lib` producing static libraries.
#[derive(Debug, Clone)]
pub struct MsvcStaticLinker {
  command: Vec<String>,
  flags: Vec<String>,
  object_format: ObjectFormat,
}

impl Linker for MsvcStaticLinker {
  fn flavor(&self) -> Flavor {
    Flavor::Msvc
  }

  fn mode(&self) -> LinkMode {
    LinkMode::StaticLibrary
  }

  fn name(&self) -> &'static str {
    "lib"
  }

  fn command_var(&self) -> &'static str {
    "VCLIB"
  }

  fn command(&self) -> &[String] {
    &self.command
  }

  fn flags_var(&self) -> Option<&'static str> {
    Some("LIBFLAGS")
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
    result.extend(inputs);
    if let Some(output) = outputs.first() {
      result.push(Fragment::raw("/OUT:") + output.clone());
    }
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
    vec![output_path(name, "", ".lib")]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  use crate::execute::ScriptedRunner;
  use crate::make::render_command;
  use crate::platform::{Arch, Os, Platform};
  use crate::toolchain::{LibraryKind, Pch};

  const CL_BANNER: &str = "Microsoft (R) C/C++ Optimizing Compiler Version 19.29.30133 for x64\n\
    Copyright (C) Microsoft Corporation.  All rights reserved.\n";

  fn windows_env() -> Environment {
    Environment::new(Platform::new(Arch::X86_64, Os::Windows), BTreeMap::new())
      .with_runner(Arc::new(ScriptedRunner::new()))
  }

  fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
  }

  fn text(words: &[Fragment]) -> String {
    render_command(words).unwrap()
  }

  fn outputs(paths: Vec<BuildPath>) -> Vec<Fragment> {
    paths.into_iter().map(Fragment::from).collect()
  }

  #[test]
  fn detects_msvc_brand_and_version() {
    let builder = build(&windows_env(), Language::Cxx, words(&["cl"]), CL_BANNER).unwrap();
    assert_eq!(builder.brand(), Brand::Msvc);
    assert_eq!(builder.version(), Some(&Version::new(19, 29, 30133)));
    assert_eq!(builder.object_format(), ObjectFormat::Coff);
    assert!(builder.auto_link());
    assert!(!builder.can_dual_link());
    assert_eq!(builder.compiler().global_flags(), ["/nologo"]);
  }

  #[test]
  fn unrecognized_banner_is_unknown() {
    let builder = build(&windows_env(), Language::C, words(&["clang-cl"]), "clang version 17").unwrap();
    assert_eq!(builder.brand(), Brand::Unknown);
    assert_eq!(builder.version(), None);
  }

  #[test]
  fn link_and_lib_live_beside_cl() {
    let builder = build(&windows_env(), Language::C, words(&["C:/VS/bin/cl.exe"]), CL_BANNER).unwrap();
    assert_eq!(builder.linker(LinkMode::Executable).unwrap().command(), ["C:/VS/bin/link"]);
    assert_eq!(builder.linker(LinkMode::StaticLibrary).unwrap().command(), ["C:/VS/bin/lib"]);
    assert!(builder.linker(LinkMode::Raw).is_err());
  }

  #[test]
  fn linker_override_from_environment() {
    let env = windows_env().with_variable("VCLINK", "lld-link");
    let builder = build(&env, Language::C, words(&["cl"]), CL_BANNER).unwrap();
    assert_eq!(builder.linker(LinkMode::SharedLibrary).unwrap().command(), ["lld-link"]);
  }

  #[test]
  fn compile_command_line() {
    let compiler = MsvcCompiler::new(Language::C, words(&["cl"]), Vec::new(), false);
    let args = compiler
      .args(&[
        CompileOption::include_dir(BuildPath::srcdir("include")),
        CompileOption::define("NAME", None),
        CompileOption::Warning {
          level: WarningLevel::Extra,
        },
        CompileOption::WarningsAsErrors,
      ])
      .unwrap();
    let cmd = compiler.call(
      Fragment::raw("cl"),
      Fragment::from(BuildPath::srcdir("main.c")),
      &outputs(compiler.output_files("main")),
      None,
      args,
    );
    assert_eq!(
      text(&cmd),
      "cl /I'$(srcdir)/include' /DNAME /W4 /WX /c '$(srcdir)/main.c' /Fomain.obj"
    );
  }

  #[test]
  fn pch_creation_and_use() {
    let header = BuildPath::srcdir("include/pch.hpp");
    let pch_compiler = MsvcCompiler::new(Language::Cxx, words(&["cl"]), Vec::new(), true);
    assert_eq!(pch_compiler.num_outputs(), 2);

    let wrapper = pch_compiler.pch_wrapper(&header).unwrap();
    assert_eq!(wrapper.path, BuildPath::builddir("include/pch.cpp"));
    assert_eq!(wrapper.contents, "#include \"pch.hpp\"\n");

    let files = pch_compiler.output_files("pch");
    assert_eq!(files, vec![BuildPath::builddir("pch.pch"), BuildPath::builddir("pch.obj")]);
    let cmd = pch_compiler.call(
      Fragment::raw("cl"),
      Fragment::from(wrapper.path.clone()),
      &outputs(files.clone()),
      None,
      pch_compiler.pch_args(&header, true),
    );
    assert_eq!(
      text(&cmd),
      "cl /I'$(srcdir)/include' /Ycpch.hpp /c include/pch.cpp /Fopch.obj /Fppch.pch"
    );

    let compiler = MsvcCompiler::new(Language::Cxx, words(&["cl"]), Vec::new(), false);
    let usage = [CompileOption::PchUse(Pch {
      header,
      artifact: files[0].clone(),
      object: Some(files[1].clone()),
    })];
    assert_eq!(text(&compiler.args(&usage).unwrap()), "/Yupch.hpp /Fppch.pch");
    assert_eq!(compiler.extra_objects(&usage), vec![BuildPath::builddir("pch.obj")]);
  }

  #[test]
  fn dll_link_command_line() {
    let linker = MsvcLinker {
      lang: Language::C,
      mode: LinkMode::SharedLibrary,
      command: words(&["link"]),
      flags: Vec::new(),
      libs: Vec::new(),
      object_format: ObjectFormat::Coff,
    };
    let options = [
      LinkOption::lib(Library::file(BuildPath::absolute("C:/zlib/zlib.lib"), LibraryKind::Unknown)),
      LinkOption::lib(Library::named("user32")),
    ];
    let files = linker.output_files("foo");
    assert_eq!(files, vec![BuildPath::builddir("foo.dll"), BuildPath::builddir("foo.lib")]);
    let cmd = linker.call(
      Fragment::raw("link"),
      vec![Fragment::raw("a.obj")],
      &outputs(files),
      linker.libs(&options).unwrap(),
      linker.args(&options).unwrap(),
    );
    assert_eq!(
      text(&cmd),
      "link /DLL /LIBPATH:C:/zlib a.obj zlib.lib user32.lib /OUT:foo.dll /IMPLIB:foo.lib"
    );
  }

  #[test]
  fn unsupported_libraries_are_errors() {
    let linker = MsvcLinker {
      lang: Language::Cxx,
      mode: LinkMode::Executable,
      command: words(&["link"]),
      flags: Vec::new(),
      libs: Vec::new(),
      object_format: ObjectFormat::Coff,
    };
    for library in [
      Library::framework("Cocoa"),
      Library::file(BuildPath::builddir("x.lib"), LibraryKind::Static).whole_archive(),
    ] {
      assert!(matches!(
        linker.libs(&[LinkOption::lib(library)]),
        Err(ToolchainError::UnsupportedFeature {
          flavor: Flavor::Msvc,
          ..
        })
      ));
    }
  }

  #[test]
  fn c_linker_rejects_cxx_objects() {
    let builder = build(&windows_env(), Language::C, words(&["cl"]), CL_BANNER).unwrap();
    let mixed = BTreeSet::from([Language::C, Language::Cxx]);

    let err = builder
      .linker_for(LinkMode::Executable, ObjectFormat::Coff, &mixed)
      .err()
      .unwrap();
    assert!(matches!(err, ToolchainError::LinkCompatibility { .. }), "{err}");
    assert!(
      builder
        .linker_for(LinkMode::SharedLibrary, ObjectFormat::Coff, &mixed)
        .is_err()
    );
    assert!(
      builder
        .linker_for(LinkMode::Executable, ObjectFormat::Coff, &BTreeSet::from([Language::C]))
        .is_ok()
    );
    // `lib` only archives objects
    assert!(
      builder
        .linker_for(LinkMode::StaticLibrary, ObjectFormat::Coff, &mixed)
        .is_ok()
    );
  }

  #[test]
  fn cxx_linker_accepts_c_objects() {
    let builder = build(&windows_env(), Language::Cxx, words(&["cl"]), CL_BANNER).unwrap();
    let mixed = BTreeSet::from([Language::C, Language::Cxx]);
    assert!(builder.linker_for(LinkMode::Executable, ObjectFormat::Coff, &mixed).is_ok());
    assert!(matches!(
      builder.linker_for(LinkMode::Executable, ObjectFormat::Elf, &mixed),
      Err(ToolchainError::LinkCompatibility { .. })
    ));
  }

  #[test]
  fn static_library_command_line() {
    let lib = MsvcStaticLinker {
      command: words(&["lib"]),
      flags: Vec::new(),
      object_format: ObjectFormat::Coff,
    };
    let cmd = lib.call(
      Fragment::raw("lib"),
      vec![Fragment::raw("a.obj")],
      &outputs(lib.output_files("sub/util")),
      Vec::new(),
      Vec::new(),
    );
    assert_eq!(text(&cmd), "lib a.obj /OUT:sub/util.lib");
  }

  #[test]
  fn parse_compile_args() {
    let compiler = MsvcCompiler::new(Language::C, words(&["cl"]), Vec::new(), false);
    let parsed = compiler.parse_args(&words(&["/Iinc", "/DX=1", "/W4", "/WX", "/Yupch.h", "/O2"]));
    assert_eq!(parsed.includes, ["inc"]);
    assert_eq!(parsed.defines, ["X=1"]);
    assert_eq!(parsed.warning_level.as_deref(), Some("extra"));
    assert_eq!(parsed.warnings_as_errors, Some(true));
    assert_eq!(parsed.pch_use.as_deref(), Some("pch.h"));
    assert_eq!(parsed.extra, ["/O2"]);
  }
}
