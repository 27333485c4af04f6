//! Translate a [`BuildGraph`] into a Makefile.
//!
//! Builders are probed lazily, once per language, the first time a node
//! needs one. Packages are resolved once per builder and request no matter
//! how many nodes ask for them. Every error names the node it came from.

pub mod graph;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::VersionReq;
use thiserror::Error;
use tracing::{debug, info};

use crate::make::{MakeError, Makefile, Rule, Section, ShellValue, var};
use crate::packages::{HeaderMacroVersion, Package, PackageError, VersionProbe};
use crate::path::{BuildPath, Root};
use crate::platform::Environment;
use crate::safe_str::Fragment;
use crate::toolchain::{
  Builder, CompileOption, Compiler, GeneratedFile, Language, Library, LibraryKind, LinkMode, LinkOption, Linker, Pch,
  ToolchainError,
};

pub use graph::{BuildGraph, Command, LibraryLink, Link, Node, ObjectFile, PackageRequest, Phony, VersionHeader};

/// Errors raised while generating build files.
#[derive(Debug, Error)]
pub enum GenerateError {
  #[error("target '{target}': {source}")]
  Toolchain { target: String, source: ToolchainError },

  #[error("target '{target}': {source}")]
  Package { target: String, source: PackageError },

  #[error("target '{target}': {source}")]
  Make { target: String, source: MakeError },

  #[error("target '{target}' depends on unknown target '{dep}'")]
  UnknownDependency { target: String, dep: String },

  #[error("target '{target}': '{dep}' is not {expected}")]
  WrongKind {
    target: String,
    dep: String,
    expected: &'static str,
  },

  #[error("target '{target}': unable to determine the language of '{file}'")]
  UnknownLanguage { target: String, file: String },

  #[error("target '{target}' has no object files")]
  NoObjects { target: String },

  #[error("target '{target}': invalid version requirement for '{package}': {reason}")]
  InvalidVersion {
    target: String,
    package: String,
    reason: String,
  },

  #[error("invalid build graph in {source_name}: {reason}")]
  Graph { source_name: String, reason: String },

  #[error(transparent)]
  Document(#[from] MakeError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Builders for the target platform, created on first use.
#[derive(Debug)]
pub struct Toolchains<'a> {
  env: &'a Environment,
  builders: BTreeMap<Language, Arc<Builder>>,
}

impl<'a> Toolchains<'a> {
  pub fn new(env: &'a Environment) -> Self {
    Self {
      env,
      builders: BTreeMap::new(),
    }
  }

  /// Use `builder` for its language instead of probing.
  pub fn with_builder(mut self, builder: Builder) -> Self {
    self.builders.insert(builder.lang(), Arc::new(builder));
    self
  }

  pub fn get(&mut self, lang: Language) -> Result<Arc<Builder>, ToolchainError> {
    if let Some(builder) = self.builders.get(&lang) {
      return Ok(builder.clone());
    }
    let builder = Arc::new(Builder::detect(self.env, lang)?);
    self.builders.insert(lang, builder.clone());
    Ok(builder)
  }
}

/// The output of a generator run.
#[derive(Debug)]
pub struct Generated {
  pub makefile: Makefile,
  /// Sources created at configure time, such as MSVC PCH wrappers.
  pub files: Vec<GeneratedFile>,
  /// Build-directory subdirectories outputs are written to.
  pub dirs: BTreeSet<String>,
}

impl Generated {
  /// Write the Makefile and generated files under `builddir`, creating the
  /// directories outputs need. Returns the Makefile's path.
  pub fn write_to(&self, builddir: &Path) -> Result<PathBuf, GenerateError> {
    fs::create_dir_all(builddir)?;
    for dir in &self.dirs {
      fs::create_dir_all(builddir.join(dir))?;
    }
    for file in &self.files {
      let path = builddir.join(&file.path.suffix);
      if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
      }
      fs::write(&path, &file.contents)?;
    }

    let path = builddir.join("Makefile");
    let mut out = fs::File::create(&path)?;
    self.makefile.write(&mut out)?;
    info!(path = %path.display(), "wrote makefile");
    Ok(path)
  }
}

/// What an already-processed node produced.
#[derive(Debug, Clone)]
enum Built {
  Object {
    path: BuildPath,
    lang: Language,
    extra: Vec<BuildPath>,
  },
  Binary {
    outputs: Vec<BuildPath>,
    library: Option<Library>,
  },
  Named,
}

impl Built {
  /// What a dependent rule lists as its prerequisite.
  fn dep(&self, name: &str) -> Fragment {
    match self {
      Self::Object { path, .. } => path.clone().into(),
      Self::Binary { outputs, .. } => match outputs.first() {
        Some(path) => path.clone().into(),
        None => name.into(),
      },
      Self::Named => name.into(),
    }
  }
}

/// Generate a Makefile for `graph`, probing toolchains from `env`.
pub fn generate(env: &Environment, graph: &BuildGraph, srcdir: &str) -> Result<Generated, GenerateError> {
  Generator::new(Toolchains::new(env)).run(graph, srcdir)
}

pub struct Generator<'a> {
  toolchains: Toolchains<'a>,
  makefile: Makefile,
  files: Vec<GeneratedFile>,
  dirs: BTreeSet<String>,
  built: HashMap<String, Built>,
  pchs: HashMap<(Language, String), Pch>,
  packages: HashMap<(Language, String), Package>,
}

impl<'a> Generator<'a> {
  pub fn new(toolchains: Toolchains<'a>) -> Self {
    Self {
      toolchains,
      makefile: Makefile::new(),
      files: Vec::new(),
      dirs: BTreeSet::new(),
      built: HashMap::new(),
      pchs: HashMap::new(),
      packages: HashMap::new(),
    }
  }

  pub fn run(mut self, graph: &BuildGraph, srcdir: &str) -> Result<Generated, GenerateError> {
    self.makefile.variable("srcdir", srcdir, Section::Path, false)?;

    for node in &graph.nodes {
      let name = node.name();
      debug!(target = name, "generating rules");
      if self.built.contains_key(name) {
        return Err(GenerateError::Make {
          target: name.to_string(),
          source: MakeError::DuplicateTarget(name.to_string()),
        });
      }
      let built = match node {
        Node::ObjectFile(object) => self.object_file(object)?,
        Node::Executable(link) => self.link(link, LinkMode::Executable)?,
        Node::Library(link) => {
          let mode = match link.link {
            LibraryLink::Shared => LinkMode::SharedLibrary,
            LibraryLink::Static => LinkMode::StaticLibrary,
          };
          self.link(link, mode)?
        }
        Node::Phony(phony) => self.phony(phony)?,
        Node::Command(command) => self.command(command)?,
      };
      self.built.insert(name.to_string(), built);
    }

    if !self.built.contains_key("all") {
      self.default_target(graph)?;
    }
    self.makefile.variable(".DEFAULT_GOAL", "all", Section::Other, true)?;

    Ok(Generated {
      makefile: self.makefile,
      files: self.files,
      dirs: self.dirs,
    })
  }

  /// An `all` target building every executable and library.
  fn default_target(&mut self, graph: &BuildGraph) -> Result<(), GenerateError> {
    let deps: Vec<Fragment> = graph
      .nodes
      .iter()
      .filter(|node| matches!(node, Node::Executable(_) | Node::Library(_)))
      .filter_map(|node| self.built.get(node.name()).map(|built| built.dep(node.name())))
      .collect();
    self.makefile.rule(Rule::new(["all"]).with_deps(deps).phony())?;
    Ok(())
  }

  fn builder(&mut self, target: &str, lang: Language) -> Result<Arc<Builder>, GenerateError> {
    self.toolchains.get(lang).map_err(|source| toolchain_error(target, source))
  }

  fn add_rule(&mut self, target: &str, rule: Rule) -> Result<(), GenerateError> {
    self.makefile.rule(rule).map_err(|source| GenerateError::Make {
      target: target.to_string(),
      source,
    })
  }

  fn note_dirs(&mut self, outputs: &[BuildPath]) {
    for path in outputs {
      let parent = path.parent();
      if path.root == Root::BuildDir && !parent.suffix.is_empty() {
        self.dirs.insert(parent.suffix);
      }
    }
  }

  fn register_compiler(&mut self, compiler: &dyn Compiler) -> Result<(), GenerateError> {
    self.makefile.variable(
      compiler.command_var(),
      ShellValue::words(compiler.command()),
      Section::Command,
      true,
    )?;
    self.makefile.variable(
      compiler.flags_var(),
      ShellValue::words(compiler.global_flags()),
      Section::Flags,
      true,
    )?;
    Ok(())
  }

  fn register_linker(&mut self, linker: &dyn Linker) -> Result<(), GenerateError> {
    self.makefile.variable(
      linker.command_var(),
      ShellValue::words(linker.command()),
      Section::Command,
      true,
    )?;
    if let Some(flags) = linker.flags_var() {
      self.makefile.variable(flags, ShellValue::words(linker.global_flags()), Section::Flags, true)?;
    }
    if let Some(libs) = linker.libs_var() {
      self.makefile.variable(libs, ShellValue::words(linker.global_libs()), Section::Flags, true)?;
    }
    Ok(())
  }

  fn package(&mut self, target: &str, builder: &Builder, request: &PackageRequest) -> Result<Package, GenerateError> {
    let key = (
      builder.lang(),
      format!(
        "{}:{}:{}:{}",
        request.name,
        request.version.as_deref().unwrap_or("*"),
        request.kind,
        request.submodules.join(",")
      ),
    );
    if let Some(package) = self.packages.get(&key) {
      return Ok(package.clone());
    }

    let version = match &request.version {
      Some(text) => VersionReq::parse(text).map_err(|err| GenerateError::InvalidVersion {
        target: target.to_string(),
        package: request.name.clone(),
        reason: err.to_string(),
      })?,
      None => VersionReq::STAR,
    };
    let probe = request
      .version_header
      .as_ref()
      .map(|h| HeaderMacroVersion::new(&h.header, &h.macro_name));

    let package = builder
      .packages()
      .resolve(
        &request.name,
        &request.submodules,
        &version,
        request.kind,
        probe.as_ref().map(|p| p as &dyn VersionProbe),
      )
      .map_err(|source| GenerateError::Package {
        target: target.to_string(),
        source,
      })?;
    self.packages.insert(key, package.clone());
    Ok(package)
  }

  /// The rule building the precompiled form of `header`, registered the
  /// first time any object asks for it.
  fn pch(
    &mut self,
    target: &str,
    builder: &Builder,
    header: &str,
    options: &[CompileOption],
  ) -> Result<Pch, GenerateError> {
    let key = (builder.lang(), header.to_string());
    if let Some(pch) = self.pchs.get(&key) {
      return Ok(pch.clone());
    }

    let compiler = builder.pch_compiler().ok_or_else(|| {
      toolchain_error(
        target,
        ToolchainError::UnsupportedFeature {
          flavor: builder.flavor(),
          feature: "precompiled headers".to_string(),
        },
      )
    })?;
    self.register_compiler(compiler)?;

    let header_path = BuildPath::srcdir(header);
    let mut deps = Vec::new();
    let (name, injected) = match compiler.pch_wrapper(&header_path) {
      Some(wrapper) => {
        deps.push(Fragment::from(wrapper.path.clone()));
        self.files.push(wrapper);
        (header_path.with_extension("").suffix, true)
      }
      None => (header_path.suffix.clone(), false),
    };
    deps.push(Fragment::from(header_path.clone()));

    let outputs = compiler.output_files(&name);
    let depfile = compiler
      .supports_depfile()
      .then(|| BuildPath::builddir(format!("{name}.d")));

    let mut args = vec![Fragment::from(var(compiler.flags_var()))];
    args.extend(compiler.pch_args(&header_path, injected));
    let own: Vec<CompileOption> = options
      .iter()
      .filter(|option| !matches!(option, CompileOption::PchUse(_)))
      .cloned()
      .collect();
    args.extend(compiler.args(&own).map_err(|source| toolchain_error(target, source))?);

    let recipe = compiler.call(
      var(compiler.command_var()).into(),
      var("<").into(),
      &output_fragments(&outputs),
      depfile.clone().map(Fragment::from),
      args,
    );
    self.add_rule(target, Rule::new(outputs.clone()).with_deps(deps).with_recipe([recipe]))?;
    if let Some(depfile) = depfile {
      self.makefile.include(depfile, true);
    }
    self.note_dirs(&outputs);

    let mut outputs = outputs.into_iter();
    let artifact = outputs.next().ok_or_else(|| no_output(target))?;
    let pch = Pch {
      header: header_path,
      artifact,
      object: outputs.next(),
    };
    self.pchs.insert(key, pch.clone());
    Ok(pch)
  }

  fn object_file(&mut self, node: &ObjectFile) -> Result<Built, GenerateError> {
    let target = node.name.as_str();
    let lang = match node.lang {
      Some(lang) => lang,
      None => Language::from_extension(&node.source).ok_or_else(|| GenerateError::UnknownLanguage {
        target: target.to_string(),
        file: node.source.clone(),
      })?,
    };
    let builder = self.builder(target, lang)?;
    let compiler = builder.compiler();
    self.register_compiler(compiler)?;

    let mut deps = vec![Fragment::from(BuildPath::srcdir(&node.source))];
    let mut options = Vec::new();
    if let Some(header) = &node.pch {
      let pch = self.pch(target, &builder, header, &node.options)?;
      deps.push(pch.artifact.clone().into());
      options.push(CompileOption::PchUse(pch));
    }
    options.extend(node.options.iter().cloned());
    for request in &node.packages {
      let package = self.package(target, &builder, request)?;
      options.extend(package.compile_options);
    }

    let outputs = compiler.output_files(&node.name);
    let depfile = compiler
      .supports_depfile()
      .then(|| BuildPath::builddir(format!("{}.d", node.name)));

    let mut args = vec![Fragment::from(var(compiler.flags_var()))];
    args.extend(compiler.args(&options).map_err(|source| toolchain_error(target, source))?);
    let recipe = compiler.call(
      var(compiler.command_var()).into(),
      var("<").into(),
      &output_fragments(&outputs),
      depfile.clone().map(Fragment::from),
      args,
    );
    self.add_rule(target, Rule::new(outputs.clone()).with_deps(deps).with_recipe([recipe]))?;
    if let Some(depfile) = depfile {
      self.makefile.include(depfile, true);
    }
    self.note_dirs(&outputs);

    let path = outputs.into_iter().next().ok_or_else(|| no_output(target))?;
    Ok(Built::Object {
      path,
      lang,
      extra: compiler.extra_objects(&options),
    })
  }

  fn link(&mut self, node: &Link, mode: LinkMode) -> Result<Built, GenerateError> {
    let target = node.name.as_str();
    let mut inputs: Vec<BuildPath> = Vec::new();
    let mut langs = BTreeSet::new();
    for name in &node.objects {
      match self.built.get(name) {
        Some(Built::Object { path, lang, extra }) => {
          inputs.push(path.clone());
          for object in extra {
            if !inputs.contains(object) {
              inputs.push(object.clone());
            }
          }
          langs.insert(*lang);
        }
        Some(_) => return Err(wrong_kind(target, name, "an object file")),
        None => return Err(unknown_dep(target, name)),
      }
    }
    // C++ objects need the C++ driver to pull in its runtime.
    let lang = langs.last().copied().ok_or_else(|| GenerateError::NoObjects {
      target: target.to_string(),
    })?;

    let builder = self.builder(target, lang)?;
    let linker = builder
      .linker_for(mode, builder.object_format(), &langs)
      .map_err(|source| toolchain_error(target, source))?;
    self.register_linker(linker)?;

    let mut options = Vec::new();
    let mut deps: Vec<Fragment> = inputs.iter().cloned().map(Fragment::from).collect();
    for name in &node.libs {
      match self.built.get(name) {
        Some(Built::Binary {
          library: Some(library), ..
        }) => {
          if let Some(path) = library.path() {
            deps.push(path.clone().into());
          }
          options.push(LinkOption::lib(library.clone()));
        }
        Some(_) => return Err(wrong_kind(target, name, "a library")),
        None => return Err(unknown_dep(target, name)),
      }
    }
    options.extend(node.options.iter().cloned());
    for request in &node.packages {
      let package = self.package(target, &builder, request)?;
      options.extend(package.link_options);
    }

    let outputs = linker.output_files(target);
    let mut args: Vec<Fragment> = linker.flags_var().map(|v| var(v).into()).into_iter().collect();
    args.extend(linker.args(&options).map_err(|source| toolchain_error(target, source))?);
    let mut libs = linker.libs(&options).map_err(|source| toolchain_error(target, source))?;
    if let Some(v) = linker.libs_var() {
      libs.push(var(v).into());
    }

    let recipe = linker.call(
      var(linker.command_var()).into(),
      inputs.iter().cloned().map(Fragment::from).collect(),
      &output_fragments(&outputs),
      libs,
      args,
    );
    self.add_rule(target, Rule::new(outputs.clone()).with_deps(deps).with_recipe([recipe]))?;
    self.note_dirs(&outputs);

    let library = match mode {
      LinkMode::SharedLibrary => match outputs.as_slice() {
        [_, import_lib] => Some(Library::file(import_lib.clone(), LibraryKind::Unknown)),
        [shared, ..] => Some(Library::file(shared.clone(), LibraryKind::Shared)),
        [] => None,
      },
      LinkMode::StaticLibrary => outputs
        .first()
        .map(|path| Library::file(path.clone(), LibraryKind::Static)),
      LinkMode::Executable | LinkMode::Raw => None,
    };
    Ok(Built::Binary { outputs, library })
  }

  fn deps(&self, target: &str, names: &[String]) -> Result<Vec<Fragment>, GenerateError> {
    names
      .iter()
      .map(|name| {
        self
          .built
          .get(name)
          .map(|built| built.dep(name))
          .ok_or_else(|| unknown_dep(target, name))
      })
      .collect()
  }

  fn phony(&mut self, node: &Phony) -> Result<Built, GenerateError> {
    let deps = self.deps(&node.name, &node.deps)?;
    self.add_rule(&node.name, Rule::new([node.name.as_str()]).with_deps(deps).phony())?;
    Ok(Built::Named)
  }

  fn command(&mut self, node: &Command) -> Result<Built, GenerateError> {
    let deps = self.deps(&node.name, &node.deps)?;
    let rule = Rule::new([node.name.as_str()])
      .with_deps(deps)
      .with_recipe(node.commands.iter().map(ShellValue::words))
      .phony();
    self.add_rule(&node.name, rule)?;
    Ok(Built::Named)
  }
}

/// `$@` for single-output rules; multi-output rules name each file.
fn output_fragments(outputs: &[BuildPath]) -> Vec<Fragment> {
  match outputs {
    [_] => vec![var("@").into()],
    _ => outputs.iter().cloned().map(Fragment::from).collect(),
  }
}

fn toolchain_error(target: &str, source: ToolchainError) -> GenerateError {
  GenerateError::Toolchain {
    target: target.to_string(),
    source,
  }
}

fn no_output(target: &str) -> GenerateError {
  toolchain_error(
    target,
    ToolchainError::InvalidArgument("tool reported no output files".to_string()),
  )
}

fn unknown_dep(target: &str, dep: &str) -> GenerateError {
  GenerateError::UnknownDependency {
    target: target.to_string(),
    dep: dep.to_string(),
  }
}

fn wrong_kind(target: &str, dep: &str, expected: &'static str) -> GenerateError {
  GenerateError::WrongKind {
    target: target.to_string(),
    dep: dep.to_string(),
    expected,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;

  use crate::execute::ScriptedRunner;
  use crate::platform::{Arch, Os, Platform};

  const GCC_BANNER: &str = "cc (Debian 12.2.0-14) 12.2.0\nCopyright (C) 2022 Free Software Foundation, Inc.\n";
  const CL_BANNER: &str = "Microsoft (R) C/C++ Optimizing Compiler Version 19.29.30133 for x64\n";

  fn env_for(os: Os) -> Environment {
    Environment::new(Platform::new(Arch::X86_64, os), BTreeMap::new()).with_runner(Arc::new(ScriptedRunner::new()))
  }

  fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
  }

  fn gcc_toolchains(env: &Environment) -> Toolchains<'_> {
    Toolchains::new(env)
      .with_builder(Builder::from_probe(env, Language::C, words(&["cc"]), GCC_BANNER).unwrap())
      .with_builder(Builder::from_probe(env, Language::Cxx, words(&["c++"]), GCC_BANNER).unwrap())
  }

  fn render(toolchains: Toolchains<'_>, graph: &str) -> Result<String, GenerateError> {
    let graph = BuildGraph::from_json(graph)?;
    let generated = Generator::new(toolchains).run(&graph, "/src")?;
    Ok(generated.makefile.render()?)
  }

  #[test]
  fn compiles_and_links_an_executable() {
    let env = env_for(Os::Linux);
    let text = render(
      gcc_toolchains(&env),
      r#"{"nodes": [
        {"kind": "object_file", "name": "main", "source": "main.c",
         "options": [{"type": "define", "name": "NDEBUG"}]},
        {"kind": "executable", "name": "app", "objects": ["main"]}
      ]}"#,
    )
    .unwrap();

    assert!(text.contains("srcdir := /src\n"), "{text}");
    assert!(text.contains("CC := cc\n"), "{text}");
    assert!(text.contains("main.o: $(srcdir)/main.c\n"), "{text}");
    assert!(
      text.contains("\t$(CC) $(CFLAGS) -DNDEBUG -MMD -MF main.d -c $< -o $@\n"),
      "{text}"
    );
    assert!(text.contains("app: main.o\n\t$(CC) $(LDFLAGS) main.o $(LDLIBS) -o $@\n"), "{text}");
    assert!(text.contains(".PHONY: all\nall: app\n"), "{text}");
    assert!(text.contains("-include main.d\n"), "{text}");
  }

  #[test]
  fn cxx_objects_link_with_the_cxx_driver() {
    let env = env_for(Os::Linux);
    let text = render(
      gcc_toolchains(&env),
      r#"{"nodes": [
        {"kind": "object_file", "name": "a", "source": "a.c"},
        {"kind": "object_file", "name": "b", "source": "b.cpp"},
        {"kind": "library", "name": "mix", "objects": ["a", "b"]}
      ]}"#,
    )
    .unwrap();
    assert!(text.contains("libmix.so: a.o b.o\n\t$(CXX) -shared $(LDFLAGS) a.o b.o"), "{text}");
  }

  #[test]
  fn libraries_feed_later_links() {
    let env = env_for(Os::Linux);
    let text = render(
      gcc_toolchains(&env),
      r#"{"nodes": [
        {"kind": "object_file", "name": "util", "source": "util.c"},
        {"kind": "library", "name": "util", "objects": ["util"], "link": "static"},
        {"kind": "object_file", "name": "main", "source": "main.c"},
        {"kind": "executable", "name": "app", "objects": ["main"], "libs": ["util"]}
      ]}"#,
    );
    // Object and library share a name but not an output.
    let err = text.unwrap_err();
    assert!(matches!(err, GenerateError::Make { ref target, .. } if target == "util"));

    let text = render(
      gcc_toolchains(&env),
      r#"{"nodes": [
        {"kind": "object_file", "name": "util_obj", "source": "util.c"},
        {"kind": "library", "name": "util", "objects": ["util_obj"], "link": "static"},
        {"kind": "object_file", "name": "main", "source": "main.c"},
        {"kind": "executable", "name": "app", "objects": ["main"], "libs": ["util"]}
      ]}"#,
    )
    .unwrap();
    assert!(text.contains("libutil.a: util_obj.o\n\t$(AR) $(ARFLAGS) $@ util_obj.o\n"), "{text}");
    assert!(text.contains("app: main.o libutil.a\n"), "{text}");
    assert!(text.contains("main.o libutil.a $(LDLIBS) -o $@"), "{text}");
  }

  #[test]
  fn unknown_dependency_names_the_target() {
    let env = env_for(Os::Linux);
    let err = render(
      gcc_toolchains(&env),
      r#"{"nodes": [{"kind": "executable", "name": "app", "objects": ["ghost"]}]}"#,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "target 'app' depends on unknown target 'ghost'");
  }

  #[test]
  fn empty_link_is_rejected() {
    let env = env_for(Os::Linux);
    let err = render(
      gcc_toolchains(&env),
      r#"{"nodes": [{"kind": "executable", "name": "app", "objects": []}]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, GenerateError::NoObjects { .. }));
  }

  #[test]
  fn pch_rule_is_shared_between_objects() {
    let env = env_for(Os::Linux);
    let graph = BuildGraph::from_json(
      r#"{"nodes": [
        {"kind": "object_file", "name": "a", "source": "a.cpp", "pch": "pch.hpp"},
        {"kind": "object_file", "name": "b", "source": "b.cpp", "pch": "pch.hpp"}
      ]}"#,
    )
    .unwrap();
    let generated = Generator::new(gcc_toolchains(&env)).run(&graph, "/src").unwrap();
    let text = generated.makefile.render().unwrap();

    assert_eq!(text.matches("pch.hpp.gch: $(srcdir)/pch.hpp\n").count(), 1, "{text}");
    assert!(text.contains("a.o: $(srcdir)/a.cpp pch.hpp.gch\n"), "{text}");
    assert!(text.contains("-include pch.hpp"), "{text}");
    assert!(generated.files.is_empty());
  }

  #[test]
  fn msvc_pch_needs_a_wrapper_and_links_its_object() {
    let env = env_for(Os::Windows);
    let toolchains = Toolchains::new(&env)
      .with_builder(Builder::from_probe(&env, Language::Cxx, words(&["cl"]), CL_BANNER).unwrap());
    let graph = BuildGraph::from_json(
      r#"{"nodes": [
        {"kind": "object_file", "name": "main", "source": "main.cpp", "pch": "inc/pch.hpp"},
        {"kind": "executable", "name": "app", "objects": ["main"]}
      ]}"#,
    )
    .unwrap();
    let generated = Generator::new(toolchains).run(&graph, "C:/src").unwrap();
    let text = generated.makefile.render().unwrap();

    assert_eq!(generated.files.len(), 1);
    assert_eq!(generated.files[0].path, BuildPath::builddir("inc/pch.cpp"));
    assert!(text.contains("inc/pch.pch inc/pch.obj: inc/pch.cpp $(srcdir)/inc/pch.hpp\n"), "{text}");
    assert!(text.contains("app.exe: main.obj inc/pch.obj\n"), "{text}");
    assert!(generated.dirs.contains("inc"));
  }

  #[test]
  fn unknown_brand_cannot_precompile() {
    let env = env_for(Os::Linux);
    let toolchains = Toolchains::new(&env)
      .with_builder(Builder::from_probe(&env, Language::C, words(&["tcc"]), "tcc version 0.9.27").unwrap());
    let err = render(
      toolchains,
      r#"{"nodes": [{"kind": "object_file", "name": "a", "source": "a.c", "pch": "pch.h"}]}"#,
    )
    .unwrap_err();
    assert!(matches!(
      err,
      GenerateError::Toolchain {
        source: ToolchainError::UnsupportedFeature { .. },
        ..
      }
    ));
  }

  #[test]
  fn unknown_source_extension_is_an_error() {
    let env = env_for(Os::Linux);
    let err = render(
      gcc_toolchains(&env),
      r#"{"nodes": [{"kind": "object_file", "name": "a", "source": "a.f90"}]}"#,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "target 'a': unable to determine the language of 'a.f90'");
  }

  #[test]
  fn commands_and_phony_targets() {
    let env = env_for(Os::Linux);
    let text = render(
      gcc_toolchains(&env),
      r#"{"nodes": [
        {"kind": "command", "name": "hello", "commands": [["echo", "hello world"]]},
        {"kind": "phony", "name": "all", "deps": ["hello"]}
      ]}"#,
    )
    .unwrap();
    assert!(text.contains(".PHONY: hello\nhello:\n\techo 'hello world'\n"), "{text}");
    assert_eq!(text.matches(".PHONY: all\n").count(), 1, "{text}");
    assert!(text.contains(".DEFAULT_GOAL := all\n"), "{text}");
  }

  #[test]
  fn invalid_version_requirement_names_the_package() {
    let env = env_for(Os::Linux);
    let err = render(
      gcc_toolchains(&env),
      r#"{"nodes": [{"kind": "object_file", "name": "a", "source": "a.c",
                     "packages": [{"name": "zlib", "version": "not a version"}]}]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, GenerateError::InvalidVersion { ref package, .. } if package == "zlib"));
  }

  #[test]
  fn write_to_creates_output_directories() {
    let env = env_for(Os::Linux);
    let graph = BuildGraph::from_json(
      r#"{"nodes": [{"kind": "object_file", "name": "sub/a", "source": "a.c"}]}"#,
    )
    .unwrap();
    let generated = Generator::new(gcc_toolchains(&env)).run(&graph, "/src").unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = generated.write_to(dir.path()).unwrap();

    assert!(dir.path().join("sub").is_dir());
    let text = fs::read_to_string(path).unwrap();
    assert!(text.contains("sub/a.o: $(srcdir)/a.c\n"));
  }
}
