//! Build graphs turned into Makefiles with packages resolved along the way.

use std::fs;
use std::sync::Arc;

use buildgen_lib::execute::{Output, ScriptedRunner};
use buildgen_lib::generate::{BuildGraph, GenerateError, Generator, Toolchains};
use buildgen_lib::packages::PackageError;
use buildgen_lib::toolchain::Language;

use super::common::{gcc, scripted_env};

fn zlib_runner() -> ScriptedRunner {
  ScriptedRunner::new()
    .respond("pkg-config zlib --modversion", Output::stdout("1.3.1\n"))
    .respond("pkg-config zlib --cflags", Output::stdout("-I/opt/zlib/include\n"))
    .respond("pkg-config zlib --libs", Output::stdout("-L/opt/zlib/lib -lz\n"))
}

const TWO_USERS: &str = r#"{"nodes": [
  {"kind": "object_file", "name": "a", "source": "a.c", "packages": [{"name": "zlib"}]},
  {"kind": "object_file", "name": "b", "source": "b.c", "packages": [{"name": "zlib"}]},
  {"kind": "executable", "name": "app", "objects": ["a", "b"], "packages": [{"name": "zlib"}]}
]}"#;

#[test]
fn pkg_config_options_reach_compile_and_link() {
  let runner = Arc::new(zlib_runner());
  let env = scripted_env(runner.clone(), "{}");
  let toolchains = Toolchains::new(&env).with_builder(gcc(&env, Language::C));
  let graph = BuildGraph::from_json(TWO_USERS).unwrap();

  let generated = Generator::new(toolchains).run(&graph, "/src").unwrap();
  let text = generated.makefile.render().unwrap();

  assert!(text.contains("$(CC) $(CFLAGS) -I/opt/zlib/include -MMD -MF a.d -c $< -o $@"), "{text}");
  assert!(text.contains("$(CC) $(LDFLAGS) -L/opt/zlib/lib a.o b.o -lz $(LDLIBS) -o $@"), "{text}");

  let modversion_calls = runner
    .calls()
    .iter()
    .filter(|call| call.command == "pkg-config zlib --modversion")
    .count();
  assert_eq!(modversion_calls, 1);
}

#[test]
fn path_usage_finds_files_on_disk() {
  let root = tempfile::tempdir().unwrap();
  let include = root.path().join("include");
  let lib = root.path().join("lib");
  fs::create_dir_all(&include).unwrap();
  fs::create_dir_all(&lib).unwrap();
  fs::write(include.join("png.h"), "").unwrap();
  fs::write(lib.join("libpng.a"), "").unwrap();

  let usage = serde_json::json!({
    "png": {
      "type": "path",
      "headers": ["png.h"],
      "libraries": ["png"],
      "include_path": [include],
      "library_path": [lib],
    }
  });
  let runner = Arc::new(ScriptedRunner::new().missing("pkg-config"));
  let env = scripted_env(runner, &usage.to_string());
  let toolchains = Toolchains::new(&env).with_builder(gcc(&env, Language::C));
  let graph = BuildGraph::from_json(
    r#"{"nodes": [
      {"kind": "object_file", "name": "main", "source": "main.c", "packages": [{"name": "png", "kind": "static"}]},
      {"kind": "executable", "name": "viewer", "objects": ["main"], "packages": [{"name": "png", "kind": "static"}]}
    ]}"#,
  )
  .unwrap();

  let text = Generator::new(toolchains).run(&graph, "/src").unwrap().makefile.render().unwrap();
  assert!(text.contains(&format!("-I{}", include.display())), "{text}");
  assert!(text.contains(&format!("-L{}", lib.display())), "{text}");
  assert!(text.contains("main.o -lpng $(LDLIBS)"), "{text}");
}

#[test]
fn unresolvable_package_names_the_target() {
  let runner = Arc::new(ScriptedRunner::new().missing("pkg-config"));
  let env = scripted_env(runner, r#"{"ghost": {"type": "path", "headers": ["ghost.h"], "include_path": ["/nonexistent"]}}"#);
  let toolchains = Toolchains::new(&env).with_builder(gcc(&env, Language::C));
  let graph = BuildGraph::from_json(
    r#"{"nodes": [{"kind": "object_file", "name": "main", "source": "main.c", "packages": [{"name": "ghost"}]}]}"#,
  )
  .unwrap();

  let err = Generator::new(toolchains).run(&graph, "/src").unwrap_err();
  let GenerateError::Package { target, source } = &err else {
    panic!("expected a package error, got {err}");
  };
  assert_eq!(target, "main");
  assert!(matches!(source, PackageError::Resolution { .. }));
  assert!(err.to_string().starts_with("target 'main': "));
}

#[test]
fn missing_compiler_is_reported_once_asked_for() {
  let runner = Arc::new(ScriptedRunner::new().missing("cc").missing("gcc").missing("clang"));
  let env = scripted_env(runner, "{}");
  let graph = BuildGraph::from_json(
    r#"{"nodes": [
      {"kind": "command", "name": "hello", "commands": [["echo", "hi"]]},
      {"kind": "object_file", "name": "main", "source": "main.c"}
    ]}"#,
  )
  .unwrap();

  let err = Generator::new(Toolchains::new(&env)).run(&graph, "/src").unwrap_err();
  assert!(matches!(err, GenerateError::Toolchain { ref target, .. } if target == "main"), "{err}");
}
