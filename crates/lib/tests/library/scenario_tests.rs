//! End-to-end checks of the core behaviors through the public API.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use buildgen_lib::execute::{Output, ScriptedRunner};
use buildgen_lib::make::{Makefile, Rule};
use buildgen_lib::packages::{PackageKind, PackageResolver};
use buildgen_lib::path::BuildPath;
use buildgen_lib::platform::{Arch, ObjectFormat, Os, Platform};
use buildgen_lib::toolchain::cc::CcCompiler;
use buildgen_lib::toolchain::{
  Brand, Builder, BuilderParts, CompileOption, Flavor, Language, LinkMode, ToolchainError,
};
use semver::VersionReq;

use super::common::{GCC_BANNER, gcc, linux, scripted_env};

mod makefile_rules {
  use super::*;

  #[test]
  fn plain_rule_renders_deps_and_recipe() {
    let mut make = Makefile::new();
    make
      .rule(Rule::new(["out"]).with_deps(["in"]).with_recipe(["cc -c in -o out"]))
      .unwrap();
    let text = make.render().unwrap();

    let block = text.split_once("out: in\n").map(|(_, rest)| rest).unwrap();
    assert!(block.starts_with("\tcc -c in -o out\n"), "{text}");
    assert!(!text.contains(".PHONY"), "{text}");
  }

  #[test]
  fn phony_marker_precedes_empty_rule() {
    let mut make = Makefile::new();
    make.rule(Rule::new(["check"]).phony()).unwrap();
    assert!(make.render().unwrap().contains(".PHONY: check\ncheck:\n"));
  }

  #[test]
  fn second_rule_for_a_target_is_rejected() {
    let mut make = Makefile::new();
    make.rule(Rule::new(["out"])).unwrap();
    let err = make.rule(Rule::new(["out"])).unwrap_err();
    assert_eq!(err.to_string(), "target 'out' already has a rule");
  }
}

mod package_resolution {
  use super::*;

  #[test]
  fn include_path_is_taken_without_probing() {
    let runner = Arc::new(ScriptedRunner::new().missing("pkg-config"));
    let env = scripted_env(
      runner.clone(),
      r#"{"x": {"type": "path", "include_path": ["/opt/x/include"]}}"#,
    );
    let resolver = PackageResolver::new(&env, Language::C, Flavor::Cc, ObjectFormat::Elf, Vec::new(), Vec::new());

    let package = resolver
      .resolve("x", &[], &VersionReq::STAR, PackageKind::Any, None)
      .unwrap();
    assert_eq!(
      package.compile_options,
      vec![CompileOption::include_dir(BuildPath::absolute("/opt/x/include"))]
    );
    assert!(runner.calls().is_empty());
  }
}

mod cross_compiling {
  use super::*;

  #[test]
  fn different_arch_adds_one_flag() {
    let runner = Arc::new(ScriptedRunner::new().respond("gcc -dumpmachine", Output::stdout("x86_64-pc-linux-gnu\n")));
    let env = scripted_env(runner, "{}").with_target(Platform::new(Arch::X86, Os::Linux));

    let builder = gcc(&env, Language::C);
    assert_eq!(builder.compiler().global_flags(), ["-m32"]);
  }

  #[test]
  fn matching_arch_adds_nothing() {
    let runner = Arc::new(ScriptedRunner::new().respond("gcc -dumpmachine", Output::stdout("i686-pc-linux-gnu\n")));
    let env = scripted_env(runner, "{}").with_target(Platform::new(Arch::X86, Os::Linux));

    let builder = gcc(&env, Language::C);
    assert!(builder.compiler().global_flags().is_empty());
  }
}

mod link_modes {
  use super::*;

  #[test]
  fn missing_mode_is_a_named_lookup_error() {
    let env = scripted_env(Arc::new(ScriptedRunner::new()), "{}");
    let command = vec!["gcc".to_string()];
    let builder = Builder::from_parts(BuilderParts {
      lang: Language::C,
      brand: Brand::Gcc,
      version: None,
      object_format: ObjectFormat::Elf,
      flavor: Flavor::Cc,
      compiler: Box::new(CcCompiler::new(Language::C, command, Vec::new(), false)),
      pch_compiler: None,
      linkers: BTreeMap::new(),
      packages: PackageResolver::new(&env, Language::C, Flavor::Cc, ObjectFormat::Elf, Vec::new(), Vec::<PathBuf>::new()),
    });

    let err = builder.linker(LinkMode::StaticLibrary).unwrap_err();
    assert!(matches!(
      err,
      ToolchainError::MissingLinkMode {
        mode: LinkMode::StaticLibrary
      }
    ));
    assert!(err.to_string().contains("static_library"));
  }

  #[test]
  fn detected_gcc_links_every_library_kind() {
    let env = scripted_env(Arc::new(ScriptedRunner::new()), "{}");
    assert_eq!(env.target, linux());
    let builder = Builder::from_probe(&env, Language::C, vec!["gcc".to_string()], GCC_BANNER).unwrap();
    for mode in [LinkMode::Executable, LinkMode::SharedLibrary, LinkMode::StaticLibrary] {
      assert_eq!(builder.linker(mode).unwrap().mode(), mode);
    }
  }
}
