//! Shared helpers for library integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use buildgen_lib::execute::ScriptedRunner;
use buildgen_lib::packages::UsageTable;
use buildgen_lib::platform::{Arch, Environment, Os, Platform};
use buildgen_lib::toolchain::{Builder, Language};

pub const GCC_BANNER: &str = "gcc (GCC) 13.2.1 20230801\nCopyright (C) 2023 Free Software Foundation, Inc.\n";

pub fn linux() -> Platform {
  Platform::new(Arch::X86_64, Os::Linux)
}

/// A Linux environment whose commands are answered by `runner`.
pub fn scripted_env(runner: Arc<ScriptedRunner>, usage: &str) -> Environment {
  Environment::new(linux(), BTreeMap::new())
    .with_runner(runner)
    .with_usage(Arc::new(UsageTable::from_json(usage, None).unwrap()))
}

pub fn gcc(env: &Environment, lang: Language) -> Builder {
  let command = match lang {
    Language::C => "gcc",
    Language::Cxx => "g++",
  };
  Builder::from_probe(env, lang, vec![command.to_string()], GCC_BANNER).unwrap()
}
