//! Implementation of the `buildgen package` command.

use anyhow::{Context, Result};
use semver::VersionReq;

use buildgen_lib::packages::PackageKind;
use buildgen_lib::toolchain::{Builder, Language};

use super::Config;
use crate::output::print_json;

pub fn cmd_package(
  config: &Config,
  name: &str,
  submodules: &[String],
  lang: Language,
  kind: PackageKind,
  version: Option<&str>,
) -> Result<()> {
  let version = match version {
    Some(text) => VersionReq::parse(text).with_context(|| format!("Invalid version requirement '{text}'"))?,
    None => VersionReq::STAR,
  };
  let env = config.environment()?;
  let builder = Builder::detect(&env, lang).with_context(|| format!("Failed to detect a {lang} toolchain"))?;

  let package = builder
    .packages()
    .resolve(name, submodules, &version, kind, None)
    .with_context(|| format!("Failed to resolve package '{name}'"))?;
  print_json(&package)
}
