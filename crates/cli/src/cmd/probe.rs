//! Implementation of the `buildgen probe` command.

use anyhow::{Context, Result};

use buildgen_lib::toolchain::{Builder, Language};

use super::Config;
use crate::output::{print_json, print_stat, print_success};

pub fn cmd_probe(config: &Config, lang: Language, json: bool) -> Result<()> {
  let env = config.environment()?;
  let builder = Builder::detect(&env, lang).with_context(|| format!("Failed to detect a {lang} toolchain"))?;

  let version = builder.version().map(ToString::to_string);
  let modes: Vec<&str> = builder.link_modes().map(|mode| mode.as_str()).collect();
  let command = builder.compiler().command().join(" ");

  if json {
    let json_output = serde_json::json!({
      "lang": lang,
      "target": env.target_triple(),
      "brand": builder.brand().as_str(),
      "version": version,
      "flavor": builder.flavor().as_str(),
      "object_format": builder.object_format(),
      "command": builder.compiler().command(),
      "link_modes": modes,
    });
    return print_json(&json_output);
  }

  print_success(&format!("{lang} compiler: {command}"));
  print_stat("Target", &env.target_triple());
  print_stat("Brand", builder.brand().as_str());
  print_stat("Version", version.as_deref().unwrap_or("unknown"));
  print_stat("Flavor", builder.flavor().as_str());
  print_stat("Object format", builder.object_format().as_str());
  print_stat("Link modes", &modes.join(", "));
  Ok(())
}
