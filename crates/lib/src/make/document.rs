//! The Makefile document model.
//!
//! A [`Makefile`] collects global variables, pattern-scoped variables,
//! defines, rules and includes, then renders them in a fixed order. All
//! containers preserve registration order so output is stable across runs.

use std::collections::{BTreeMap, HashSet};
use std::io;

use tracing::debug;

use crate::make::MakeError;
use crate::make::entity::{Entity, Pattern, Variable};
use crate::make::syntax::{Section, ShellQuote, Syntax};
use crate::make::writer::{ShellValue, Writer, render};
use crate::safe_str::Fragment;

/// What a rule runs once its prerequisites are up to date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Recipe {
  #[default]
  None,
  /// A single entity written on the rule line: `target: deps ; $(cmd)`.
  Inline(Entity),
  /// Tab-indented recipe lines.
  Commands(Vec<ShellValue>),
}

/// One rule block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
  pub targets: Vec<Fragment>,
  pub deps: Vec<Fragment>,
  pub order_only: Vec<Fragment>,
  pub recipe: Recipe,
  pub variables: Vec<(Variable, ShellValue)>,
  pub phony: bool,
}

impl Rule {
  pub fn new<I, F>(targets: I) -> Self
  where
    I: IntoIterator<Item = F>,
    F: Into<Fragment>,
  {
    Self {
      targets: targets.into_iter().map(Into::into).collect(),
      deps: Vec::new(),
      order_only: Vec::new(),
      recipe: Recipe::None,
      variables: Vec::new(),
      phony: false,
    }
  }

  pub fn with_deps<I, F>(mut self, deps: I) -> Self
  where
    I: IntoIterator<Item = F>,
    F: Into<Fragment>,
  {
    self.deps.extend(deps.into_iter().map(Into::into));
    self
  }

  pub fn with_order_only<I, F>(mut self, deps: I) -> Self
  where
    I: IntoIterator<Item = F>,
    F: Into<Fragment>,
  {
    self.order_only.extend(deps.into_iter().map(Into::into));
    self
  }

  pub fn with_recipe<I, C>(mut self, commands: I) -> Self
  where
    I: IntoIterator<Item = C>,
    C: Into<ShellValue>,
  {
    self.recipe = Recipe::Commands(commands.into_iter().map(Into::into).collect());
    self
  }

  pub fn with_inline(mut self, entity: impl Into<Entity>) -> Self {
    self.recipe = Recipe::Inline(entity.into());
    self
  }

  /// Add a target-specific variable. Later values for the same name replace
  /// earlier ones.
  pub fn with_variable(mut self, name: impl Into<Variable>, value: impl Into<ShellValue>) -> Self {
    let name = name.into();
    let value = value.into();
    match self.variables.iter_mut().find(|(existing, _)| *existing == name) {
      Some(slot) => slot.1 = value,
      None => self.variables.push((name, value)),
    }
    self
  }

  pub fn phony(mut self) -> Self {
    self.phony = true;
    self
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
  pub name: Fragment,
  pub optional: bool,
}

/// An in-memory Makefile.
#[derive(Debug, Default)]
pub struct Makefile {
  var_table: HashSet<Variable>,
  global_variables: BTreeMap<Section, Vec<(Variable, ShellValue)>>,
  target_variables: Vec<(Variable, ShellValue)>,
  defines: Vec<(Variable, Vec<ShellValue>)>,
  rules: Vec<Rule>,
  targets: HashSet<String>,
  includes: Vec<Include>,
}

impl Makefile {
  pub fn new() -> Self {
    Self::default()
  }

  fn unique_var(&mut self, name: Variable, exist_ok: bool) -> Result<(Variable, bool), MakeError> {
    let exists = self.var_table.contains(&name);
    if exists && !exist_ok {
      return Err(MakeError::DuplicateVariable(name.name().to_string()));
    }
    self.var_table.insert(name.clone());
    Ok((name, exists))
  }

  /// Register a global variable and return its canonical form.
  ///
  /// When the name is already taken and `exist_ok` is set, the existing
  /// definition is kept and `value` is discarded.
  pub fn variable(
    &mut self,
    name: impl Into<Variable>,
    value: impl Into<ShellValue>,
    section: Section,
    exist_ok: bool,
  ) -> Result<Variable, MakeError> {
    let (name, exists) = self.unique_var(name.into(), exist_ok)?;
    if !exists {
      self
        .global_variables
        .entry(section)
        .or_default()
        .push((name.clone(), value.into()));
    }
    Ok(name)
  }

  /// Register a variable scoped to every target (`%: NAME := value`).
  pub fn target_variable(
    &mut self,
    name: impl Into<Variable>,
    value: impl Into<ShellValue>,
    exist_ok: bool,
  ) -> Result<Variable, MakeError> {
    let (name, exists) = self.unique_var(name.into(), exist_ok)?;
    if !exists {
      self.target_variables.push((name.clone(), value.into()));
    }
    Ok(name)
  }

  /// Register a multi-line `define` block.
  pub fn define<I, C>(&mut self, name: impl Into<Variable>, lines: I, exist_ok: bool) -> Result<Variable, MakeError>
  where
    I: IntoIterator<Item = C>,
    C: Into<ShellValue>,
  {
    let (name, exists) = self.unique_var(name.into(), exist_ok)?;
    if !exists {
      self
        .defines
        .push((name.clone(), lines.into_iter().map(Into::into).collect()));
    }
    Ok(name)
  }

  pub fn has_variable(&self, name: impl Into<Variable>) -> bool {
    self.var_table.contains(&name.into())
  }

  pub fn include(&mut self, name: impl Into<Fragment>, optional: bool) {
    self.includes.push(Include {
      name: name.into(),
      optional,
    });
  }

  /// Register a rule.
  ///
  /// Every target must be new to the document; nothing is registered if any
  /// of them collides.
  pub fn rule(&mut self, rule: Rule) -> Result<(), MakeError> {
    if rule.targets.is_empty() {
      return Err(MakeError::NoTargets);
    }

    let mut names = Vec::with_capacity(rule.targets.len());
    for target in &rule.targets {
      let (name, _) = render(target, Syntax::Target, ShellQuote::None)?;
      if self.targets.contains(&name) || names.contains(&name) {
        return Err(MakeError::DuplicateTarget(name));
      }
      names.push(name);
    }

    debug!(targets = ?names, phony = rule.phony, "registered rule");
    self.targets.extend(names);
    self.rules.push(rule);
    Ok(())
  }

  pub fn has_rule(&self, target: impl Into<Fragment>) -> bool {
    render(&target.into(), Syntax::Target, ShellQuote::None)
      .map(|(name, _)| self.targets.contains(&name))
      .unwrap_or(false)
  }

  pub fn rules(&self) -> &[Rule] {
    &self.rules
  }

  fn write_variable(
    out: &mut Writer,
    name: &Variable,
    value: &ShellValue,
    syntax: Syntax,
    target: Option<&Fragment>,
  ) -> Result<(), MakeError> {
    if let Some(target) = target {
      out.write(target, Syntax::Target, ShellQuote::Info)?;
      out.write_literal(": ");
    }
    out.write_literal(name.name());
    out.write_literal(" := ");
    out.write_shell(value, syntax)?;
    out.write_literal("\n");
    Ok(())
  }

  fn write_define(out: &mut Writer, name: &Variable, lines: &[ShellValue]) -> Result<(), MakeError> {
    out.write_literal(&format!("define {}\n", name.name()));
    for line in lines {
      out.write_shell(line, Syntax::Shell)?;
      out.write_literal("\n");
    }
    out.write_literal("endef\n\n");
    Ok(())
  }

  fn write_rule(out: &mut Writer, rule: &Rule) -> Result<(), MakeError> {
    for target in &rule.targets {
      for (name, value) in &rule.variables {
        Self::write_variable(out, name, value, Syntax::Shell, Some(target))?;
      }
    }

    if rule.phony {
      out.write_literal(".PHONY: ");
      out.write_each(&rule.targets, Syntax::Dependency, " ", None, None, ShellQuote::Info)?;
      out.write_literal("\n");
    }

    out.write_each(&rule.targets, Syntax::Target, " ", None, None, ShellQuote::Info)?;
    out.write_literal(":");
    out.write_each(&rule.deps, Syntax::Dependency, " ", Some(" "), None, ShellQuote::Info)?;
    out.write_each(&rule.order_only, Syntax::Dependency, " ", Some(" | "), None, ShellQuote::Info)?;

    match &rule.recipe {
      Recipe::None => {}
      Recipe::Inline(entity) => {
        out.write_literal(" ; ");
        out.write(&Fragment::Entity(entity.clone()), Syntax::Shell, ShellQuote::None)?;
      }
      Recipe::Commands(commands) => {
        for command in commands {
          out.write_literal("\n\t");
          out.write_shell(command, Syntax::Shell)?;
        }
      }
    }
    out.write_literal("\n\n");
    Ok(())
  }

  /// Render the whole document to a string.
  pub fn render(&self) -> Result<String, MakeError> {
    let mut out = Writer::new();

    // Built-in suffix rules would shadow the generated ones.
    out.write_literal(".SUFFIXES:\n");

    // `$,` is how commas are escaped inside function arguments.
    Self::write_variable(
      &mut out,
      &Variable::new(","),
      &ShellValue::from(","),
      Syntax::Shell,
      None,
    )?;
    out.write_literal("\n");

    for section in Section::ALL {
      let Some(vars) = self.global_variables.get(&section).filter(|v| !v.is_empty()) else {
        continue;
      };
      // Path variables are only ever used inside other, quoted, paths.
      let syntax = if section == Section::Path { Syntax::Clean } else { Syntax::Shell };
      for (name, value) in vars {
        Self::write_variable(&mut out, name, value, syntax, None)?;
      }
      out.write_literal("\n");
    }

    if !self.target_variables.is_empty() {
      let every_target = Fragment::from(Pattern::new("%")?);
      for (name, value) in &self.target_variables {
        Self::write_variable(&mut out, name, value, Syntax::Shell, Some(&every_target))?;
      }
      out.write_literal("\n");
    }

    for (name, lines) in &self.defines {
      Self::write_define(&mut out, name, lines)?;
    }

    for rule in &self.rules {
      Self::write_rule(&mut out, rule)?;
    }

    for include in &self.includes {
      out.write_literal(if include.optional { "-include " } else { "include " });
      out.write(&include.name, Syntax::Target, ShellQuote::Info)?;
      out.write_literal("\n");
    }

    Ok(out.into_string())
  }

  /// Render the document into `sink`.
  pub fn write<W: io::Write>(&self, sink: &mut W) -> Result<(), MakeError> {
    let text = self.render()?;
    sink.write_all(text.as_bytes())?;
    Ok(())
  }
}
