//! Named Makefile entities: variables, function calls and patterns.
//!
//! Entities compare and hash by name only, so a variable referenced in two
//! places is the same variable regardless of how it is quoted.

use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use regex::Regex;

use crate::make::MakeError;
use crate::make::syntax::{ShellQuote, Syntax};
use crate::make::writer::{ShellValue, Writer};
use crate::safe_str::{self, Fragment};
use crate::shell;

static BAD_NAME_CHARS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[\s:#=]").expect("variable name character class is a valid regex"));

static WILDCARD: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"([^\\]|^)(\\\\)*%").expect("wildcard pattern is a valid regex"));

/// A Make variable.
///
/// Names are normalized on construction so they are always legal on the
/// left-hand side of an assignment.
#[derive(Debug, Clone)]
pub struct Variable {
  name: String,
  quoted: bool,
}

impl Variable {
  pub fn new(name: &str) -> Self {
    Self {
      name: BAD_NAME_CHARS.replace_all(name, "_").into_owned(),
      quoted: false,
    }
  }

  /// A variable whose expansion must be shell-quoted wherever it is used.
  pub fn quoted(name: &str) -> Self {
    Self {
      quoted: true,
      ..Self::new(name)
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn is_quoted(&self) -> bool {
    self.quoted
  }

  /// The reference syntax, e.g. `$(CC)` or `$@`.
  pub fn expand(&self) -> String {
    let reference = if self.name.chars().count() == 1 {
      format!("${}", self.name)
    } else {
      format!("$({})", self.name)
    };
    if self.quoted {
      shell::quote_escaped(&reference)
    } else {
      reference
    }
  }
}

impl PartialEq for Variable {
  fn eq(&self, other: &Self) -> bool {
    self.name == other.name
  }
}

impl Eq for Variable {}

impl Hash for Variable {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.name.hash(state);
  }
}

impl From<&str> for Variable {
  fn from(name: &str) -> Self {
    Variable::new(name)
  }
}

impl From<String> for Variable {
  fn from(name: String) -> Self {
    Variable::new(&name)
  }
}

impl From<&Variable> for Variable {
  fn from(var: &Variable) -> Self {
    var.clone()
  }
}

impl From<Variable> for Fragment {
  fn from(var: Variable) -> Self {
    Fragment::Entity(Entity::Variable(var))
  }
}

impl From<&Variable> for Fragment {
  fn from(var: &Variable) -> Self {
    Fragment::Entity(Entity::Variable(var.clone()))
  }
}

/// A `$(name arg1,arg2,...)` call.
///
/// Each argument is a list of fragments joined by spaces.
#[derive(Debug, Clone)]
pub struct Function {
  name: String,
  args: Vec<Vec<Fragment>>,
  quoted: bool,
}

impl Function {
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      args: Vec::new(),
      quoted: false,
    }
  }

  /// `$(call func,args...)`.
  pub fn call(func: impl Into<Variable>) -> Self {
    let func = func.into();
    Self::new("call").arg(Fragment::raw(func.name()))
  }

  /// Append a single-fragment argument.
  pub fn arg(mut self, arg: impl Into<Fragment>) -> Self {
    self.args.push(vec![arg.into()]);
    self
  }

  /// Append an argument made of several space-separated fragments.
  pub fn arg_list<I, F>(mut self, items: I) -> Self
  where
    I: IntoIterator<Item = F>,
    F: Into<Fragment>,
  {
    self.args.push(items.into_iter().map(Into::into).collect());
    self
  }

  /// Quote the whole call, leaving the arguments unquoted.
  pub fn quoted(mut self) -> Self {
    self.quoted = true;
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn expand(&self) -> Result<String, MakeError> {
    let quote = if self.quoted { ShellQuote::None } else { ShellQuote::Info };

    let mut out = Writer::new();
    if self.args.is_empty() {
      out.write_literal(&format!("$({})", self.name));
    } else {
      out.write_literal(&format!("$({} ", self.name));
      for (idx, arg) in self.args.iter().enumerate() {
        if idx > 0 {
          out.write_literal(",");
        }
        out.write_each(arg, Syntax::Function, " ", None, None, quote)?;
      }
      out.write_literal(")");
    }

    let result = out.into_string();
    if self.quoted {
      Ok(shell::quote_escaped(&result))
    } else {
      Ok(result)
    }
  }
}

impl PartialEq for Function {
  fn eq(&self, other: &Self) -> bool {
    self.name == other.name
  }
}

impl Eq for Function {}

impl Hash for Function {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.name.hash(state);
  }
}

impl From<Function> for Fragment {
  fn from(func: Function) -> Self {
    Fragment::Entity(Entity::Function(func))
  }
}

/// A pattern-rule template with exactly one `%` wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
  template: String,
}

impl Pattern {
  pub fn new(template: &str) -> Result<Self, MakeError> {
    if WILDCARD.find_iter(template).count() != 1 {
      return Err(MakeError::Format {
        pattern: template.to_string(),
      });
    }
    Ok(Self {
      template: template.to_string(),
    })
  }

  pub fn template(&self) -> &str {
    &self.template
  }

  /// The text before and after the wildcard.
  pub fn wildcard_parts(&self) -> (&str, &str) {
    // Validated on construction, so exactly one match exists.
    let pos = WILDCARD
      .find(&self.template)
      .map(|m| m.end() - 1)
      .unwrap_or(self.template.len());
    let (stem, rest) = self.template.split_at(pos);
    (stem, rest.get(1..).unwrap_or(""))
  }

  /// The pattern as fragments, with the wildcard emitted unescaped.
  pub fn to_fragment(&self) -> Fragment {
    safe_str::join(self.template.split('%'), Fragment::literal("%"))
  }
}

impl From<Pattern> for Fragment {
  fn from(pattern: Pattern) -> Self {
    Fragment::Entity(Entity::Pattern(pattern))
  }
}

/// Any named symbol that can appear in a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entity {
  Variable(Variable),
  Function(Function),
  Pattern(Pattern),
}

impl Entity {
  pub fn name(&self) -> &str {
    match self {
      Self::Variable(var) => var.name(),
      Self::Function(func) => func.name(),
      Self::Pattern(pattern) => pattern.template(),
    }
  }
}

impl From<Variable> for Entity {
  fn from(var: Variable) -> Self {
    Self::Variable(var)
  }
}

impl From<Function> for Entity {
  fn from(func: Function) -> Self {
    Self::Function(func)
  }
}

/// Shorthand for an unquoted variable.
pub fn var(name: &str) -> Variable {
  Variable::new(name)
}

/// Shorthand for a quoted variable.
pub fn qvar(name: &str) -> Variable {
  Variable::quoted(name)
}

/// Prefix a recipe command with `@` so Make does not echo it.
pub fn silent(command: ShellValue) -> ShellValue {
  match command {
    ShellValue::Words(mut words) => {
      if let Some(first) = words.first_mut() {
        *first = Fragment::literal("@").concat(first.clone());
      }
      ShellValue::Words(words)
    }
    ShellValue::Line(line) => ShellValue::Line(Fragment::literal("@").concat(line)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn variable_names_are_normalized() {
    assert_eq!(Variable::new("my var:x#y=z").name(), "my_var_x_y_z");
  }

  #[test]
  fn variable_expansion_forms() {
    assert_eq!(var("CC").expand(), "$(CC)");
    assert_eq!(var("@").expand(), "$@");
    assert_eq!(qvar("srcdir").expand(), "'$(srcdir)'");
  }

  #[test]
  fn variable_equality_ignores_quoting() {
    assert_eq!(var("x"), qvar("x"));
  }

  #[test]
  fn function_expansion_escapes_commas() {
    let func = Function::new("subst").arg(",").arg("x").arg_list(["a,b", "c d"]);
    assert_eq!(func.expand().unwrap(), "$(subst $,,x,a$,b 'c d')");
  }

  #[test]
  fn quoted_function_quotes_whole_call() {
    let func = Function::new("patsubst").arg_list(["%.c", "%.o"]).quoted();
    assert_eq!(func.expand().unwrap(), "'$(patsubst %.c %.o)'");
  }

  #[test]
  fn call_passes_function_name_first() {
    let func = Function::call("my_func").arg("foo");
    assert_eq!(func.expand().unwrap(), "$(call my_func,foo)");
  }

  #[test]
  fn pattern_requires_exactly_one_wildcard() {
    assert!(Pattern::new("%.o").is_ok());
    assert!(Pattern::new("a\\%b%c").is_ok());
    assert!(matches!(Pattern::new("foo"), Err(MakeError::Format { .. })));
    assert!(matches!(Pattern::new("%/%"), Err(MakeError::Format { .. })));
    assert!(matches!(Pattern::new("a\\\\\\%"), Err(MakeError::Format { .. })));
  }

  #[test]
  fn pattern_splits_at_single_wildcard() {
    let pattern = Pattern::new("a%b").unwrap();
    assert_eq!(pattern.wildcard_parts(), ("a", "b"));
    assert_eq!(Pattern::new("%").unwrap().wildcard_parts(), ("", ""));
    assert_eq!(Pattern::new("a\\%b%c").unwrap().wildcard_parts(), ("a\\%b", "c"));
  }

  #[test]
  fn silent_prefixes_first_word() {
    let cmd = silent(ShellValue::Words(vec![Fragment::raw("echo"), Fragment::raw("hi")]));
    assert_eq!(
      cmd,
      ShellValue::Words(vec![
        Fragment::Join(vec![Fragment::literal("@"), Fragment::raw("echo")]),
        Fragment::raw("hi"),
      ])
    );
  }
}
