//! Syntax contexts and sections of a Makefile.

use crate::make::entity::Variable;
use crate::path::{BuildPath, Root};
use crate::safe_str::Fragment;

/// The escaping regime a fragment is rendered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syntax {
  /// Left-hand side of a rule.
  Target,
  /// Prerequisite lists (normal and order-only).
  Dependency,
  /// Arguments of a `$(function ...)` call.
  Function,
  /// Recipe lines and variable values passed to the shell.
  Shell,
  /// Values that must not be shell-quoted (built-in path variables).
  Clean,
}

impl Syntax {
  /// Contexts whose text eventually reaches a shell.
  pub fn is_shelly(&self) -> bool {
    matches!(self, Self::Function | Self::Shell)
  }
}

/// How raw text is shell-quoted in shell-bound contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellQuote {
  /// Quote each word that needs it.
  Info,
  /// Escape single quotes and report whether quoting is needed, but leave
  /// the quoting to the caller.
  Escape,
  /// Emit the text as-is.
  None,
}

/// Groups of global variables, written in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
  Path,
  Command,
  Flags,
  Other,
}

impl Section {
  pub const ALL: [Section; 4] = [Section::Path, Section::Command, Section::Flags, Section::Other];
}

/// The variable a path root is rendered through, if any.
///
/// Build-directory paths are relative to the Makefile itself and need no
/// prefix.
pub fn path_var(root: Root) -> Option<Variable> {
  match root {
    Root::Absolute | Root::BuildDir => None,
    root => Some(Variable::new(root.as_str())),
  }
}

/// Express a rooted path as fragments for this backend.
pub fn realize(path: &BuildPath) -> Fragment {
  match path_var(path.root) {
    Some(var) if path.suffix.is_empty() => Fragment::from(var),
    Some(var) => Fragment::Join(vec![
      Fragment::from(var),
      Fragment::literal("/"),
      Fragment::raw(path.suffix.clone()),
    ]),
    None if path.suffix.is_empty() => Fragment::raw("."),
    None => Fragment::raw(path.suffix.clone()),
  }
}
