//! Make backend.
//!
//! This module provides the escaping-aware Makefile model:
//! - `syntax`: the contexts a fragment can be rendered in
//! - `writer`: turns fragments into text for a context
//! - `entity`: variables, function calls and patterns
//! - `document`: the `Makefile` itself, with rules, variables and includes

pub mod document;
pub mod entity;
pub mod syntax;
pub mod writer;

use thiserror::Error;

pub use document::{Include, Makefile, Recipe, Rule};
pub use entity::{Entity, Function, Pattern, Variable, qvar, silent, var};
pub use syntax::{Section, ShellQuote, Syntax};
pub use writer::{ShellValue, Writer, escape_str, render, render_command};

/// Errors raised while building or rendering a Makefile.
#[derive(Debug, Error)]
pub enum MakeError {
  /// A pattern did not contain exactly one unescaped `%`.
  #[error("expected exactly one '%' in pattern '{pattern}'")]
  Format { pattern: String },

  #[error("variable '{0}' already defined")]
  DuplicateVariable(String),

  #[error("target '{0}' already has a rule")]
  DuplicateTarget(String),

  #[error("rule has no targets")]
  NoTargets,

  /// Raw text that cannot be represented on one Makefile line.
  #[error("unable to write newline in {0:?}")]
  UnsupportedLiteral(String),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}
