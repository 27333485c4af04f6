//! Rendering fragments to Makefile text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::make::MakeError;
use crate::make::entity::Entity;
use crate::make::syntax::{ShellQuote, Syntax, realize};
use crate::safe_str::Fragment;
use crate::shell;

// Windows paths contain drive colons, so ":" is only escaped elsewhere.
const EXTRA_ESCAPES: &str = if cfg!(windows) { "" } else { ":" };

static TARGET_ESCAPES: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(&format!(r"(\\*)([#?*\[\]~\s%{{}}{}])", EXTRA_ESCAPES)).expect("target escapes are a valid regex")
});

static DEPENDENCY_ESCAPES: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(&format!(r"(\\*)([#?*\[\]~\s|%{{}}{}])", EXTRA_ESCAPES)).expect("dependency escapes are a valid regex")
});

fn backslash_escape(caps: &Captures<'_>) -> String {
  format!("{}{}\\{}", &caps[1], &caps[1], &caps[2])
}

/// Escape raw text for the given syntax context.
///
/// Newlines cannot be represented on a single Makefile line and are rejected.
pub fn escape_str(text: &str, syntax: Syntax) -> Result<String, MakeError> {
  if text.contains('\n') {
    return Err(MakeError::UnsupportedLiteral(text.to_string()));
  }
  let result = text.replace('$', "$$");

  Ok(match syntax {
    Syntax::Target => TARGET_ESCAPES.replace_all(&result, backslash_escape).into_owned(),
    Syntax::Dependency => DEPENDENCY_ESCAPES.replace_all(&result, backslash_escape).into_owned(),
    Syntax::Function => result.replace(',', "$,"),
    Syntax::Shell | Syntax::Clean => result,
  })
}

/// A value destined for the shell: either a single pre-formed line or a list
/// of words quoted individually.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShellValue {
  Line(Fragment),
  Words(Vec<Fragment>),
}

impl ShellValue {
  pub fn words<I, F>(items: I) -> Self
  where
    I: IntoIterator<Item = F>,
    F: Into<Fragment>,
  {
    Self::Words(items.into_iter().map(Into::into).collect())
  }
}

impl From<&str> for ShellValue {
  fn from(text: &str) -> Self {
    Self::Line(Fragment::raw(text))
  }
}

impl From<String> for ShellValue {
  fn from(text: String) -> Self {
    Self::Line(Fragment::Raw(text))
  }
}

impl From<Fragment> for ShellValue {
  fn from(fragment: Fragment) -> Self {
    Self::Line(fragment)
  }
}

impl From<Vec<Fragment>> for ShellValue {
  fn from(words: Vec<Fragment>) -> Self {
    Self::Words(words)
  }
}

/// Accumulates rendered Makefile text.
#[derive(Debug, Default)]
pub struct Writer {
  out: String,
}

impl Writer {
  pub fn new() -> Self {
    Self { out: String::new() }
  }

  pub fn write_literal(&mut self, text: &str) {
    self.out.push_str(text);
  }

  /// Render one fragment.
  ///
  /// Returns whether any part of the output was shell-quoted (or is an
  /// already-escaped literal), which decides whether an enclosing path is
  /// quoted as a whole.
  pub fn write(&mut self, fragment: &Fragment, syntax: Syntax, quote: ShellQuote) -> Result<bool, MakeError> {
    let shelly = syntax.is_shelly();

    match fragment {
      Fragment::Literal(text) => {
        self.write_literal(text);
        Ok(true)
      }
      Fragment::Raw(text) => {
        let (text, escaped) = match quote {
          ShellQuote::Info if shelly => shell::quote_info(text),
          ShellQuote::Escape if shelly => shell::escape(text),
          _ => (text.clone(), false),
        };
        self.write_literal(&escape_str(&text, syntax)?);
        Ok(escaped)
      }
      Fragment::Join(items) => {
        let mut escaped = false;
        for item in items {
          escaped |= self.write(item, syntax, quote)?;
        }
        Ok(escaped)
      }
      Fragment::Entity(Entity::Pattern(pattern)) => self.write(&pattern.to_fragment(), syntax, quote),
      Fragment::Entity(Entity::Variable(var)) => {
        self.write_literal(&var.expand());
        Ok(true)
      }
      Fragment::Entity(Entity::Function(func)) => {
        self.write_literal(&func.expand()?);
        Ok(true)
      }
      Fragment::Path(path) => {
        let mut inner = Writer::new();
        let escaped = inner.write(&realize(path), syntax, ShellQuote::Escape)?;
        let text = inner.into_string();
        if shelly && escaped {
          self.write_literal(&shell::quote_escaped(&text));
        } else {
          self.write_literal(&text);
        }
        Ok(escaped)
      }
    }
  }

  /// Render a list of fragments with `delim` between them.
  ///
  /// `prefix` and `suffix` are only written when the list is non-empty.
  pub fn write_each<'a, I>(
    &mut self,
    items: I,
    syntax: Syntax,
    delim: &str,
    prefix: Option<&str>,
    suffix: Option<&str>,
    quote: ShellQuote,
  ) -> Result<(), MakeError>
  where
    I: IntoIterator<Item = &'a Fragment>,
  {
    let mut any = false;
    for (idx, item) in items.into_iter().enumerate() {
      if idx == 0 {
        if let Some(prefix) = prefix {
          self.write_literal(prefix);
        }
      } else {
        self.write_literal(delim);
      }
      self.write(item, syntax, quote)?;
      any = true;
    }
    if any && let Some(suffix) = suffix {
      self.write_literal(suffix);
    }
    Ok(())
  }

  /// Render a shell value: word lists are quoted per word, lines verbatim.
  pub fn write_shell(&mut self, value: &ShellValue, syntax: Syntax) -> Result<(), MakeError> {
    match value {
      ShellValue::Words(words) => self.write_each(words, syntax, " ", None, None, ShellQuote::Info),
      ShellValue::Line(line) => self.write(line, syntax, ShellQuote::None).map(|_| ()),
    }
  }

  pub fn as_str(&self) -> &str {
    &self.out
  }

  pub fn into_string(self) -> String {
    self.out
  }
}

/// Render a single fragment to text.
pub fn render(fragment: &Fragment, syntax: Syntax, quote: ShellQuote) -> Result<(String, bool), MakeError> {
  let mut out = Writer::new();
  let escaped = out.write(fragment, syntax, quote)?;
  Ok((out.into_string(), escaped))
}

/// Render a word list as a single shell command line.
pub fn render_command(words: &[Fragment]) -> Result<String, MakeError> {
  let mut out = Writer::new();
  out.write_each(words, Syntax::Shell, " ", None, None, ShellQuote::Info)?;
  Ok(out.into_string())
}
