//! POSIX shell quoting, escaping and word splitting.
//!
//! The Makefile writer uses [`quote_info`] and [`escape`] to decide whether a
//! word needs single quotes in a recipe, and the environment layer uses
//! [`split`] to turn flag variables such as `CFLAGS` into argument lists.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static UNSAFE_CHARS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[^\w@%+=:,./-]").expect("shell character class is a valid regex"));

/// Errors produced while splitting a shell string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShellError {
  #[error("unterminated quote in '{0}'")]
  UnterminatedQuote(String),

  #[error("trailing backslash in '{0}'")]
  TrailingBackslash(String),
}

/// Escape embedded single quotes so `word` can sit inside `'...'`.
///
/// Returns the escaped text and whether the word needs quoting at all.
pub fn escape(word: &str) -> (String, bool) {
  if word.is_empty() {
    return (String::new(), false);
  }
  let escaped = word.replace('\'', r#"'"'"'"#);
  let needs_quote = UNSAFE_CHARS.is_match(&escaped);
  (escaped, needs_quote)
}

/// Wrap already-escaped text in single quotes.
pub fn quote_escaped(escaped: &str) -> String {
  format!("'{}'", escaped)
}

/// Quote `word` only if the shell would otherwise misread it.
///
/// The boolean reports whether quoting was applied.
pub fn quote_info(word: &str) -> (String, bool) {
  if word.is_empty() {
    return ("''".to_string(), true);
  }
  let (escaped, needs_quote) = escape(word);
  if needs_quote {
    (quote_escaped(&escaped), true)
  } else {
    (word.to_string(), false)
  }
}

/// Quote `word` for a POSIX shell if required.
pub fn quote(word: &str) -> String {
  quote_info(word).0
}

/// Join words into a single command line, quoting where needed.
pub fn join<S: AsRef<str>>(words: &[S]) -> String {
  words.iter().map(|w| quote(w.as_ref())).collect::<Vec<_>>().join(" ")
}

/// Split a string into words using POSIX shell rules.
///
/// Handles single quotes, double quotes (with `\` escapes for `"`, `\`, `$`
/// and `` ` ``) and backslash escapes outside quotes. No expansion is
/// performed.
pub fn split(line: &str) -> Result<Vec<String>, ShellError> {
  let mut words = Vec::new();
  let mut current = String::new();
  let mut in_word = false;
  let mut chars = line.chars();

  while let Some(c) = chars.next() {
    match c {
      c if c.is_whitespace() => {
        if in_word {
          words.push(std::mem::take(&mut current));
          in_word = false;
        }
      }
      '\'' => {
        in_word = true;
        loop {
          match chars.next() {
            Some('\'') => break,
            Some(c) => current.push(c),
            None => return Err(ShellError::UnterminatedQuote(line.to_string())),
          }
        }
      }
      '"' => {
        in_word = true;
        loop {
          match chars.next() {
            Some('"') => break,
            Some('\\') => match chars.next() {
              Some(c @ ('"' | '\\' | '$' | '`')) => current.push(c),
              Some('\n') => {}
              Some(c) => {
                current.push('\\');
                current.push(c);
              }
              None => return Err(ShellError::UnterminatedQuote(line.to_string())),
            },
            Some(c) => current.push(c),
            None => return Err(ShellError::UnterminatedQuote(line.to_string())),
          }
        }
      }
      '\\' => match chars.next() {
        Some('\n') => {}
        Some(c) => {
          in_word = true;
          current.push(c);
        }
        None => return Err(ShellError::TrailingBackslash(line.to_string())),
      },
      c => {
        in_word = true;
        current.push(c);
      }
    }
  }

  if in_word {
    words.push(current);
  }
  Ok(words)
}
