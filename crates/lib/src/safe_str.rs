//! Escaping-deferred string fragments.
//!
//! A [`Fragment`] records *what* a piece of build-file text is (already
//! escaped, raw user text, a path, a named entity) without deciding *how* it
//! is escaped. Only the writer for a concrete syntax context turns fragments
//! into text, so code assembling command lines never has to know the escaping
//! rules of the output format.

use std::ops::Add;

use crate::make::entity::Entity;
use crate::path::BuildPath;

/// A composable piece of output text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fragment {
  /// Pre-escaped text, emitted verbatim.
  Literal(String),
  /// Text that is escaped for whatever context it is rendered in.
  Raw(String),
  /// A rooted path, realized against the backend's path variables.
  Path(BuildPath),
  /// A named, reusable symbol (variable, function call, pattern).
  Entity(Entity),
  /// Ordered concatenation of fragments.
  Join(Vec<Fragment>),
}

impl Fragment {
  pub fn literal(text: impl Into<String>) -> Self {
    Self::Literal(text.into())
  }

  pub fn raw(text: impl Into<String>) -> Self {
    Self::Raw(text.into())
  }

  /// Concatenate two fragments, flattening nested joins.
  ///
  /// Flattening keeps `(a + b) + c` and `a + (b + c)` structurally equal.
  pub fn concat(self, rhs: impl Into<Fragment>) -> Self {
    match (self, rhs.into()) {
      (Self::Join(mut lhs), Self::Join(rhs)) => {
        lhs.extend(rhs);
        Self::Join(lhs)
      }
      (Self::Join(mut lhs), rhs) => {
        lhs.push(rhs);
        Self::Join(lhs)
      }
      (lhs, Self::Join(mut rhs)) => {
        rhs.insert(0, lhs);
        Self::Join(rhs)
      }
      (lhs, rhs) => Self::Join(vec![lhs, rhs]),
    }
  }

  /// True for fragments that render to nothing in every context.
  pub fn is_empty(&self) -> bool {
    match self {
      Self::Literal(s) | Self::Raw(s) => s.is_empty(),
      Self::Join(items) => items.iter().all(Fragment::is_empty),
      Self::Path(_) | Self::Entity(_) => false,
    }
  }
}

impl Add for Fragment {
  type Output = Fragment;

  fn add(self, rhs: Fragment) -> Fragment {
    self.concat(rhs)
  }
}

impl Add<&str> for Fragment {
  type Output = Fragment;

  fn add(self, rhs: &str) -> Fragment {
    self.concat(Fragment::raw(rhs))
  }
}

impl From<&str> for Fragment {
  fn from(text: &str) -> Self {
    Self::Raw(text.to_string())
  }
}

impl From<String> for Fragment {
  fn from(text: String) -> Self {
    Self::Raw(text)
  }
}

impl From<&String> for Fragment {
  fn from(text: &String) -> Self {
    Self::Raw(text.clone())
  }
}

impl From<BuildPath> for Fragment {
  fn from(path: BuildPath) -> Self {
    Self::Path(path)
  }
}

impl From<Entity> for Fragment {
  fn from(entity: Entity) -> Self {
    Self::Entity(entity)
  }
}

/// Join fragments with a delimiter between each pair.
pub fn join<I, F>(items: I, delim: Fragment) -> Fragment
where
  I: IntoIterator<Item = F>,
  F: Into<Fragment>,
{
  let mut out = Vec::new();
  for (idx, item) in items.into_iter().enumerate() {
    if idx > 0 {
      out.push(delim.clone());
    }
    out.push(item.into());
  }
  Fragment::Join(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn concat_flattens_joins() {
    let a = Fragment::raw("a");
    let b = Fragment::literal("b");
    let c = Fragment::raw("c");

    let left = (a.clone() + b.clone()) + c.clone();
    let right = a + (b + c);
    assert_eq!(left, right);
    assert!(matches!(left, Fragment::Join(ref items) if items.len() == 3));
  }

  #[test]
  fn join_interleaves_delimiter() {
    let joined = join(["x", "y", "z"], Fragment::literal(","));
    assert_eq!(
      joined,
      Fragment::Join(vec![
        Fragment::raw("x"),
        Fragment::literal(","),
        Fragment::raw("y"),
        Fragment::literal(","),
        Fragment::raw("z"),
      ])
    );
  }

  #[test]
  fn empty_detection() {
    assert!(Fragment::raw("").is_empty());
    assert!(Fragment::Join(vec![Fragment::literal(""), Fragment::raw("")]).is_empty());
    assert!(!Fragment::from(BuildPath::builddir("")).is_empty());
  }
}
