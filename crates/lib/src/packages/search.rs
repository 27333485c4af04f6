//! Filesystem lookups for the path-search strategy.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::packages::{PackageError, PackageKind};
use crate::platform::Platform;
use crate::toolchain::{Flavor, LibraryKind};

/// Drop duplicates and directories that do not exist, keeping first-seen
/// order.
pub fn existing_unique(dirs: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
  let mut seen = HashSet::new();
  dirs
    .into_iter()
    .filter(|dir| seen.insert(dir.clone()))
    .filter(|dir| dir.is_dir())
    .collect()
}

/// Fail unless `dir` is absolute; relative roots are ambiguous against the
/// build directory.
pub fn require_absolute(dir: &Path) -> Result<(), PackageError> {
  if dir.is_absolute() {
    Ok(())
  } else {
    Err(PackageError::NotAbsolute {
      path: dir.display().to_string(),
    })
  }
}

/// The first of `dirs` containing `name`.
pub fn find_header(name: &str, dirs: &[PathBuf]) -> Result<Option<PathBuf>, PackageError> {
  for dir in dirs {
    require_absolute(dir)?;
    if dir.join(name).exists() {
      return Ok(Some(dir.clone()));
    }
  }
  Ok(None)
}

/// File names a library may have on `target`, most preferred first.
pub fn library_candidates(
  name: &str,
  kind: PackageKind,
  target: &Platform,
  flavor: Flavor,
) -> Vec<(String, LibraryKind)> {
  if flavor == Flavor::Msvc {
    // Static library or import library; only the linker knows.
    return vec![(format!("{name}.lib"), LibraryKind::Unknown)];
  }

  let mut names = Vec::new();
  if kind.allows_shared() {
    let shared = format!("lib{name}{}", target.shared_library_ext());
    if target.has_import_library() {
      names.push((format!("{shared}.a"), LibraryKind::Unknown));
    } else {
      names.push((shared, LibraryKind::Shared));
    }
  }
  if kind.allows_static() {
    names.push((format!("lib{name}.a"), LibraryKind::Static));
  }
  if target.family() == "windows" {
    names.push((format!("{name}.lib"), LibraryKind::Unknown));
  }
  names
}

/// The first candidate found, trying every candidate in one directory before
/// moving to the next.
pub fn find_library(
  candidates: &[(String, LibraryKind)],
  dirs: &[PathBuf],
) -> Result<Option<(PathBuf, LibraryKind)>, PackageError> {
  for dir in dirs {
    require_absolute(dir)?;
    for (file, kind) in candidates {
      let path = dir.join(file);
      if path.exists() {
        return Ok(Some((path, *kind)));
      }
    }
  }
  Ok(None)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  use crate::platform::{Arch, Os};

  #[test]
  fn existing_unique_keeps_order_and_drops_missing() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let dirs = existing_unique([
      b.path().to_path_buf(),
      a.path().join("missing"),
      a.path().to_path_buf(),
      b.path().to_path_buf(),
    ]);
    assert_eq!(dirs, vec![b.path().to_path_buf(), a.path().to_path_buf()]);
  }

  #[test]
  fn relative_search_dirs_fail_fast() {
    let err = find_header("zlib.h", &[PathBuf::from("include")]).unwrap_err();
    assert!(matches!(err, PackageError::NotAbsolute { ref path } if path == "include"));
  }

  #[test]
  fn first_directory_with_header_wins() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    fs::create_dir_all(second.path().join("boost")).unwrap();
    fs::write(second.path().join("boost/version.hpp"), "").unwrap();
    fs::write(first.path().join("other.h"), "").unwrap();

    let dirs = [first.path().to_path_buf(), second.path().to_path_buf()];
    assert_eq!(find_header("boost/version.hpp", &dirs).unwrap(), Some(second.path().to_path_buf()));
    assert_eq!(find_header("nothing.h", &dirs).unwrap(), None);
  }

  #[test]
  fn candidates_per_platform() {
    let linux = Platform::new(Arch::X86_64, Os::Linux);
    assert_eq!(
      library_candidates("z", PackageKind::Any, &linux, Flavor::Cc),
      vec![
        ("libz.so".to_string(), LibraryKind::Shared),
        ("libz.a".to_string(), LibraryKind::Static),
      ]
    );

    let mingw = Platform::new(Arch::X86_64, Os::Windows);
    assert_eq!(
      library_candidates("z", PackageKind::Shared, &mingw, Flavor::Cc),
      vec![
        ("libz.dll.a".to_string(), LibraryKind::Unknown),
        ("z.lib".to_string(), LibraryKind::Unknown),
      ]
    );

    assert_eq!(
      library_candidates("z", PackageKind::Static, &mingw, Flavor::Msvc),
      vec![("z.lib".to_string(), LibraryKind::Unknown)]
    );
  }

  #[test]
  fn shared_preferred_within_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("libz.a"), "").unwrap();
    fs::write(dir.path().join("libz.so"), "").unwrap();

    let linux = Platform::new(Arch::X86_64, Os::Linux);
    let candidates = library_candidates("z", PackageKind::Any, &linux, Flavor::Cc);
    let found = find_library(&candidates, &[dir.path().to_path_buf()]).unwrap();
    assert_eq!(found, Some((dir.path().join("libz.so"), LibraryKind::Shared)));

    let candidates = library_candidates("z", PackageKind::Static, &linux, Flavor::Cc);
    let found = find_library(&candidates, &[dir.path().to_path_buf()]).unwrap();
    assert_eq!(found, Some((dir.path().join("libz.a"), LibraryKind::Static)));
  }
}
