use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("Failed to find matching prefix")]
pub(crate) struct StripPrefixError;

pub(crate) trait PathExt {
  /// Like [Path::strip_prefix], but `.` and `..` are resolved on both
  /// sides first.
  fn strip_resolved_prefix(&self, p: impl AsRef<Path>) -> Result<PathBuf, StripPrefixError>;
}

impl PathExt for Path {
  fn strip_resolved_prefix(&self, p: impl AsRef<Path>) -> Result<PathBuf, StripPrefixError> {
    normalize(self)
      .strip_prefix(normalize(p.as_ref()))
      .map(Path::to_path_buf)
      .map_err(|_| StripPrefixError)
  }
}

/// Resolves `.` and `..` lexically, without touching the filesystem. `..`
/// never climbs above the root.
fn normalize(p: &Path) -> PathBuf {
  let mut out: Vec<Component<'_>> = Vec::new();
  for c in p.components() {
    match c {
      Component::CurDir => (),
      Component::ParentDir => match out.last() {
        Some(Component::Normal(_)) => {
          out.pop();
        }
        Some(Component::RootDir) | Some(Component::Prefix(_)) => (),
        _ => out.push(c),
      },
      c => out.push(c),
    }
  }

  out.iter().collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  #[test_case("/a/b/c", "/a" => Some(String::from("b/c")) ; "good subpath")]
  #[test_case("/a/b/c", "/a/b" => Some(String::from("c")) ; "good subpath 2")]
  #[test_case("/a/b/c/", "/a/b" => Some(String::from("c")) ; "good subpath end slash")]
  #[test_case("/a/b/../c", "/a" => Some(String::from("c")) ; "good subpath backticks")]
  #[test_case("/a/b/c", "/a/b/c" => Some(String::from("")) ; "good subpath equal")]
  #[test_case("/a", "/" => Some(String::from("a")) ; "good subpath root")]
  #[test_case("/a/b/c", "/a/b/c/d" => None ; "bad subpath parent")]
  #[test_case("/b/c", "/a/b/c" => None ; "bad subpath outside")]
  #[test_case("/a/b/cd", "/a/b/c" => None ; "bad subpath prefix")]
  #[test_case("/a/../b", "/a" => None ; "bad subpath backticks")]
  #[test_case("/tmp/_volumes/vol-a/../vol-b", "/tmp/_volumes" => Some(String::from("vol-b")) ; "volume link backticks")]
  #[test_case("/tmp/_volumes/../etc", "/tmp/_volumes" => None ; "volume link escapes root")]
  #[test_case("/tmp/_volumes/a/b/../../vol-c", "/tmp/_volumes" => Some(String::from("vol-c")) ; "consecutive backticks")]
  #[test_case("/../../tmp/_volumes/vol-a", "/tmp/_volumes" => Some(String::from("vol-a")) ; "backticks above root")]
  fn strip_resolved_prefix(full_path: &str, base_path: &str) -> Option<String> {
    let full_path: &Path = full_path.as_ref();
    let base_path: &Path = base_path.as_ref();

    full_path
      .strip_resolved_prefix(base_path)
      .ok()
      .map(|p| (*p.to_string_lossy()).to_owned())
  }
}
