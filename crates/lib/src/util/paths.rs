use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve `.` and `..` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::ParentDir => {
        normalized.pop();
      }
      Component::CurDir => {}
      c => normalized.push(c),
    }
  }
  normalized
}

/// Join `path` onto `base` unless it is already absolute.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    path.to_path_buf()
  } else {
    normalize(&base.join(path))
  }
}

/// Canonical form of a path that may not exist.
///
/// Existing paths are canonicalized. For a missing path the parent is
/// canonicalized and the file name re-joined; if the parent is missing too,
/// the lexically normalized absolute path is returned.
pub fn canonical(path: &Path) -> io::Result<PathBuf> {
  match dunce::canonicalize(path) {
    Ok(canonical) => return Ok(canonical),
    Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
    Err(_) => {}
  }

  let absolute = normalize(&std::path::absolute(path)?);
  if let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name())
    && let Ok(parent) = dunce::canonicalize(parent)
  {
    return Ok(parent.join(name));
  }
  Ok(absolute)
}

/// Canonical directory containing `file`.
pub fn canonical_parent(file: &Path) -> io::Result<PathBuf> {
  let canonical = canonical(file)?;
  Ok(canonical.parent().map(Path::to_path_buf).unwrap_or(canonical))
}
