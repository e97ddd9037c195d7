use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::{RuleError, RuleLocation};
use crate::consts::RULE_EXTENSION;
use crate::util::paths::resolve_against;

/// Finds rule scripts across the configured rule paths.
#[derive(Debug, Clone)]
pub struct RuleResolver {
  search: Vec<PathBuf>,
}

impl RuleResolver {
  /// Relative rule paths are resolved against `base_dir`, the reference
  /// file's directory.
  pub fn new(rule_paths: &[PathBuf], base_dir: &Path) -> Self {
    Self {
      search: rule_paths.iter().map(|p| resolve_against(base_dir, p)).collect(),
    }
  }

  /// Directories searched, in order.
  pub fn search_paths(&self) -> &[PathBuf] {
    &self.search
  }

  /// Locate `<identifier>.lua`; the first directory holding it wins.
  pub fn resolve(&self, identifier: &str) -> Result<RuleLocation, RuleError> {
    let not_found = || RuleError::NotFound {
      identifier: identifier.to_string(),
      searched: self.search.clone(),
    };

    // Identifiers name files, never paths.
    if identifier.is_empty() || identifier.contains(['/', '\\']) || identifier.starts_with('.') {
      return Err(not_found());
    }

    let file_name = format!("{identifier}.{RULE_EXTENSION}");
    for dir in &self.search {
      let candidate = dir.join(&file_name);
      debug!(path = %candidate.display(), "looking for rule");
      if candidate.is_file() {
        return Ok(RuleLocation {
          identifier: identifier.to_string(),
          path: candidate,
        });
      }
    }

    Err(not_found())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  #[test]
  fn first_match_wins() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("first");
    let second = temp.path().join("second");
    fs::create_dir_all(&first).unwrap();
    fs::create_dir_all(&second).unwrap();
    fs::write(second.join("compile.lua"), "").unwrap();
    fs::write(second.join("clean.lua"), "").unwrap();
    fs::write(first.join("clean.lua"), "").unwrap();

    let resolver = RuleResolver::new(&[first.clone(), second.clone()], temp.path());
    assert_eq!(resolver.resolve("compile").unwrap().path, second.join("compile.lua"));
    assert_eq!(resolver.resolve("clean").unwrap().path, first.join("clean.lua"));
  }

  #[test]
  fn relative_paths_use_base_dir() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("rules")).unwrap();
    fs::write(temp.path().join("rules/compile.lua"), "").unwrap();

    let resolver = RuleResolver::new(&[PathBuf::from("./rules")], temp.path());
    assert_eq!(
      resolver.resolve("compile").unwrap().path,
      temp.path().join("rules").join("compile.lua")
    );
  }

  #[test]
  fn not_found_lists_searched_paths() {
    let temp = TempDir::new().unwrap();
    let resolver = RuleResolver::new(&[PathBuf::from("a"), PathBuf::from("/abs/b")], temp.path());

    match resolver.resolve("ghost").unwrap_err() {
      RuleError::NotFound { identifier, searched } => {
        assert_eq!(identifier, "ghost");
        assert_eq!(searched, vec![temp.path().join("a"), PathBuf::from("/abs/b")]);
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn path_like_identifiers_are_rejected() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("x.lua"), "").unwrap();
    let resolver = RuleResolver::new(&[temp.path().join("rules")], temp.path());
    assert!(resolver.resolve("../x").is_err());
  }
}
