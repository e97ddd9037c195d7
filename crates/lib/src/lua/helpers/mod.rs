//! Capability sets exposed to rule scripts and conditional expressions.
//!
//! Each capability is a Lua function bound over the directive's
//! [`FileScope`]. Conditionals get the file and text helpers only; rules
//! additionally get parameter access, the session and outcome constructors.

pub mod outcomes;
pub mod params;
pub mod path;
pub mod session;
pub mod text;

use std::io;
use std::path::{Path, PathBuf};

use mlua::prelude::*;

use crate::cache::ChangeCache;
use crate::util::paths;

/// Files a directive's helpers operate on.
#[derive(Debug, Clone)]
pub struct FileScope {
  /// File the directive operates on, resolved against `base_dir`.
  pub current: PathBuf,
  /// The build's reference file.
  pub reference: PathBuf,
  /// Canonical directory of the reference file.
  pub base_dir: PathBuf,
  pub cache: ChangeCache,
}

impl FileScope {
  pub fn new(reference: &Path, current: &Path, cache: ChangeCache) -> io::Result<Self> {
    let base_dir = paths::canonical_parent(reference)?;
    Ok(Self {
      current: paths::resolve_against(&base_dir, current),
      reference: paths::canonical(reference)?,
      base_dir,
      cache,
    })
  }

  /// Resolve a user-supplied path against the reference directory.
  pub fn resolve(&self, path: &Path) -> PathBuf {
    paths::resolve_against(&self.base_dir, path)
  }

  /// Sibling of the current file with another extension.
  pub fn with_extension(&self, extension: &str) -> PathBuf {
    let stem = self
      .current
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_default();
    let name = format!("{}.{}", stem, extension.trim_start_matches('.'));
    match self.current.parent() {
      Some(parent) => parent.join(name),
      None => self.base_dir.join(name),
    }
  }
}

/// Register the conditional capability set into `env`.
pub fn register_conditional_helpers(lua: &Lua, env: &LuaTable, scope: &FileScope) -> LuaResult<()> {
  path::register(lua, env, scope)?;
  text::register(lua, env)?;
  Ok(())
}

/// Register the rule capability set into `env`.
pub fn register_rule_helpers(
  lua: &Lua,
  env: &LuaTable,
  scope: &FileScope,
  bindings: &params::Bindings,
  session: &session::Session,
) -> LuaResult<()> {
  register_conditional_helpers(lua, env, scope)?;
  params::register(lua, env, bindings)?;
  text::register_replicate(lua, env)?;
  env.set("session", session::create_session_table(lua, session)?)?;
  outcomes::register(lua, env)?;
  Ok(())
}
