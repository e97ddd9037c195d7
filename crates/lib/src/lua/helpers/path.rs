//! File predicates and path helpers.

use std::path::{Path, PathBuf};

use mlua::prelude::*;
use regex::Regex;

use super::FileScope;
use crate::lua::markers;

/// Resolve a file-predicate argument.
///
/// A string is an extension of the current file; a file reference is used
/// as-is.
fn target(scope: &FileScope, value: &LuaValue) -> LuaResult<PathBuf> {
  match value {
    LuaValue::String(s) => Ok(scope.with_extension(&s.to_str()?)),
    LuaValue::Table(t) => markers::file_path(t)?
      .map(|p| scope.resolve(&p))
      .ok_or_else(|| LuaError::external("expected an extension or a file reference")),
    other => Err(LuaError::external(format!(
      "expected an extension or a file reference, got {}",
      other.type_name()
    ))),
  }
}

/// Resolve a path argument: a path string or a file reference.
fn path_arg(scope: &FileScope, value: &LuaValue) -> LuaResult<PathBuf> {
  match value {
    LuaValue::String(s) => Ok(scope.resolve(Path::new(&*s.to_str()?))),
    LuaValue::Table(t) => markers::file_path(t)?
      .map(|p| scope.resolve(&p))
      .ok_or_else(|| LuaError::external("expected a path or a file reference")),
    other => Err(LuaError::external(format!(
      "expected a path or a file reference, got {}",
      other.type_name()
    ))),
  }
}

fn existing_file(scope: &FileScope, value: &LuaValue, helper: &str) -> LuaResult<PathBuf> {
  let path = path_arg(scope, value)?;
  if !path.is_file() {
    return Err(LuaError::external(format!(
      "{}: '{}' is not a file",
      helper,
      path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
    )));
  }
  Ok(path)
}

fn changed(scope: &FileScope, value: &LuaValue) -> LuaResult<bool> {
  let path = target(scope, value)?;
  scope.cache.has_changed(&path).map_err(LuaError::external)
}

/// Register the file helpers into `env`.
pub fn register(lua: &Lua, env: &LuaTable, scope: &FileScope) -> LuaResult<()> {
  // exists(ext | file) - Whether the file exists
  let s = scope.clone();
  env.set(
    "exists",
    lua.create_function(move |_, value: LuaValue| Ok(target(&s, &value)?.exists()))?,
  )?;

  // missing(ext | file) - Whether the file does not exist
  let s = scope.clone();
  env.set(
    "missing",
    lua.create_function(move |_, value: LuaValue| Ok(!target(&s, &value)?.exists()))?,
  )?;

  // changed(ext | file) - Whether the file changed since the last query
  let s = scope.clone();
  env.set(
    "changed",
    lua.create_function(move |_, value: LuaValue| changed(&s, &value))?,
  )?;

  // unchanged(ext | file) - Negation of changed
  let s = scope.clone();
  env.set(
    "unchanged",
    lua.create_function(move |_, value: LuaValue| Ok(!changed(&s, &value)?))?,
  )?;

  // contains(ext | file, regex) - Whether the file's text matches the regex
  let s = scope.clone();
  env.set(
    "contains",
    lua.create_function(move |_, (value, pattern): (LuaValue, String)| {
      let path = target(&s, &value)?;
      let bytes = std::fs::read(&path)
        .map_err(|e| LuaError::external(format!("cannot read '{}': {}", path.display(), e)))?;
      let regex = Regex::new(&pattern).map_err(LuaError::external)?;
      Ok(regex.is_match(&String::from_utf8_lossy(&bytes)))
    })?,
  )?;

  // file(path) - Create a file reference
  let s = scope.clone();
  env.set(
    "file",
    lua.create_function(move |lua, path: String| markers::create_file(lua, &s.resolve(Path::new(&path))))?,
  )?;

  // reference() - File reference to the reference file
  let s = scope.clone();
  env.set(
    "reference",
    lua.create_function(move |lua, ()| markers::create_file(lua, &s.reference))?,
  )?;

  // filename(file) - Last component of the path
  let s = scope.clone();
  env.set(
    "filename",
    lua.create_function(move |_, value: LuaValue| {
      let path = path_arg(&s, &value)?;
      Ok(
        path
          .file_name()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  // basename(file) - File name without its last extension
  let s = scope.clone();
  env.set(
    "basename",
    lua.create_function(move |_, value: LuaValue| {
      let path = existing_file(&s, &value, "basename")?;
      Ok(
        path
          .file_stem()
          .map(|n| n.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  // filetype(file) - Last extension, without the dot
  let s = scope.clone();
  env.set(
    "filetype",
    lua.create_function(move |_, value: LuaValue| {
      let path = existing_file(&s, &value, "filetype")?;
      Ok(
        path
          .extension()
          .map(|e| e.to_string_lossy().into_owned())
          .unwrap_or_default(),
      )
    })?,
  )?;

  Ok(())
}
