//! Typed Lua tables.
//!
//! Values that need to be told apart from plain tables carry a metatable
//! with a `__type` field:
//!
//! - `file`: `{ path = "..." }`, printable through `__tostring`
//! - `trigger`: `{ kind = "halt" }`
//! - `command`: `{ args = { ... } }`, a structured argument vector

use std::path::{Path, PathBuf};

use mlua::prelude::*;

pub const FILE_TYPE: &str = "file";
pub const TRIGGER_TYPE: &str = "trigger";
pub const COMMAND_TYPE: &str = "command";

/// The `__type` marker of a table, if it has one.
pub fn type_of(table: &LuaTable) -> Option<String> {
  let mt = table.metatable()?;
  mt.get::<Option<String>>("__type").ok().flatten()
}

fn set_marker(lua: &Lua, table: &LuaTable, type_name: &str, tostring: Option<LuaFunction>) -> LuaResult<()> {
  let mt = lua.create_table()?;
  mt.set("__type", type_name)?;
  if let Some(tostring) = tostring {
    mt.set("__tostring", tostring)?;
  }
  table.set_metatable(Some(mt))?;
  Ok(())
}

/// Create a file reference.
pub fn create_file(lua: &Lua, path: &Path) -> LuaResult<LuaTable> {
  let table = lua.create_table()?;
  table.set("path", path.to_string_lossy().into_owned())?;
  let tostring = lua.create_function(|_, t: LuaTable| t.get::<String>("path"))?;
  set_marker(lua, &table, FILE_TYPE, Some(tostring))?;
  Ok(table)
}

/// Path of a file reference, or `None` for any other table.
pub fn file_path(table: &LuaTable) -> LuaResult<Option<PathBuf>> {
  if type_of(table).as_deref() != Some(FILE_TYPE) {
    return Ok(None);
  }
  Ok(Some(PathBuf::from(table.get::<String>("path")?)))
}

/// Create a trigger of the given kind.
pub fn create_trigger(lua: &Lua, kind: &str) -> LuaResult<LuaTable> {
  let table = lua.create_table()?;
  table.set("kind", kind)?;
  let tostring = lua.create_function(|_, t: LuaTable| Ok(format!("trigger:{}", t.get::<String>("kind")?)))?;
  set_marker(lua, &table, TRIGGER_TYPE, Some(tostring))?;
  Ok(table)
}

/// Kind of a trigger, or `None` for any other table.
pub fn trigger_kind(table: &LuaTable) -> LuaResult<Option<String>> {
  if type_of(table).as_deref() != Some(TRIGGER_TYPE) {
    return Ok(None);
  }
  Ok(Some(table.get::<String>("kind")?))
}

/// Create a structured command.
pub fn create_command(lua: &Lua, args: Vec<String>) -> LuaResult<LuaTable> {
  let table = lua.create_table()?;
  table.set("args", lua.create_sequence_from(args)?)?;
  let tostring = lua.create_function(|_, t: LuaTable| {
    let args: Vec<String> = t.get("args")?;
    Ok(args.join(" "))
  })?;
  set_marker(lua, &table, COMMAND_TYPE, Some(tostring))?;
  Ok(table)
}

/// Arguments of a structured command, or `None` for any other table.
pub fn command_args(table: &LuaTable) -> LuaResult<Option<Vec<String>>> {
  if type_of(table).as_deref() != Some(COMMAND_TYPE) {
    return Ok(None);
  }
  Ok(Some(table.get::<Vec<String>>("args")?))
}

/// Whether a plain table is a list: keys are exactly `1..=n`.
pub fn is_sequence(table: &LuaTable) -> LuaResult<bool> {
  if type_of(table).is_some() {
    return Ok(false);
  }
  let len = table.raw_len();
  let mut count = 0usize;
  for pair in table.pairs::<LuaValue, LuaValue>() {
    let (key, _) = pair?;
    match key {
      LuaValue::Integer(i) if i >= 1 && (i as usize) <= len => count += 1,
      _ => return Ok(false),
    }
  }
  Ok(count == len)
}
