//! String, selection and platform helpers.

use mlua::prelude::*;

use crate::lua::markers;
use crate::platform::OsFamily;

/// Render a value the way Lua's `tostring` does, honouring `__tostring`.
pub fn display(value: &LuaValue) -> LuaResult<String> {
  match value {
    LuaValue::Nil => Ok(String::new()),
    other => other.to_string(),
  }
}

fn empty_string(lua: &Lua) -> LuaResult<LuaValue> {
  Ok(LuaValue::String(lua.create_string("")?))
}

fn os_matches(name: &str) -> LuaResult<bool> {
  let family: OsFamily = name.parse().map_err(LuaError::external)?;
  Ok(family.is_current())
}

/// Register the text helpers shared by conditionals and rules.
pub fn register(lua: &Lua, env: &LuaTable) -> LuaResult<()> {
  // conditional(op, v1 [, v2]) - v1 when op holds, otherwise v2 (or "")
  env.set(
    "conditional",
    lua.create_function(|lua, (op, v1, v2): (LuaValue, LuaValue, Option<LuaValue>)| {
      let LuaValue::Boolean(op) = op else {
        return Err(LuaError::external(format!(
          "conditional: expected a boolean operation, got {}",
          op.type_name()
        )));
      };
      if op {
        Ok(v1)
      } else {
        v2.map_or_else(|| empty_string(lua), Ok)
      }
    })?,
  )?;

  // build(...) - Join the non-empty string forms of the values with a space
  env.set(
    "build",
    lua.create_function(|_, values: LuaMultiValue| {
      let mut parts = Vec::new();
      for value in values.iter() {
        let text = display(value)?;
        if !text.is_empty() {
          parts.push(text);
        }
      }
      Ok(parts.join(" "))
    })?,
  )?;

  // quote(value) - Enclose the value in double quotes
  env.set(
    "quote",
    lua.create_function(|_, value: LuaValue| Ok(format!("\"{}\"", display(&value)?)))?,
  )?;

  // empty(s) - Whether the value is nil or the empty string
  env.set(
    "empty",
    lua.create_function(|_, value: LuaValue| {
      Ok(match &value {
        LuaValue::Nil => true,
        LuaValue::String(s) => s.as_bytes().is_empty(),
        _ => false,
      })
    })?,
  )?;

  // operatingsystem(name [, v1 [, v2]]) - OS-family match, or a selection on it
  env.set(
    "operatingsystem",
    lua.create_function(|lua, (name, values): (String, LuaMultiValue)| {
      let matched = os_matches(&name)?;
      let mut values = values.into_iter();
      match values.next() {
        None => Ok(LuaValue::Boolean(matched)),
        Some(v1) if matched => Ok(v1),
        Some(_) => values.next().map_or_else(|| empty_string(lua), Ok),
      }
    })?,
  )?;

  Ok(())
}

/// Register `replicate`, which only rules get.
pub fn register_replicate(lua: &Lua, env: &LuaTable) -> LuaResult<()> {
  // replicate(pattern, values) - Apply a `%s` pattern to each value
  env.set(
    "replicate",
    lua.create_function(|lua, (pattern, values): (String, LuaValue)| {
      let items: Vec<LuaValue> = match values {
        LuaValue::Table(t) if markers::type_of(&t).is_none() => {
          t.sequence_values::<LuaValue>().collect::<LuaResult<_>>()?
        }
        other => vec![other],
      };
      if !pattern.contains("%s") {
        return Err(LuaError::external(format!(
          "replicate: pattern '{}' has no '%s' placeholder",
          pattern
        )));
      }
      let result = items
        .iter()
        .map(|item| Ok(pattern.replace("%s", &display(item)?)))
        .collect::<LuaResult<Vec<String>>>()?;
      lua.create_sequence_from(result)
    })?,
  )?;

  Ok(())
}
