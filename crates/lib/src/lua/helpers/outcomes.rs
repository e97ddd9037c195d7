//! Outcome constructors for rule commands.

use mlua::prelude::*;

use crate::lua::markers;
use crate::lua::helpers::text::display;

/// Flatten command pieces into an argument vector.
fn collect_args(value: LuaValue, args: &mut Vec<String>) -> LuaResult<()> {
  match value {
    LuaValue::Nil => Ok(()),
    LuaValue::Table(t) => match markers::type_of(&t).as_deref() {
      None => {
        for item in t.sequence_values::<LuaValue>() {
          collect_args(item?, args)?;
        }
        Ok(())
      }
      Some(markers::COMMAND_TYPE) => {
        args.extend(markers::command_args(&t)?.unwrap_or_default());
        Ok(())
      }
      Some(markers::FILE_TYPE) => {
        args.push(display(&LuaValue::Table(t))?);
        Ok(())
      }
      Some(other) => Err(LuaError::external(format!("command: cannot use a {} as an argument", other))),
    },
    other @ (LuaValue::String(_) | LuaValue::Integer(_) | LuaValue::Number(_)) => {
      args.push(display(&other)?);
      Ok(())
    }
    other => Err(LuaError::external(format!(
      "command: cannot use a {} as an argument",
      other.type_name()
    ))),
  }
}

/// Register `halt` and `command`.
pub fn register(lua: &Lua, env: &LuaTable) -> LuaResult<()> {
  // halt() - Trigger that stops the whole run after this step
  env.set("halt", lua.create_function(|lua, ()| markers::create_trigger(lua, "halt"))?)?;

  // command(...) - Structured argument vector; nested lists are flattened
  env.set(
    "command",
    lua.create_function(|lua, values: LuaMultiValue| {
      let mut args = Vec::new();
      for value in values {
        collect_args(value, &mut args)?;
      }
      if args.is_empty() {
        return Err(LuaError::external("command: no program given"));
      }
      markers::create_command(lua, args)
    })?,
  )?;

  Ok(())
}
