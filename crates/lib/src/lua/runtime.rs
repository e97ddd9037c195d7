use std::path::Path;

use mlua::prelude::*;

/// Base functions copied into every sandbox environment.
const SAFE_GLOBALS: &[&str] = &[
  "assert", "error", "ipairs", "next", "pairs", "pcall", "select", "tonumber", "tostring", "type", "string", "table",
  "math", "utf8",
];

/// Create a Lua state with only the pure standard libraries loaded.
pub fn create_runtime() -> LuaResult<Lua> {
  Lua::new_with(
    LuaStdLib::STRING | LuaStdLib::TABLE | LuaStdLib::MATH | LuaStdLib::UTF8,
    LuaOptions::default(),
  )
}

/// Create an environment table holding only the safe base functions.
///
/// Chunks loaded with this environment cannot reach the state's globals.
pub fn sandbox_env(lua: &Lua) -> LuaResult<LuaTable> {
  let globals = lua.globals();
  let env = lua.create_table()?;
  for name in SAFE_GLOBALS {
    env.set(*name, globals.get::<LuaValue>(*name)?)?;
  }
  Ok(env)
}

/// Load and execute a Lua file inside `env`, returning its result.
pub fn load_file(lua: &Lua, path: &Path, env: LuaTable) -> LuaResult<LuaValue> {
  let canonical_path =
    dunce::canonicalize(path).map_err(|e| LuaError::external(format!("cannot resolve '{}': {}", path.display(), e)))?;
  let content = std::fs::read_to_string(&canonical_path)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", canonical_path.display(), e)))?;

  lua
    .load(&content)
    .set_name(format!("@{}", canonical_path.display()))
    .set_environment(env)
    .eval::<LuaValue>()
}

/// Evaluate a single expression inside `env`.
pub fn eval_expression(lua: &Lua, expression: &str, env: LuaTable) -> LuaResult<LuaValue> {
  lua
    .load(format!("return (\n{expression}\n)"))
    .set_name("=conditional")
    .set_environment(env)
    .eval::<LuaValue>()
}
