use mlua::prelude::*;
use tracing::debug;

use super::types::{Rule, RuleError, RuleLocation};
use super::validate::{check_identifier, check_version, validate_arguments, validate_commands, validate_header};
use crate::directive::Directive;
use crate::lua::helpers::params::Bindings;
use crate::lua::helpers::session::Session;
use crate::lua::helpers::{FileScope, register_rule_helpers};
use crate::lua::runtime::{load_file, sandbox_env};
use crate::types::Version;

const SCRIPT_KEYS: &[&str] = &["rule", "commands"];

/// Build the environment a rule script runs in.
pub fn rule_env(lua: &Lua, scope: &FileScope, bindings: &Bindings, session: &Session) -> LuaResult<LuaTable> {
  let env = sandbox_env(lua)?;
  register_rule_helpers(lua, &env, scope, bindings, session)?;
  Ok(env)
}

/// Evaluate a rule script and validate it against `directive`.
pub fn load_rule(
  lua: &Lua,
  location: &RuleLocation,
  env: LuaTable,
  directive: &Directive,
  version: Version,
) -> Result<Rule, RuleError> {
  debug!(path = %location.path.display(), "evaluating rule script");
  let value = load_file(lua, &location.path, env).map_err(RuleError::Script)?;

  let LuaValue::Table(script) = value else {
    return Err(RuleError::Malformed(format!(
      "the script must return a table, got {}",
      value.type_name()
    )));
  };

  let mut extra = Vec::new();
  for pair in script.pairs::<LuaValue, LuaValue>() {
    let (key, _) = pair.map_err(RuleError::Script)?;
    match &key {
      LuaValue::String(s) if SCRIPT_KEYS.iter().any(|k| k.as_bytes() == &*s.as_bytes()) => {}
      other => extra.push(other.to_string().unwrap_or_else(|_| other.type_name().to_string())),
    }
  }
  if !extra.is_empty() {
    extra.sort();
    return Err(RuleError::Malformed(format!(
      "unexpected top-level keys: {}",
      extra.join(", ")
    )));
  }

  let header = validate_header(script.raw_get("rule").map_err(RuleError::Script)?)?;
  check_identifier(&header, location)?;
  check_version(&header, version)?;
  validate_arguments(&header, &directive.parameters, &directive.line_numbers)?;
  let commands = validate_commands(script.raw_get("commands").map_err(RuleError::Script)?)?;

  Ok(Rule {
    location: location.clone(),
    header,
    commands,
  })
}
