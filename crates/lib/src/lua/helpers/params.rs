//! Parameter access for rule scripts.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use mlua::Variadic;
use mlua::prelude::*;

use crate::consts::FILE_PARAMETER;
use crate::types::{ParamValue, Parameters};

#[derive(Debug, Default)]
struct BindingsState {
  parameters: Parameters,
  /// Keys `ensure` may set: the declared arguments plus `file`.
  permitted: BTreeSet<String>,
}

/// A directive's parameters as seen by its rule script.
///
/// Shared between the Lua closures of one directive; `ensure` can add
/// defaults for declared arguments the directive left out.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
  inner: Rc<RefCell<BindingsState>>,
}

impl Bindings {
  pub fn new(parameters: Parameters) -> Self {
    Self {
      inner: Rc::new(RefCell::new(BindingsState {
        parameters,
        permitted: BTreeSet::from([FILE_PARAMETER.to_string()]),
      })),
    }
  }

  /// Allow `ensure` to set the given declared arguments.
  pub fn permit<I>(&self, arguments: I)
  where
    I: IntoIterator<Item = String>,
  {
    let mut state = self.inner.borrow_mut();
    state.permitted.extend(arguments);
  }

  pub fn get(&self, key: &str) -> Option<ParamValue> {
    self.inner.borrow().parameters.get(key).cloned()
  }

  pub fn contains(&self, key: &str) -> bool {
    self.inner.borrow().parameters.contains_key(key)
  }

  pub fn parameters(&self) -> Parameters {
    self.inner.borrow().parameters.clone()
  }

  fn ensure(&self, key: String, value: ParamValue) -> LuaResult<()> {
    let mut state = self.inner.borrow_mut();
    if !state.permitted.contains(&key) {
      return Err(LuaError::external(format!(
        "ensure: '{}' is not a declared argument of this rule",
        key
      )));
    }
    state.parameters.entry(key).or_insert(value);
    Ok(())
  }
}

/// Interpret a string as a boolean: `yes/true/1/on` or `no/false/0/off`.
pub fn check_boolean(value: &str) -> Result<bool, String> {
  match value.to_lowercase().as_str() {
    "yes" | "true" | "1" | "on" => Ok(true),
    "no" | "false" | "0" | "off" => Ok(false),
    _ => Err(format!("'{}' is not a valid boolean value", value)),
  }
}

/// Register the parameter helpers into `env`.
pub fn register(lua: &Lua, env: &LuaTable, bindings: &Bindings) -> LuaResult<()> {
  // obtain(key [, default]) - Parameter value, or the default
  let b = bindings.clone();
  env.set(
    "obtain",
    lua.create_function(move |lua, (key, default): (String, LuaMultiValue)| {
      match (b.get(&key), default.into_iter().next()) {
        (Some(value), _) => value.into_lua(lua),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(LuaError::external(format!("obtain: '{}' is not defined", key))),
      }
    })?,
  )?;

  // defined(key) - Whether the parameter is set
  let b = bindings.clone();
  env.set("defined", lua.create_function(move |_, key: String| Ok(b.contains(&key)))?)?;

  // undefined(key) - Whether the parameter is not set
  let b = bindings.clone();
  env.set("undefined", lua.create_function(move |_, key: String| Ok(!b.contains(&key)))?)?;

  // required(k1, ...) - Fail unless every key is set
  let b = bindings.clone();
  env.set(
    "required",
    lua.create_function(move |_, keys: Variadic<String>| {
      match keys.iter().find(|key| !b.contains(key)) {
        Some(key) => Err(LuaError::external(format!("required: '{}' is not defined", key))),
        None => Ok(()),
      }
    })?,
  )?;

  // ensure(key, value) or ensure({keys}, {values}) - Default for unset arguments
  let b = bindings.clone();
  env.set(
    "ensure",
    lua.create_function(move |lua, (keys, values): (LuaValue, LuaValue)| {
      match keys {
        LuaValue::String(key) => b.ensure(key.to_str()?.to_string(), ParamValue::from_lua(values, lua)?),
        LuaValue::Table(keys) => {
          let keys: Vec<String> = keys.sequence_values::<String>().collect::<LuaResult<_>>()?;
          let LuaValue::Table(values) = values else {
            return Err(LuaError::external("ensure: expected a list of values"));
          };
          let values: Vec<LuaValue> = values.sequence_values::<LuaValue>().collect::<LuaResult<_>>()?;
          if keys.len() != values.len() {
            return Err(LuaError::external(format!(
              "ensure: {} keys but {} values",
              keys.len(),
              values.len()
            )));
          }
          for (key, value) in keys.into_iter().zip(values) {
            b.ensure(key, ParamValue::from_lua(value, lua)?)?;
          }
          Ok(())
        }
        other => Err(LuaError::external(format!(
          "ensure: expected a key or a list of keys, got {}",
          other.type_name()
        ))),
      }
    })?,
  )?;

  // check(expected, key [, v1 [, v2]]) - Compare a boolean parameter
  let b = bindings.clone();
  env.set(
    "check",
    lua.create_function(move |lua, (expected, key, values): (bool, String, LuaMultiValue)| {
      let actual = match b.get(&key) {
        None => return Err(LuaError::external(format!("check: '{}' is not defined", key))),
        Some(ParamValue::Boolean(v)) => v,
        Some(ParamValue::String(s)) => check_boolean(&s).map_err(LuaError::external)?,
        Some(_) => {
          return Err(LuaError::external(format!(
            "check: '{}' is neither a boolean nor a string",
            key
          )));
        }
      };
      let matched = expected == actual;
      let mut values = values.into_iter();
      match values.next() {
        None => Ok(LuaValue::Boolean(matched)),
        Some(v1) if matched => Ok(v1),
        Some(_) => match values.next() {
          Some(v2) => Ok(v2),
          None => Ok(LuaValue::String(lua.create_string("")?)),
        },
      }
    })?,
  )?;

  Ok(())
}
