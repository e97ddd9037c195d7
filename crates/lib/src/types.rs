use std::collections::BTreeMap;
use std::fmt;

use mlua::prelude::*;
use serde::{Deserialize, Serialize};

use crate::lua::markers;

/// Directive parameters, keyed by name.
pub type Parameters = BTreeMap<String, ParamValue>;

/// A typed parameter value as written in a directive or stored in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
  Boolean(bool),
  Number(f64),
  String(String),
  List(Vec<ParamValue>),
}

impl ParamValue {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      ParamValue::String(s) => Some(s),
      _ => None,
    }
  }
}

impl From<&str> for ParamValue {
  fn from(value: &str) -> Self {
    ParamValue::String(value.to_string())
  }
}

impl From<String> for ParamValue {
  fn from(value: String) -> Self {
    ParamValue::String(value)
  }
}

impl fmt::Display for ParamValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ParamValue::Boolean(b) => write!(f, "{b}"),
      ParamValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
      ParamValue::Number(n) => write!(f, "{n}"),
      ParamValue::String(s) => f.write_str(s),
      ParamValue::List(items) => {
        let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(" "))
      }
    }
  }
}

impl IntoLua for ParamValue {
  fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
    match self {
      ParamValue::Boolean(b) => Ok(LuaValue::Boolean(b)),
      ParamValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Ok(LuaValue::Integer(n as i64)),
      ParamValue::Number(n) => Ok(LuaValue::Number(n)),
      ParamValue::String(s) => Ok(LuaValue::String(lua.create_string(&s)?)),
      ParamValue::List(items) => Ok(LuaValue::Table(lua.create_sequence_from(items)?)),
    }
  }
}

impl FromLua for ParamValue {
  fn from_lua(value: LuaValue, lua: &Lua) -> LuaResult<Self> {
    match value {
      LuaValue::Boolean(b) => Ok(ParamValue::Boolean(b)),
      LuaValue::Integer(i) => Ok(ParamValue::Number(i as f64)),
      LuaValue::Number(n) => Ok(ParamValue::Number(n)),
      LuaValue::String(s) => Ok(ParamValue::String(s.to_str()?.to_string())),
      LuaValue::Table(t) => {
        if let Some(path) = markers::file_path(&t)? {
          return Ok(ParamValue::String(path.to_string_lossy().into_owned()));
        }
        t.sequence_values::<LuaValue>()
          .map(|v| v.and_then(|v| ParamValue::from_lua(v, lua)))
          .collect::<LuaResult<Vec<_>>>()
          .map(ParamValue::List)
      }
      other => Err(LuaError::external(format!(
        "cannot store a {} as a parameter value",
        other.type_name()
      ))),
    }
  }
}

/// Application or rule version, a decimal such as `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub f64);

impl Default for Version {
  fn default() -> Self {
    Version(crate::consts::APP_VERSION)
  }
}

impl fmt::Display for Version {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:.1}", self.0)
  }
}
