//! Run-wide key/value store shared by all directives of one run.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use mlua::prelude::*;

use crate::types::ParamValue;

/// Session store owned by the interpreter and handed to each rule.
#[derive(Debug, Clone, Default)]
pub struct Session {
  inner: Rc<RefCell<BTreeMap<String, ParamValue>>>,
}

impl Session {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<ParamValue> {
    self.inner.borrow().get(key).cloned()
  }

  pub fn put(&self, key: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
    self.inner.borrow_mut().insert(key.into(), value)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.inner.borrow().contains_key(key)
  }

  pub fn remove(&self, key: &str) -> Option<ParamValue> {
    self.inner.borrow_mut().remove(key)
  }

  pub fn len(&self) -> usize {
    self.inner.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.borrow().is_empty()
  }
}

/// Create the `session` table exposed to rule scripts.
pub fn create_session_table(lua: &Lua, session: &Session) -> LuaResult<LuaTable> {
  let table = lua.create_table()?;

  // session.get(key [, default]) - Stored value, or the default
  let s = session.clone();
  table.set(
    "get",
    lua.create_function(move |lua, (key, default): (String, Option<LuaValue>)| match s.get(&key) {
      Some(value) => value.into_lua(lua),
      None => Ok(default.unwrap_or(LuaValue::Nil)),
    })?,
  )?;

  // session.put(key, value) - Store a value
  let s = session.clone();
  table.set(
    "put",
    lua.create_function(move |lua, (key, value): (String, LuaValue)| {
      s.put(key, ParamValue::from_lua(value, lua)?);
      Ok(())
    })?,
  )?;

  // session.contains(key) - Whether a value is stored
  let s = session.clone();
  table.set("contains", lua.create_function(move |_, key: String| Ok(s.contains(&key)))?)?;

  // session.remove(key) - Remove and return a stored value
  let s = session.clone();
  table.set(
    "remove",
    lua.create_function(move |lua, key: String| match s.remove(&key) {
      Some(value) => value.into_lua(lua),
      None => Ok(LuaValue::Nil),
    })?,
  )?;

  Ok(table)
}
