//! Conversion of command results into outcomes.

use std::fmt;

use mlua::prelude::*;

use super::types::InterpreterError;
use crate::lua::markers;
use crate::process::CommandLine;

/// Signals that change run-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
  Halt,
}

impl fmt::Display for TriggerKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TriggerKind::Halt => f.write_str("halt"),
    }
  }
}

/// What one command result asks the interpreter to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  Boolean(bool),
  Trigger(TriggerKind),
  Process(CommandLine),
}

/// Plain-table list items, keeping `nil` holes; `None` if the table is not a list.
fn list_items(table: &LuaTable) -> LuaResult<Option<Vec<LuaValue>>> {
  if markers::type_of(table).is_some() {
    return Ok(None);
  }
  let len = table.raw_len();
  for pair in table.pairs::<LuaValue, LuaValue>() {
    let (key, _) = pair?;
    match key {
      LuaValue::Integer(i) if i >= 1 && (i as usize) <= len => {}
      _ => return Ok(None),
    }
  }
  let mut items = Vec::with_capacity(len);
  for index in 1..=len {
    items.push(table.raw_get::<LuaValue>(index)?);
  }
  Ok(Some(items))
}

/// Flatten nested lists into one ordered sequence of raw results.
///
/// Only list structure is inspected here; each item is converted by
/// [`Outcome::convert`] right before it runs.
pub fn flatten(value: LuaValue) -> LuaResult<Vec<LuaValue>> {
  let mut out = Vec::new();
  flatten_into(value, &mut out)?;
  Ok(out)
}

fn flatten_into(value: LuaValue, out: &mut Vec<LuaValue>) -> LuaResult<()> {
  if let LuaValue::Table(table) = &value
    && let Some(items) = list_items(table)?
  {
    for item in items {
      flatten_into(item, out)?;
    }
    return Ok(());
  }
  out.push(value);
  Ok(())
}

impl Outcome {
  /// Convert one raw result of `command`. `None` means the result is empty and is skipped.
  pub fn convert(value: LuaValue, command: &str) -> Result<Option<Outcome>, InterpreterError> {
    let unsupported = |found: String| InterpreterError::UnsupportedOutcome {
      command: command.to_string(),
      found,
    };

    let line = |text: String| {
      if text.is_empty() {
        None
      } else {
        Some(Outcome::Process(CommandLine::Line(text)))
      }
    };

    match value {
      LuaValue::Nil => Err(InterpreterError::NullOutcome {
        command: command.to_string(),
      }),
      LuaValue::Boolean(b) => Ok(Some(Outcome::Boolean(b))),
      LuaValue::String(s) => Ok(line(s.to_string_lossy())),
      LuaValue::Integer(i) => Ok(line(i.to_string())),
      LuaValue::Number(n) => Ok(line(n.to_string())),
      LuaValue::Table(table) => match markers::type_of(&table).as_deref() {
        Some(markers::TRIGGER_TYPE) => {
          let kind = markers::trigger_kind(&table).map_err(InterpreterError::Script)?;
          match kind.as_deref() {
            Some("halt") => Ok(Some(Outcome::Trigger(TriggerKind::Halt))),
            other => Err(unsupported(format!("trigger '{}'", other.unwrap_or_default()))),
          }
        }
        Some(markers::COMMAND_TYPE) => {
          let args = markers::command_args(&table)
            .map_err(InterpreterError::Script)?
            .unwrap_or_default();
          if args.is_empty() {
            Ok(None)
          } else {
            Ok(Some(Outcome::Process(CommandLine::Args(args))))
          }
        }
        Some(markers::FILE_TYPE) => {
          let path = markers::file_path(&table)
            .map_err(InterpreterError::Script)?
            .unwrap_or_default();
          Ok(line(path.to_string_lossy().into_owned()))
        }
        Some(other) => Err(unsupported(other.to_string())),
        None => Err(unsupported("table that is not a list".to_string())),
      },
      other => Err(unsupported(other.type_name().to_string())),
    }
  }
}
