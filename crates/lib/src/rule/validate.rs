//! Rule contract validation.
//!
//! Checks run in a fixed order and stop at the first failure: header shape,
//! key types, list contents, reserved names, duplicates, identifier,
//! version, directive arguments, then the command list.

use std::collections::BTreeSet;

use mlua::prelude::*;

use super::types::{CommandsError, HeaderError, RuleCommand, RuleError, RuleHeader, RuleLocation};
use crate::consts::{FILE_PARAMETER, RESERVED_ARGUMENTS};
use crate::lua::markers;
use crate::types::{Parameters, Version};

#[derive(Clone, Copy)]
enum Kind {
  String,
  List,
  Number,
  Function,
}

impl Kind {
  fn name(&self) -> &'static str {
    match self {
      Kind::String => "string",
      Kind::List => "list",
      Kind::Number => "number",
      Kind::Function => "function",
    }
  }

  fn matches(&self, value: &LuaValue) -> LuaResult<bool> {
    Ok(match (self, value) {
      (Kind::String, LuaValue::String(_)) => true,
      (Kind::Number, LuaValue::Integer(_) | LuaValue::Number(_)) => true,
      (Kind::Function, LuaValue::Function(_)) => true,
      (Kind::List, LuaValue::Table(t)) => markers::is_sequence(t)?,
      _ => false,
    })
  }
}

const HEADER_KEYS: &[(&str, Kind)] = &[
  ("id", Kind::String),
  ("name", Kind::String),
  ("description", Kind::String),
  ("arguments", Kind::List),
  ("authors", Kind::List),
  ("requires", Kind::Number),
];

const COMMAND_KEYS: &[(&str, Kind)] = &[("name", Kind::String), ("command", Kind::Function), ("exit", Kind::Function)];

fn key_name(key: &LuaValue) -> String {
  match key {
    LuaValue::String(s) => s.to_string_lossy(),
    LuaValue::Integer(i) => i.to_string(),
    other => other.type_name().to_string(),
  }
}

/// Keys of `table` outside `known`, sorted.
fn unknown_keys(table: &LuaTable, known: &[(&str, Kind)]) -> LuaResult<Vec<String>> {
  let mut unknown = Vec::new();
  for pair in table.pairs::<LuaValue, LuaValue>() {
    let (key, _) = pair?;
    let is_known = matches!(&key, LuaValue::String(s) if known.iter().any(|(k, _)| &*s.as_bytes() == k.as_bytes()));
    if !is_known {
      unknown.push(key_name(&key));
    }
  }
  unknown.sort();
  Ok(unknown)
}

fn string_list(table: &LuaTable, key: &'static str) -> Result<Vec<String>, HeaderError> {
  let list: LuaTable = table.raw_get(key).map_err(|_| HeaderError::InvalidList(key))?;
  let mut items = Vec::new();
  for value in list.sequence_values::<LuaValue>() {
    match value {
      Ok(LuaValue::String(s)) => {
        let item = s.to_string_lossy().to_string();
        if item.trim().is_empty() {
          return Err(HeaderError::InvalidList(key));
        }
        items.push(item);
      }
      _ => return Err(HeaderError::InvalidList(key)),
    }
  }
  Ok(items)
}

/// Validate the header table and extract it.
pub fn validate_header(value: LuaValue) -> Result<RuleHeader, RuleError> {
  let table = match value {
    LuaValue::Nil => return Err(HeaderError::Missing.into()),
    LuaValue::Table(t) if markers::type_of(&t).is_none() => t,
    other => return Err(HeaderError::NotATable(other.type_name()).into()),
  };

  for &(key, kind) in HEADER_KEYS {
    let value: LuaValue = table.raw_get(key).map_err(RuleError::Script)?;
    if value.is_nil() {
      return Err(HeaderError::MissingKey(key).into());
    }
    if !kind.matches(&value).map_err(RuleError::Script)? {
      return Err(
        HeaderError::WrongType {
          key,
          expected: kind.name(),
          found: value.type_name(),
        }
        .into(),
      );
    }
  }

  let unknown = unknown_keys(&table, HEADER_KEYS).map_err(RuleError::Script)?;
  if !unknown.is_empty() {
    return Err(HeaderError::UnknownKeys(unknown).into());
  }

  let arguments = string_list(&table, "arguments")?;
  let authors = string_list(&table, "authors")?;

  if let Some(reserved) = arguments.iter().find(|a| RESERVED_ARGUMENTS.contains(&a.as_str())) {
    return Err(HeaderError::ReservedArgument(reserved.clone()).into());
  }

  let mut seen = BTreeSet::new();
  for argument in &arguments {
    if !seen.insert(argument.as_str()) {
      return Err(HeaderError::DuplicateArgument(argument.clone()).into());
    }
  }

  let get_string = |key: &str| -> Result<String, RuleError> {
    table.raw_get::<String>(key).map_err(RuleError::Script)
  };

  Ok(RuleHeader {
    id: get_string("id")?,
    name: get_string("name")?,
    description: get_string("description")?,
    arguments,
    authors,
    requires: Version(table.raw_get::<f64>("requires").map_err(RuleError::Script)?),
  })
}

/// The header id must equal the rule file's base name.
pub fn check_identifier(header: &RuleHeader, location: &RuleLocation) -> Result<(), HeaderError> {
  let expected = location
    .path
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_default();
  if header.id != expected {
    return Err(HeaderError::IdentifierMismatch {
      expected,
      found: header.id.clone(),
    });
  }
  Ok(())
}

/// The rule must not require a newer application.
pub fn check_version(header: &RuleHeader, current: Version) -> Result<(), HeaderError> {
  if header.requires > current {
    return Err(HeaderError::VersionTooOld {
      required: header.requires,
      current,
    });
  }
  Ok(())
}

/// Directive parameters, minus `file`, must be declared arguments.
pub fn validate_arguments(header: &RuleHeader, parameters: &Parameters, lines: &[usize]) -> Result<(), RuleError> {
  let names: Vec<String> = parameters
    .keys()
    .filter(|key| key.as_str() != FILE_PARAMETER && !header.arguments.contains(key))
    .cloned()
    .collect();
  if !names.is_empty() {
    return Err(RuleError::UnknownArguments {
      names,
      lines: lines.to_vec(),
    });
  }
  Ok(())
}

/// Validate the command list and extract it.
pub fn validate_commands(value: LuaValue) -> Result<Vec<RuleCommand>, RuleError> {
  let list = match value {
    LuaValue::Nil => return Err(CommandsError::Missing.into()),
    LuaValue::Table(t) if markers::is_sequence(&t).unwrap_or(false) => t,
    other => return Err(CommandsError::NotAList(other.type_name()).into()),
  };

  let mut commands = Vec::new();
  for (i, entry) in list.sequence_values::<LuaValue>().enumerate() {
    let index = i + 1;
    let entry = match entry.map_err(RuleError::Script)? {
      LuaValue::Table(t) if markers::type_of(&t).is_none() => t,
      other => {
        return Err(
          CommandsError::EntryNotATable {
            index,
            found: other.type_name(),
          }
          .into(),
        );
      }
    };

    for &(key, kind) in COMMAND_KEYS {
      let value: LuaValue = entry.raw_get(key).map_err(RuleError::Script)?;
      if value.is_nil() {
        return Err(CommandsError::MissingKey { index, key }.into());
      }
      if !kind.matches(&value).map_err(RuleError::Script)? {
        return Err(
          CommandsError::WrongType {
            index,
            key,
            expected: kind.name(),
            found: value.type_name(),
          }
          .into(),
        );
      }
    }

    let keys = unknown_keys(&entry, COMMAND_KEYS).map_err(RuleError::Script)?;
    if !keys.is_empty() {
      return Err(CommandsError::UnknownKeys { index, keys }.into());
    }

    commands.push(RuleCommand {
      name: entry.raw_get("name").map_err(RuleError::Script)?,
      command: entry.raw_get("command").map_err(RuleError::Script)?,
      exit: entry.raw_get("exit").map_err(RuleError::Script)?,
    });
  }

  Ok(commands)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::ParamValue;
  use std::path::PathBuf;

  const VALID_HEADER: &str = r#"{
    id = "compile",
    name = "Compile",
    description = "Runs the engine",
    arguments = { "engine", "shell" },
    authors = { "Jane Doe" },
    requires = 1.0,
  }"#;

  fn eval(lua: &Lua, source: &str) -> LuaValue {
    lua.load(format!("return {source}")).eval().unwrap()
  }

  fn header(source: &str) -> Result<RuleHeader, RuleError> {
    let lua = Lua::new();
    validate_header(eval(&lua, source))
  }

  fn header_error(source: &str) -> HeaderError {
    match header(source) {
      Err(RuleError::Header(e)) => e,
      other => panic!("expected a header error, got {other:?}"),
    }
  }

  fn with_header(replace: &str, with: &str) -> String {
    VALID_HEADER.replace(replace, with)
  }

  mod header {
    use super::*;

    #[test]
    fn valid_header_is_extracted() {
      let header = header(VALID_HEADER).unwrap();
      assert_eq!(header.id, "compile");
      assert_eq!(header.arguments, vec!["engine", "shell"]);
      assert_eq!(header.authors, vec!["Jane Doe"]);
      assert_eq!(header.requires, Version(1.0));
    }

    #[test]
    fn missing_header() {
      assert!(matches!(header_error("nil"), HeaderError::Missing));
      assert!(matches!(header_error("'compile'"), HeaderError::NotATable("string")));
    }

    #[test]
    fn missing_key() {
      let source = with_header("description = \"Runs the engine\",", "");
      assert!(matches!(header_error(&source), HeaderError::MissingKey("description")));
    }

    #[test]
    fn wrong_type() {
      let source = with_header("requires = 1.0", "requires = \"1.0\"");
      assert!(matches!(
        header_error(&source),
        HeaderError::WrongType {
          key: "requires",
          expected: "number",
          ..
        }
      ));

      let source = with_header("arguments = { \"engine\", \"shell\" }", "arguments = { engine = true }");
      assert!(matches!(header_error(&source), HeaderError::WrongType { key: "arguments", .. }));
    }

    #[test]
    fn unknown_keys() {
      let source = with_header("requires = 1.0,", "requires = 1.0, zeta = 1, alpha = 2,");
      match header_error(&source) {
        HeaderError::UnknownKeys(keys) => assert_eq!(keys, vec!["alpha", "zeta"]),
        other => panic!("unexpected: {other}"),
      }
    }

    #[test]
    fn list_entries_must_be_non_empty_strings() {
      let source = with_header("authors = { \"Jane Doe\" }", "authors = { \"  \" }");
      assert!(matches!(header_error(&source), HeaderError::InvalidList("authors")));

      let source = with_header("arguments = { \"engine\", \"shell\" }", "arguments = { 1 }");
      assert!(matches!(header_error(&source), HeaderError::InvalidList("arguments")));
    }

    #[test]
    fn reserved_argument() {
      let source = with_header("arguments = { \"engine\", \"shell\" }", "arguments = { \"engine\", \"files\" }");
      assert!(matches!(header_error(&source), HeaderError::ReservedArgument(name) if name == "files"));
    }

    #[test]
    fn duplicate_argument() {
      let source = with_header("arguments = { \"engine\", \"shell\" }", "arguments = { \"engine\", \"engine\" }");
      assert!(matches!(header_error(&source), HeaderError::DuplicateArgument(name) if name == "engine"));
    }

    #[test]
    fn list_entries_are_kept_verbatim() {
      let source = with_header("arguments = { \"engine\", \"shell\" }", "arguments = { \"engine\", \" engine\" }");
      assert_eq!(header(&source).unwrap().arguments, vec!["engine", " engine"]);
    }

    #[test]
    fn empty_lists_are_allowed() {
      let source = with_header("arguments = { \"engine\", \"shell\" }", "arguments = {}");
      assert!(header(&source).unwrap().arguments.is_empty());
    }
  }

  mod identity {
    use super::*;

    fn location(path: &str) -> RuleLocation {
      RuleLocation {
        identifier: "compile".to_string(),
        path: PathBuf::from(path),
      }
    }

    #[test]
    fn identifier_must_match_file_name() {
      let header = header(VALID_HEADER).unwrap();
      assert!(check_identifier(&header, &location("/rules/compile.lua")).is_ok());
      assert!(matches!(
        check_identifier(&header, &location("/rules/build.lua")),
        Err(HeaderError::IdentifierMismatch { expected, found }) if expected == "build" && found == "compile"
      ));
    }

    #[test]
    fn version_must_not_exceed_current() {
      let header = header(&with_header("requires = 1.0", "requires = 2.0")).unwrap();
      assert!(check_version(&header, Version(2.0)).is_ok());
      let err = check_version(&header, Version(1.0)).unwrap_err();
      assert!(matches!(err, HeaderError::VersionTooOld { .. }));
      assert_eq!(err.to_string(), "the rule requires version 2.0, but this is version 1.0");
    }
  }

  mod arguments {
    use super::*;

    fn params(keys: &[&str]) -> Parameters {
      keys.iter().map(|k| (k.to_string(), ParamValue::from("x"))).collect()
    }

    #[test]
    fn declared_arguments_and_file_pass() {
      let header = header(VALID_HEADER).unwrap();
      assert!(validate_arguments(&header, &params(&["file", "engine", "shell"]), &[1]).is_ok());
      assert!(validate_arguments(&header, &params(&["file"]), &[1]).is_ok());
    }

    #[test]
    fn extra_arguments_are_named() {
      let header = header(VALID_HEADER).unwrap();
      match validate_arguments(&header, &params(&["file", "engine", "extra", "more"]), &[3, 4]) {
        Err(RuleError::UnknownArguments { names, lines }) => {
          assert_eq!(names, vec!["extra", "more"]);
          assert_eq!(lines, vec![3, 4]);
        }
        other => panic!("unexpected: {other:?}"),
      }
    }
  }

  mod commands {
    use super::*;

    fn commands_error(source: &str) -> CommandsError {
      let lua = Lua::new();
      match validate_commands(eval(&lua, source)) {
        Err(RuleError::Commands(e)) => e,
        other => panic!("expected a commands error, got {other:?}"),
      }
    }

    #[test]
    fn valid_commands() {
      let lua = Lua::new();
      let commands = validate_commands(eval(
        &lua,
        "{ { name = 'run', command = function() return true end, exit = function(c) return c == 0 end } }",
      ))
      .unwrap();
      assert_eq!(commands.len(), 1);
      assert_eq!(commands[0].name, "run");
    }

    #[test]
    fn shape_errors() {
      assert!(matches!(commands_error("nil"), CommandsError::Missing));
      assert!(matches!(commands_error("{ a = 1 }"), CommandsError::NotAList("table")));
      assert!(matches!(
        commands_error("{ 'run' }"),
        CommandsError::EntryNotATable { index: 1, .. }
      ));
    }

    #[test]
    fn key_errors() {
      assert!(matches!(
        commands_error("{ { name = 'run', command = function() end } }"),
        CommandsError::MissingKey { index: 1, key: "exit" }
      ));
      assert!(matches!(
        commands_error("{ { name = 'run', command = 'echo', exit = function() end } }"),
        CommandsError::WrongType {
          key: "command",
          expected: "function",
          ..
        }
      ));
      assert!(matches!(
        commands_error("{ { name = 'run', command = function() end, exit = function() end, retry = 2 } }"),
        CommandsError::UnknownKeys { index: 1, .. }
      ));
    }
  }
}
