use std::path::PathBuf;

use mlua::prelude::*;
use thiserror::Error;

use crate::types::Version;

/// Where a rule was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLocation {
  pub identifier: String,
  /// Path of the rule script.
  pub path: PathBuf,
}

/// A rule's declared contract.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleHeader {
  pub id: String,
  pub name: String,
  pub description: String,
  pub arguments: Vec<String>,
  pub authors: Vec<String>,
  pub requires: Version,
}

/// One step of a rule.
#[derive(Debug, Clone)]
pub struct RuleCommand {
  pub name: String,
  /// Produces the step's outcome(s); called with no arguments.
  pub command: LuaFunction,
  /// Maps a process exit code to success.
  pub exit: LuaFunction,
}

/// A loaded and validated rule.
#[derive(Debug, Clone)]
pub struct Rule {
  pub location: RuleLocation,
  pub header: RuleHeader,
  pub commands: Vec<RuleCommand>,
}

#[derive(Debug, Error)]
pub enum HeaderError {
  #[error("the rule has no 'rule' header")]
  Missing,

  #[error("the rule header must be a table, got {0}")]
  NotATable(&'static str),

  #[error("the rule header key '{key}' must be a {expected}, got {found}")]
  WrongType {
    key: &'static str,
    expected: &'static str,
    found: &'static str,
  },

  #[error("the rule header is missing the key '{0}'")]
  MissingKey(&'static str),

  #[error("the rule header has unknown keys: {}", .0.join(", "))]
  UnknownKeys(Vec<String>),

  #[error("the rule header key '{0}' must be a list of non-empty strings")]
  InvalidList(&'static str),

  #[error("'{0}' is a reserved argument name")]
  ReservedArgument(String),

  #[error("the argument '{0}' is declared more than once")]
  DuplicateArgument(String),

  #[error("the rule identifier '{found}' does not match its file name '{expected}'")]
  IdentifierMismatch { expected: String, found: String },

  #[error("the rule requires version {required}, but this is version {current}")]
  VersionTooOld { required: Version, current: Version },
}

#[derive(Debug, Error)]
pub enum CommandsError {
  #[error("the rule has no 'commands' list")]
  Missing,

  #[error("the rule commands must be a list, got {0}")]
  NotAList(&'static str),

  #[error("command #{index} must be a table, got {found}")]
  EntryNotATable { index: usize, found: &'static str },

  #[error("command #{index} is missing the key '{key}'")]
  MissingKey { index: usize, key: &'static str },

  #[error("command #{index}: key '{key}' must be a {expected}, got {found}")]
  WrongType {
    index: usize,
    key: &'static str,
    expected: &'static str,
    found: &'static str,
  },

  #[error("command #{index} has unknown keys: {}", .keys.join(", "))]
  UnknownKeys { index: usize, keys: Vec<String> },
}

#[derive(Debug, Error)]
pub enum RuleError {
  #[error("rule '{identifier}' not found; searched: {}", display_paths(.searched))]
  NotFound { identifier: String, searched: Vec<PathBuf> },

  #[error("failed to evaluate the rule script: {0}")]
  Script(#[source] LuaError),

  #[error("malformed rule script: {0}")]
  Malformed(String),

  #[error("invalid rule header: {0}")]
  Header(#[from] HeaderError),

  #[error("invalid rule commands: {0}")]
  Commands(#[from] CommandsError),

  #[error("unknown arguments [{}] in the directive at lines {}", .names.join(", "), display_lines(.lines))]
  UnknownArguments { names: Vec<String>, lines: Vec<usize> },
}

fn display_paths(paths: &[PathBuf]) -> String {
  paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}

pub(crate) fn display_lines(lines: &[usize]) -> String {
  let lines: Vec<String> = lines.iter().map(ToString::to_string).collect();
  format!("({})", lines.join(", "))
}
