//! Error and result types for a run.

use std::fmt;
use std::path::PathBuf;

use mlua::prelude::*;
use thiserror::Error;

use crate::cache::CacheError;
use crate::conditional::EvalError;
use crate::directive::Directive;
use crate::process::ProcessError;
use crate::rule::{RuleError, display_lines};

#[derive(Debug, Error)]
pub enum InterpreterError {
  #[error(transparent)]
  Rule(#[from] RuleError),

  #[error(transparent)]
  Condition(#[from] EvalError),

  #[error(transparent)]
  Process(#[from] ProcessError),

  #[error(transparent)]
  Cache(#[from] CacheError),

  #[error("failed to resolve the files of '{path}': {source}")]
  Scope {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("rule script error: {0}")]
  Script(#[source] LuaError),

  #[error("the command '{command}' produced a nil outcome")]
  NullOutcome { command: String },

  #[error("the exit mapper of '{command}' returned a {found}, expected a boolean")]
  InvalidExitMapper { command: String, found: &'static str },

  #[error("the command '{command}' produced an unsupported outcome: {found}")]
  UnsupportedOutcome { command: String, found: String },
}

/// Where in the document an error happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleContext {
  pub identifier: String,
  /// Set once the rule has been resolved.
  pub path: Option<PathBuf>,
  pub lines: Vec<usize>,
}

impl RuleContext {
  pub fn for_directive(directive: &Directive) -> Self {
    Self {
      identifier: directive.identifier.clone(),
      path: None,
      lines: directive.line_numbers.clone(),
    }
  }
}

impl fmt::Display for RuleContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "rule '{}'", self.identifier)?;
    if let Some(path) = &self.path {
      write!(f, " ({})", path.display())?;
    }
    if !self.lines.is_empty() {
      write!(f, " at lines {}", display_lines(&self.lines))?;
    }
    Ok(())
  }
}

/// A failed run, with the directive it failed in when known.
#[derive(Debug, Error)]
#[error("{}{error}", context_prefix(.context))]
pub struct RunError {
  pub context: Option<RuleContext>,
  #[source]
  pub error: InterpreterError,
}

fn context_prefix(context: &Option<RuleContext>) -> String {
  context.as_ref().map(|c| format!("{c}: ")).unwrap_or_default()
}

impl From<InterpreterError> for RunError {
  fn from(error: InterpreterError) -> Self {
    Self { context: None, error }
  }
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
  /// A rule returned `halt()`.
  Trigger,
  /// A step failed while halt-on-error was set.
  Failure { rule: String, command: String },
}

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
  /// Every directive ran.
  Completed { directives: usize },
  /// Stopped after `directives` directives.
  Halted { reason: HaltReason, directives: usize },
}

impl RunOutcome {
  pub fn is_failure(&self) -> bool {
    matches!(
      self,
      RunOutcome::Halted {
        reason: HaltReason::Failure { .. },
        ..
      }
    )
  }
}
