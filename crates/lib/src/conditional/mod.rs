//! Conditional evaluation with loop bounds.
//!
//! One [`Evaluator`] lives for one directive. Its state decides how often a
//! guard may hold:
//!
//! - dry-run: never
//! - `none`: never (the body runs once regardless)
//! - `if` / `unless`: at most once, on the first call
//! - `while`: until the loop counter exceeds the maximum
//! - `until`: until the loop counter reaches the maximum

use mlua::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::directive::{Conditional, ConditionalKind};
use crate::lua::helpers::{FileScope, register_conditional_helpers};
use crate::lua::runtime::{eval_expression, sandbox_env};

#[derive(Debug, Error)]
pub enum EvalError {
  #[error("failed to evaluate the conditional '{expression}': {source}")]
  Evaluation {
    expression: String,
    #[source]
    source: LuaError,
  },

  #[error("the conditional '{expression}' returned a {found}, expected a boolean")]
  NonBoolean { expression: String, found: &'static str },
}

/// Lua state and environment holding the conditional capability set.
pub struct ConditionSandbox<'lua> {
  lua: &'lua Lua,
  env: LuaTable,
}

impl<'lua> ConditionSandbox<'lua> {
  pub fn new(lua: &'lua Lua, scope: &FileScope) -> LuaResult<Self> {
    let env = sandbox_env(lua)?;
    register_conditional_helpers(lua, &env, scope)?;
    Ok(Self { lua, env })
  }

  /// Evaluate an expression to a boolean.
  pub fn evaluate(&self, expression: &str) -> Result<bool, EvalError> {
    let value = eval_expression(self.lua, expression, self.env.clone()).map_err(|source| EvalError::Evaluation {
      expression: expression.to_string(),
      source,
    })?;
    match value {
      LuaValue::Boolean(b) => Ok(b),
      other => Err(EvalError::NonBoolean {
        expression: expression.to_string(),
        found: other.type_name(),
      }),
    }
  }
}

/// Per-directive guard state.
#[derive(Debug)]
pub struct Evaluator {
  max_loops: u64,
  dry_run: bool,
  loop_count: u64,
  halt_seen: bool,
}

impl Evaluator {
  pub fn new(config: &Config) -> Self {
    Self {
      max_loops: config.max_loops,
      dry_run: config.dry_run,
      loop_count: 0,
      halt_seen: false,
    }
  }

  pub fn loop_count(&self) -> u64 {
    self.loop_count
  }

  /// Whether the guard holds now.
  pub fn evaluate(&mut self, conditional: &Conditional, sandbox: &ConditionSandbox<'_>) -> Result<bool, EvalError> {
    if self.dry_run {
      return Ok(false);
    }

    match conditional.kind {
      ConditionalKind::None => return Ok(false),
      ConditionalKind::If | ConditionalKind::Unless => {
        if self.halt_seen {
          return Ok(false);
        }
        self.halt_seen = true;
      }
      ConditionalKind::While | ConditionalKind::Until => {
        self.loop_count += 1;
        let exhausted = match conditional.kind {
          ConditionalKind::While => self.loop_count > self.max_loops,
          _ => self.loop_count >= self.max_loops,
        };
        if exhausted {
          debug!(kind = conditional.kind.as_str(), loops = self.loop_count, "loop bound reached");
          return Ok(false);
        }
      }
    }

    let result = sandbox.evaluate(&conditional.expression)?;
    let result = if conditional.kind.is_negated() { !result } else { result };
    debug!(conditional = %conditional, result, "conditional evaluated");
    Ok(result)
  }
}
