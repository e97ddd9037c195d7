//! The execution pipeline.
//!
//! For each directive, in document order:
//!
//! 1. Resolve and load its rule, validating the directive's parameters
//! 2. Gate `if`/`unless`/`while` directives on their conditional
//! 3. Run every rule command, executing each outcome in order
//! 4. Repeat while the conditional holds (only loops ever do)
//!
//! A `halt()` outcome, or a failed step under halt-on-error, ends the whole
//! run. Any error aborts it.

mod observer;
mod outcome;
mod types;

pub use observer::{Action, Notice, NullObserver, Observer, RecordingObserver, StepEvent};
pub use outcome::{Outcome, TriggerKind, flatten};
pub use types::{HaltReason, InterpreterError, RuleContext, RunError, RunOutcome};

use std::path::{Path, PathBuf};

use mlua::prelude::*;
use tracing::{debug, info};

use crate::cache::ChangeCache;
use crate::conditional::{ConditionSandbox, Evaluator};
use crate::config::Config;
use crate::consts::FILE_PARAMETER;
use crate::directive::{Conditional, Directive};
use crate::lua::helpers::FileScope;
use crate::lua::helpers::params::Bindings;
use crate::lua::helpers::session::Session;
use crate::lua::runtime::create_runtime;
use crate::process::{self, ProcessOptions};
use crate::rule::{Rule, RuleCommand, RuleResolver, load_rule, rule_env};
use crate::types::ParamValue;
use crate::util::paths;

/// Runs directives against one reference file.
///
/// The session outlives individual directives, so rules can hand values to
/// later rules of the same run.
pub struct Interpreter {
  config: Config,
  reference: PathBuf,
  resolver: RuleResolver,
  session: Session,
  halted: bool,
}

impl Interpreter {
  pub fn new(config: Config, reference: &Path) -> Result<Self, InterpreterError> {
    let base_dir = paths::canonical_parent(reference).map_err(|source| InterpreterError::Scope {
      path: reference.to_path_buf(),
      source,
    })?;
    let resolver = RuleResolver::new(&config.rule_paths, &base_dir);
    Ok(Self {
      config,
      reference: reference.to_path_buf(),
      resolver,
      session: Session::new(),
      halted: false,
    })
  }

  /// Run `directives` in order.
  pub async fn run(&mut self, directives: &[Directive], observer: &mut dyn Observer) -> Result<RunOutcome, RunError> {
    info!(reference = %self.reference.display(), directives = directives.len(), "starting run");

    for (index, directive) in directives.iter().enumerate() {
      let mut context = RuleContext::for_directive(directive);
      match self.run_directive(directive, &mut context, observer).await {
        Ok(None) => {}
        Ok(Some(reason)) => {
          info!(?reason, "run halted");
          return Ok(RunOutcome::Halted {
            reason,
            directives: index + 1,
          });
        }
        Err(error) => {
          return Err(RunError {
            context: Some(context),
            error,
          });
        }
      }
    }

    Ok(RunOutcome::Completed {
      directives: directives.len(),
    })
  }

  async fn run_directive(
    &mut self,
    directive: &Directive,
    context: &mut RuleContext,
    observer: &mut dyn Observer,
  ) -> Result<Option<HaltReason>, InterpreterError> {
    info!(rule = %directive.identifier, "resolving rule");
    let location = self.resolver.resolve(&directive.identifier)?;
    info!(rule = %directive.identifier, path = %location.path.display(), "rule located");
    context.path = Some(location.path.clone());

    let current = directive
      .file()
      .map(PathBuf::from)
      .unwrap_or_else(|| self.reference.clone());
    let cache = ChangeCache::for_reference(&self.reference, &self.config.cache_name)?;
    let scope = FileScope::new(&self.reference, &current, cache).map_err(|source| InterpreterError::Scope {
      path: current.clone(),
      source,
    })?;

    let mut parameters = directive.parameters.clone();
    parameters
      .entry(FILE_PARAMETER.to_string())
      .or_insert_with(|| ParamValue::String(current.to_string_lossy().into_owned()));
    let bindings = Bindings::new(parameters);

    // One Lua state per directive; rule and conditional share it but not their environments.
    let lua = create_runtime().map_err(InterpreterError::Script)?;
    let env = rule_env(&lua, &scope, &bindings, &self.session).map_err(InterpreterError::Script)?;
    let rule = load_rule(&lua, &location, env, directive, self.config.application_version)?;
    bindings.permit(rule.header.arguments.iter().cloned());
    observer.rule_started(directive, &rule);

    let sandbox = ConditionSandbox::new(&lua, &scope).map_err(InterpreterError::Script)?;
    let mut evaluator = Evaluator::new(&self.config);
    let conditional = &directive.conditional;

    if conditional.kind.checks_before_entry() && !self.config.dry_run && !evaluator.evaluate(conditional, &sandbox)? {
      debug!(rule = %rule.header.id, conditional = %conditional, "directive skipped");
      return Ok(None);
    }

    let options = ProcessOptions::from_config(&self.config, Some(scope.base_dir.clone()));
    loop {
      for command in &rule.commands {
        if let Some(reason) = self.run_command(&rule, command, conditional, &options, observer).await? {
          return Ok(Some(reason));
        }
      }
      if self.config.dry_run || !evaluator.evaluate(conditional, &sandbox)? {
        break;
      }
      debug!(rule = %rule.header.id, pass = evaluator.loop_count() + 1, "repeating rule");
    }

    Ok(None)
  }

  async fn run_command(
    &mut self,
    rule: &Rule,
    command: &RuleCommand,
    conditional: &Conditional,
    options: &ProcessOptions,
    observer: &mut dyn Observer,
  ) -> Result<Option<HaltReason>, InterpreterError> {
    let raw = command.command.call::<LuaValue>(()).map_err(InterpreterError::Script)?;
    let results = flatten(raw).map_err(InterpreterError::Script)?;

    for value in results {
      let Some(outcome) = Outcome::convert(value, &command.name)? else {
        continue;
      };

      observer.step_started(&rule.header.name, &command.name);
      let success = self.perform(rule, command, conditional, outcome, options, observer).await?;
      observer.step_finished(&StepEvent {
        rule_name: rule.header.name.clone(),
        command_name: command.name.clone(),
        success,
      });

      if self.halted {
        return Ok(Some(HaltReason::Trigger));
      }
      if self.config.halt_on_error && !success {
        return Ok(Some(HaltReason::Failure {
          rule: rule.header.name.clone(),
          command: command.name.clone(),
        }));
      }
    }

    Ok(None)
  }

  async fn perform(
    &mut self,
    rule: &Rule,
    command: &RuleCommand,
    conditional: &Conditional,
    outcome: Outcome,
    options: &ProcessOptions,
    observer: &mut dyn Observer,
  ) -> Result<bool, InterpreterError> {
    let dry_run = |action| Notice::DryRun {
      rule_name: rule.header.name.clone(),
      command_name: command.name.clone(),
      authors: rule.header.authors.clone(),
      conditional: conditional.clone(),
      action,
    };
    let verbose = |action| Notice::Verbose {
      rule_name: rule.header.name.clone(),
      command_name: command.name.clone(),
      action,
    };

    match outcome {
      Outcome::Boolean(value) => {
        if self.config.dry_run {
          observer.notice(&dry_run(Action::Boolean(value)));
        } else if self.config.verbose {
          observer.notice(&verbose(Action::Boolean(value)));
        }
        Ok(value)
      }
      Outcome::Trigger(kind) => {
        self.halted = true;
        if self.config.dry_run {
          observer.notice(&dry_run(Action::Trigger(kind)));
        } else if self.config.verbose {
          observer.notice(&verbose(Action::Trigger(kind)));
        }
        Ok(true)
      }
      Outcome::Process(line) => {
        if self.config.dry_run {
          observer.notice(&dry_run(Action::Command(line.to_string())));
          return Ok(true);
        }

        info!(rule = %rule.header.id, command = %line, "running system command");
        let output = process::run(&line, options).await?;
        let mapped = command
          .exit
          .call::<LuaValue>(output.code)
          .map_err(InterpreterError::Script)?;
        match mapped {
          LuaValue::Boolean(success) => {
            debug!(code = output.code, success, "exit code mapped");
            Ok(success)
          }
          other => Err(InterpreterError::InvalidExitMapper {
            command: command.name.clone(),
            found: other.type_name(),
          }),
        }
      }
    }
  }
}
