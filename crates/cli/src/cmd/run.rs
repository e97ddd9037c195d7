//! Implementation of the `kestrel run` command.
//!
//! Loads the configuration and a plan file, runs the plan's directives and
//! prints every step as it finishes.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;
use tracing::info;

use kestrel_lib::config::{Config, TimeoutConfig};
use kestrel_lib::consts::LOG_EXTENSION;
use kestrel_lib::directive::{ConditionalKind, Directive, Plan};
use kestrel_lib::interpreter::{Action, HaltReason, Interpreter, Notice, Observer, RunOutcome, StepEvent};
use kestrel_lib::rule::Rule;
use kestrel_lib::util::paths;

use crate::logging;
use crate::signals;
use crate::output::{format_duration, print_error, print_info, print_success, print_warning, symbols};

/// Command-line overrides for a run.
#[derive(Debug, Default)]
pub struct RunArgs {
  pub config: Option<PathBuf>,
  pub verbose: bool,
  pub dry_run: bool,
  pub max_loops: Option<u64>,
  pub timeout: Option<Duration>,
  pub no_halt_on_error: bool,
  pub log: bool,
}

impl RunArgs {
  fn apply(&self, config: &mut Config) -> Result<()> {
    config.verbose |= self.verbose;
    config.dry_run |= self.dry_run;
    config.logging |= self.log;
    if self.no_halt_on_error {
      config.halt_on_error = false;
    }
    if let Some(loops) = self.max_loops {
      if loops == 0 {
        bail!("--max-loops must be greater than zero");
      }
      config.max_loops = loops;
    }
    if let Some(timeout) = self.timeout {
      if timeout.is_zero() {
        bail!("--timeout must be greater than zero");
      }
      config.timeout = TimeoutConfig::from_duration(timeout);
    }
    Ok(())
  }
}

/// Prints rules and steps as the interpreter reports them.
struct StepPrinter;

impl Observer for StepPrinter {
  fn rule_started(&mut self, directive: &Directive, rule: &Rule) {
    let mut line = format!("{} {}", symbols::ARROW.cyan(), rule.header.name.bold());
    if directive.conditional.kind != ConditionalKind::None {
      line.push_str(&format!(" {}", format!("[{}]", directive.conditional).dimmed()));
    }
    println!("{}", line);
  }

  fn step_finished(&mut self, event: &StepEvent) {
    if event.success {
      println!("  {} {}", symbols::SUCCESS.green(), event.command_name);
    } else {
      println!("  {} {}", symbols::ERROR.red(), event.command_name.red());
    }
  }

  fn notice(&mut self, notice: &Notice) {
    match notice {
      Notice::DryRun {
        command_name,
        authors,
        conditional,
        action,
        ..
      } => {
        println!(
          "  {} {} {}: {}",
          symbols::INFO.yellow(),
          "[dry-run]".yellow(),
          command_name,
          describe(action)
        );
        if !authors.is_empty() {
          println!("      {}", format!("authors: {}", authors.join(", ")).dimmed());
        }
        if conditional.kind != ConditionalKind::None {
          println!("      {}", format!("conditional: {}", conditional).dimmed());
        }
      }
      Notice::Verbose {
        command_name, action, ..
      } => {
        println!("  {} {}: {}", symbols::INFO.dimmed(), command_name, describe(action));
      }
    }
  }
}

fn describe(action: &Action) -> String {
  match action {
    Action::Boolean(value) => format!("returns {}", value),
    Action::Trigger(kind) => format!("triggers {}", kind),
    Action::Command(line) => format!("runs {}", line),
  }
}

/// Execute the run command.
///
/// Exits with status 1 when a failed step halted the run.
pub fn cmd_run(plan_path: &Path, args: &RunArgs) -> Result<ExitCode> {
  let start = Instant::now();

  let mut config = Config::discover(args.config.as_deref()).context("Failed to load configuration")?;
  args.apply(&mut config)?;

  let plan_path =
    dunce::canonicalize(plan_path).with_context(|| format!("Plan file not found: {}", plan_path.display()))?;
  let plan = Plan::load(&plan_path)?;

  let log_file = if config.logging {
    let dir = paths::canonical_parent(&plan.reference)
      .with_context(|| format!("Failed to resolve reference: {}", plan.reference.display()))?;
    Some(dir.join(format!("{}.{}", config.log_name, LOG_EXTENSION)))
  } else {
    None
  };
  logging::init(config.verbose, log_file.as_deref())?;
  info!(plan = %plan_path.display(), ?config, "configuration loaded");

  if config.dry_run {
    println!("{}", "Dry run - no commands will be executed".yellow());
  }
  print_info(&format!(
    "Running {} directive(s) for {}",
    plan.directives.len(),
    plan.reference.display()
  ));

  let mut interpreter = Interpreter::new(config, &plan.reference).context("Failed to prepare the run")?;
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.spawn(signals::listen());
  let outcome = rt
    .block_on(interpreter.run(&plan.directives, &mut StepPrinter))
    .context("Run failed")?;

  let elapsed = format_duration(start.elapsed());
  match outcome {
    RunOutcome::Completed { directives } => {
      print_success(&format!("Run complete: {} directive(s) in {}", directives, elapsed));
      Ok(ExitCode::SUCCESS)
    }
    RunOutcome::Halted {
      reason: HaltReason::Trigger,
      directives,
    } => {
      print_warning(&format!("Run halted by a rule after {} directive(s) in {}", directives, elapsed));
      Ok(ExitCode::SUCCESS)
    }
    RunOutcome::Halted {
      reason: HaltReason::Failure { rule, command },
      ..
    } => {
      print_error(&format!("Run stopped: '{}' failed in {} ({})", command, rule, elapsed));
      Ok(ExitCode::FAILURE)
    }
  }
}
