mod cmd;
mod logging;
mod output;
mod signals;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::cmd::{RunArgs, cmd_check, cmd_run};
use crate::output::print_error;

/// kestrel - Run the build directives of a document
#[derive(Parser)]
#[command(name = "kestrel")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Configuration file (default: ~/.kestrel.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Show process output and report every step
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the directives of a plan file
  Run {
    /// Plan file listing the reference document and its directives
    plan: PathBuf,

    /// Report what would run without running anything
    #[arg(long)]
    dry_run: bool,

    /// Upper bound for while/until loops
    #[arg(long)]
    max_loops: Option<u64>,

    /// Kill processes running longer than this (e.g., "30s", "5min")
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Keep going after a failed step
    #[arg(long)]
    no_halt_on_error: bool,

    /// Also write the log next to the reference document
    #[arg(long)]
    log: bool,
  },

  /// Load and validate a rule
  Check {
    /// Rule identifier
    identifier: String,

    /// Reference document whose directory resolves relative rule paths
    #[arg(long)]
    reference: Option<PathBuf>,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let result = match cli.command {
    Commands::Run {
      plan,
      dry_run,
      max_loops,
      timeout,
      no_halt_on_error,
      log,
    } => cmd_run(
      &plan,
      &RunArgs {
        config: cli.config,
        verbose: cli.verbose,
        dry_run,
        max_loops,
        timeout,
        no_halt_on_error,
        log,
      },
    ),
    Commands::Check { identifier, reference } => {
      cmd_check(&identifier, reference.as_deref(), cli.config.as_deref(), cli.verbose).map(|()| ExitCode::SUCCESS)
    }
  };

  match result {
    Ok(code) => code,
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}
