//! Tracing setup: stderr always, plus a plain-text log file on request.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// The console honours `RUST_LOG`, defaulting to `warn` (`info` when verbose).
/// The log file, when given, records everything at `info` and above.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
  let default = if verbose { "info" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  let console = fmt::layer()
    .with_writer(std::io::stderr)
    .without_time()
    .with_target(false)
    .with_filter(filter);

  let file = match log_file {
    Some(path) => {
      let file = File::create(path).with_context(|| format!("Failed to create log file: {}", path.display()))?;
      Some(
        fmt::layer()
          .with_writer(Mutex::new(file))
          .with_ansi(false)
          .with_filter(LevelFilter::INFO),
      )
    }
    None => None,
  };

  tracing_subscriber::registry()
    .with(console)
    .with(file)
    .try_init()
    .context("Failed to initialize logging")?;
  Ok(())
}
