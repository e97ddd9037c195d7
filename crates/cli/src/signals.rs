//! Termination signals for the whole run.
//!
//! Installed once per run. A signal kills the process groups of running
//! commands, which then fail as interrupted and end the run. A signal that
//! arrives while no command runs ends kestrel at once.

use std::io;

use tracing::warn;

use kestrel_lib::process;

use crate::output::print_warning;

/// Exit status after an interrupt with nothing left to kill.
const INTERRUPTED_EXIT: i32 = 130;

/// Listen for SIGINT, SIGTERM and SIGHUP (Ctrl-C elsewhere) until the run ends.
pub async fn listen() {
  let mut signals = match Signals::install() {
    Ok(signals) => signals,
    Err(e) => {
      warn!(error = %e, "failed to install signal handlers");
      return;
    }
  };

  loop {
    if let Err(e) = signals.recv().await {
      warn!(error = %e, "signal listener stopped");
      return;
    }
    if process::interrupt() == 0 {
      print_warning("Interrupted");
      std::process::exit(INTERRUPTED_EXIT);
    }
  }
}

#[cfg(unix)]
struct Signals {
  interrupt: tokio::signal::unix::Signal,
  terminate: tokio::signal::unix::Signal,
  hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
  fn install() -> io::Result<Self> {
    use tokio::signal::unix::{SignalKind, signal};

    Ok(Self {
      interrupt: signal(SignalKind::interrupt())?,
      terminate: signal(SignalKind::terminate())?,
      hangup: signal(SignalKind::hangup())?,
    })
  }

  async fn recv(&mut self) -> io::Result<()> {
    tokio::select! {
      _ = self.interrupt.recv() => {}
      _ = self.terminate.recv() => {}
      _ = self.hangup.recv() => {}
    }
    Ok(())
  }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
  fn install() -> io::Result<Self> {
    Ok(Self)
  }

  async fn recv(&mut self) -> io::Result<()> {
    tokio::signal::ctrl_c().await
  }
}
