//! Process executor.
//!
//! Runs a rule's system command, capturing combined stdout/stderr into one
//! buffer. In verbose mode the output is also teed to our own streams as it
//! arrives. The exit code is returned as-is; interpreting it is the rule's
//! job.

mod command;
mod group;

pub use command::{CommandLine, split_command};
pub use group::interrupt;

use group::ProcessGroup;

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, TimeoutConfig};

#[derive(Debug, Error)]
pub enum ProcessError {
  #[error("invalid command '{command}': {message}")]
  InvalidCommand { command: String, message: String },

  #[error("the timeout is enabled but its value is zero")]
  InvalidTimeoutRange,

  #[error("failed to run '{command}': {source}")]
  Io {
    command: String,
    #[source]
    source: std::io::Error,
  },

  #[error("'{command}' was interrupted")]
  Interrupted { command: String },

  #[error("'{command}' timed out after {timeout:?}")]
  Timeout { command: String, timeout: Duration },

  #[error("'{command}' terminated without an exit code")]
  AbnormalExit { command: String },
}

/// How to run a command.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
  pub verbose: bool,
  pub timeout: TimeoutConfig,
  pub working_dir: Option<PathBuf>,
}

impl ProcessOptions {
  pub fn from_config(config: &Config, working_dir: Option<PathBuf>) -> Self {
    Self {
      verbose: config.verbose,
      timeout: config.timeout,
      working_dir,
    }
  }

  /// The effective timeout, if any.
  pub fn timeout(&self) -> Result<Option<Duration>, ProcessError> {
    if !self.timeout.enabled {
      return Ok(None);
    }
    if self.timeout.value == 0 {
      return Err(ProcessError::InvalidTimeoutRange);
    }
    Ok(Some(self.timeout.unit.duration(self.timeout.value)))
  }
}

/// Result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
  pub code: i32,
  /// Combined stdout and stderr, in arrival order.
  pub output: String,
}

#[derive(Clone, Copy)]
enum Tee {
  Stdout,
  Stderr,
}

/// Run a command to completion.
///
/// The command leads its own process group. On timeout, on [`interrupt`] and
/// when this future is dropped early, the whole group is killed. The timeout
/// also bounds draining the output, which descendants may hold open after
/// the command itself exits.
pub async fn run(command: &CommandLine, options: &ProcessOptions) -> Result<ProcessOutput, ProcessError> {
  let timeout = options.timeout()?;
  let argv = command.argv()?;
  let shown = command.to_string();
  let io_error = |source| ProcessError::Io {
    command: shown.clone(),
    source,
  };

  let mut cmd = Command::new(&argv[0]);
  cmd
    .args(&argv[1..])
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .stdin(if options.verbose { Stdio::inherit() } else { Stdio::null() })
    .kill_on_drop(true);
  #[cfg(unix)]
  cmd.process_group(0);
  if let Some(dir) = &options.working_dir {
    cmd.current_dir(dir);
  }

  debug!(command = %shown, working_dir = ?options.working_dir, "spawning process");
  let mut child = cmd.spawn().map_err(io_error)?;
  let deadline = timeout.map(|t| Instant::now() + t);
  let group = child.id().map(ProcessGroup::track);

  let buffer = Arc::new(Mutex::new(Vec::new()));
  let tee = |stream| options.verbose.then_some(stream);
  let mut pumps = Vec::new();
  if let Some(stdout) = child.stdout.take() {
    pumps.push(tokio::spawn(pump(stdout, buffer.clone(), tee(Tee::Stdout))));
  }
  if let Some(stderr) = child.stderr.take() {
    pumps.push(tokio::spawn(pump(stderr, buffer.clone(), tee(Tee::Stderr))));
  }
  let aborts: Vec<AbortHandle> = pumps.iter().map(JoinHandle::abort_handle).collect();

  let status = tokio::select! {
    status = child.wait() => status.map_err(io_error)?,
    _ = expiry(deadline) => {
      terminate(&mut child, group.as_ref(), &aborts, &shown).await;
      return Err(ProcessError::Timeout {
        command: shown.clone(),
        timeout: timeout.unwrap_or_default(),
      });
    }
  };

  let drain = async {
    for handle in pumps {
      match handle.await {
        Ok(result) => result?,
        Err(e) => return Err(std::io::Error::other(e)),
      }
    }
    Ok::<(), std::io::Error>(())
  };
  let drained = match deadline {
    Some(deadline) => match tokio::time::timeout_at(deadline, drain).await {
      Ok(drained) => drained,
      Err(_) => {
        debug!(command = %shown, "output still open at the deadline");
        terminate(&mut child, group.as_ref(), &aborts, &shown).await;
        return Err(ProcessError::Timeout {
          command: shown.clone(),
          timeout: timeout.unwrap_or_default(),
        });
      }
    },
    None => drain.await,
  };

  if group.as_ref().is_some_and(ProcessGroup::interrupted) {
    return Err(ProcessError::Interrupted { command: shown.clone() });
  }
  drained.map_err(io_error)?;
  if let Some(group) = group {
    group.release();
  }

  let output = {
    let bytes = buffer.lock().map_err(|_| io_error(std::io::Error::other("output buffer poisoned")))?;
    String::from_utf8_lossy(&bytes).into_owned()
  };
  info!(command = %shown, "begin of output buffer\n{}\nend of output buffer", output.trim_end());

  let code = status.code().ok_or_else(|| ProcessError::AbnormalExit {
    command: shown.clone(),
  })?;
  debug!(command = %shown, code, "process finished");

  Ok(ProcessOutput { code, output })
}

/// Resolves at `deadline`, or never.
async fn expiry(deadline: Option<Instant>) {
  match deadline {
    Some(deadline) => tokio::time::sleep_until(deadline).await,
    None => std::future::pending().await,
  }
}

/// Kill the command's process group, reap the command and stop its pumps.
async fn terminate(child: &mut Child, group: Option<&ProcessGroup>, pumps: &[AbortHandle], shown: &str) {
  if let Some(group) = group {
    if let Err(e) = group.kill() {
      warn!(command = %shown, error = %e, "failed to kill process group");
    }
  }
  // The command itself may already be reaped when only its output is late.
  if !matches!(child.try_wait(), Ok(Some(_))) {
    if let Err(e) = child.kill().await {
      warn!(command = %shown, error = %e, "failed to kill process");
    }
  }
  pumps.iter().for_each(AbortHandle::abort);
}

/// Copy a child stream into the shared buffer, teeing it when asked.
async fn pump<R>(mut reader: R, buffer: Arc<Mutex<Vec<u8>>>, tee: Option<Tee>) -> std::io::Result<()>
where
  R: AsyncRead + Unpin,
{
  let mut chunk = [0u8; 4096];
  loop {
    let read = reader.read(&mut chunk).await?;
    if read == 0 {
      return Ok(());
    }
    match tee {
      Some(Tee::Stdout) => {
        let mut out = tokio::io::stdout();
        out.write_all(&chunk[..read]).await?;
        out.flush().await?;
      }
      Some(Tee::Stderr) => {
        let mut err = tokio::io::stderr();
        err.write_all(&chunk[..read]).await?;
        err.flush().await?;
      }
      None => {}
    }
    buffer
      .lock()
      .map_err(|_| std::io::Error::other("output buffer poisoned"))?
      .extend_from_slice(&chunk[..read]);
  }
}
