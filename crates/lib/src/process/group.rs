//! Process groups of running commands.
//!
//! Every spawned command leads its own process group so that a timeout or an
//! interrupt reaches the whole tree it started, not just the direct child.
//! Live groups are tracked process-wide; [`interrupt`] kills all of them.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

/// Live process groups, mapped to whether they were interrupted.
static LIVE: Mutex<BTreeMap<u32, bool>> = Mutex::new(BTreeMap::new());

/// A tracked process group, killed on drop unless released.
#[derive(Debug)]
pub(crate) struct ProcessGroup {
  id: u32,
  armed: bool,
}

impl ProcessGroup {
  /// Start tracking the group led by process `id`.
  pub(crate) fn track(id: u32) -> Self {
    LIVE.lock().unwrap_or_else(PoisonError::into_inner).insert(id, false);
    Self { id, armed: true }
  }

  /// Send SIGKILL to every process in the group.
  pub(crate) fn kill(&self) -> io::Result<()> {
    kill_group(self.id)
  }

  /// Whether [`interrupt`] reached this group.
  pub(crate) fn interrupted(&self) -> bool {
    LIVE
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&self.id)
      .copied()
      .unwrap_or(false)
  }

  /// Stop tracking without killing; the command finished normally.
  pub(crate) fn release(mut self) {
    self.armed = false;
  }
}

impl Drop for ProcessGroup {
  fn drop(&mut self) {
    LIVE.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.id);
    if self.armed {
      if let Err(e) = kill_group(self.id) {
        warn!(group = self.id, error = %e, "failed to kill abandoned process group");
      } else {
        debug!(group = self.id, "killed abandoned process group");
      }
    }
  }
}

/// Kill every live process group.
///
/// Returns how many groups were signalled. Each affected [`crate::process::run`]
/// call fails with `ProcessError::Interrupted`.
pub fn interrupt() -> usize {
  let mut live = LIVE.lock().unwrap_or_else(PoisonError::into_inner);
  for (id, interrupted) in live.iter_mut() {
    *interrupted = true;
    if let Err(e) = kill_group(*id) {
      warn!(group = *id, error = %e, "failed to interrupt process group");
    }
  }
  live.len()
}

#[cfg(unix)]
fn kill_group(id: u32) -> io::Result<()> {
  use rustix::io::Errno;
  use rustix::process::{Pid, Signal, kill_process_group};

  let pid = i32::try_from(id)
    .ok()
    .and_then(Pid::from_raw)
    .ok_or_else(|| io::Error::other(format!("invalid process group {id}")))?;
  match kill_process_group(pid, Signal::KILL) {
    // Already gone.
    Ok(()) | Err(Errno::SRCH) => Ok(()),
    Err(e) => Err(e.into()),
  }
}

#[cfg(not(unix))]
fn kill_group(_id: u32) -> io::Result<()> {
  Ok(())
}
