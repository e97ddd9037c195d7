//! Test utilities for kestrel-lib.

use crate::process::CommandLine;

/// A command running `script` through the platform shell.
#[cfg(unix)]
pub fn shell(script: &str) -> CommandLine {
  CommandLine::Args(vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell(script: &str) -> CommandLine {
  CommandLine::Args(vec!["cmd.exe".to_string(), "/C".to_string(), script.to_string()])
}
