use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown operating system '{0}'; expected one of: windows, linux, mac, unix, aix, irix, os2, solaris")]
pub struct UnknownOs(pub String);

/// Operating system families a rule can test for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
  Windows,
  Linux,
  Mac,
  Unix,
  Aix,
  Irix,
  Os2,
  Solaris,
}

/// `std::env::consts::OS` values of Unix-like targets.
const UNIX_LIKE: &[&str] = &[
  "linux",
  "macos",
  "ios",
  "android",
  "freebsd",
  "openbsd",
  "netbsd",
  "dragonfly",
  "solaris",
  "illumos",
  "aix",
  "haiku",
];

impl OsFamily {
  /// Whether the running system belongs to this family.
  pub fn is_current(&self) -> bool {
    self.matches(std::env::consts::OS)
  }

  /// Whether an OS identifier (as in `std::env::consts::OS`) belongs to this family.
  pub fn matches(&self, os: &str) -> bool {
    match self {
      Self::Windows => os == "windows",
      Self::Linux => os == "linux",
      Self::Mac => os == "macos",
      Self::Unix => UNIX_LIKE.contains(&os),
      Self::Aix => os == "aix",
      Self::Solaris => matches!(os, "solaris" | "illumos"),
      // No Rust target runs on these.
      Self::Irix | Self::Os2 => false,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Windows => "windows",
      Self::Linux => "linux",
      Self::Mac => "mac",
      Self::Unix => "unix",
      Self::Aix => "aix",
      Self::Irix => "irix",
      Self::Os2 => "os2",
      Self::Solaris => "solaris",
    }
  }
}

impl FromStr for OsFamily {
  type Err = UnknownOs;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "windows" => Ok(Self::Windows),
      "linux" => Ok(Self::Linux),
      "mac" => Ok(Self::Mac),
      "unix" => Ok(Self::Unix),
      "aix" => Ok(Self::Aix),
      "irix" => Ok(Self::Irix),
      "os2" => Ok(Self::Os2),
      "solaris" => Ok(Self::Solaris),
      _ => Err(UnknownOs(s.to_string())),
    }
  }
}

impl fmt::Display for OsFamily {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
