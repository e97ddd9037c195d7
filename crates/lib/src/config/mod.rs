//! Typed run configuration.
//!
//! [`Config`] is threaded through the interpreter, evaluator and process
//! executor. A [`ConfigFile`] loaded from YAML is applied on top of the
//! defaults; the CLI then applies its own flags.

mod file;

pub use file::{ConfigFile, TimeoutFile};

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{APP_NAME, CONFIG_FILENAME, DEFAULT_MAX_LOOPS, RULES_DIR};
use crate::types::Version;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read configuration '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse configuration '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },

  #[error("invalid value for '{key}': {message}")]
  InvalidValue { key: &'static str, message: String },
}

/// Unit of the timeout value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
  #[default]
  #[serde(alias = "ms")]
  Milliseconds,
  #[serde(alias = "s")]
  Seconds,
  #[serde(alias = "min")]
  Minutes,
  #[serde(alias = "h")]
  Hours,
}

impl TimeUnit {
  pub fn duration(&self, value: u64) -> Duration {
    match self {
      TimeUnit::Milliseconds => Duration::from_millis(value),
      TimeUnit::Seconds => Duration::from_secs(value),
      TimeUnit::Minutes => Duration::from_secs(value.saturating_mul(60)),
      TimeUnit::Hours => Duration::from_secs(value.saturating_mul(3600)),
    }
  }
}

/// Process timeout settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutConfig {
  pub enabled: bool,
  pub value: u64,
  pub unit: TimeUnit,
}

impl TimeoutConfig {
  pub fn from_duration(duration: Duration) -> Self {
    Self {
      enabled: true,
      value: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
      unit: TimeUnit::Milliseconds,
    }
  }
}

/// Everything the engine reads from configuration.
#[derive(Debug, Clone)]
pub struct Config {
  pub max_loops: u64,
  pub halt_on_error: bool,
  pub dry_run: bool,
  pub verbose: bool,
  pub timeout: TimeoutConfig,
  /// Searched in order; the first directory holding the rule wins.
  pub rule_paths: Vec<PathBuf>,
  pub cache_name: String,
  pub log_name: String,
  pub logging: bool,
  pub application_version: Version,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      max_loops: DEFAULT_MAX_LOOPS,
      halt_on_error: true,
      dry_run: false,
      verbose: false,
      timeout: TimeoutConfig::default(),
      rule_paths: vec![default_rule_path()],
      cache_name: APP_NAME.to_string(),
      log_name: APP_NAME.to_string(),
      logging: false,
      application_version: Version::default(),
    }
  }
}

impl Config {
  /// Defaults overlaid with the user configuration file, if one exists.
  pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
    let mut config = Config::default();
    let path = match explicit {
      Some(path) => Some(path.to_path_buf()),
      None => user_config_path().filter(|p| p.is_file()),
    };
    if let Some(path) = path {
      tracing::debug!(path = %path.display(), "loading configuration");
      config.apply(ConfigFile::load(&path)?)?;
    }
    Ok(config)
  }

  /// Apply a configuration file on top of this configuration.
  pub fn apply(&mut self, file: ConfigFile) -> Result<(), ConfigError> {
    if let Some(paths) = file.rule_paths {
      self.rule_paths = paths;
    }
    self.rule_paths = normalize_paths(std::mem::take(&mut self.rule_paths));

    if let Some(loops) = file.maximum_loops {
      if loops == 0 {
        return Err(ConfigError::InvalidValue {
          key: "maximum-loops",
          message: "must be greater than zero".to_string(),
        });
      }
      self.max_loops = loops;
    }
    if let Some(halt) = file.halt_on_error {
      self.halt_on_error = halt;
    }
    if let Some(name) = file.cache_name {
      self.cache_name = clean_name(&name);
    }
    if let Some(name) = file.log_name {
      self.log_name = clean_name(&name);
    }
    if let Some(verbose) = file.verbose {
      self.verbose = verbose;
    }
    if let Some(logging) = file.logging {
      self.logging = logging;
    }
    if let Some(timeout) = file.timeout {
      if let Some(value) = timeout.value {
        if value == 0 {
          return Err(ConfigError::InvalidValue {
            key: "timeout.value",
            message: "must be greater than zero".to_string(),
          });
        }
        self.timeout.value = value;
      }
      if let Some(enabled) = timeout.enabled {
        self.timeout.enabled = enabled;
      }
      if let Some(unit) = timeout.unit {
        self.timeout.unit = unit;
      }
    }
    Ok(())
  }
}

/// `<directory of the executable>/rules`.
pub fn default_rule_path() -> PathBuf {
  std::env::current_exe()
    .ok()
    .and_then(|exe| exe.parent().map(Path::to_path_buf))
    .unwrap_or_else(|| PathBuf::from("."))
    .join(RULES_DIR)
}

/// `~/.kestrel.yaml`, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
  dirs::home_dir().map(|home| home.join(CONFIG_FILENAME))
}

/// Append the default rule path and drop duplicates, keeping first occurrences.
fn normalize_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
  let mut result: Vec<PathBuf> = Vec::with_capacity(paths.len() + 1);
  for path in paths.into_iter().chain(std::iter::once(default_rule_path())) {
    if !result.contains(&path) {
      result.push(path);
    }
  }
  result
}

/// Reduce a name to a bare file name, falling back to the application name.
fn clean_name(name: &str) -> String {
  let cleaned = Path::new(name.trim())
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  if cleaned.is_empty() { APP_NAME.to_string() } else { cleaned }
}
