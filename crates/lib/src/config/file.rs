use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{ConfigError, TimeUnit};

/// On-disk configuration. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
  pub rule_paths: Option<Vec<PathBuf>>,
  pub maximum_loops: Option<u64>,
  pub halt_on_error: Option<bool>,
  pub cache_name: Option<String>,
  pub log_name: Option<String>,
  pub timeout: Option<TimeoutFile>,
  pub verbose: Option<bool>,
  pub logging: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutFile {
  pub enabled: Option<bool>,
  pub value: Option<u64>,
  pub unit: Option<TimeUnit>,
}

impl ConfigFile {
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    // An empty document deserializes as null; treat it as no settings.
    if content.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}
