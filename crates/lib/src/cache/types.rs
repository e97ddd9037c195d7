use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hash::Checksum;

/// Current version of the cache file format.
pub const CACHE_DATABASE_VERSION: u32 = 1;

/// Persistent mapping from canonical file path to last observed checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheDatabase {
  pub version: u32,
  #[serde(default)]
  pub entries: BTreeMap<String, Checksum>,
}

impl CacheDatabase {
  pub fn new() -> Self {
    Self {
      version: CACHE_DATABASE_VERSION,
      entries: BTreeMap::new(),
    }
  }
}

impl Default for CacheDatabase {
  fn default() -> Self {
    Self::new()
  }
}

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("could not resolve '{path}': {source}")]
  Canonicalize {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("could not hash '{path}': {source}")]
  Hash {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("could not load the cache database '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("could not load the cache database '{path}': {message}")]
  Corrupt { path: PathBuf, message: String },

  #[error("could not save the cache database '{path}': {source}")]
  Save {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl CacheError {
  /// Whether this error came from loading the database.
  pub fn is_load_error(&self) -> bool {
    matches!(self, CacheError::Read { .. } | CacheError::Corrupt { .. })
  }
}
