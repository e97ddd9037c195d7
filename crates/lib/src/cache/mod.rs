//! Change-detection cache.
//!
//! Tracks a checksum per canonical file path so rules can ask "has this file
//! changed since the last time anyone asked?". The whole database lives in
//! one JSON file next to the reference file:
//!
//! ```text
//! <reference dir>/
//! ├── doc.tex
//! └── kestrel.json     # CacheDatabase
//! ```
//!
//! Every query that changes state does a full load-mutate-save cycle.

mod types;

pub use types::{CACHE_DATABASE_VERSION, CacheDatabase, CacheError};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::CACHE_EXTENSION;
use crate::util::hash::checksum_file;
use crate::util::paths;

/// Handle to one cache database file.
#[derive(Debug, Clone)]
pub struct ChangeCache {
  path: PathBuf,
}

impl ChangeCache {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  /// The cache named `name` next to `reference`.
  pub fn for_reference(reference: &Path, name: &str) -> Result<Self, CacheError> {
    let dir = paths::canonical_parent(reference).map_err(|source| CacheError::Canonicalize {
      path: reference.to_path_buf(),
      source,
    })?;
    Ok(Self::new(dir.join(format!("{name}.{CACHE_EXTENSION}"))))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Load the database. A missing file is an empty database.
  pub fn load(&self) -> Result<CacheDatabase, CacheError> {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CacheDatabase::new()),
      Err(source) => {
        return Err(CacheError::Read {
          path: self.path.clone(),
          source,
        });
      }
    };

    let database: CacheDatabase = serde_json::from_str(&content).map_err(|e| CacheError::Corrupt {
      path: self.path.clone(),
      message: e.to_string(),
    })?;

    if database.version != CACHE_DATABASE_VERSION {
      return Err(CacheError::Corrupt {
        path: self.path.clone(),
        message: format!("unsupported version {}", database.version),
      });
    }

    Ok(database)
  }

  /// Save the database.
  ///
  /// Uses atomic write (write to temp, then rename) to prevent corruption.
  pub fn save(&self, database: &CacheDatabase) -> Result<(), CacheError> {
    let save_error = |source| CacheError::Save {
      path: self.path.clone(),
      source,
    };

    let temp_path = self.path.with_extension(format!("{CACHE_EXTENSION}.tmp"));
    let content = serde_json::to_string_pretty(database).map_err(|e| save_error(io::Error::other(e)))?;
    fs::write(&temp_path, &content).map_err(save_error)?;
    fs::rename(&temp_path, &self.path).map_err(save_error)?;

    Ok(())
  }

  /// Whether `file` changed since the last query.
  ///
  /// Appearance, disappearance and content changes all count as changed.
  /// A file that is missing and was never tracked is unchanged.
  pub fn has_changed(&self, file: &Path) -> Result<bool, CacheError> {
    let canonical = paths::canonical(file).map_err(|source| CacheError::Canonicalize {
      path: file.to_path_buf(),
      source,
    })?;
    let key = canonical.to_string_lossy().into_owned();
    let mut database = self.load()?;

    if !canonical.exists() {
      if database.entries.remove(&key).is_some() {
        debug!(file = %key, "tracked file disappeared");
        self.save(&database)?;
        return Ok(true);
      }
      return Ok(false);
    }

    let checksum = checksum_file(&canonical).map_err(|source| CacheError::Hash {
      path: canonical.clone(),
      source,
    })?;

    if database.entries.get(&key) == Some(&checksum) {
      return Ok(false);
    }

    debug!(file = %key, checksum = %checksum, "file changed");
    database.entries.insert(key, checksum);
    self.save(&database)?;
    Ok(true)
  }
}
