//! Content checksums for change detection.
//!
//! A checksum is the first 32 bits of the SHA-256 digest of a file,
//! hex-encoded (8 characters).

use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of digest bytes kept in a checksum.
const CHECKSUM_BYTES: usize = 4;

/// A 32-bit content checksum, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(pub String);

impl fmt::Display for Checksum {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Checksum a file's contents, streaming it through the hasher.
pub fn checksum_file(path: &Path) -> io::Result<Checksum> {
  let mut file = fs::File::open(path)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(truncate(hasher.finalize().as_slice()))
}

/// Checksum arbitrary bytes.
pub fn checksum_bytes(data: &[u8]) -> Checksum {
  truncate(Sha256::digest(data).as_slice())
}

fn truncate(digest: &[u8]) -> Checksum {
  Checksum(hex::encode(&digest[..CHECKSUM_BYTES]))
}
