//! xxHash64 content fingerprints with streaming reads.
//!
//! # Overview
//!
//! [`Hasher`] computes a 64-bit non-cryptographic fingerprint either over a
//! bounded prefix of a file (`piece_size * piece_count` bytes) or over the
//! whole file. Both use the same algorithm and seed, so for a file no larger
//! than the prefix span the two values are identical.
//!
//! Distinct content can collide on 64 bits. The pipeline accepts that
//! residual risk in exchange for throughput; reports name the algorithm so
//! the risk is visible.

use std::fmt;
use std::fs::File;
use std::hash::Hasher as _;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use super::HashError;

/// Default piece size in bytes (512 KiB).
pub const DEFAULT_PIECE_SIZE: u64 = 512 * 1024;

/// Default number of leading pieces hashed by the prefix stage.
pub const DEFAULT_PIECE_COUNT: u64 = 1;

/// Seed shared by every fingerprint in a run.
const SEED: u64 = 0;

/// Read buffer size for streaming.
const BUFFER_SIZE: usize = 64 * 1024;

/// A 64-bit content fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Fingerprint as 16 lowercase hex digits.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }

    /// Parse a fingerprint from hex.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hexadecimal or overflows 64 bits.
    pub fn from_hex(hex: &str) -> Result<Self, std::num::ParseIntError> {
        u64::from_str_radix(hex, 16).map(Self)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:016x})", self.0)
    }
}

/// Streaming xxHash64 fingerprinter.
#[derive(Debug, Clone)]
pub struct Hasher {
    piece_size: u64,
    piece_count: u64,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default piece layout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            piece_size: DEFAULT_PIECE_SIZE,
            piece_count: DEFAULT_PIECE_COUNT,
        }
    }

    /// Set the piece size and number of leading pieces for the prefix.
    ///
    /// Both values are clamped to at least 1.
    #[must_use]
    pub fn with_pieces(mut self, piece_size: u64, piece_count: u64) -> Self {
        self.piece_size = piece_size.max(1);
        self.piece_count = piece_count.max(1);
        self
    }

    /// Number of leading bytes covered by a prefix fingerprint.
    #[must_use]
    pub fn prefix_len(&self) -> u64 {
        self.piece_size.saturating_mul(self.piece_count)
    }

    /// Whether the prefix of a file of `size` bytes is the whole file.
    ///
    /// When this holds, the prefix fingerprint is the full fingerprint.
    #[must_use]
    pub fn covers(&self, size: u64) -> bool {
        size <= self.prefix_len()
    }

    /// Fingerprint the leading `prefix_len()` bytes of an open reader.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Read`] if reading fails.
    pub fn prefix_hash_reader<R: Read>(
        &self,
        reader: R,
        path: &Path,
    ) -> Result<Fingerprint, HashError> {
        hash_stream(reader.take(self.prefix_len()), path)
    }

    /// Fingerprint everything remaining in an open reader.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Read`] if reading fails.
    pub fn full_hash_reader<R: Read>(
        &self,
        reader: R,
        path: &Path,
    ) -> Result<Fingerprint, HashError> {
        hash_stream(reader, path)
    }

    /// Open `path` and fingerprint its prefix.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] naming why the file could not be opened or read.
    pub fn prefix_hash(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let file = File::open(path).map_err(|e| HashError::open(path, e))?;
        self.prefix_hash_reader(file, path)
    }

    /// Open `path` and fingerprint its whole content.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] naming why the file could not be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let file = File::open(path).map_err(|e| HashError::open(path, e))?;
        self.full_hash_reader(file, path)
    }
}

/// Fingerprint a byte slice already in memory.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> Fingerprint {
    let mut hasher = XxHash64::with_seed(SEED);
    hasher.write(data);
    Fingerprint(hasher.finish())
}

fn hash_stream<R: Read>(mut reader: R, path: &Path) -> Result<Fingerprint, HashError> {
    let mut hasher = XxHash64::with_seed(SEED);
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(HashError::read(path, e)),
        };
        hasher.write(&buffer[..n]);
    }

    Ok(Fingerprint(hasher.finish()))
}
