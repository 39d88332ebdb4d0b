//! Scanner module for directory traversal and content fingerprinting.
//!
//! This module provides functionality for:
//! - Directory walking using jwalk (one metadata query per entry)
//! - Content fingerprinting with xxHash64 (prefix and whole-file)
//! - A scoped pool of open read handles shared by the hashing stages
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: xxHash64 fingerprints over a bounded prefix or a whole file
//! - [`handles`]: Per-run cache of open handles between hashing stages
//!
//! # Example
//!
//! ```no_run
//! use dupsift::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! println!("observed {} entries", walker.stats().observed);
//! ```

pub mod handles;
pub mod hasher;
pub mod walker;

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

// Re-export main types
pub use handles::{HandlePool, PoolStats, DEFAULT_MAX_OPEN_HANDLES};
pub use hasher::{hash_bytes, Fingerprint, Hasher, DEFAULT_PIECE_COUNT, DEFAULT_PIECE_SIZE};
pub use walker::{WalkStats, Walker};

/// A regular file discovered during traversal.
///
/// Identity is the path. Records are created by the walker and never
/// mutated afterwards; each pipeline stage either passes a record on or
/// drops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes at traversal time
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

impl FileRecord {
    /// Create a new FileRecord.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            size,
            modified,
        }
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Off by default: a link is treated as an intentional "duplicate".
    pub follow_symlinks: bool,

    /// Stop enumeration once this many entries have been observed.
    pub limit: Option<usize>,
}

impl WalkerConfig {
    /// Create a new configuration from CLI arguments.
    #[must_use]
    pub fn new(follow_symlinks: bool, limit: Option<usize>) -> Self {
        Self {
            follow_symlinks,
            limit,
        }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The entry vanished between listing and stat.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing an entry.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A file could not be fingerprinted.
    #[error(transparent)]
    Hash(#[from] HashError),
}

impl ScanError {
    /// Classify an I/O error raised while stat-ing `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Why a file could not be fingerprinted.
///
/// A failed hash is never represented by a sentinel value; callers always
/// get either a [`Fingerprint`] or one of these reasons.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file was removed before it could be opened.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when opening or reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The file could not be opened.
    #[error("Could not open {path}: {source}")]
    Open {
        /// Path of the file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Reading the file failed part way through.
    #[error("Read failed for {path}: {source}")]
    Read {
        /// Path of the file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
    /// Classify a failure to open `path`.
    #[must_use]
    pub fn open(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Open {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Classify a failure while reading `path`.
    #[must_use]
    pub fn read(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Read {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path of the file that failed.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path) | Self::PermissionDenied(path) => path,
            Self::Open { path, .. } | Self::Read { path, .. } => path,
        }
    }
}
