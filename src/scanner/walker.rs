//! Directory walker implementation using jwalk.
//!
//! # Overview
//!
//! [`Walker`] enumerates every regular file below a root and yields a
//! [`FileRecord`] for each. It performs exactly one metadata query per
//! entry (without following links unless configured to) and skips
//! everything that is not a regular file.
//!
//! # Features
//!
//! - Deterministic discovery order (children sorted by name per directory)
//! - Symlinks skipped by default, followed on request
//! - An "entries observed" counter for progress reporting
//! - Optional hard cap on observed entries (partial runs)
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use dupsift::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     limit: Some(10_000),
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), config);
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! let stats = walker.stats();
//! println!("{} files, limit hit: {}", files.len(), stats.limit_reached);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use jwalk::WalkDir;

use super::{FileRecord, ScanError, WalkerConfig};
use crate::progress::ProgressCallback;

/// Snapshot of the walker's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Non-directory entries seen (regular or not)
    pub observed: usize,
    /// Entries skipped because they are not regular files (or are unfollowed links)
    pub excluded: usize,
    /// Entries that could not be stat-ed or listed
    pub errors: usize,
    /// Whether enumeration stopped at the configured limit
    pub limit_reached: bool,
}

#[derive(Debug, Default)]
struct WalkCounters {
    observed: AtomicUsize,
    excluded: AtomicUsize,
    errors: AtomicUsize,
}

/// Directory walker for file discovery.
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback, fed the observed counter
    progress_callback: Option<Arc<dyn ProgressCallback>>,
    counters: WalkCounters,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("counters", &self.counters)
            .finish()
    }
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dupsift::scanner::{Walker, WalkerConfig};
    /// use std::path::Path;
    ///
    /// let walker = Walker::new(Path::new("."), WalkerConfig::default());
    /// ```
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
            progress_callback: None,
            counters: WalkCounters::default(),
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn limit_reached(&self) -> bool {
        self.config
            .limit
            .is_some_and(|cap| self.counters.observed.load(Ordering::SeqCst) >= cap)
    }

    /// Current counter values.
    #[must_use]
    pub fn stats(&self) -> WalkStats {
        WalkStats {
            observed: self.counters.observed.load(Ordering::SeqCst),
            excluded: self.counters.excluded.load(Ordering::SeqCst),
            errors: self.counters.errors.load(Ordering::SeqCst),
            limit_reached: self.limit_reached(),
        }
    }

    /// Walk the directory tree, yielding file records.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration. Iteration ends early when the limit is reached or shutdown
    /// is requested; both are checked between entries.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileRecord, ScanError>> + '_ {
        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(false)
            .process_read_dir(|_depth, _path, _read_dir_state, children| {
                // Sort children for deterministic output
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        walk_dir
            .into_iter()
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    return false;
                }
                if self.limit_reached() {
                    log::info!(
                        "Walker: limit of {} entries reached, stopping enumeration",
                        self.config.limit.unwrap_or_default()
                    );
                    return false;
                }
                true
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    if entry.file_type().is_dir() {
                        return None;
                    }
                    self.process_entry(entry.path(), entry.file_type().is_symlink())
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    self.counters.errors.fetch_add(1, Ordering::SeqCst);
                    log::warn!("Walker error for {}: {}", path.display(), e);
                    Some(Err(ScanError::Io {
                        path,
                        source: std::io::Error::other(e.to_string()),
                    }))
                }
            })
    }

    /// Stat a non-directory entry and turn it into a record if it is a regular file.
    fn process_entry(
        &self,
        path: PathBuf,
        is_symlink: bool,
    ) -> Option<Result<FileRecord, ScanError>> {
        let observed = self.counters.observed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(ref callback) = self.progress_callback {
            callback.on_progress(observed, path.to_string_lossy().as_ref());
        }

        if is_symlink && !self.config.follow_symlinks {
            self.counters.excluded.fetch_add(1, Ordering::SeqCst);
            log::trace!("Skipping symlink: {}", path.display());
            return None;
        }

        let metadata = if self.config.follow_symlinks {
            fs::metadata(&path)
        } else {
            fs::symlink_metadata(&path)
        };

        let metadata = match metadata {
            Ok(m) => m,
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::SeqCst);
                let err = ScanError::from_io(&path, e);
                log::warn!("{}", err);
                return Some(Err(err));
            }
        };

        if !metadata.is_file() {
            self.counters.excluded.fetch_add(1, Ordering::SeqCst);
            log::trace!("Skipping non-regular entry: {}", path.display());
            return None;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Some(Ok(FileRecord::new(path, metadata.len(), modified)))
    }
}
