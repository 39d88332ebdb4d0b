//! Scoped pool of open read handles.
//!
//! The prefix stage opens every candidate. Files whose prefix does not cover
//! their whole content are likely to be read again by the full stage, so the
//! open handle is parked here instead of being closed and reopened.
//!
//! A pool belongs to exactly one pipeline run. Handles leave the pool when a
//! stage checks them out, when a file is eliminated ([`HandlePool::evict`]),
//! when the run calls [`HandlePool::release`], and finally on drop.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::HashError;

/// Default upper bound on handles kept open at once.
pub const DEFAULT_MAX_OPEN_HANDLES: usize = 256;

/// Counters describing how the pool was used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Files opened from scratch
    pub opened: usize,
    /// Checkouts served by a parked handle
    pub reused: usize,
    /// Handles closed because the pool was full
    pub rejected: usize,
}

/// Per-run cache of open file handles keyed by path.
#[derive(Debug)]
pub struct HandlePool {
    handles: Mutex<HashMap<PathBuf, File>>,
    capacity: usize,
    opened: AtomicUsize,
    reused: AtomicUsize,
    rejected: AtomicUsize,
}

impl Default for HandlePool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OPEN_HANDLES)
    }
}

impl HandlePool {
    /// Create a pool holding at most `capacity` handles.
    ///
    /// A capacity of zero disables caching; every checkout opens the file.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
            capacity,
            opened: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
            rejected: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, File>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the parked handle for `path`, or open the file.
    ///
    /// The returned handle may be positioned anywhere; callers that need the
    /// start of the file must rewind it.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] if the file has to be opened and cannot be.
    pub fn checkout(&self, path: &Path) -> Result<File, HashError> {
        let parked = self.lock().remove(path);
        if let Some(file) = parked {
            self.reused.fetch_add(1, Ordering::Relaxed);
            log::trace!("Reusing open handle: {}", path.display());
            return Ok(file);
        }

        let file = File::open(path).map_err(|e| HashError::open(path, e))?;
        self.opened.fetch_add(1, Ordering::Relaxed);
        Ok(file)
    }

    /// Park an open handle for a later stage.
    ///
    /// Returns `false` (and closes the handle) when the pool is full.
    pub fn checkin(&self, path: &Path, file: File) -> bool {
        let mut handles = self.lock();
        if handles.len() >= self.capacity && !handles.contains_key(path) {
            drop(handles);
            drop(file);
            self.rejected.fetch_add(1, Ordering::Relaxed);
            log::trace!("Handle pool full, closing: {}", path.display());
            return false;
        }
        handles.insert(path.to_path_buf(), file);
        true
    }

    /// Close the parked handle for a file that has been eliminated.
    pub fn evict(&self, path: &Path) -> bool {
        self.lock().remove(path).is_some()
    }

    /// Number of handles currently parked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no handles are parked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Usage counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            opened: self.opened.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    /// Close every parked handle. Returns how many were closed.
    pub fn release(&self) -> usize {
        let drained: Vec<(PathBuf, File)> = self.lock().drain().collect();
        drained.len()
    }
}

impl Drop for HandlePool {
    fn drop(&mut self) {
        let closed = self.release();
        if closed > 0 {
            log::debug!("Handle pool dropped with {} open handle(s)", closed);
        }
    }
}
