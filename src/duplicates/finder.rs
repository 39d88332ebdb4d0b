//! Duplicate finder implementation with staged candidate filtering.
//!
//! # Overview
//!
//! This module orchestrates the duplicate detection pipeline:
//! 1. **Walk**: enumerate regular files (see [`crate::scanner::walker`])
//! 2. **Size**: bucket by exact size (see [`crate::duplicates::groups`])
//! 3. **Quickstat** (optional): presume `(size, mtime)` matches are duplicates
//! 4. **Prefix hash**: xxHash64 over the leading `piece_size * piece_count` bytes
//! 5. **Full hash**: xxHash64 over whole content of prefix matches
//! 6. **Verify** (optional): audit the quickstat presumption against content
//!
//! Each hashing stage fans out on a bounded rayon pool and waits for every
//! item before grouping, so one stage never sees another's partial output.
//! A file that fails to hash is logged, counted and dropped; its siblings
//! carry on.
//!
//! # Example
//!
//! ```no_run
//! use dupsift::scanner::{HandlePool, Hasher, Walker, WalkerConfig};
//! use dupsift::duplicates::{index_by_size, phase2_prehash, PrehashConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! let records = walker.walk().filter_map(Result::ok);
//! let partition = index_by_size(records, 1).partition(false);
//!
//! let hasher = Hasher::new();
//! let pool = HandlePool::default();
//! let (buckets, stats) =
//!     phase2_prehash(partition.candidates, &hasher, &pool, &PrehashConfig::default());
//!
//! println!("{} files share a prefix with a sibling", stats.potential_duplicates);
//! # drop(buckets);
//! ```

use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use rayon::prelude::*;

use super::groups::{index_by_size, SizeBuckets};
use super::quickstat::group_by_time_and_size;
use super::report::{build_report, ScanReport, ScanSummary};
use super::verify::{verify_presumed, VerifyConfig};
use super::RunMode;
use crate::progress::{ProgressCallback, PHASE_FULLHASH, PHASE_PREHASH, PHASE_WALKING};
use crate::scanner::{
    FileRecord, Fingerprint, HandlePool, HashError, Hasher, ScanError, WalkStats, Walker,
    WalkerConfig, DEFAULT_MAX_OPEN_HANDLES, DEFAULT_PIECE_COUNT, DEFAULT_PIECE_SIZE,
};

/// Default number of I/O threads per hashing stage.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Bucket key for both hashing stages.
///
/// Size is part of the key so that files of different lengths never share a
/// bucket, even when their prefixes agree.
pub type BucketKey = (u64, Fingerprint);

/// Prefix-stage output: buckets of two or more entries sharing a prefix.
pub type PrefixBuckets = IndexMap<BucketKey, Vec<PrefixEntry>>;

/// Full-stage output: every hashed record keyed by its whole-content fingerprint.
pub type FullBuckets = IndexMap<BucketKey, Vec<FileRecord>>;

/// Settings shared by the parallel hashing stages.
#[derive(Clone)]
pub struct StageConfig {
    /// Number of I/O threads for parallel hashing.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

/// Configuration for the prefix stage.
pub type PrehashConfig = StageConfig;

/// Configuration for the full stage.
pub type FullhashConfig = StageConfig;

impl std::fmt::Debug for StageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageConfig")
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl StageConfig {
    /// Set the number of I/O threads (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
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
    pub(crate) fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    pub(crate) fn phase_start(&self, phase: &str, total: usize) {
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(phase, total);
        }
    }

    pub(crate) fn phase_end(&self, phase: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(phase);
        }
    }

    pub(crate) fn progress(&self, current: usize, path: &Path) {
        if let Some(ref callback) = self.progress_callback {
            callback.on_progress(current, path.to_string_lossy().as_ref());
        }
    }

    pub(crate) fn item_completed(&self, bytes: u64) {
        if let Some(ref callback) = self.progress_callback {
            callback.on_item_completed(bytes);
        }
    }
}

/// Run `op` inside a dedicated pool of `io_threads` workers.
///
/// Falls back to the global pool if the dedicated one cannot be built.
pub(crate) fn run_in_pool<T, F>(io_threads: usize, op: F) -> T
where
    F: FnOnce() -> T + Send,
    T: Send,
{
    match rayon::ThreadPoolBuilder::new()
        .num_threads(io_threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(op),
        Err(e) => {
            log::warn!(
                "Failed to create I/O thread pool ({}), using global pool with {} threads",
                e,
                rayon::current_num_threads()
            );
            op()
        }
    }
}

/// Per-item result of a parallel hashing stage.
enum HashOutcome<T> {
    Hashed(T),
    Failed(HashError),
    Skipped,
}

/// A record together with its prefix fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixEntry {
    /// The hashed record
    pub record: FileRecord,
    /// Fingerprint of the leading bytes
    pub prefix: Fingerprint,
    /// The prefix covered the whole file, so `prefix` is the full fingerprint
    pub complete: bool,
}

/// Statistics from the prefix stage.
#[derive(Debug, Default)]
pub struct PrehashStats {
    /// Files the stage tried to hash
    pub attempted: usize,
    /// Files hashed successfully
    pub hashed: usize,
    /// Files that failed to hash
    pub failed: usize,
    /// Files whose prefix was their whole content
    pub short_circuited: usize,
    /// Files ruled out because no sibling shared their prefix
    pub unique_prefixes: usize,
    /// Files passed on to the full stage
    pub potential_duplicates: usize,
    /// Buckets passed on to the full stage
    pub duplicate_groups: usize,
    /// Whether shutdown cut the stage short
    pub interrupted: bool,
    /// Per-file failures
    pub errors: Vec<HashError>,
}

impl PrehashStats {
    /// Percentage of hashed files eliminated by prefix comparison.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.hashed == 0 {
            0.0
        } else {
            (self.unique_prefixes as f64 / self.hashed as f64) * 100.0
        }
    }
}

/// Fingerprint the prefix of every candidate and bucket by `(size, prefix)`.
///
/// Buckets with a single member are dropped and their pooled handles closed.
/// Handles of surviving files whose prefix does not cover the whole file are
/// left in `pool` for the full stage.
pub fn phase2_prehash(
    candidates: SizeBuckets,
    hasher: &Hasher,
    pool: &HandlePool,
    config: &PrehashConfig,
) -> (PrefixBuckets, PrehashStats) {
    let mut stats = PrehashStats::default();
    let files: Vec<FileRecord> = candidates.into_values().flatten().collect();

    if files.is_empty() {
        log::debug!("Prefix stage: no files to process");
        return (PrefixBuckets::new(), stats);
    }

    config.phase_start(PHASE_PREHASH, files.len());
    log::info!(
        "Prefix stage: hashing up to {} bytes of {} files",
        hasher.prefix_len(),
        files.len()
    );

    let results: Vec<(FileRecord, HashOutcome<(Fingerprint, bool)>)> =
        run_in_pool(config.io_threads, || {
            files
                .into_par_iter()
                .enumerate()
                .map(|(idx, file)| {
                    if config.is_shutdown_requested() {
                        return (file, HashOutcome::Skipped);
                    }
                    config.progress(idx + 1, &file.path);

                    let outcome = match prefix_one(&file, hasher, pool) {
                        Ok(hashed) => {
                            config.item_completed(file.size.min(hasher.prefix_len()));
                            HashOutcome::Hashed(hashed)
                        }
                        Err(e) => {
                            log::warn!("Failed to prefix hash {}: {}", file.path.display(), e);
                            HashOutcome::Failed(e)
                        }
                    };
                    (file, outcome)
                })
                .collect()
        });

    if config.is_shutdown_requested() {
        stats.interrupted = true;
        log::info!("Prefix stage: interrupted by shutdown signal");
    }

    let mut buckets: PrefixBuckets = IndexMap::new();
    for (record, outcome) in results {
        match outcome {
            HashOutcome::Hashed((prefix, complete)) => {
                stats.attempted += 1;
                stats.hashed += 1;
                if complete {
                    stats.short_circuited += 1;
                }
                buckets
                    .entry((record.size, prefix))
                    .or_default()
                    .push(PrefixEntry {
                        record,
                        prefix,
                        complete,
                    });
            }
            HashOutcome::Failed(e) => {
                stats.attempted += 1;
                stats.failed += 1;
                pool.evict(&record.path);
                stats.errors.push(e);
            }
            HashOutcome::Skipped => {
                pool.evict(&record.path);
            }
        }
    }

    buckets.retain(|(size, prefix), entries| {
        if entries.len() < 2 {
            stats.unique_prefixes += entries.len();
            for entry in entries.iter() {
                pool.evict(&entry.record.path);
                log::trace!(
                    "Eliminated unique prefix {} ({} bytes): {}",
                    prefix,
                    size,
                    entry.record.path.display()
                );
            }
            false
        } else {
            stats.potential_duplicates += entries.len();
            stats.duplicate_groups += 1;
            log::debug!(
                "Prefix bucket {} ({} bytes): {} candidates",
                prefix,
                size,
                entries.len()
            );
            true
        }
    });

    config.phase_end(PHASE_PREHASH);

    log::info!(
        "Prefix stage complete: {} hashed ({} short-circuited, {} failed) → {} candidates ({:.1}% eliminated)",
        stats.hashed,
        stats.short_circuited,
        stats.failed,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    (buckets, stats)
}

fn prefix_one(
    file: &FileRecord,
    hasher: &Hasher,
    pool: &HandlePool,
) -> Result<(Fingerprint, bool), HashError> {
    let mut handle = pool.checkout(&file.path)?;
    let prefix = hasher.prefix_hash_reader(&mut handle, &file.path)?;
    let complete = hasher.covers(file.size);
    if complete {
        log::trace!("Prefix covers whole file: {}", file.path.display());
    } else {
        pool.checkin(&file.path, handle);
    }
    Ok((prefix, complete))
}

/// Statistics from the full stage.
#[derive(Debug, Default)]
pub struct FullhashStats {
    /// Files the stage needed a full fingerprint for
    pub attempted: usize,
    /// Files with a full fingerprint (read or reused)
    pub hashed: usize,
    /// Files whose prefix fingerprint was reused without a read
    pub reused: usize,
    /// Files that failed to hash
    pub failed: usize,
    /// Bytes read by this stage
    pub bytes_hashed: u64,
    /// Buckets with two or more identical files
    pub duplicate_groups: usize,
    /// Whether shutdown cut the stage short
    pub interrupted: bool,
    /// Per-file failures
    pub errors: Vec<HashError>,
}

/// Fingerprint whole content of every prefix match and bucket by `(size, hash)`.
///
/// Only prefix buckets with two or more members are processed. The returned
/// map holds every hashed record, singletons included; callers keep the
/// buckets with two or more members as duplicate groups.
pub fn phase3_fullhash(
    prefix_buckets: PrefixBuckets,
    hasher: &Hasher,
    pool: &HandlePool,
    config: &FullhashConfig,
) -> (FullBuckets, FullhashStats) {
    let mut stats = FullhashStats::default();
    let entries: Vec<PrefixEntry> = prefix_buckets
        .into_values()
        .filter(|entries| entries.len() > 1)
        .flatten()
        .collect();

    if entries.is_empty() {
        log::debug!("Full stage: no files to process");
        return (FullBuckets::new(), stats);
    }

    config.phase_start(PHASE_FULLHASH, entries.len());
    log::info!("Full stage: hashing {} files", entries.len());

    let results: Vec<(PrefixEntry, HashOutcome<(Fingerprint, bool)>)> =
        run_in_pool(config.io_threads, || {
            entries
                .into_par_iter()
                .enumerate()
                .map(|(idx, entry)| {
                    if config.is_shutdown_requested() {
                        return (entry, HashOutcome::Skipped);
                    }
                    config.progress(idx + 1, &entry.record.path);

                    if entry.complete {
                        let prefix = entry.prefix;
                        return (entry, HashOutcome::Hashed((prefix, true)));
                    }

                    let outcome = match full_one(&entry.record.path, hasher, pool) {
                        Ok(fingerprint) => {
                            config.item_completed(entry.record.size);
                            HashOutcome::Hashed((fingerprint, false))
                        }
                        Err(e) => {
                            log::warn!(
                                "Failed to full hash {}: {}",
                                entry.record.path.display(),
                                e
                            );
                            HashOutcome::Failed(e)
                        }
                    };
                    (entry, outcome)
                })
                .collect()
        });

    if config.is_shutdown_requested() {
        stats.interrupted = true;
        log::info!("Full stage: interrupted by shutdown signal");
    }

    let mut buckets: FullBuckets = IndexMap::new();
    for (entry, outcome) in results {
        match outcome {
            HashOutcome::Hashed((fingerprint, reused)) => {
                stats.attempted += 1;
                stats.hashed += 1;
                if reused {
                    stats.reused += 1;
                } else {
                    stats.bytes_hashed += entry.record.size;
                }
                buckets
                    .entry((entry.record.size, fingerprint))
                    .or_default()
                    .push(entry.record);
            }
            HashOutcome::Failed(e) => {
                stats.attempted += 1;
                stats.failed += 1;
                stats.errors.push(e);
            }
            HashOutcome::Skipped => {
                pool.evict(&entry.record.path);
            }
        }
    }

    stats.duplicate_groups = buckets.values().filter(|files| files.len() > 1).count();
    for ((size, fingerprint), files) in buckets.iter().filter(|(_, files)| files.len() > 1) {
        log::debug!(
            "Full bucket {} ({} bytes): {} identical files",
            fingerprint,
            size,
            files.len()
        );
    }

    config.phase_end(PHASE_FULLHASH);

    log::info!(
        "Full stage complete: {} hashed ({} reused, {} failed) → {} duplicate groups",
        stats.hashed,
        stats.reused,
        stats.failed,
        stats.duplicate_groups
    );

    (buckets, stats)
}

/// Full fingerprint of one file, taking its pooled handle when one is parked.
pub(crate) fn full_one(
    path: &Path,
    hasher: &Hasher,
    pool: &HandlePool,
) -> Result<Fingerprint, HashError> {
    let mut handle = pool.checkout(path)?;
    handle
        .seek(SeekFrom::Start(0))
        .map_err(|e| HashError::read(path, e))?;
    hasher.full_hash_reader(&mut handle, path)
}

// ============================================================================
// DuplicateFinder - Pipeline Orchestrator
// ============================================================================

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of I/O threads per hashing stage.
    pub io_threads: usize,
    /// Files smaller than this are ignored.
    pub min_size: u64,
    /// Piece size in bytes for the prefix stage.
    pub piece_size: u64,
    /// Number of leading pieces hashed by the prefix stage.
    pub piece_count: u64,
    /// Upper bound on handles kept open between stages.
    pub max_open_handles: usize,
    /// Which optional stages run.
    pub mode: RunMode,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("io_threads", &self.io_threads)
            .field("min_size", &self.min_size)
            .field("piece_size", &self.piece_size)
            .field("piece_count", &self.piece_count)
            .field("max_open_handles", &self.max_open_handles)
            .field("mode", &self.mode)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            min_size: 1,
            piece_size: DEFAULT_PIECE_SIZE,
            piece_count: DEFAULT_PIECE_COUNT,
            max_open_handles: DEFAULT_MAX_OPEN_HANDLES,
            mode: RunMode::default(),
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the number of I/O threads (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the minimum file size.
    #[must_use]
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = min_size;
        self
    }

    /// Set the prefix piece layout.
    #[must_use]
    pub fn with_pieces(mut self, piece_size: u64, piece_count: u64) -> Self {
        self.piece_size = piece_size.max(1);
        self.piece_count = piece_count.max(1);
        self
    }

    /// Set the handle pool capacity.
    #[must_use]
    pub fn with_max_open_handles(mut self, max: usize) -> Self {
        self.max_open_handles = max;
        self
    }

    /// Set which optional stages run.
    #[must_use]
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
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

    fn stage_config(&self) -> StageConfig {
        StageConfig {
            io_threads: self.io_threads,
            shutdown_flag: self.shutdown_flag.clone(),
            progress_callback: self.progress_callback.clone(),
        }
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(std::path::PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(std::path::PathBuf),

    /// The root could not be inspected.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: std::path::PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Duplicate finder that orchestrates the staged detection pipeline.
///
/// # Example
///
/// ```no_run
/// use dupsift::duplicates::{DuplicateFinder, FinderConfig};
/// use std::path::Path;
///
/// let config = FinderConfig::default().with_io_threads(4);
/// let finder = DuplicateFinder::new(config);
///
/// let report = finder.find_duplicates(Path::new("/some/path")).unwrap();
///
/// println!("Found {} duplicate groups", report.summary.duplicate_groups);
/// ```
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
}

/// Staged results handed from the hashing stages to the report.
struct StageResults {
    full: FullBuckets,
    prehash: PrehashStats,
    fullhash: FullhashStats,
    verification: Option<super::verify::VerificationReport>,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let hasher = Hasher::new().with_pieces(config.piece_size, config.piece_count);
        Self { config, hasher }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The hasher this finder fingerprints with.
    #[must_use]
    pub fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    /// Find all duplicate files below `path`.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The path does not exist
    /// - The path is not a directory
    /// - The scan is interrupted by shutdown signal
    ///
    /// Per-file problems are never errors here; they are counted in the
    /// report's summary and listed in its `errors`.
    pub fn find_duplicates(&self, path: &Path) -> Result<ScanReport, FinderError> {
        let start_time = Instant::now();

        match std::fs::metadata(path) {
            Ok(meta) if !meta.is_dir() => {
                return Err(FinderError::NotADirectory(path.to_path_buf()));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FinderError::PathNotFound(path.to_path_buf()));
            }
            Err(source) => {
                return Err(FinderError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        log::info!("Starting duplicate scan of {}", path.display());

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(PHASE_WALKING, 0);
            callback.on_message(&format!("Walking {}", path.display()));
        }

        let mut walker = Walker::new(path, self.config.walker_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = self.config.progress_callback {
            walker = walker.with_progress_callback(Arc::clone(callback));
        }

        let mut records = Vec::new();
        let mut errors = Vec::new();
        for result in walker.walk() {
            match result {
                Ok(record) => records.push(record),
                Err(e) => errors.push(e),
            }
        }
        let walk_stats = walker.stats();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(PHASE_WALKING);
        }

        log::info!(
            "Walk complete: {} entries observed, {} regular files, {} excluded",
            walk_stats.observed,
            records.len(),
            walk_stats.excluded
        );

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        self.run_pipeline(records, walk_stats, errors, start_time)
    }

    /// Find duplicates among records collected elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Interrupted`] if shutdown is requested.
    pub fn find_duplicates_from_records(
        &self,
        records: Vec<FileRecord>,
    ) -> Result<ScanReport, FinderError> {
        let walk_stats = WalkStats {
            observed: records.len(),
            ..WalkStats::default()
        };
        self.run_pipeline(records, walk_stats, Vec::new(), Instant::now())
    }

    fn run_pipeline(
        &self,
        records: Vec<FileRecord>,
        walk_stats: WalkStats,
        mut errors: Vec<ScanError>,
        start_time: Instant,
    ) -> Result<ScanReport, FinderError> {
        let mode = self.config.mode;
        let partition = index_by_size(records, self.config.min_size).partition(mode.verify);

        let mut summary = ScanSummary {
            files_observed: walk_stats.observed,
            excluded_entries: walk_stats.excluded,
            below_min_size: partition.stats.below_min_size,
            size_candidates: partition.candidate_count(),
            limit_reached: walk_stats.limit_reached,
            ..ScanSummary::default()
        };

        let (hash_input, presumed) = if mode.quickstat {
            let quickstat = group_by_time_and_size(partition.candidates);
            (quickstat.hash_candidates(), quickstat.presumed)
        } else {
            (partition.candidates, Vec::new())
        };

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let pool = HandlePool::new(self.config.max_open_handles);
        let staged = self.hash_stages(hash_input, &presumed, &pool);
        let closed = pool.release();
        if closed > 0 {
            log::debug!("Released {} pooled handle(s)", closed);
        }
        let pool_stats = pool.stats();
        log::debug!(
            "Handle pool: {} opened, {} reused, {} rejected",
            pool_stats.opened,
            pool_stats.reused,
            pool_stats.rejected
        );
        let mut staged = staged?;

        summary.prefix_hashed = staged.prehash.hashed;
        summary.prefix_candidates = staged.prehash.potential_duplicates;
        summary.full_hashed = staged.fullhash.hashed;
        summary.full_reused = staged.fullhash.reused;
        summary.scan_duration = start_time.elapsed();

        errors.extend(staged.prehash.errors.drain(..).map(ScanError::from));
        errors.extend(staged.fullhash.errors.drain(..).map(ScanError::from));
        if let Some(ref mut verification) = staged.verification {
            errors.extend(verification.errors.drain(..).map(ScanError::from));
        }

        let report = build_report(staged.full, presumed, staged.verification, summary, errors);

        log::info!(
            "Scan complete: {} duplicate groups, {} duplicate files, {} reclaimable",
            report.summary.duplicate_groups,
            report.summary.total_duplicates,
            report.summary.reclaimable_display()
        );

        Ok(report)
    }

    fn hash_stages(
        &self,
        hash_input: SizeBuckets,
        presumed: &[super::quickstat::PresumedGroup],
        pool: &HandlePool,
    ) -> Result<StageResults, FinderError> {
        let stage = self.config.stage_config();

        let (prefix_buckets, prehash) = phase2_prehash(hash_input, &self.hasher, pool, &stage);
        if prehash.interrupted || self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let (full, fullhash) = phase3_fullhash(prefix_buckets, &self.hasher, pool, &stage);
        if fullhash.interrupted || self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let verification = if self.config.mode.verify {
            let config = VerifyConfig {
                stage,
                dump_tainted: self.config.mode.dump_tainted,
            };
            let report = verify_presumed(presumed, &self.hasher, pool, &config);
            if report.interrupted || self.config.is_shutdown_requested() {
                return Err(FinderError::Interrupted);
            }
            Some(report)
        } else {
            None
        };

        Ok(StageResults {
            full,
            prehash,
            fullhash,
            verification,
        })
    }
}
