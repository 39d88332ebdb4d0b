//! Size indexing and confirmed duplicate groups.
//!
//! # Overview
//!
//! Size indexing is the first stage of duplicate detection. Files with
//! different sizes cannot have identical content, so grouping by exact size
//! rules most files out without opening any of them.
//!
//! Buckets are [`IndexMap`]s: iteration follows the order in which sizes
//! were first discovered, and each bucket keeps its records in discovery
//! order. Later stages inherit that order, which keeps reports stable.
//!
//! # Example
//!
//! ```
//! use dupsift::scanner::FileRecord;
//! use dupsift::duplicates::index_by_size;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/file1.txt"), 1024, SystemTime::now()),
//!     FileRecord::new(PathBuf::from("/file2.txt"), 1024, SystemTime::now()),
//!     FileRecord::new(PathBuf::from("/file3.txt"), 2048, SystemTime::now()),
//! ];
//!
//! let partition = index_by_size(files, 1).partition(false);
//!
//! assert_eq!(partition.stats.total_files, 3);
//! assert_eq!(partition.stats.potential_duplicates, 2);
//! assert_eq!(partition.unique.len(), 1);
//! assert_eq!(partition.candidates.len(), 1);
//! ```

use std::path::PathBuf;

use indexmap::IndexMap;

use crate::scanner::{FileRecord, Fingerprint};

/// Records keyed by exact size, in discovery order.
pub type SizeBuckets = IndexMap<u64, Vec<FileRecord>>;

/// Statistics from the size indexing stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Records handed to the indexer
    pub total_files: usize,
    /// Total size of indexed records in bytes
    pub total_size: u64,
    /// Records dropped for being smaller than the minimum size
    pub below_min_size: usize,
    /// Number of distinct sizes among indexed records
    pub unique_sizes: usize,
    /// Records passed on as candidates
    pub potential_duplicates: usize,
    /// Records ruled out as size singletons
    pub eliminated_unique: usize,
    /// Sizes passed on as candidate buckets
    pub duplicate_groups: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by size grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Every record at or above the minimum size, bucketed by size.
#[derive(Debug, Clone, Default)]
pub struct SizeIndex {
    buckets: SizeBuckets,
    stats: GroupingStats,
}

/// Outcome of splitting a [`SizeIndex`] into singletons and candidates.
#[derive(Debug, Clone, Default)]
pub struct SizePartition {
    /// Definite non-duplicates (the only record of their size)
    pub unique: Vec<FileRecord>,
    /// Buckets worth hashing
    pub candidates: SizeBuckets,
    /// Counters for the whole stage
    pub stats: GroupingStats,
}

impl SizePartition {
    /// Number of records across all candidate buckets.
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.candidates.values().map(Vec::len).sum()
    }
}

/// Build a size index from a record sequence.
///
/// Consumes the whole sequence. Records smaller than `min_size` are dropped
/// and counted. No file is opened.
#[must_use]
pub fn index_by_size(records: impl IntoIterator<Item = FileRecord>, min_size: u64) -> SizeIndex {
    let mut buckets = SizeBuckets::new();
    let mut stats = GroupingStats::default();

    for record in records {
        if record.size < min_size {
            stats.below_min_size += 1;
            log::trace!(
                "Below minimum size ({} < {}): {}",
                record.size,
                min_size,
                record.path.display()
            );
            continue;
        }
        stats.total_files += 1;
        stats.total_size += record.size;
        buckets.entry(record.size).or_default().push(record);
    }

    stats.unique_sizes = buckets.len();

    if stats.below_min_size > 0 {
        log::debug!(
            "Skipped {} file(s) smaller than {} byte(s)",
            stats.below_min_size,
            min_size
        );
    }

    SizeIndex { buckets, stats }
}

impl SizeIndex {
    /// Number of distinct sizes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no record was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Records of exactly `size` bytes, in discovery order.
    #[must_use]
    pub fn get(&self, size: u64) -> Option<&[FileRecord]> {
        self.buckets.get(&size).map(Vec::as_slice)
    }

    /// Split into singletons and candidate buckets.
    ///
    /// With `retain_singletons` every bucket is a candidate, which the
    /// verification pass needs to see the full population.
    #[must_use]
    pub fn partition(self, retain_singletons: bool) -> SizePartition {
        let SizeIndex { buckets, mut stats } = self;
        let mut unique = Vec::new();
        let mut candidates = SizeBuckets::new();

        for (size, files) in buckets {
            if files.len() < 2 && !retain_singletons {
                stats.eliminated_unique += files.len();
                if let Some(file) = files.first() {
                    log::trace!("Eliminated unique size {}: {}", size, file.path.display());
                }
                unique.extend(files);
                continue;
            }
            stats.potential_duplicates += files.len();
            stats.duplicate_groups += 1;
            log::debug!("Size group {} bytes: {} candidate(s)", size, files.len());
            candidates.insert(size, files);
        }

        log::info!(
            "Size stage complete: {} files → {} candidates ({:.1}% eliminated)",
            stats.total_files,
            stats.potential_duplicates,
            stats.elimination_rate()
        );

        SizePartition {
            unique,
            candidates,
            stats,
        }
    }
}

/// Rebucket records by size, keeping only sizes shared by two or more.
#[must_use]
pub fn regroup_by_size(records: impl IntoIterator<Item = FileRecord>) -> SizeBuckets {
    let mut buckets = SizeBuckets::new();
    for record in records {
        buckets.entry(record.size).or_default().push(record);
    }
    buckets.retain(|_, files| files.len() > 1);
    buckets
}

/// Confirmed duplicate group: files whose whole content fingerprints agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Full-content fingerprint shared by every member
    pub fingerprint: Fingerprint,
    /// File size in bytes (shared by every member)
    pub size: u64,
    /// Members in discovery order
    pub files: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create a new duplicate group.
    #[must_use]
    pub fn new(fingerprint: Fingerprint, size: u64, files: Vec<FileRecord>) -> Self {
        Self {
            fingerprint,
            size,
            files,
        }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of duplicate copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Space reclaimable by keeping a single copy.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Fingerprint as hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        self.fingerprint.to_hex()
    }

    /// Get just the paths of files in this group.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}
