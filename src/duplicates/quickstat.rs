//! Metadata-only duplicate presumption ("quickstat").
//!
//! Files sharing both exact size and modification time are very often
//! copies. Grouping on that pair costs nothing beyond the traversal stat,
//! but it is a heuristic: the groups it produces are always reported as
//! unverified, and [`crate::duplicates::verify`] can measure how often the
//! presumption is wrong.

use std::time::SystemTime;

use indexmap::IndexMap;

use super::groups::{regroup_by_size, SizeBuckets};
use crate::scanner::FileRecord;

/// Files presumed identical because size and mtime agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresumedGroup {
    /// Shared size in bytes
    pub size: u64,
    /// Shared modification time
    pub modified: SystemTime,
    /// Members in discovery order (at least two)
    pub files: Vec<FileRecord>,
}

impl PresumedGroup {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Presumed copies beyond the first member.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }
}

/// Result of the quickstat partition.
#[derive(Debug, Clone, Default)]
pub struct QuickstatGroups {
    /// Groups of two or more records sharing `(size, modified)`
    pub presumed: Vec<PresumedGroup>,
    /// Every record that did not land in a presumed group
    pub residue: Vec<FileRecord>,
}

impl QuickstatGroups {
    /// Duplicates accounted for by presumption alone.
    #[must_use]
    pub fn known_duplicates(&self) -> usize {
        self.presumed.iter().map(PresumedGroup::duplicate_count).sum()
    }

    /// Records the hash stages still need to see.
    ///
    /// The residue plus one representative per presumed group, rebucketed by
    /// size. A representative can still match a residue file whose mtime
    /// differs.
    #[must_use]
    pub fn hash_candidates(&self) -> SizeBuckets {
        let representatives = self.presumed.iter().filter_map(|g| g.files.first());
        regroup_by_size(self.residue.iter().chain(representatives).cloned())
    }
}

/// Partition candidate buckets by exact `(size, modified)`.
#[must_use]
pub fn group_by_time_and_size(candidates: SizeBuckets) -> QuickstatGroups {
    let mut result = QuickstatGroups::default();

    for (size, files) in candidates {
        let mut by_time: IndexMap<SystemTime, Vec<FileRecord>> = IndexMap::new();
        for file in files {
            by_time.entry(file.modified).or_default().push(file);
        }

        for (modified, files) in by_time {
            if files.len() > 1 {
                log::debug!(
                    "Quickstat group: {} file(s) of {} bytes share an mtime",
                    files.len(),
                    size
                );
                result.presumed.push(PresumedGroup {
                    size,
                    modified,
                    files,
                });
            } else {
                result.residue.extend(files);
            }
        }
    }

    log::info!(
        "Quickstat: {} presumed group(s), {} known duplicate(s), {} residue file(s)",
        result.presumed.len(),
        result.known_duplicates(),
        result.residue.len()
    );

    result
}
