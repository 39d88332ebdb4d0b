//! Final duplicate groups and run counters.

use std::time::Duration;

use super::finder::FullBuckets;
use super::groups::DuplicateGroup;
use super::quickstat::PresumedGroup;
use super::verify::VerificationReport;
use crate::scanner::ScanError;

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    /// Non-directory entries seen by the walker
    pub files_observed: usize,
    /// Entries skipped as non-regular or unfollowed links
    pub excluded_entries: usize,
    /// Regular files smaller than the minimum size
    pub below_min_size: usize,
    /// Files left after size indexing
    pub size_candidates: usize,
    /// Files fingerprinted by the prefix stage
    pub prefix_hashed: usize,
    /// Files that survived the prefix stage
    pub prefix_candidates: usize,
    /// Files with a full fingerprint (read or reused)
    pub full_hashed: usize,
    /// Full fingerprints taken from a prefix that covered the whole file
    pub full_reused: usize,
    /// Per-file errors across every stage
    pub soft_errors: usize,
    /// Confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Confirmed copies beyond the first in each group
    pub duplicate_files: usize,
    /// Bytes freed by keeping one copy per confirmed group
    pub reclaimable_space: u64,
    /// Presumed (size, mtime) groups
    pub quickstat_groups: usize,
    /// Copies accounted for by presumption alone
    pub known_duplicates: usize,
    /// `duplicate_files + known_duplicates`
    pub total_duplicates: usize,
    /// Whether traversal stopped at the entry limit
    pub limit_reached: bool,
    /// Wall time of the run
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Reclaimable space as a human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        bytesize::ByteSize::b(self.reclaimable_space).to_string()
    }
}

/// Everything a run produced.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Confirmed duplicate groups, largest waste first
    pub groups: Vec<DuplicateGroup>,
    /// Unverified groups from the quickstat heuristic
    pub presumed: Vec<PresumedGroup>,
    /// Audit of the presumed groups, when verification ran
    pub verification: Option<VerificationReport>,
    /// Run counters
    pub summary: ScanSummary,
    /// Per-file errors, in the order they were met
    pub errors: Vec<ScanError>,
}

/// Assemble the report from the full-stage buckets.
///
/// `summary` carries the pipeline counters; the group-derived counters are
/// filled in here.
#[must_use]
pub fn build_report(
    full: FullBuckets,
    presumed: Vec<PresumedGroup>,
    verification: Option<VerificationReport>,
    mut summary: ScanSummary,
    errors: Vec<ScanError>,
) -> ScanReport {
    let groups = build_groups(full);

    summary.duplicate_groups = groups.len();
    summary.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
    summary.reclaimable_space = groups.iter().map(DuplicateGroup::wasted_space).sum();
    summary.quickstat_groups = presumed.len();
    summary.known_duplicates = presumed.iter().map(PresumedGroup::duplicate_count).sum();
    summary.total_duplicates = summary.duplicate_files + summary.known_duplicates;
    summary.soft_errors = errors.len();

    ScanReport {
        groups,
        presumed,
        verification,
        summary,
        errors,
    }
}

/// Keep buckets of two or more and order them for output.
///
/// Largest wasted space first; ties broken by first member path.
#[must_use]
pub fn build_groups(full: FullBuckets) -> Vec<DuplicateGroup> {
    let mut groups: Vec<DuplicateGroup> = full
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|((size, fingerprint), files)| DuplicateGroup::new(fingerprint, size, files))
        .collect();

    groups.sort_by(|a, b| {
        b.wasted_space()
            .cmp(&a.wasted_space())
            .then_with(|| a.files[0].path.cmp(&b.files[0].path))
    });
    groups
}
