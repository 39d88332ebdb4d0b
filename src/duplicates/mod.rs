//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based candidate indexing ([`groups`])
//! - The mtime+size presumption heuristic ([`quickstat`])
//! - Prefix and full content hashing ([`finder`])
//! - Auditing presumed groups against content ([`verify`])
//! - Assembling groups and counters ([`report`])

pub mod finder;
pub mod groups;
pub mod quickstat;
pub mod report;
pub mod verify;

pub use finder::{
    phase2_prehash, phase3_fullhash, BucketKey, DuplicateFinder, FinderConfig, FinderError,
    FullBuckets, FullhashConfig, FullhashStats, PrefixBuckets, PrefixEntry, PrehashConfig,
    PrehashStats, StageConfig, DEFAULT_IO_THREADS,
};
pub use groups::{
    index_by_size, regroup_by_size, DuplicateGroup, GroupingStats, SizeBuckets, SizeIndex,
    SizePartition,
};
pub use quickstat::{group_by_time_and_size, PresumedGroup, QuickstatGroups};
pub use report::{build_report, ScanReport, ScanSummary};
pub use verify::{
    verify_presumed, GroupVerdict, GroupVerification, MemberResult, MemberVerdict,
    VerificationReport, VerifyConfig,
};

use crate::config::ConfigError;

/// Which optional stages a run includes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunMode {
    /// Presume `(size, mtime)` matches are duplicates
    pub quickstat: bool,
    /// Audit presumed groups by full hashing
    pub verify: bool,
    /// Keep per-member fingerprints of tainted groups
    pub dump_tainted: bool,
}

impl RunMode {
    /// Validate a flag combination.
    ///
    /// # Errors
    ///
    /// Verification needs quickstat groups to audit, and dumping needs
    /// verification; either missing dependency is a
    /// [`ConfigError::InvalidCombination`].
    pub fn from_flags(quickstat: bool, verify: bool, dump_tainted: bool) -> Result<Self, ConfigError> {
        if verify && !quickstat {
            return Err(ConfigError::InvalidCombination(
                "--verify requires --quickstat".to_string(),
            ));
        }
        if dump_tainted && !verify {
            return Err(ConfigError::InvalidCombination(
                "--dump-tainted requires --verify".to_string(),
            ));
        }
        Ok(Self {
            quickstat,
            verify,
            dump_tainted,
        })
    }
}
