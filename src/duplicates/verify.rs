//! Verification of quickstat presumptions against content.
//!
//! Every member of every presumed group is full-hashed. Within a group the
//! first member that hashes successfully is the reference; each later member
//! either agrees or disagrees with it. Disagreement is a measurement of the
//! heuristic, not an error.

use std::path::PathBuf;
use std::time::SystemTime;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;

use super::finder::{full_one, run_in_pool, StageConfig};
use super::quickstat::PresumedGroup;
use crate::progress::PHASE_VERIFY;
use crate::scanner::{Fingerprint, HandlePool, HashError, Hasher};

/// Configuration for the verification pass.
#[derive(Debug, Clone, Default)]
pub struct VerifyConfig {
    /// Thread pool, shutdown and progress settings
    pub stage: StageConfig,
    /// Keep every member's fingerprint for tainted groups
    pub dump_tainted: bool,
}

/// How one member compares with its group's reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberVerdict {
    /// First successfully hashed member; others are compared with it
    Reference,
    /// Content matches the reference
    Agree,
    /// Content differs from the reference
    Disagree,
    /// The member could not be hashed
    Failed,
}

/// Outcome for a whole presumed group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupVerdict {
    /// Every hashed member agrees and at least two were hashed
    Clean,
    /// At least one member disagrees
    Tainted,
    /// Fewer than two members could be hashed
    Inconclusive,
}

/// Per-member result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberResult {
    /// Member path
    pub path: PathBuf,
    /// Comparison with the reference
    pub verdict: MemberVerdict,
}

/// Verification result for one presumed group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupVerification {
    /// Shared size
    pub size: u64,
    /// Shared modification time
    pub modified: SystemTime,
    /// Members in group order
    pub members: Vec<MemberResult>,
    /// Group outcome
    pub verdict: GroupVerdict,
    /// `path -> fingerprint` for every hashed member; kept only for tainted
    /// groups when dumping was requested
    pub fingerprints: Option<IndexMap<PathBuf, Fingerprint>>,
}

/// Results of the verification pass.
#[derive(Debug, Default)]
pub struct VerificationReport {
    /// One entry per presumed group, in input order
    pub groups: Vec<GroupVerification>,
    /// Members that agreed with their reference
    pub verified_ok: usize,
    /// Members that disagreed with their reference
    pub verified_bad: usize,
    /// Members that could not be hashed
    pub failed: usize,
    /// Whether shutdown cut the pass short
    pub interrupted: bool,
    /// Per-file failures
    pub errors: Vec<HashError>,
}

impl VerificationReport {
    /// Share of compared members whose content contradicted the presumption.
    ///
    /// 0.0 when nothing was compared.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        let compared = self.verified_ok + self.verified_bad;
        if compared == 0 {
            0.0
        } else {
            self.verified_bad as f64 / compared as f64
        }
    }

    /// Groups whose presumption was wrong.
    pub fn tainted(&self) -> impl Iterator<Item = &GroupVerification> {
        self.groups
            .iter()
            .filter(|g| g.verdict == GroupVerdict::Tainted)
    }

    /// Number of groups with the given verdict.
    #[must_use]
    pub fn count(&self, verdict: GroupVerdict) -> usize {
        self.groups.iter().filter(|g| g.verdict == verdict).count()
    }
}

/// Full-hash every member of every presumed group and classify the groups.
pub fn verify_presumed(
    groups: &[PresumedGroup],
    hasher: &Hasher,
    pool: &HandlePool,
    config: &VerifyConfig,
) -> VerificationReport {
    let mut report = VerificationReport::default();
    let members: Vec<(usize, &PathBuf)> = groups
        .iter()
        .enumerate()
        .flat_map(|(idx, g)| g.files.iter().map(move |f| (idx, &f.path)))
        .collect();

    if members.is_empty() {
        log::debug!("Verify: no presumed groups to check");
        return report;
    }

    let stage = &config.stage;
    stage.phase_start(PHASE_VERIFY, members.len());
    log::info!(
        "Verify: hashing {} members of {} presumed group(s)",
        members.len(),
        groups.len()
    );

    let results: Vec<Option<Result<Fingerprint, HashError>>> =
        run_in_pool(stage.io_threads, || {
            members
                .par_iter()
                .enumerate()
                .map(|(n, (_, path))| {
                    if stage.is_shutdown_requested() {
                        return None;
                    }
                    stage.progress(n + 1, path);
                    Some(full_one(path, hasher, pool))
                })
                .collect()
        });

    if stage.is_shutdown_requested() {
        report.interrupted = true;
        log::info!("Verify: interrupted by shutdown signal");
        stage.phase_end(PHASE_VERIFY);
        return report;
    }

    let mut outcomes: Vec<Vec<(PathBuf, Result<Fingerprint, HashError>)>> =
        groups.iter().map(|_| Vec::new()).collect();
    for ((idx, path), result) in members.into_iter().zip(results) {
        if let Some(result) = result {
            outcomes[idx].push((path.clone(), result));
        }
    }

    for (group, hashed) in groups.iter().zip(outcomes) {
        let verification = classify(group, hashed, config.dump_tainted, &mut report);
        match verification.verdict {
            GroupVerdict::Tainted => log::warn!(
                "Quickstat group of {} bytes is tainted: {} member(s) differ",
                group.size,
                verification
                    .members
                    .iter()
                    .filter(|m| m.verdict == MemberVerdict::Disagree)
                    .count()
            ),
            GroupVerdict::Inconclusive => log::debug!(
                "Quickstat group of {} bytes could not be verified",
                group.size
            ),
            GroupVerdict::Clean => {}
        }
        report.groups.push(verification);
    }

    stage.phase_end(PHASE_VERIFY);

    log::info!(
        "Verify complete: {} agree, {} disagree, {} failed (error rate {:.2}%)",
        report.verified_ok,
        report.verified_bad,
        report.failed,
        report.error_rate() * 100.0
    );

    report
}

fn classify(
    group: &PresumedGroup,
    hashed: Vec<(PathBuf, Result<Fingerprint, HashError>)>,
    dump_tainted: bool,
    report: &mut VerificationReport,
) -> GroupVerification {
    let mut reference: Option<Fingerprint> = None;
    let mut members = Vec::with_capacity(hashed.len());
    let mut fingerprints = IndexMap::new();
    let mut disagreements = 0;

    for (path, result) in hashed {
        let verdict = match result {
            Ok(fingerprint) => {
                fingerprints.insert(path.clone(), fingerprint);
                match reference {
                    None => {
                        reference = Some(fingerprint);
                        MemberVerdict::Reference
                    }
                    Some(r) if r == fingerprint => {
                        report.verified_ok += 1;
                        MemberVerdict::Agree
                    }
                    Some(_) => {
                        report.verified_bad += 1;
                        disagreements += 1;
                        MemberVerdict::Disagree
                    }
                }
            }
            Err(e) => {
                log::warn!("Failed to verify {}: {}", path.display(), e);
                report.failed += 1;
                report.errors.push(e);
                MemberVerdict::Failed
            }
        };
        members.push(MemberResult { path, verdict });
    }

    let verdict = if disagreements > 0 {
        GroupVerdict::Tainted
    } else if fingerprints.len() < 2 {
        GroupVerdict::Inconclusive
    } else {
        GroupVerdict::Clean
    };

    GroupVerification {
        size: group.size,
        modified: group.modified,
        members,
        verdict,
        fingerprints: (dump_tainted && verdict == GroupVerdict::Tainted).then_some(fingerprints),
    }
}
