//! JSON output formatter for scan reports.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "hash_algorithm": "xxhash64",
//!   "duplicates": [
//!     { "fingerprint": "9f1c...", "size": 1024, "files": ["/a", "/b"] }
//!   ],
//!   "presumed": [
//!     { "status": "unverified", "size": 10, "modified": "2024-01-01T00:00:00Z", "files": ["/c", "/d"] }
//!   ],
//!   "verification": null,
//!   "errors": [],
//!   "summary": { "files_observed": 4, "duplicate_groups": 1, "...": 0 }
//! }
//! ```

use std::io::Write;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::duplicates::{
    DuplicateGroup, GroupVerdict, GroupVerification, MemberVerdict, PresumedGroup, ScanReport,
    ScanSummary, VerificationReport,
};
use crate::error::ExitCode;

/// Name of the fingerprint algorithm, carried in every report.
pub const HASH_ALGORITHM: &str = "xxhash64";

/// A confirmed duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Fingerprint as 16 hex digits
    pub fingerprint: String,
    /// File size in bytes
    pub size: u64,
    /// Member paths in discovery order
    pub files: Vec<String>,
}

impl From<&DuplicateGroup> for JsonDuplicateGroup {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            fingerprint: group.hash_hex(),
            size: group.size,
            files: group.files.iter().map(|f| path_string(&f.path)).collect(),
        }
    }
}

/// A presumed (size, mtime) group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonPresumedGroup {
    /// Always "unverified"
    pub status: &'static str,
    /// Shared size in bytes
    pub size: u64,
    /// Shared modification time (UTC)
    pub modified: DateTime<Utc>,
    /// Member paths
    pub files: Vec<String>,
}

impl From<&PresumedGroup> for JsonPresumedGroup {
    fn from(group: &PresumedGroup) -> Self {
        Self {
            status: "unverified",
            size: group.size,
            modified: utc(group.modified),
            files: group.files.iter().map(|f| path_string(&f.path)).collect(),
        }
    }
}

/// One member of a verified group.
#[derive(Debug, Clone, Serialize)]
pub struct JsonMember {
    /// Member path
    pub path: String,
    /// Comparison with the group reference
    pub verdict: MemberVerdict,
    /// Full fingerprint, present only for dumped tainted groups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Verification outcome for one presumed group.
#[derive(Debug, Clone, Serialize)]
pub struct JsonGroupVerification {
    /// Shared size in bytes
    pub size: u64,
    /// Group outcome
    pub verdict: GroupVerdict,
    /// Members in group order
    pub members: Vec<JsonMember>,
}

impl From<&GroupVerification> for JsonGroupVerification {
    fn from(group: &GroupVerification) -> Self {
        let members = group
            .members
            .iter()
            .map(|m| JsonMember {
                path: path_string(&m.path),
                verdict: m.verdict,
                fingerprint: group
                    .fingerprints
                    .as_ref()
                    .and_then(|map| map.get(&m.path))
                    .map(|fp| fp.to_hex()),
            })
            .collect();
        Self {
            size: group.size,
            verdict: group.verdict,
            members,
        }
    }
}

/// Verification results in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonVerification {
    /// Members that agreed with their reference
    pub verified_ok: usize,
    /// Members that disagreed with their reference
    pub verified_bad: usize,
    /// Members that could not be hashed
    pub failed: usize,
    /// `verified_bad / (verified_ok + verified_bad)`
    pub error_rate: f64,
    /// Per-group outcomes
    pub groups: Vec<JsonGroupVerification>,
}

impl From<&VerificationReport> for JsonVerification {
    fn from(report: &VerificationReport) -> Self {
        Self {
            verified_ok: report.verified_ok,
            verified_bad: report.verified_bad,
            failed: report.failed,
            error_rate: report.error_rate(),
            groups: report.groups.iter().map(Into::into).collect(),
        }
    }
}

/// Summary counters in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
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
    /// Files with a full fingerprint
    pub full_hashed: usize,
    /// Full fingerprints reused from the prefix stage
    pub full_reused: usize,
    /// Per-file errors
    pub soft_errors: usize,
    /// Confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Confirmed copies beyond the first
    pub duplicate_files: usize,
    /// Reclaimable bytes
    pub reclaimable_space: u64,
    /// Presumed groups
    pub quickstat_groups: usize,
    /// Copies accounted for by presumption
    pub known_duplicates: usize,
    /// Confirmed plus presumed copies
    pub total_duplicates: usize,
    /// Whether traversal stopped at the entry limit
    pub limit_reached: bool,
    /// Duration of the run in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DS000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a ScanSummary and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            files_observed: summary.files_observed,
            excluded_entries: summary.excluded_entries,
            below_min_size: summary.below_min_size,
            size_candidates: summary.size_candidates,
            prefix_hashed: summary.prefix_hashed,
            prefix_candidates: summary.prefix_candidates,
            full_hashed: summary.full_hashed,
            full_reused: summary.full_reused,
            soft_errors: summary.soft_errors,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            quickstat_groups: summary.quickstat_groups,
            known_duplicates: summary.known_duplicates,
            total_duplicates: summary.total_duplicates,
            limit_reached: summary.limit_reached,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Fingerprint algorithm used for every group
    pub hash_algorithm: &'static str,
    /// Confirmed duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Unverified quickstat groups
    pub presumed: Vec<JsonPresumedGroup>,
    /// Verification results, when verification ran
    pub verification: Option<JsonVerification>,
    /// Per-file error messages
    pub errors: Vec<String>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the JSON view of a report.
    #[must_use]
    pub fn new(report: &ScanReport, exit_code: ExitCode) -> Self {
        Self {
            hash_algorithm: HASH_ALGORITHM,
            duplicates: report.groups.iter().map(Into::into).collect(),
            presumed: report.presumed.iter().map(Into::into).collect(),
            verification: report.verification.as_ref().map(Into::into),
            errors: report.errors.iter().map(ToString::to_string).collect(),
            summary: JsonSummary::from_scan_summary(&report.summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::{build_report, FullBuckets, MemberResult};
    use crate::scanner::{FileRecord, Fingerprint};
    use indexmap::IndexMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn record(path: &str, size: u64) -> FileRecord {
        FileRecord::new(PathBuf::from(path), size, SystemTime::UNIX_EPOCH)
    }

    fn sample_report() -> ScanReport {
        let mut full = FullBuckets::new();
        full.insert(
            (1024, Fingerprint(0xabc)),
            vec![record("/file1.txt", 1024), record("/file2.txt", 1024)],
        );
        let presumed = vec![PresumedGroup {
            size: 10,
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(86_400),
            files: vec![record("/p", 10), record("/q", 10)],
        }];
        build_report(full, presumed, None, ScanSummary::default(), Vec::new())
    }

    #[test]
    fn test_json_output_structure() {
        let output = JsonOutput::new(&sample_report(), ExitCode::Success);
        let value: serde_json::Value = serde_json::from_str(&output.to_json().unwrap()).unwrap();

        assert_eq!(value["hash_algorithm"], "xxhash64");
        assert_eq!(value["duplicates"][0]["fingerprint"], "0000000000000abc");
        assert_eq!(value["duplicates"][0]["files"][1], "/file2.txt");
        assert_eq!(value["presumed"][0]["status"], "unverified");
        assert_eq!(value["presumed"][0]["modified"], "1970-01-02T00:00:00Z");
        assert!(value["verification"].is_null());
        assert_eq!(value["summary"]["duplicate_groups"], 1);
        assert_eq!(value["summary"]["known_duplicates"], 1);
        assert_eq!(value["summary"]["exit_code_name"], "DS000");
    }

    #[test]
    fn test_json_verification_dump() {
        let mut fingerprints = IndexMap::new();
        fingerprints.insert(PathBuf::from("/a"), Fingerprint(1));
        fingerprints.insert(PathBuf::from("/b"), Fingerprint(2));
        let verification = VerificationReport {
            groups: vec![GroupVerification {
                size: 4,
                modified: SystemTime::UNIX_EPOCH,
                members: vec![
                    MemberResult {
                        path: PathBuf::from("/a"),
                        verdict: MemberVerdict::Reference,
                    },
                    MemberResult {
                        path: PathBuf::from("/b"),
                        verdict: MemberVerdict::Disagree,
                    },
                ],
                verdict: GroupVerdict::Tainted,
                fingerprints: Some(fingerprints),
            }],
            verified_bad: 1,
            ..VerificationReport::default()
        };

        let json = serde_json::to_value(JsonVerification::from(&verification)).unwrap();
        assert_eq!(json["error_rate"], 1.0);
        assert_eq!(json["groups"][0]["verdict"], "tainted");
        assert_eq!(json["groups"][0]["members"][1]["verdict"], "disagree");
        assert_eq!(
            json["groups"][0]["members"][1]["fingerprint"],
            "0000000000000002"
        );
    }

    #[test]
    fn test_write_to_appends_newline() {
        let output = JsonOutput::new(&ScanReport::default(), ExitCode::Success);
        let mut buf = Vec::new();
        output.write_to(&mut buf, true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with("}\n"));
        assert!(text.contains('\n'));
    }
}
