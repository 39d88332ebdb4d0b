//! Human-readable report.
//!
//! Layout:
//!
//! ```text
//! Matching qstats (unverified) size 10 B, modified 2024-01-01 00:00:00 UTC
//!     /data/a
//!     /data/b
//!
//! Matching xxhash64 9f1c2e4a00b7d311 (2 files, 1.0 MiB each)
//!     /data/c
//!     /data/d
//!
//! Summary
//!   files observed ....
//! ```

use std::io::{self, Write};
use std::time::SystemTime;

use bytesize::ByteSize;
use chrono::{DateTime, Utc};
use yansi::{Paint, Style};

use crate::duplicates::{
    DuplicateGroup, GroupVerdict, GroupVerification, MemberVerdict, PresumedGroup, ScanReport,
    ScanSummary, VerificationReport,
};
use crate::output::json::HASH_ALGORITHM;

const HEADER: Style = Style::new().bold();
const GROUP: Style = Style::new().cyan().bold();
const PRESUMED: Style = Style::new().yellow().bold();
const CLEAN: Style = Style::new().green();
const TAINTED: Style = Style::new().red().bold();
const DIM: Style = Style::new().dim();

/// Plain-text report writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReport {
    color: bool,
}

impl TextReport {
    /// Create a writer; `color` enables ANSI styling.
    #[must_use]
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Write the whole report.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn write_to<W: Write>(&self, report: &ScanReport, writer: &mut W) -> io::Result<()> {
        for group in &report.presumed {
            self.write_presumed(group, writer)?;
        }
        for group in &report.groups {
            self.write_group(group, writer)?;
        }
        if let Some(verification) = &report.verification {
            self.write_verification(verification, writer)?;
        }
        if !report.errors.is_empty() {
            writeln!(writer, "{}", self.style("Errors", HEADER))?;
            for error in &report.errors {
                writeln!(writer, "\t{error}")?;
            }
            writeln!(writer)?;
        }
        self.write_summary(&report.summary, writer)?;
        self.write_footer(writer)
    }

    fn write_presumed<W: Write>(&self, group: &PresumedGroup, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "{} size {}, modified {}",
            self.style("Matching qstats (unverified)", PRESUMED),
            ByteSize::b(group.size),
            format_time(group.modified)
        )?;
        for file in &group.files {
            writeln!(writer, "\t{}", file.path.display())?;
        }
        writeln!(writer)
    }

    fn write_group<W: Write>(&self, group: &DuplicateGroup, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "{} {}",
            self.style(&format!("Matching {HASH_ALGORITHM} {}", group.hash_hex()), GROUP),
            self.style(
                &format!("({} files, {} each)", group.len(), ByteSize::b(group.size)),
                DIM
            )
        )?;
        for file in &group.files {
            writeln!(writer, "\t{}", file.path.display())?;
        }
        writeln!(writer)
    }

    fn write_verification<W: Write>(
        &self,
        report: &VerificationReport,
        writer: &mut W,
    ) -> io::Result<()> {
        writeln!(writer, "{}", self.style("Verification", HEADER))?;
        writeln!(
            writer,
            "  groups: {} clean, {} tainted, {} inconclusive",
            report.count(GroupVerdict::Clean),
            report.count(GroupVerdict::Tainted),
            report.count(GroupVerdict::Inconclusive)
        )?;
        writeln!(
            writer,
            "  members: {} agree, {} disagree, {} failed",
            report.verified_ok, report.verified_bad, report.failed
        )?;
        writeln!(
            writer,
            "  error rate: {:.2}%",
            report.error_rate() * 100.0
        )?;

        for group in report.tainted() {
            self.write_tainted(group, writer)?;
        }
        writeln!(writer)
    }

    fn write_tainted<W: Write>(&self, group: &GroupVerification, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "  {} size {}, modified {}",
            self.style("tainted", TAINTED),
            ByteSize::b(group.size),
            format_time(group.modified)
        )?;
        for member in &group.members {
            let verdict = match member.verdict {
                MemberVerdict::Reference => "reference",
                MemberVerdict::Agree => "agree",
                MemberVerdict::Disagree => "disagree",
                MemberVerdict::Failed => "failed",
            };
            let fingerprint = group
                .fingerprints
                .as_ref()
                .and_then(|map| map.get(&member.path));
            match fingerprint {
                Some(fp) => writeln!(
                    writer,
                    "\t{:<9} {} {}",
                    verdict,
                    fp,
                    member.path.display()
                )?,
                None => writeln!(writer, "\t{:<9} {}", verdict, member.path.display())?,
            }
        }
        Ok(())
    }

    fn write_summary<W: Write>(&self, summary: &ScanSummary, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{}", self.style("Summary", HEADER))?;
        let rows: [(&str, String); 12] = [
            ("files observed", summary.files_observed.to_string()),
            ("excluded entries", summary.excluded_entries.to_string()),
            ("below minimum size", summary.below_min_size.to_string()),
            ("size candidates", summary.size_candidates.to_string()),
            ("prefix hashed", summary.prefix_hashed.to_string()),
            ("prefix candidates", summary.prefix_candidates.to_string()),
            (
                "full hashed",
                format!("{} ({} reused)", summary.full_hashed, summary.full_reused),
            ),
            ("duplicate groups", summary.duplicate_groups.to_string()),
            ("duplicate files", summary.duplicate_files.to_string()),
            ("known duplicates", summary.known_duplicates.to_string()),
            ("total duplicates", summary.total_duplicates.to_string()),
            ("reclaimable", summary.reclaimable_display()),
        ];
        for (label, value) in rows {
            writeln!(writer, "  {label:<20} {value}")?;
        }
        if summary.soft_errors > 0 {
            writeln!(writer, "  {:<20} {}", "errors", summary.soft_errors)?;
        }
        if summary.limit_reached {
            writeln!(
                writer,
                "  {}",
                self.style("entry limit reached; results are partial", PRESUMED)
            )?;
        }
        writeln!(
            writer,
            "  {:<20} {:.2}s",
            "duration",
            summary.scan_duration.as_secs_f64()
        )
    }

    fn write_footer<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "{}",
            self.style(
                &format!(
                    "Groups are matched by 64-bit {HASH_ALGORITHM} fingerprints; \
                     distinct content can collide with very low probability."
                ),
                DIM
            )
        )
    }

    fn style(&self, text: &str, style: Style) -> String {
        if self.color {
            text.paint(style).to_string()
        } else {
            text.to_string()
        }
    }
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}
