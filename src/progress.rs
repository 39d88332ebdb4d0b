//! Progress reporting utilities using indicatif.
//!
//! The pipeline never talks to the terminal directly. It calls a
//! [`ProgressCallback`]; [`Progress`] is the indicatif subscriber used by the
//! binary. Every bar draws on stderr and is cleared when its phase ends, so
//! the final report on stdout stays clean.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Phase name for directory traversal.
pub const PHASE_WALKING: &str = "walking";
/// Phase name for the prefix hashing stage.
pub const PHASE_PREHASH: &str = "prehash";
/// Phase name for the full hashing stage.
pub const PHASE_FULLHASH: &str = "fullhash";
/// Phase name for the quickstat verification pass.
pub const PHASE_VERIFY: &str = "verify";

/// Progress callback for duplicate finding phases.
///
/// Implement this trait to receive progress updates during
/// the duplicate detection pipeline.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (e.g., "prehash", "fullhash")
    /// * `total` - Total number of items to process (0 when unknown)
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, providing the bytes read.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
///
/// Holds one bar per pipeline phase; at most one is active at a time.
pub struct Progress {
    multi: MultiProgress,
    walking: Mutex<Option<ProgressBar>>,
    prehash: Mutex<Option<ProgressBar>>,
    fullhash: Mutex<Option<ProgressBar>>,
    verify: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupsift::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::stderr())
        };
        Self {
            multi,
            walking: Mutex::new(None),
            prehash: Mutex::new(None),
            fullhash: Mutex::new(None),
            verify: Mutex::new(None),
            quiet,
        }
    }

    fn slot(&self, phase: &str) -> Option<&Mutex<Option<ProgressBar>>> {
        match phase {
            PHASE_WALKING => Some(&self.walking),
            PHASE_PREHASH => Some(&self.prehash),
            PHASE_FULLHASH => Some(&self.fullhash),
            PHASE_VERIFY => Some(&self.verify),
            _ => None,
        }
    }

    /// The most recently started bar that is still running.
    fn active(&self) -> Option<ProgressBar> {
        [&self.verify, &self.fullhash, &self.prehash, &self.walking]
            .into_iter()
            .find_map(|slot| lock(slot).clone())
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} entries")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style(color: &str) -> ProgressStyle {
        let template = format!(
            "[{{elapsed_precise}}] [{{bar:40.{color}/blue}}] {{pos}}/{{len}} ({{percent}}%) {{msg}} (ETA: {{eta}})"
        );
        ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let (pb, message) = match phase {
            PHASE_WALKING => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(Self::walking_style());
                pb.enable_steady_tick(Duration::from_millis(100));
                (pb, "Walking directory")
            }
            PHASE_PREHASH => {
                let pb = ProgressBar::new(total as u64);
                pb.set_style(Self::bar_style("cyan"));
                (pb, "Prefix hashing")
            }
            PHASE_FULLHASH => {
                let pb = ProgressBar::new(total as u64);
                pb.set_style(Self::bar_style("green"));
                (pb, "Full hashing")
            }
            PHASE_VERIFY => {
                let pb = ProgressBar::new(total as u64);
                pb.set_style(Self::bar_style("yellow"));
                (pb, "Verifying quickstat groups")
            }
            _ => return,
        };

        let pb = self.multi.add(pb);
        pb.set_message(message);
        if let Some(slot) = self.slot(phase) {
            *lock(slot) = Some(pb);
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active() {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 30));
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.slot(phase).and_then(|slot| lock(slot).take()) {
            pb.finish_and_clear();
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active() {
            pb.set_message(message.to_string());
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let chars: Vec<char> = file_name.chars().collect();
    if chars.len() + 4 > max_len {
        let keep = max_len.saturating_sub(3);
        let tail: String = chars[chars.len().saturating_sub(keep)..].iter().collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
