//! Output formatting and progress reporting

use console::{style, Term};
use cubrir::{CoverageSnapshot, RunReport};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress reporter for case execution
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar for a batch of cases
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Move the bar to an absolute position
    pub fn set_position(&self, position: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_position(position);
        }
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("!").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an informational line
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _ = self.term.write_line(message);
    }
}

/// Render the run summary as printable lines.
#[must_use]
pub fn render_summary(report: &RunReport) -> Vec<String> {
    let snap = &report.snapshot;
    let mut lines = vec![
        format!(
            "{} against {} ({} cases)",
            report.spec_title, report.base_url, report.case_count
        ),
        format!(
            "coverage    {:.1}% ({}/{} endpoints)",
            snap.coverage * 100.0,
            snap.covered_endpoints,
            snap.total_endpoints
        ),
        format!(
            "reliability {:.1}% ({}/{} cases responded)",
            snap.reliability * 100.0,
            snap.responded_cases,
            snap.total_cases
        ),
        format!(
            "match rate  {:.1}% ({}/{} expectations met)",
            snap.match_rate * 100.0,
            snap.matched_cases,
            snap.total_cases
        ),
        format!("mean latency {:.0}ms", snap.mean_latency_ms),
    ];
    if report.cancelled {
        lines.push("run was cancelled; results are partial".to_string());
    }
    lines
}

/// Render the per-endpoint breakdown, one line per endpoint.
#[must_use]
pub fn render_endpoints(snapshot: &CoverageSnapshot) -> Vec<String> {
    snapshot
        .endpoints
        .iter()
        .map(|ep| {
            let classes = if ep.observed_classes.is_empty() {
                "-".to_string()
            } else {
                ep.observed_classes
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(",")
            };
            format!(
                "{:<40} {:>3} cases  {:>3} responded  [{classes}]",
                ep.label, ep.cases, ep.responded
            )
        })
        .collect()
}
