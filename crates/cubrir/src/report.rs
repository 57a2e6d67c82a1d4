//! Final run reports: JSON serialization and threshold gating.

use crate::coverage::CoverageSnapshot;
use crate::error::CubrirResult;
use crate::exec::ExecutionResult;
use crate::synth::SynthesisWarning;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Minimum acceptable ratios for a run to pass.
///
/// Unset thresholds are not enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum coverage ratio.
    pub min_coverage: Option<f64>,
    /// Minimum reliability ratio.
    pub min_reliability: Option<f64>,
    /// Minimum expectation match rate.
    pub min_match_rate: Option<f64>,
}

/// Complete record of one finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// Title from the spec's info block.
    pub spec_title: String,
    /// Server the run targeted.
    pub base_url: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Whether the run was cancelled before completing.
    pub cancelled: bool,
    /// Cases synthesized for the run.
    pub case_count: usize,
    /// Synthesis warnings.
    pub warnings: Vec<SynthesisWarning>,
    /// Final coverage snapshot.
    pub snapshot: CoverageSnapshot,
    /// Every recorded result.
    pub results: Vec<ExecutionResult>,
}

impl RunReport {
    /// Human-readable reasons the run fails the thresholds. Empty means pass.
    #[must_use]
    pub fn threshold_failures(&self, thresholds: &Thresholds) -> Vec<String> {
        let mut failures = Vec::new();
        let mut check = |name: &str, actual: f64, min: Option<f64>| {
            if let Some(min) = min {
                if actual < min {
                    failures.push(format!("{name} {actual:.3} below threshold {min:.3}"));
                }
            }
        };
        check("coverage", self.snapshot.coverage, thresholds.min_coverage);
        check(
            "reliability",
            self.snapshot.reliability,
            thresholds.min_reliability,
        );
        check(
            "match rate",
            self.snapshot.match_rate,
            thresholds.min_match_rate,
        );
        failures
    }

    /// Whether the run meets every set threshold.
    #[must_use]
    pub fn meets_thresholds(&self, thresholds: &Thresholds) -> bool {
        self.threshold_failures(thresholds).is_empty()
    }

    /// Serialize the report as pretty-printed JSON.
    pub fn to_json(&self) -> CubrirResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as JSON to a file.
    pub fn write_json(&self, path: &Path) -> CubrirResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coverage::CoverageMode;

    fn report(coverage: f64, reliability: f64, match_rate: f64) -> RunReport {
        RunReport {
            run_id: Uuid::new_v4(),
            spec_title: "Items".to_string(),
            base_url: "http://localhost:8080".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            cancelled: false,
            case_count: 4,
            warnings: vec![],
            snapshot: CoverageSnapshot {
                mode: CoverageMode::Endpoint,
                total_endpoints: 2,
                covered_endpoints: 2,
                coverage,
                reliability,
                match_rate,
                error_rate: 0.0,
                mean_latency_ms: 8.0,
                total_cases: 4,
                responded_cases: 4,
                matched_cases: 4,
                endpoints: vec![],
            },
            results: vec![],
        }
    }

    #[test]
    fn test_unset_thresholds_always_pass() {
        let report = report(0.0, 0.0, 0.0);
        assert!(report.meets_thresholds(&Thresholds::default()));
    }

    #[test]
    fn test_threshold_failures_name_each_miss() {
        let report = report(0.5, 0.9, 1.0);
        let thresholds = Thresholds {
            min_coverage: Some(0.8),
            min_reliability: Some(0.95),
            min_match_rate: Some(0.9),
        };
        let failures = report.threshold_failures(&thresholds);
        assert_eq!(failures.len(), 2);
        assert!(failures[0].contains("coverage"));
        assert!(failures[1].contains("reliability"));
        assert!(!report.meets_thresholds(&thresholds));
    }

    #[test]
    fn test_exact_threshold_passes() {
        let report = report(0.8, 1.0, 1.0);
        let thresholds = Thresholds {
            min_coverage: Some(0.8),
            ..Thresholds::default()
        };
        assert!(report.meets_thresholds(&thresholds));
    }

    #[test]
    fn test_write_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = report(1.0, 1.0, 1.0);
        report.write_json(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let back: RunReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.run_id, report.run_id);
        assert_eq!(back.case_count, 4);
    }
}
