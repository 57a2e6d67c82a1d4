//! Coverage aggregation: a pure fold from execution results to a snapshot.
//!
//! `aggregate` has no I/O and no hidden state. Feeding it the same results
//! and model twice produces byte-identical snapshots, which is what makes
//! mid-run snapshots and final reports comparable.

use crate::exec::ExecutionResult;
use crate::spec::SpecModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// What counts as covering an endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoverageMode {
    /// An endpoint is covered once any of its cases yields a result,
    /// transport failures included.
    #[default]
    Endpoint,
    /// Fraction of declared response patterns actually observed.
    StatusClass,
}

impl CoverageMode {
    /// Stable tag used in config and reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Endpoint => "endpoint",
            Self::StatusClass => "status-class",
        }
    }
}

impl fmt::Display for CoverageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoverageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "endpoint" => Ok(Self::Endpoint),
            "status-class" => Ok(Self::StatusClass),
            other => Err(format!("unknown coverage mode: {other}")),
        }
    }
}

/// Per-endpoint slice of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointCoverage {
    /// Endpoint label, e.g. `GET /items`.
    pub label: String,
    /// Cases executed against this endpoint.
    pub cases: usize,
    /// Cases that received an HTTP response.
    pub responded: usize,
    /// Cases whose observed outcome matched their expectation.
    pub matched: usize,
    /// Distinct observed status classes, sorted.
    pub observed_classes: BTreeSet<String>,
    /// Declared response patterns for the endpoint.
    pub declared_responses: usize,
    /// Declared patterns matched by at least one observed status.
    pub matched_responses: usize,
}

impl EndpointCoverage {
    /// Whether any case ran against the endpoint. A transport failure still
    /// exercises the endpoint; reliability tracks response health separately.
    #[must_use]
    pub fn is_covered(&self) -> bool {
        self.cases > 0
    }
}

/// Point-in-time coverage over a (possibly partial) result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSnapshot {
    /// Mode the ratios were computed under.
    pub mode: CoverageMode,
    /// Endpoints in the spec.
    pub total_endpoints: usize,
    /// Endpoints with at least one result.
    pub covered_endpoints: usize,
    /// Coverage ratio in `[0, 1]`.
    pub coverage: f64,
    /// Fraction of cases that received any HTTP response.
    pub reliability: f64,
    /// Fraction of cases whose outcome matched their expectation.
    pub match_rate: f64,
    /// Fraction of cases that ended in transport failure.
    pub error_rate: f64,
    /// Mean latency across all results, in milliseconds.
    pub mean_latency_ms: f64,
    /// Total results folded in.
    pub total_cases: usize,
    /// Results with an HTTP response.
    pub responded_cases: usize,
    /// Results matching their expectation.
    pub matched_cases: usize,
    /// Per-endpoint breakdown, in spec declaration order.
    pub endpoints: Vec<EndpointCoverage>,
}

/// Ratio with the empty-denominator convention: nothing demanded, nothing
/// missed.
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        1.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        {
            numerator as f64 / denominator as f64
        }
    }
}

/// Fold execution results into a coverage snapshot.
#[must_use]
pub fn aggregate(results: &[ExecutionResult], model: &SpecModel, mode: CoverageMode) -> CoverageSnapshot {
    let mut endpoints: Vec<EndpointCoverage> = model
        .endpoints()
        .iter()
        .map(|ep| EndpointCoverage {
            label: ep.label(),
            cases: 0,
            responded: 0,
            matched: 0,
            observed_classes: BTreeSet::new(),
            declared_responses: ep.responses.len(),
            matched_responses: 0,
        })
        .collect();

    for result in results {
        let ix = result.case.endpoint.index();
        let Some(slot) = endpoints.get_mut(ix) else {
            continue;
        };
        slot.cases += 1;
        if let Some(class) = result.status_class() {
            slot.responded += 1;
            let _ = slot.observed_classes.insert(class);
        }
        if result.matched_expectation() {
            slot.matched += 1;
        }
    }

    // Second pass for declared-response matching, one endpoint at a time.
    for (slot, ep) in endpoints.iter_mut().zip(model.endpoints()) {
        slot.matched_responses = ep
            .responses
            .iter()
            .filter(|decl| {
                results.iter().any(|r| {
                    r.case.endpoint == ep.id && r.status.is_some_and(|s| decl.matches(s))
                })
            })
            .count();
    }

    let total_cases = results.len();
    let responded_cases = results.iter().filter(|r| !r.transport_failed()).count();
    let matched_cases = results
        .iter()
        .filter(|r| r.matched_expectation())
        .count();
    let mean_latency_ms = if results.is_empty() {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        {
            results.iter().map(|r| r.latency_ms as f64).sum::<f64>() / results.len() as f64
        }
    };
    let error_rate = if total_cases == 0 {
        0.0
    } else {
        ratio(total_cases - responded_cases, total_cases)
    };

    let (covered, coverage) = match mode {
        CoverageMode::Endpoint => {
            let covered = endpoints.iter().filter(|e| e.is_covered()).count();
            (covered, ratio(covered, endpoints.len()))
        }
        CoverageMode::StatusClass => {
            let declared: usize = endpoints.iter().map(|e| e.declared_responses).sum();
            let matched: usize = endpoints.iter().map(|e| e.matched_responses).sum();
            let covered = endpoints.iter().filter(|e| e.is_covered()).count();
            (covered, ratio(matched, declared))
        }
    };

    CoverageSnapshot {
        mode,
        total_endpoints: endpoints.len(),
        covered_endpoints: covered,
        coverage,
        reliability: ratio(responded_cases, total_cases),
        match_rate: ratio(matched_cases, total_cases),
        error_rate,
        mean_latency_ms,
        total_cases,
        responded_cases,
        matched_cases,
        endpoints,
    }
}
