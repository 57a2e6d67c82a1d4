//! Case execution: worker pools, retries, and the append-only result log.
//!
//! The [`Executor`] trait is the seam between synthesis and transport. The
//! built-in [`HttpExecutor`] drives reqwest workers; [`DelegateExecutor`]
//! hands the case batch to an external command over stdio. Both uphold the
//! same contract: every dequeued case produces exactly one
//! [`ExecutionResult`], cancelled or not.

mod credentials;
mod delegate;
mod http;

pub use credentials::{BearerToken, CredentialProvider, HeaderCredential};
pub use delegate::DelegateExecutor;
pub use http::HttpExecutor;

use crate::run::RunConfig;
use crate::synth::TestCase;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Retry behavior for transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per case, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
    /// Also retry 5xx responses, not just transport failures.
    pub retry_on_server_error: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 5_000,
            retry_on_server_error: false,
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff delay before retry number `attempt` (0-based),
    /// clamped to `max_delay_ms`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        Duration::from_millis(exp.min(self.max_delay_ms))
    }
}

/// Terminal record of one executed case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// The case that ran.
    pub case: TestCase,
    /// HTTP status, or `None` when no response arrived.
    pub status: Option<u16>,
    /// Wall-clock latency of the final attempt.
    pub latency_ms: u64,
    /// Transport error message, when `status` is `None`.
    pub error: Option<String>,
    /// Number of retries performed (attempts minus one).
    pub retries: u32,
    /// When the result was recorded.
    pub timestamp: DateTime<Utc>,
}

impl ExecutionResult {
    /// Record a response with a status code.
    #[must_use]
    pub fn responded(case: TestCase, status: u16, latency_ms: u64, retries: u32) -> Self {
        Self {
            case,
            status: Some(status),
            latency_ms,
            error: None,
            retries,
            timestamp: Utc::now(),
        }
    }

    /// Record a transport failure.
    #[must_use]
    pub fn failed(case: TestCase, error: impl Into<String>, latency_ms: u64, retries: u32) -> Self {
        Self {
            case,
            status: None,
            latency_ms,
            error: Some(error.into()),
            retries,
            timestamp: Utc::now(),
        }
    }

    /// Whether the case never got an HTTP response.
    #[must_use]
    pub fn transport_failed(&self) -> bool {
        self.status.is_none()
    }

    /// Status class string (`"2xx"`, `"4xx"`, ...), if a response arrived.
    #[must_use]
    pub fn status_class(&self) -> Option<String> {
        self.status.map(|s| format!("{}xx", s / 100))
    }

    /// Whether the observed outcome matches the case's expectation.
    #[must_use]
    pub fn matched_expectation(&self) -> bool {
        self.case.expected.matches(self.status)
    }
}

/// Append-only, shared log of execution results.
///
/// Workers append concurrently; `snapshot` clones the current contents so
/// coverage can be computed mid-run without blocking appends for long.
#[derive(Debug, Clone, Default)]
pub struct ResultLog {
    inner: Arc<Mutex<Vec<ExecutionResult>>>,
}

impl ResultLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one result.
    pub fn append(&self, result: ExecutionResult) {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(result);
    }

    /// Clone the results recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ExecutionResult> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of results recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cooperative cancellation flag shared between a run handle and its workers.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Transport seam: takes synthesized cases, appends results to the log.
///
/// Implementations observe `cancel` between cases (never mid-request) and
/// guarantee one result per dequeued case.
#[async_trait]
pub trait Executor: Send + Sync + fmt::Debug {
    /// Execute the batch, appending to `log` until done or cancelled.
    async fn run(
        &self,
        cases: Vec<TestCase>,
        config: &RunConfig,
        log: &ResultLog,
        cancel: &CancelFlag,
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::spec::{EndpointId, HttpMethod};
    use crate::synth::{ExpectedOutcome, Strategy};

    fn case(id: &str) -> TestCase {
        TestCase {
            id: id.to_string(),
            endpoint: EndpointId(0),
            method: HttpMethod::Get,
            path: "/x".to_string(),
            strategy: Strategy::ValidMinimal,
            path_params: vec![],
            query: vec![],
            headers: vec![],
            cookies: vec![],
            body: None,
            expected: ExpectedOutcome::Success,
        }
    }

    #[test]
    fn test_backoff_doubles_then_clamps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay_ms: 100,
            max_delay_ms: 350,
            retry_on_server_error: false,
        };
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(350));
        assert_eq!(policy.backoff_delay(30), Duration::from_millis(350));
    }

    #[test]
    fn test_backoff_survives_huge_attempt_numbers() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(200), Duration::from_millis(5_000));
    }

    #[test]
    fn test_result_log_append_and_snapshot() {
        let log = ResultLog::new();
        assert!(log.is_empty());
        log.append(ExecutionResult::responded(case("a"), 200, 12, 0));
        log.append(ExecutionResult::failed(case("b"), "refused", 3, 2));
        assert_eq!(log.len(), 2);
        let snap = log.snapshot();
        assert_eq!(snap[0].status, Some(200));
        assert!(snap[1].transport_failed());
        assert_eq!(snap[1].retries, 2);
        // Snapshot is a copy: later appends do not show up in it.
        log.append(ExecutionResult::responded(case("c"), 404, 1, 0));
        assert_eq!(snap.len(), 2);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_status_class() {
        let ok = ExecutionResult::responded(case("a"), 204, 1, 0);
        assert_eq!(ok.status_class().as_deref(), Some("2xx"));
        let bad = ExecutionResult::responded(case("b"), 418, 1, 0);
        assert_eq!(bad.status_class().as_deref(), Some("4xx"));
        let dead = ExecutionResult::failed(case("c"), "timeout", 1, 0);
        assert_eq!(dead.status_class(), None);
    }

    #[test]
    fn test_matched_expectation() {
        let ok = ExecutionResult::responded(case("a"), 201, 1, 0);
        assert!(ok.matched_expectation());
        let miss = ExecutionResult::responded(case("b"), 500, 1, 0);
        assert!(!miss.matched_expectation());
        let dead = ExecutionResult::failed(case("c"), "refused", 1, 0);
        assert!(!dead.matched_expectation());
    }

    #[test]
    fn test_cancel_flag_shared_across_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
    }
}
