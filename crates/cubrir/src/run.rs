//! Run orchestration: config validation, the coordinator, and live handles.

use crate::coverage::{aggregate, CoverageMode, CoverageSnapshot};
use crate::error::CubrirResult;
use crate::exec::{CancelFlag, CredentialProvider, Executor, ResultLog};
use crate::report::RunReport;
use crate::spec::SpecModel;
use crate::synth::{Strategy, SynthesisWarning, Synthesizer, DEFAULT_DEPTH_CAP};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Everything a run needs, validated up front.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Server under test, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// Concurrent executor workers.
    pub concurrency: usize,
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// Retry behavior.
    pub retry: crate::exec::RetryPolicy,
    /// Strategies to synthesize with, in order.
    pub strategies: Vec<Strategy>,
    /// Schema recursion depth cap.
    pub depth_cap: usize,
    /// Coverage accounting mode.
    pub coverage_mode: CoverageMode,
    /// Optional credentials injected into every request.
    pub credentials: Option<Arc<dyn CredentialProvider>>,
    /// Optional cap on total synthesized cases.
    pub case_limit: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            concurrency: 4,
            timeout_ms: 10_000,
            retry: crate::exec::RetryPolicy::default(),
            strategies: Strategy::ALL.to_vec(),
            depth_cap: DEFAULT_DEPTH_CAP,
            coverage_mode: CoverageMode::Endpoint,
            credentials: None,
            case_limit: None,
        }
    }
}

/// Why a run config was rejected. Surfaced before anything executes.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Base URL is not `http(s)://`
    #[error("base URL must start with http:// or https://, got: {url}")]
    InvalidBaseUrl {
        /// Offending URL
        url: String,
    },

    /// Concurrency of zero would never make progress
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    /// Timeout of zero would fail every request
    #[error("timeout must be at least 1ms")]
    ZeroTimeout,

    /// Retry policy must allow at least the first attempt
    #[error("retry policy must allow at least one attempt")]
    ZeroAttempts,

    /// No strategies means no cases
    #[error("at least one strategy is required")]
    NoStrategies,

    /// Depth cap of zero truncates every schema at the root
    #[error("depth cap must be at least 1")]
    ZeroDepthCap,
}

impl RunConfig {
    /// Validate the config; all violations are fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.strategies.is_empty() {
            return Err(ConfigError::NoStrategies);
        }
        if self.depth_cap == 0 {
            return Err(ConfigError::ZeroDepthCap);
        }
        Ok(())
    }
}

/// Starts runs and hands back live handles.
#[derive(Debug)]
pub struct RunCoordinator;

impl RunCoordinator {
    /// Synthesize cases for the whole model and start executing them.
    ///
    /// Returns immediately with a [`RunHandle`]; execution proceeds on a
    /// spawned task.
    pub fn start(
        model: Arc<SpecModel>,
        config: RunConfig,
        executor: Arc<dyn Executor>,
    ) -> CubrirResult<RunHandle> {
        config.validate()?;

        let synth = Synthesizer::new(&model).with_depth_cap(config.depth_cap);
        let mut output = synth.synthesize_all(&config.strategies);
        if let Some(limit) = config.case_limit {
            output.cases.truncate(limit);
        }
        let case_count = output.cases.len();
        let run_id = Uuid::new_v4();
        info!(%run_id, cases = case_count, base_url = %config.base_url, "run starting");

        let log = ResultLog::new();
        let cancel = CancelFlag::new();
        let task = {
            let config = config.clone();
            let log = log.clone();
            let cancel = cancel.clone();
            let cases = output.cases;
            tokio::spawn(async move {
                executor.run(cases, &config, &log, &cancel).await;
            })
        };

        Ok(RunHandle {
            run_id,
            model,
            config,
            log,
            cancel,
            warnings: output.warnings,
            case_count,
            started_at: Utc::now(),
            task,
        })
    }
}

/// Live view of an in-flight (or finished) run.
#[derive(Debug)]
pub struct RunHandle {
    /// Unique run identifier.
    pub run_id: Uuid,
    model: Arc<SpecModel>,
    config: RunConfig,
    log: ResultLog,
    cancel: CancelFlag,
    warnings: Vec<SynthesisWarning>,
    case_count: usize,
    started_at: chrono::DateTime<Utc>,
    task: tokio::task::JoinHandle<()>,
}

impl RunHandle {
    /// Cases synthesized for this run.
    #[must_use]
    pub fn case_count(&self) -> usize {
        self.case_count
    }

    /// Results recorded so far.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.log.len()
    }

    /// Synthesis warnings for this run.
    #[must_use]
    pub fn warnings(&self) -> &[SynthesisWarning] {
        &self.warnings
    }

    /// Coverage over the results recorded so far.
    ///
    /// Valid mid-run; the snapshot simply reflects fewer results.
    #[must_use]
    pub fn snapshot(&self) -> CoverageSnapshot {
        aggregate(&self.log.snapshot(), &self.model, self.config.coverage_mode)
    }

    /// Publish the current snapshot to a sink, keyed by this run's id.
    pub fn publish(&self, sink: &dyn crate::sink::ResultSink) -> CubrirResult<()> {
        sink.append(self.run_id, &self.snapshot(), Utc::now())
    }

    /// Request cooperative cancellation. Workers stop between cases; results
    /// already recorded are kept.
    pub fn cancel(&self) {
        info!(run_id = %self.run_id, "cancellation requested");
        self.cancel.cancel();
    }

    /// Wait for the run to finish and assemble the final report.
    pub async fn wait(self) -> RunReport {
        // A panicked executor still yields a report over whatever results
        // landed in the log.
        let _ = self.task.await;
        let results = self.log.snapshot();
        let snapshot = aggregate(&results, &self.model, self.config.coverage_mode);
        let cancelled = self.cancel.is_cancelled();
        info!(
            run_id = %self.run_id,
            results = results.len(),
            coverage = snapshot.coverage,
            cancelled,
            "run finished"
        );
        RunReport {
            run_id: self.run_id,
            spec_title: self.model.info().title.clone(),
            base_url: self.config.base_url,
            started_at: self.started_at,
            finished_at: Utc::now(),
            cancelled,
            case_count: self.case_count,
            warnings: self.warnings,
            snapshot,
            results,
        }
    }
}
