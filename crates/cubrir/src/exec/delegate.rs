//! External transport: hand the case batch to a child process over stdio.
//!
//! The delegate command receives a JSON object on stdin:
//!
//! ```json
//! {"base_url": "http://...", "cases": [ ... ]}
//! ```
//!
//! and prints a JSON array of per-case outcomes on stdout:
//!
//! ```json
//! [{"id": "op::valid-minimal::0", "status": 200, "latency_ms": 12}]
//! ```
//!
//! Cases the delegate does not report on still get a result, recorded as a
//! transport failure.

use super::{CancelFlag, ExecutionResult, Executor, ResultLog};
use crate::run::RunConfig;
use crate::synth::TestCase;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs cases through an external command instead of the built-in client.
#[derive(Debug, Clone)]
pub struct DelegateExecutor {
    program: String,
    args: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DelegateInput<'a> {
    base_url: &'a str,
    timeout_ms: u64,
    cases: &'a [TestCase],
}

#[derive(Debug, Deserialize)]
struct DelegateOutcome {
    id: String,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    latency_ms: u64,
    #[serde(default)]
    error: Option<String>,
}

impl DelegateExecutor {
    /// Build from a program and its arguments.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    async fn invoke(
        &self,
        cases: &[TestCase],
        config: &RunConfig,
    ) -> Result<Vec<DelegateOutcome>, String> {
        let input = serde_json::to_vec(&DelegateInput {
            base_url: &config.base_url,
            timeout_ms: config.timeout_ms,
            cases,
        })
        .map_err(|e| e.to_string())?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| format!("failed to spawn {}: {e}", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&input).await.map_err(|e| e.to_string())?;
            // Closing stdin signals end of input to the delegate.
            drop(stdin);
        }
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Err(format!("{} exited with {}", self.program, output.status));
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| format!("unparseable delegate output: {e}"))
    }
}

#[async_trait]
impl Executor for DelegateExecutor {
    async fn run(
        &self,
        cases: Vec<TestCase>,
        config: &RunConfig,
        log: &ResultLog,
        cancel: &CancelFlag,
    ) {
        if cancel.is_cancelled() {
            return;
        }
        debug!(program = %self.program, cases = cases.len(), "delegating batch");
        match self.invoke(&cases, config).await {
            Ok(outcomes) => {
                let mut by_id: HashMap<String, DelegateOutcome> =
                    outcomes.into_iter().map(|o| (o.id.clone(), o)).collect();
                for case in cases {
                    let result = match by_id.remove(&case.id) {
                        Some(outcome) => match outcome.status {
                            Some(status) => {
                                ExecutionResult::responded(case, status, outcome.latency_ms, 0)
                            }
                            None => ExecutionResult::failed(
                                case,
                                outcome
                                    .error
                                    .unwrap_or_else(|| "delegate reported no status".to_string()),
                                outcome.latency_ms,
                                0,
                            ),
                        },
                        None => {
                            ExecutionResult::failed(case, "delegate omitted this case", 0, 0)
                        }
                    };
                    log.append(result);
                }
            }
            Err(message) => {
                warn!(program = %self.program, error = %message, "delegate failed");
                for case in cases {
                    log.append(ExecutionResult::failed(case, message.clone(), 0, 0));
                }
            }
        }
    }
}
