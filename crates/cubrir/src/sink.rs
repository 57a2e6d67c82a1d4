//! Result sinks: pluggable destinations for coverage snapshots.
//!
//! A sink stores the latest snapshot per run so external tooling can poll
//! coverage without holding a [`RunHandle`](crate::run::RunHandle). Storage
//! technology stays outside the crate; [`MemorySink`] is the reference
//! implementation.

use crate::coverage::CoverageSnapshot;
use crate::error::CubrirResult;
use crate::exec::ExecutionResult;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Destination for per-run coverage snapshots.
pub trait ResultSink: Send + Sync + fmt::Debug {
    /// Record a snapshot for a run, replacing any earlier one.
    fn append(
        &self,
        run_id: Uuid,
        snapshot: &CoverageSnapshot,
        timestamp: DateTime<Utc>,
    ) -> CubrirResult<()>;

    /// Latest snapshot recorded for a run, if any.
    fn query(&self, run_id: Uuid) -> CubrirResult<Option<CoverageSnapshot>>;
}

/// In-memory sink, mainly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<HashMap<Uuid, (DateTime<Utc>, CoverageSnapshot)>>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of runs with a recorded snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether the sink holds no snapshots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for MemorySink {
    fn append(
        &self,
        run_id: Uuid,
        snapshot: &CoverageSnapshot,
        timestamp: DateTime<Utc>,
    ) -> CubrirResult<()> {
        let _ = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(run_id, (timestamp, snapshot.clone()));
        Ok(())
    }

    fn query(&self, run_id: Uuid) -> CubrirResult<Option<CoverageSnapshot>> {
        Ok(self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&run_id)
            .map(|(_, snapshot)| snapshot.clone()))
    }
}

/// Streams execution results to a file as JSON Lines, one result per line.
///
/// This is the raw-result counterpart to the snapshot-oriented
/// [`ResultSink`]; the CLI uses it for `--results`.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl JsonlSink {
    /// Create or truncate the file at `path`.
    pub fn create(path: impl Into<PathBuf>) -> CubrirResult<Self> {
        let path = path.into();
        let file = std::fs::File::create(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path the sink writes to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Append one result as a JSON line.
    pub fn append(&self, result: &ExecutionResult) -> CubrirResult<()> {
        let line = serde_json::to_string(result)?;
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Read every recorded result back, in append order.
    pub fn results(&self) -> CubrirResult<Vec<ExecutionResult>> {
        let text = std::fs::read_to_string(&self.path)?;
        let mut results = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            results.push(serde_json::from_str(line)?);
        }
        Ok(results)
    }
}
