//! Cubrir: Spec-Driven API Testing and Coverage
//!
//! Cubrir (Spanish: "to cover") ingests an OpenAPI/Swagger document,
//! synthesizes deterministic test cases from its schemas, executes them
//! against a live server, and folds the results into coverage and
//! reliability metrics.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      CUBRIR Pipeline                             │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌─────────────┐   ┌──────────┐   ┌────────────┐  │
//! │  │ OpenAPI  │   │ Case        │   │ Executor │   │ Coverage   │  │
//! │  │ Document │──►│ Synthesizer │──►│ (workers)│──►│ Aggregator │  │
//! │  │ (2.x/3.x)│   │ (5 strats)  │   │          │   │            │  │
//! │  └──────────┘   └─────────────┘   └──────────┘   └────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`run::RunCoordinator`] wires the stages together; each stage is
//! also usable on its own (parse only, generate only, aggregate offline
//! results).

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// Coverage aggregation over execution results.
pub mod coverage;
mod error;
/// Case execution: transports, retries, and the result log.
pub mod exec;
/// Final run reports and threshold gating.
pub mod report;
/// Run orchestration and live handles.
pub mod run;
/// Pluggable result destinations.
pub mod sink;
/// OpenAPI/Swagger ingestion and the normalized endpoint model.
pub mod spec;
/// Deterministic test case synthesis.
pub mod synth;

pub use coverage::{aggregate, CoverageMode, CoverageSnapshot, EndpointCoverage};
pub use error::{CubrirError, CubrirResult};
pub use exec::{
    BearerToken, CancelFlag, CredentialProvider, DelegateExecutor, ExecutionResult, Executor,
    HeaderCredential, HttpExecutor, ResultLog, RetryPolicy,
};
pub use report::{RunReport, Thresholds};
pub use run::{ConfigError, RunConfig, RunCoordinator, RunHandle};
pub use sink::{JsonlSink, MemorySink, ResultSink};
pub use spec::{
    load_source, Endpoint, EndpointId, HttpMethod, ParamLocation, Parameter, SpecInfo, SpecModel,
    SpecParseError, SpecVersion,
};
pub use synth::{
    ExpectedOutcome, Strategy, SynthOutput, SynthesisWarning, Synthesizer, TestCase, WarningKind,
    DEFAULT_DEPTH_CAP,
};
