//! CLI command definitions using clap

use crate::config::ColorChoice;
use crate::error::{CliError, CliResult};
use clap::{Parser, Subcommand, ValueEnum};
use cubrir::{
    BearerToken, CoverageMode, HeaderCredential, RetryPolicy, RunConfig, Strategy, Thresholds,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Cubridor: CLI for Cubrir - spec-driven API testing and coverage
#[derive(Parser, Debug)]
#[command(name = "cubridor")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run synthesized cases against a live server
    Run(RunArgs),

    /// Synthesize cases and print them without executing
    Generate(GenerateArgs),

    /// Show the endpoints a spec declares
    Inspect(InspectArgs),
}

/// Color output argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Detect from terminal
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Spec document: a file path or an http(s) URL
    pub spec: String,

    /// Base URL of the server under test
    #[arg(short, long, default_value = "http://localhost:8080")]
    pub url: String,

    /// Strategies to synthesize with (repeatable; default: all)
    #[arg(short, long = "strategy", value_name = "STRATEGY")]
    pub strategies: Vec<Strategy>,

    /// Number of concurrent workers
    #[arg(short = 'j', long, default_value = "4")]
    pub concurrency: usize,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value = "10000")]
    pub timeout: u64,

    /// Attempts per case, including the first
    #[arg(long, default_value = "3")]
    pub attempts: u32,

    /// Also retry 5xx responses
    #[arg(long)]
    pub retry_server_errors: bool,

    /// Schema recursion depth cap
    #[arg(long, default_value = "5")]
    pub depth_cap: usize,

    /// Cap on total synthesized cases
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Coverage accounting mode (endpoint, status-class)
    #[arg(long, default_value = "endpoint")]
    pub coverage_mode: CoverageMode,

    /// Write the full JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stream results to this file as JSON Lines
    #[arg(long)]
    pub results: Option<PathBuf>,

    /// Fail unless coverage reaches this ratio
    #[arg(long)]
    pub min_coverage: Option<f64>,

    /// Fail unless reliability reaches this ratio
    #[arg(long)]
    pub min_reliability: Option<f64>,

    /// Fail unless the expectation match rate reaches this ratio
    #[arg(long)]
    pub min_match_rate: Option<f64>,

    /// Bearer token for the Authorization header
    #[arg(long, env = "CUBRIR_TOKEN")]
    pub bearer: Option<String>,

    /// Extra credential header, as `Name: value`
    #[arg(long, value_name = "HEADER")]
    pub auth_header: Option<String>,

    /// Delegate execution to this command instead of the built-in client
    #[arg(long)]
    pub delegate: Option<String>,

    /// Arguments for the delegate command (repeatable)
    #[arg(long = "delegate-arg", value_name = "ARG")]
    pub delegate_args: Vec<String>,
}

impl RunArgs {
    /// Translate CLI flags into a library run config.
    pub fn to_run_config(&self) -> CliResult<RunConfig> {
        let credentials: Option<Arc<dyn cubrir::CredentialProvider>> =
            match (&self.bearer, &self.auth_header) {
                (Some(_), Some(_)) => {
                    return Err(CliError::invalid_argument(
                        "--bearer and --auth-header are mutually exclusive",
                    ));
                }
                (Some(token), None) => Some(Arc::new(BearerToken::new(token.clone()))),
                (None, Some(header)) => {
                    let (name, value) = header.split_once(':').ok_or_else(|| {
                        CliError::invalid_argument("--auth-header must look like `Name: value`")
                    })?;
                    Some(Arc::new(HeaderCredential::new(name.trim(), value.trim())))
                }
                (None, None) => None,
            };

        Ok(RunConfig {
            base_url: self.url.clone(),
            concurrency: self.concurrency,
            timeout_ms: self.timeout,
            retry: RetryPolicy {
                max_attempts: self.attempts,
                retry_on_server_error: self.retry_server_errors,
                ..RetryPolicy::default()
            },
            strategies: self.effective_strategies(),
            depth_cap: self.depth_cap,
            coverage_mode: self.coverage_mode,
            credentials,
            case_limit: self.limit,
        })
    }

    /// Requested strategies, defaulting to all of them.
    #[must_use]
    pub fn effective_strategies(&self) -> Vec<Strategy> {
        if self.strategies.is_empty() {
            Strategy::ALL.to_vec()
        } else {
            self.strategies.clone()
        }
    }

    /// Thresholds from the `--min-*` flags.
    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            min_coverage: self.min_coverage,
            min_reliability: self.min_reliability,
            min_match_rate: self.min_match_rate,
        }
    }
}

/// Arguments for the generate command
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Spec document: a file path or an http(s) URL
    pub spec: String,

    /// Strategies to synthesize with (repeatable; default: all)
    #[arg(short, long = "strategy", value_name = "STRATEGY")]
    pub strategies: Vec<Strategy>,

    /// Schema recursion depth cap
    #[arg(long, default_value = "5")]
    pub depth_cap: usize,

    /// Cap on total synthesized cases
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Write cases to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl GenerateArgs {
    /// Requested strategies, defaulting to all of them.
    #[must_use]
    pub fn effective_strategies(&self) -> Vec<Strategy> {
        if self.strategies.is_empty() {
            Strategy::ALL.to_vec()
        } else {
            self.strategies.clone()
        }
    }
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Spec document: a file path or an http(s) URL
    pub spec: String,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}
