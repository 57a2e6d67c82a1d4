//! Cubrir CLI Library
//!
//! Command-line interface for the Cubrir API testing framework.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
mod output;

pub use commands::{Cli, ColorArg, Commands, GenerateArgs, InspectArgs, RunArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_endpoints, render_summary, ProgressReporter};
