//! Cubridor CLI: run spec-driven API tests from the command line
//!
//! ## Usage
//!
//! ```bash
//! cubridor run openapi.yaml --url http://localhost:3000   # Full run
//! cubridor run spec.json -s missing-required --min-coverage 0.8
//! cubridor generate spec.json -o cases.json               # Cases only
//! cubridor inspect spec.json                              # Endpoint listing
//! ```

use clap::Parser;
use cubridor::{
    render_endpoints, render_summary, Cli, CliConfig, CliError, CliResult, Commands, GenerateArgs,
    InspectArgs, ProgressReporter, RunArgs, Verbosity,
};
use cubrir::{
    load_source, DelegateExecutor, Executor, HttpExecutor, JsonlSink, RunCoordinator, RunHandle,
    SpecModel, Synthesizer,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity);

    match cli.command {
        Commands::Run(args) => run_cases(&config, &args),
        Commands::Generate(args) => generate_cases(&args),
        Commands::Inspect(args) => inspect_spec(&args),
    }
}

/// Build CLI configuration from global flags
fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Debug,
        }
    };
    CliConfig::new()
        .with_verbosity(verbosity)
        .with_color(cli.color.into())
}

/// Route tracing to stderr; `RUST_LOG` overrides the verbosity flags.
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("failed to create async runtime: {e}")))
}

/// Handler for `cubridor run`
fn run_cases(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let run_config = args.to_run_config()?;
    let mut reporter =
        ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());

    let executor: Arc<dyn Executor> = match &args.delegate {
        Some(program) => Arc::new(DelegateExecutor::new(
            program.clone(),
            args.delegate_args.clone(),
        )),
        None => Arc::new(HttpExecutor::new()),
    };

    let rt = runtime()?;
    let report = rt.block_on(async {
        let model = Arc::new(load_source(&args.spec).await?);
        let handle = RunCoordinator::start(model, run_config, executor)?;

        for warning in handle.warnings() {
            reporter.warning(&format!("{:?}: {}", warning.kind, warning.detail));
        }
        let total = handle.case_count() as u64;
        reporter.start_progress(total, "executing cases");
        watch_run(&handle, &reporter, total).await;
        reporter.finish();
        Ok::<_, CliError>(handle.wait().await)
    })?;

    if let Some(path) = &args.results {
        let sink = JsonlSink::create(path).map_err(CliError::Cubrir)?;
        for result in &report.results {
            sink.append(result).map_err(CliError::Cubrir)?;
        }
        reporter.info(&format!("results written to {}", path.display()));
    }
    if let Some(path) = &args.output {
        report.write_json(path).map_err(CliError::Cubrir)?;
        reporter.info(&format!("report written to {}", path.display()));
    }

    for line in render_summary(&report) {
        reporter.info(&line);
    }
    if config.verbosity.is_verbose() {
        for line in render_endpoints(&report.snapshot) {
            reporter.info(&line);
        }
    }

    let failures = report.threshold_failures(&args.thresholds());
    if failures.is_empty() {
        reporter.success("run complete");
        Ok(())
    } else {
        for failure in &failures {
            reporter.failure(failure);
        }
        Err(CliError::ThresholdsFailed {
            summary: failures.join("\n"),
        })
    }
}

/// Poll progress until every case has a result; Ctrl-C cancels cooperatively.
async fn watch_run(handle: &RunHandle, reporter: &ProgressReporter, total: u64) {
    loop {
        let completed = handle.completed() as u64;
        reporter.set_position(completed);
        if completed >= total {
            break;
        }
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(100)) => {}
            _ = tokio::signal::ctrl_c() => {
                reporter.warning("cancelling; keeping partial results");
                handle.cancel();
                break;
            }
        }
    }
}

/// Handler for `cubridor generate`
fn generate_cases(args: &GenerateArgs) -> CliResult<()> {
    let rt = runtime()?;
    let model = rt.block_on(load_source(&args.spec))?;

    let synth = Synthesizer::new(&model).with_depth_cap(args.depth_cap);
    let mut output = synth.synthesize_all(&args.effective_strategies());
    if let Some(limit) = args.limit {
        output.cases.truncate(limit);
    }
    for warning in &output.warnings {
        tracing::warn!(detail = %warning.detail, "synthesis degraded");
    }

    let json = serde_json::to_string_pretty(&output.cases)
        .map_err(|e| CliError::runtime(e.to_string()))?;
    match &args.output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

/// Handler for `cubridor inspect`
fn inspect_spec(args: &InspectArgs) -> CliResult<()> {
    let rt = runtime()?;
    let model = rt.block_on(load_source(&args.spec))?;

    if args.json {
        let endpoints: Vec<serde_json::Value> = model
            .endpoints()
            .iter()
            .map(|ep| {
                serde_json::json!({
                    "name": ep.name(),
                    "method": ep.method.as_str(),
                    "path": ep.path,
                    "parameters": ep.parameters.len(),
                    "has_body": ep.request_body.is_some(),
                    "responses": ep.responses.len(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&endpoints)
                .map_err(|e| CliError::runtime(e.to_string()))?
        );
    } else {
        print_endpoint_table(&model);
    }
    Ok(())
}

fn print_endpoint_table(model: &SpecModel) {
    println!(
        "{} v{} ({} endpoints)",
        model.info().title,
        model.info().version,
        model.endpoints().len()
    );
    for ep in model.endpoints() {
        let body = if ep.request_body.is_some() {
            "body"
        } else {
            "-"
        };
        println!(
            "{:<7} {:<40} {:>2} params  {:>4}  {:>2} responses",
            ep.method.as_str(),
            ep.path,
            ep.parameters.len(),
            body,
            ep.responses.len()
        );
    }
}
