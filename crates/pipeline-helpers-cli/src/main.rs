// crates/pipeline-helpers-cli/src/main.rs
// ============================================================================
// Module: Pipeline Helpers CLI Entry Point
// Description: Command dispatcher for the CI pipeline helper tasks.
// Purpose: Run one environment-configured task per invocation.
// Dependencies: clap, thiserror, pipeline-helpers-{config,core}
// ============================================================================

//! ## Overview
//! Each subcommand is one pipeline step and takes no arguments: every
//! parameter comes from the environment. A task either succeeds (exit 0) or
//! prints a single error line to stderr and exits 1. Degraded but recoverable
//! conditions, such as an unreachable object store, are logged as warnings
//! and do not fail the step.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod tasks;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use pipeline_helpers_config::EnvSource;
use pipeline_helpers_config::LoggingConfig;
use pipeline_helpers_core::LogSink;
use pipeline_helpers_core::Logger;
use pipeline_helpers_core::logging::FileLogSink;
use pipeline_helpers_core::logging::StderrLogSink;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "pipeline-helpers", version, disable_help_subcommand = true)]
struct Cli {
    /// Task to run.
    #[command(subcommand)]
    command: Commands,
}

/// Pipeline tasks.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Run the model test and capture its metrics.
    GatherMetrics,
    /// Query peak CPU and memory usage for the test window.
    GatherPlatformMetrics,
    /// Merge the run's metrics into the stored document.
    PostProcessMetrics,
    /// Aggregate stored documents and render the PR report.
    AggregateMetrics,
    /// Write PR-specific deployment, route, and service manifests.
    CustomizeDeployments,
    /// Bump outdated base images in the CI config.
    BumpBaseImage,
}

impl Commands {
    /// Returns the task name recorded in log records.
    const fn task_name(self) -> &'static str {
        match self {
            Self::GatherMetrics => "gather-metrics",
            Self::GatherPlatformMetrics => "gather-platform-metrics",
            Self::PostProcessMetrics => "post-process-metrics",
            Self::AggregateMetrics => "aggregate-metrics",
            Self::CustomizeDeployments => "customize-deployments",
            Self::BumpBaseImage => "bump-base-image",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for task failures.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }

    /// Prefixes an underlying error with context.
    fn context(context: &str, error: impl std::fmt::Display) -> Self {
        Self::new(format!("{context}: {error}"))
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command, &EnvSource::Process) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Builds the logger and dispatches one task.
fn run(command: Commands, env: &EnvSource) -> CliResult<()> {
    let logging = LoggingConfig::from_env(env).map_err(|err| CliError::context("configuration", err))?;
    let logger = build_logger(&logging, command.task_name())?;
    let result = match command {
        Commands::GatherMetrics => tasks::gather_metrics(env, &logger),
        Commands::GatherPlatformMetrics => tasks::gather_platform_metrics(env, &logger),
        Commands::PostProcessMetrics => tasks::post_process_metrics(env, &logger),
        Commands::AggregateMetrics => tasks::aggregate_metrics(env, &logger),
        Commands::CustomizeDeployments => tasks::customize_deployments(env, &logger),
        Commands::BumpBaseImage => tasks::bump_base_image(env, &logger),
    };
    if let Err(err) = &result {
        logger.error(&err.to_string());
    }
    result
}

/// Creates the logger described by the logging configuration.
fn build_logger(config: &LoggingConfig, task: &str) -> CliResult<Logger> {
    let sink: Arc<dyn LogSink> = match &config.log_path {
        Some(path) => Arc::new(
            FileLogSink::new(path)
                .map_err(|err| CliError::context(&format!("cannot open log file {}", path.display()), err))?,
        ),
        None => Arc::new(StderrLogSink),
    };
    Ok(Logger::new(sink, task, config.min_level()))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "error: {message}");
    ExitCode::FAILURE
}
