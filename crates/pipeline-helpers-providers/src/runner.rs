// crates/pipeline-helpers-providers/src/runner.rs
// ============================================================================
// Module: Test Command Runner
// Description: Runs the install step and the model test, then loads metrics.
// Purpose: Produce the model application metrics for a PR deployment.
// Dependencies: serde_json, thiserror, pipeline-helpers-core
// ============================================================================

//! ## Overview
//! Commands run through `sh -c` in the execution directory. The install step
//! is optional; the test step writes stdout and stderr to files so a chatty
//! test never blocks on a pipe. Both steps are bounded by the configured
//! timeout and the child is killed when it expires. Start and end timestamps
//! are persisted around the test step for the platform metrics collector.
//!
//! Relative stdout, stderr, and metrics paths resolve against the execution
//! directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use pipeline_helpers_core::Logger;
use pipeline_helpers_core::files::read_json;
use pipeline_helpers_core::files::read_text;
use pipeline_helpers_core::files::write_json_pretty;
use pipeline_helpers_core::logging::LogLevel;
use pipeline_helpers_core::timestamp::format_rfc3339;
use pipeline_helpers_core::timestamp::unix_seconds_now;
use pipeline_helpers_core::timestamp::write_timestamp;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Interval between child status polls.
const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Shell used to run commands.
const SHELL: &str = "sh";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Metrics collection errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectError {
    /// The install step failed or could not start.
    #[error("install step failed: {0}")]
    Install(String),
    /// The test command failed or could not start.
    #[error("test command failed: {0}")]
    TestExecution(String),
    /// The test command exceeded its timeout and was killed.
    #[error("test command timed out after {timeout_secs}s")]
    TestTimeout {
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// The metrics result is missing or not a JSON object.
    #[error("metrics file error: {0}")]
    MetricsFile(String),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Timestamp result files written around the test step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampPaths {
    /// Start timestamp file.
    pub started: PathBuf,
    /// End timestamp file.
    pub ended: PathBuf,
}

/// Everything needed to run the test and locate its metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRunSpec {
    /// Working directory for both commands.
    pub exec_dir: PathBuf,
    /// Optional install command.
    pub install_command: Option<String>,
    /// Test command.
    pub test_command: String,
    /// Timeout applied to each command.
    pub timeout: Duration,
    /// Captured stdout path.
    pub stdout_path: PathBuf,
    /// Captured stderr path.
    pub stderr_path: PathBuf,
    /// Metrics result file path.
    pub metrics_file_path: PathBuf,
    /// Parse metrics from captured stdout instead of the result file.
    pub metrics_from_stdout: bool,
    /// Timestamp result files.
    pub timestamps: TimestampPaths,
}

impl TestRunSpec {
    /// Resolves a path against the execution directory.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() { path.to_path_buf() } else { self.exec_dir.join(path) }
    }

    /// Returns the resolved metrics result path.
    #[must_use]
    pub fn resolved_metrics_path(&self) -> PathBuf {
        self.resolve(&self.metrics_file_path)
    }
}

/// Collected model application metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedMetrics {
    /// Metrics object produced by the test.
    pub metrics: Map<String, Value>,
    /// Test start in Unix seconds.
    pub started: u64,
    /// Test end in Unix seconds.
    pub ended: u64,
}

/// How a bounded child process finished.
enum ChildOutcome {
    /// Exited on its own.
    Exited(ExitStatus),
    /// Killed after the timeout.
    TimedOut,
}

// ============================================================================
// SECTION: Collection
// ============================================================================

/// Runs install and test, then loads the metrics object.
///
/// # Errors
///
/// Returns [`CollectError`] when a step fails, times out, or the metrics
/// cannot be loaded.
pub fn collect_metrics(spec: &TestRunSpec, logger: &Logger) -> Result<CollectedMetrics, CollectError> {
    if let Some(install) = spec.install_command.as_deref().filter(|command| !command.trim().is_empty()) {
        run_install(spec, install, logger)?;
    } else {
        logger.info("install step disabled");
    }

    let started = unix_seconds_now();
    persist_timestamp(&spec.timestamps.started, started, logger);
    let test_result = run_test(spec, logger);
    let ended = unix_seconds_now();
    persist_timestamp(&spec.timestamps.ended, ended, logger);
    test_result?;

    let metrics = load_metrics(spec)?;
    logger.with_fields(LogLevel::Info, "model metrics collected", [
        ("metrics", Value::from(metrics.len())),
        ("started_at", Value::String(format_rfc3339(started))),
        ("ended_at", Value::String(format_rfc3339(ended))),
        ("duration_secs", Value::from(ended.saturating_sub(started))),
    ]);
    Ok(CollectedMetrics {
        metrics,
        started,
        ended,
    })
}

/// Runs the install command with stdout forwarded to stderr.
fn run_install(spec: &TestRunSpec, command: &str, logger: &Logger) -> Result<(), CollectError> {
    logger.with_fields(LogLevel::Info, "running install step", [("command", Value::String(command.to_string()))]);
    let child = shell(command, &spec.exec_dir)
        .stdout(Stdio::from(std::io::stderr()))
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|err| CollectError::Install(format!("cannot start `{command}`: {err}")))?;
    match wait_bounded(child, spec.timeout).map_err(CollectError::Install)? {
        ChildOutcome::Exited(status) if status.success() => Ok(()),
        ChildOutcome::Exited(status) => Err(CollectError::Install(format!("`{command}` exited with {status}"))),
        ChildOutcome::TimedOut => Err(CollectError::Install(format!(
            "`{command}` timed out after {}s",
            spec.timeout.as_secs()
        ))),
    }
}

/// Runs the test command with stdout and stderr captured to files.
fn run_test(spec: &TestRunSpec, logger: &Logger) -> Result<(), CollectError> {
    let command = spec.test_command.as_str();
    logger.with_fields(LogLevel::Info, "running test command", [("command", Value::String(command.to_string()))]);
    let stdout = create_capture(&spec.resolve(&spec.stdout_path))?;
    let stderr = create_capture(&spec.resolve(&spec.stderr_path))?;
    let child = shell(command, &spec.exec_dir)
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
        .map_err(|err| CollectError::TestExecution(format!("cannot start `{command}`: {err}")))?;
    match wait_bounded(child, spec.timeout).map_err(CollectError::TestExecution)? {
        ChildOutcome::Exited(status) if status.success() => Ok(()),
        ChildOutcome::Exited(status) => Err(CollectError::TestExecution(format!(
            "`{command}` exited with {status}, see {}",
            spec.stderr_path.display()
        ))),
        ChildOutcome::TimedOut => Err(CollectError::TestTimeout {
            timeout_secs: spec.timeout.as_secs(),
        }),
    }
}

/// Loads the metrics object from the result file or captured stdout.
fn load_metrics(spec: &TestRunSpec) -> Result<Map<String, Value>, CollectError> {
    let metrics_path = spec.resolved_metrics_path();
    let value: Value = if spec.metrics_from_stdout {
        let stdout_path = spec.resolve(&spec.stdout_path);
        let text = read_text(&stdout_path).map_err(|err| CollectError::MetricsFile(err.to_string()))?;
        let value: Value = serde_json::from_str(text.trim()).map_err(|err| {
            CollectError::MetricsFile(format!("stdout of the test is not JSON: {err}"))
        })?;
        if value.is_object() {
            write_json_pretty(&metrics_path, &value)
                .map_err(|err| CollectError::MetricsFile(err.to_string()))?;
        }
        value
    } else {
        read_json(&metrics_path).map_err(|err| CollectError::MetricsFile(err.to_string()))?
    };
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(CollectError::MetricsFile(format!(
            "{} must contain a JSON object",
            metrics_path.display()
        ))),
    }
}

// ============================================================================
// SECTION: Process Helpers
// ============================================================================

/// Builds a shell command in the execution directory.
fn shell(command: &str, exec_dir: &Path) -> Command {
    let mut shell = Command::new(SHELL);
    shell.arg("-c").arg(command).current_dir(exec_dir).stdin(Stdio::null());
    shell
}

/// Creates a capture file, truncating previous output.
fn create_capture(path: &Path) -> Result<File, CollectError> {
    File::create(path)
        .map_err(|err| CollectError::TestExecution(format!("cannot create {}: {err}", path.display())))
}

/// Waits for a child, killing it once `timeout` elapses.
///
/// A timeout too large to represent as an instant never expires.
fn wait_bounded(mut child: Child, timeout: Duration) -> Result<ChildOutcome, String> {
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if let Some(status) = child.try_wait().map_err(|err| err.to_string())? {
            return Ok(ChildOutcome::Exited(status));
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(ChildOutcome::TimedOut);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Writes a timestamp file, logging instead of failing.
fn persist_timestamp(path: &Path, seconds: u64, logger: &Logger) {
    if let Err(err) = write_timestamp(path, seconds) {
        logger.with_fields(LogLevel::Warning, "timestamp not persisted", [
            ("path", Value::String(path.display().to_string())),
            ("error", Value::String(err.to_string())),
        ]);
    }
}
