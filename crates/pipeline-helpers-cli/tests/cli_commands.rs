// crates/pipeline-helpers-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests running the pipeline-helpers binary.
// Purpose: Verify exit codes, stderr errors, and result files per task.
// Dependencies: pipeline-helpers-cli binary, tempfile
// ============================================================================
//! ## Overview
//! Each test runs the binary with a cleared environment so only the
//! variables set here influence the task.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn pipeline_helpers_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pipeline-helpers"))
}

fn run(task: &str, vars: &[(&str, PathBuf)], text_vars: &[(&str, &str)]) -> Output {
    let mut command = Command::new(pipeline_helpers_bin());
    command.arg(task).env_clear();
    if let Some(path) = std::env::var_os("PATH") {
        command.env("PATH", path);
    }
    for (name, value) in vars {
        command.env(name, value);
    }
    for (name, value) in text_vars {
        command.env(name, value);
    }
    command.output().unwrap()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn write_pr(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("pr.json");
    fs::write(&path, r#"{"Number": 7, "Base": {"Repo": {"FullName": "org/app", "Name": "app"}}}"#).unwrap();
    path
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn gather_metrics_runs_command_and_logs_to_file() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("pipeline.log");
    let output = run(
        "gather-metrics",
        &[
            ("PIPELINE_EXEC_DIR", dir.path().to_path_buf()),
            ("PIPELINE_HELPERS_LOG_PATH", log.clone()),
            ("PIPELINE_HELPERS_TIMESTAMP_STARTED_PATH", dir.path().join("started")),
            ("PIPELINE_HELPERS_TIMESTAMP_ENDED_PATH", dir.path().join("ended")),
        ],
        &[
            ("PIPELINE_HELPERS_INSTALL_COMMAND", ""),
            ("PIPELINE_HELPERS_TEST_COMMAND", r#"echo '{"f1": 0.8}' > metrics.json"#),
        ],
    );

    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let metrics: Value = serde_json::from_str(&fs::read_to_string(dir.path().join("metrics.json")).unwrap()).unwrap();
    assert_eq!(metrics["f1"], 0.8);
    assert!(dir.path().join("started").exists());
    let records: Vec<Value> = fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(!records.is_empty());
    assert!(records.iter().all(|record| record["task"] == "gather-metrics"));
    assert!(records.iter().all(|record| record["event"] == "pipeline_log"));
}

#[test]
fn failing_test_command_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    let output = run(
        "gather-metrics",
        &[
            ("PIPELINE_EXEC_DIR", dir.path().to_path_buf()),
            ("PIPELINE_HELPERS_TIMESTAMP_STARTED_PATH", dir.path().join("started")),
            ("PIPELINE_HELPERS_TIMESTAMP_ENDED_PATH", dir.path().join("ended")),
        ],
        &[("PIPELINE_HELPERS_INSTALL_COMMAND", ""), ("PIPELINE_HELPERS_TEST_COMMAND", "exit 4")],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("error: gather metrics: test command failed"));
}

#[test]
fn platform_task_requires_endpoint() {
    let output = run("gather-platform-metrics", &[], &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("missing required environment variable: THANOS_ENDPOINT"));
}

#[test]
fn post_process_and_aggregate_degrade_without_store() {
    let dir = TempDir::new().unwrap();
    let pr = write_pr(&dir);
    let metrics = dir.path().join("metrics.json");
    fs::write(&metrics, r#"{"latency": 3}"#).unwrap();
    let processed = dir.path().join("processed_metrics.json");
    let report = dir.path().join("pr-comment");

    let output = run(
        "post-process-metrics",
        &[
            ("PIPELINE_HELPERS_PR_FILE_PATH", pr.clone()),
            ("PIPELINE_HELPERS_METRICS_FILE_PATH", metrics.clone()),
            ("PIPELINE_HELPERS_PLATFORM_METRICS_FILE_PATH", dir.path().join("absent.json")),
            ("PIPELINE_HELPERS_PROCESSED_METRICS_PATH", processed.clone()),
        ],
        &[],
    );
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let document: Value = serde_json::from_str(&fs::read_to_string(&processed).unwrap()).unwrap();
    assert_eq!(document["model_application_metrics"][0]["model_version"], "pr-7");

    let output = run(
        "aggregate-metrics",
        &[("PIPELINE_HELPERS_PR_FILE_PATH", pr.clone()), ("PIPELINE_HELPERS_REPORT_PATH", report.clone())],
        &[("PIPELINE_HELPERS_REPORT_TITLE", "Nightly")],
    );
    assert!(output.status.success(), "stderr: {}", stderr_of(&output));
    let text = fs::read_to_string(&report).unwrap();
    assert!(text.starts_with("# Nightly"));
    assert!(text.contains("not able to connect to the object store"));
}

#[test]
fn bump_without_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let output = run("bump-base-image", &[("REPOSITORY_PATH", dir.path().to_path_buf())], &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("error: bump base image"));
}

#[test]
fn invalid_merge_strategy_is_rejected() {
    let output = run("post-process-metrics", &[], &[("PIPELINE_HELPERS_MERGE_STRATEGY", "latest")]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("PIPELINE_HELPERS_MERGE_STRATEGY"));
}
