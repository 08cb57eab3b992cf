//! Environment validation tests for pipeline-helpers-config.
// crates/pipeline-helpers-config/tests/env_validation.rs
// =============================================================================
// Module: Environment Validation Tests
// Description: Validate defaults, required variables, and value parsing.
// Purpose: Ensure every task fails fast on unusable configuration.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use pipeline_helpers_config::AggregateConfig;
use pipeline_helpers_config::BumpConfig;
use pipeline_helpers_config::ConfigError;
use pipeline_helpers_config::EnvSource;
use pipeline_helpers_config::GatherConfig;
use pipeline_helpers_config::LoggingConfig;
use pipeline_helpers_config::ManifestConfig;
use pipeline_helpers_config::PlatformConfig;
use pipeline_helpers_config::PostProcessConfig;
use pipeline_helpers_config::store_config_from_env;
use pipeline_helpers_core::LogLevel;
use pipeline_helpers_core::MergeStrategy;
use pipeline_helpers_core::PrInfo;
use tempfile::TempDir;

type TestResult = Result<(), String>;

fn env(pairs: &[(&str, &str)]) -> EnvSource {
    EnvSource::from_pairs(pairs.iter().copied())
}

fn assert_invalid<T: std::fmt::Debug>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(value) => Err(format!("expected invalid config, got {value:?}")),
    }
}

fn check(condition: bool, message: &str) -> TestResult {
    if condition { Ok(()) } else { Err(message.to_string()) }
}

#[test]
fn logging_defaults_to_info_on_stderr() -> TestResult {
    let config = LoggingConfig::from_env(&env(&[])).map_err(|err| err.to_string())?;
    check(config.min_level() == LogLevel::Info, "default level must be info")?;
    check(config.log_path.is_none(), "log path must default to stderr")?;
    let debug = LoggingConfig::from_env(&env(&[("DEBUG_LEVEL", "1")])).map_err(|err| err.to_string())?;
    check(debug.min_level() == LogLevel::Debug, "DEBUG_LEVEL=1 enables debug")?;
    assert_invalid(LoggingConfig::from_env(&env(&[("DEBUG_LEVEL", "loud")])), "DEBUG_LEVEL")
}

#[test]
fn gather_defaults_build_pipenv_command() -> TestResult {
    let config = GatherConfig::from_env(&env(&[])).map_err(|err| err.to_string())?;
    let run = config.run;
    check(run.test_command == "pipenv run python ./src/test.py", &run.test_command)?;
    check(run.install_command.as_deref() == Some("pipenv install --deploy"), "default install")?;
    check(run.timeout == Duration::from_secs(3600), "default timeout")?;
    check(run.metrics_file_path == PathBuf::from("metrics.json"), "default metrics path")?;
    check(run.stdout_path == PathBuf::from("script.stdout"), "default stdout path")?;
    check(!run.metrics_from_stdout, "stdout mode off by default")?;
    check(
        run.timestamps.started == PathBuf::from("/tekton/results/gather_timestamp_started"),
        "default started timestamp path",
    )
}

#[test]
fn gather_quotes_exec_file_and_disables_blank_install() -> TestResult {
    let config = GatherConfig::from_env(&env(&[
        ("PIPELINE_EXEC_FILE", "/work/my tests/run.py"),
        ("PIPELINE_HELPERS_INSTALL_COMMAND", ""),
        ("PIPELINE_HELPERS_TEST_TIMEOUT_SECS", "90"),
        ("PIPELINE_HELPERS_METRICS_FROM_STDOUT", "yes"),
    ]))
    .map_err(|err| err.to_string())?;
    check(config.run.test_command == "pipenv run python '/work/my tests/run.py'", &config.run.test_command)?;
    check(config.run.install_command.is_none(), "blank install disables the step")?;
    check(config.run.timeout == Duration::from_secs(90), "timeout override")?;
    check(config.run.metrics_from_stdout, "stdout mode enabled")
}

#[test]
fn gather_rejects_bad_timeouts() -> TestResult {
    assert_invalid(
        GatherConfig::from_env(&env(&[("PIPELINE_HELPERS_TEST_TIMEOUT_SECS", "0")])),
        "greater than zero",
    )?;
    assert_invalid(
        GatherConfig::from_env(&env(&[("PIPELINE_HELPERS_TEST_TIMEOUT_SECS", "soon")])),
        "PIPELINE_HELPERS_TEST_TIMEOUT_SECS",
    )
}

#[test]
fn platform_requires_endpoint_token_and_pod() -> TestResult {
    assert_invalid(PlatformConfig::from_env(&env(&[])), "THANOS_ENDPOINT")?;
    assert_invalid(
        PlatformConfig::from_env(&env(&[("THANOS_ENDPOINT", "https://thanos.example")])),
        "THANOS_ACCESS_TOKEN",
    )?;
    assert_invalid(
        PlatformConfig::from_env(&env(&[
            ("THANOS_ENDPOINT", "https://thanos.example"),
            ("THANOS_ACCESS_TOKEN", "token"),
        ])),
        "PIPELINE_HELPERS_POD_NAME",
    )?;
    assert_invalid(
        PlatformConfig::from_env(&env(&[
            ("THANOS_ENDPOINT", "thanos.example"),
            ("THANOS_ACCESS_TOKEN", "token"),
            ("PIPELINE_HELPERS_POD_NAME", "pod"),
        ])),
        "THANOS_ENDPOINT",
    )
}

#[test]
fn platform_disables_tls_verification_by_default() -> TestResult {
    let config = PlatformConfig::from_env(&env(&[
        ("THANOS_ENDPOINT", "https://thanos.example"),
        ("THANOS_ACCESS_TOKEN", "token"),
        ("PIPELINE_HELPERS_POD_NAME", "myapp-pr-42"),
    ]))
    .map_err(|err| err.to_string())?;
    check(!config.prometheus.verify_tls, "tls verification off by default")?;
    check(config.target.namespace == "aicoe-ci", "default namespace")?;
    check(config.output_path == PathBuf::from("platform_metrics.json"), "default output")
}

#[test]
fn post_process_parses_merge_strategy() -> TestResult {
    let config = PostProcessConfig::from_env(&env(&[])).map_err(|err| err.to_string())?;
    check(config.merge_strategy == MergeStrategy::Append, "append by default")?;
    check(config.store.bucket.is_none(), "bucket unset by default")?;
    let config = PostProcessConfig::from_env(&env(&[(
        "PIPELINE_HELPERS_MERGE_STRATEGY",
        "overwrite-by-version",
    )]))
    .map_err(|err| err.to_string())?;
    check(config.merge_strategy == MergeStrategy::OverwriteByVersion, "strategy override")?;
    assert_invalid(
        PostProcessConfig::from_env(&env(&[("PIPELINE_HELPERS_MERGE_STRATEGY", "replace")])),
        "PIPELINE_HELPERS_MERGE_STRATEGY",
    )
}

#[test]
fn document_key_scopes_by_pr_and_overlay() -> TestResult {
    let dir = TempDir::new().map_err(|err| err.to_string())?;
    let pr = load_pr(&dir)?;
    let config = PostProcessConfig::from_env(&env(&[
        ("PIPELINE_HELPERS_KEY_BY_PR", "true"),
        ("PIPELINE_HELPERS_OVERLAY_NAME", "gpu"),
    ]))
    .map_err(|err| err.to_string())?;
    let key = config.target.document_key(&pr, config.key_by_pr).map_err(|err| err.to_string())?;
    check(
        key.prefix() == "data/aicoe-ci/deployment-metrics/org/myapp/42/gpu/",
        &key.prefix(),
    )?;
    let repository = config.target.repository_key(&pr).map_err(|err| err.to_string())?;
    check(repository.prefix() == "data/aicoe-ci/deployment-metrics/org/myapp/", &repository.prefix())
}

fn load_pr(dir: &TempDir) -> Result<PrInfo, String> {
    let path = dir.path().join("pr.json");
    std::fs::write(&path, r#"{"Number": 42, "Base": {"Repo": {"FullName": "org/myapp", "Name": "myapp"}}}"#)
        .map_err(|err| err.to_string())?;
    PrInfo::load(&path).map_err(|err| err.to_string())
}

#[test]
fn store_requires_both_credentials() -> TestResult {
    assert_invalid(store_config_from_env(&env(&[("THOTH_CEPH_KEY_ID", "key")])), "must be set together")?;
    let config = store_config_from_env(&env(&[
        ("THOTH_CEPH_BUCKET", "bucket"),
        ("THOTH_S3_ENDPOINT_URL", "https://s3.example"),
        ("THOTH_CEPH_KEY_ID", "key"),
        ("THOTH_CEPH_SECRET_KEY", "secret"),
    ]))
    .map_err(|err| err.to_string())?;
    check(config.force_path_style, "custom endpoints use path style")?;
    check(config.bucket.as_deref() == Some("bucket"), "bucket parsed")?;
    assert_invalid(store_config_from_env(&env(&[("THOTH_S3_ENDPOINT_URL", "s3 host")])), "THOTH_S3_ENDPOINT_URL")
}

#[test]
fn aggregate_reads_report_options() -> TestResult {
    let config = AggregateConfig::from_env(&env(&[
        ("PIPELINE_HELPERS_MAX_LIMIT_RESULTS", "3"),
        ("PIPELINE_HELPERS_REPORT_TITLE", "Nightly results"),
    ]))
    .map_err(|err| err.to_string())?;
    check(config.report.max_rows == 3, "row limit override")?;
    check(config.report.title == "Nightly results", "title override")?;
    check(config.report_path == PathBuf::from("pr-comment"), "default report path")?;
    let defaults = AggregateConfig::from_env(&env(&[])).map_err(|err| err.to_string())?;
    check(defaults.report.max_rows == 10, "default row limit")?;
    check(defaults.report.title == "AICoE CI results", "default title")
}

#[test]
fn manifest_requires_image() -> TestResult {
    assert_invalid(ManifestConfig::from_env(&env(&[])), "PIPELINE_HELPERS_IMAGE_URL_DEPLOYMENT")?;
    let config = ManifestConfig::from_env(&env(&[("PIPELINE_HELPERS_IMAGE_URL_DEPLOYMENT", "quay.io/org/img:latest")]))
        .map_err(|err| err.to_string())?;
    check(config.image == "quay.io/org/img:latest", "image parsed")?;
    check(config.output_dir == PathBuf::from("/workspace/repo"), "default output dir")
}

#[test]
fn bump_resolves_config_under_repository() -> TestResult {
    let config = BumpConfig::from_env(&env(&[("REPOSITORY_PATH", "/workspace/repo")]))
        .map_err(|err| err.to_string())?;
    check(config.config_path == PathBuf::from("/workspace/repo/.aicoe-ci.yaml"), "config under repository")?;
    check(config.field == "base-image", "default field")?;
    check(config.registry.api_url == "https://quay.io/api/v1", "default registry")?;
    check(config.registry.token.is_none(), "no token by default")?;
    assert_invalid(
        BumpConfig::from_env(&env(&[("PIPELINE_HELPERS_REGISTRY_API_URL", "ftp://quay.io")])),
        "http or https",
    )
}
