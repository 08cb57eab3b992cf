// crates/pipeline-helpers-cli/src/tasks.rs
// ============================================================================
// Module: Pipeline Tasks
// Description: One function per CLI subcommand wiring config to providers.
// Purpose: Keep task orchestration testable without spawning the binary.
// Dependencies: pipeline-helpers-{config,core,providers,store}, serde_json
// ============================================================================

//! ## Overview
//! Tasks read their configuration from an [`EnvSource`], call into the core,
//! store, and provider crates, and write their result files. They share the
//! filesystem contract of the pipeline: `metrics.json`,
//! `platform_metrics.json`, `processed_metrics.json`, the timestamp result
//! files, the customized manifests, and `pr-comment`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use pipeline_helpers_config::AggregateConfig;
use pipeline_helpers_config::BumpConfig;
use pipeline_helpers_config::EnvSource;
use pipeline_helpers_config::GatherConfig;
use pipeline_helpers_config::ManifestConfig;
use pipeline_helpers_config::PlatformConfig;
use pipeline_helpers_config::PostProcessConfig;
use pipeline_helpers_config::TestInfo;
use pipeline_helpers_core::LogLevel;
use pipeline_helpers_core::Logger;
use pipeline_helpers_core::ManifestKind;
use pipeline_helpers_core::MetricsContribution;
use pipeline_helpers_core::MetricsDocument;
use pipeline_helpers_core::PlatformMetrics;
use pipeline_helpers_core::PrInfo;
use pipeline_helpers_core::ReportSource;
use pipeline_helpers_core::TimeWindow;
use pipeline_helpers_core::files::read_json;
use pipeline_helpers_core::files::read_text;
use pipeline_helpers_core::files::write_file;
use pipeline_helpers_core::files::write_json_pretty;
use pipeline_helpers_core::manifest::customize_manifest;
use pipeline_helpers_core::manifest::parse_manifest;
use pipeline_helpers_core::manifest::render_manifest;
use pipeline_helpers_core::render_report;
use pipeline_helpers_providers::PrometheusClient;
use pipeline_helpers_providers::RegistryClient;
use pipeline_helpers_providers::bump_base_images;
use pipeline_helpers_providers::collect_metrics;
use pipeline_helpers_providers::collect_platform_metrics;
use pipeline_helpers_store::MetricsStore;
use serde_json::Map;
use serde_json::Value;

use crate::CliError;
use crate::CliResult;

// ============================================================================
// SECTION: Info Metric Keys
// ============================================================================

/// Deployment namespace key.
const NAMESPACE_KEY: &str = "namespace deployment";
/// Pull request URL key.
const SOURCE_URL_KEY: &str = "source URL";
/// Pull request number key.
const PR_NUMBER_KEY: &str = "PR number";
/// Test name key.
const TEST_NAME_KEY: &str = "test name";
/// Test type key.
const TEST_TYPE_KEY: &str = "test type";
/// Test URL key.
const TEST_URL_KEY: &str = "test URL";

// ============================================================================
// SECTION: Gather Metrics
// ============================================================================

/// Runs the install step and the model test, leaving `metrics.json` behind.
pub(crate) fn gather_metrics(env: &EnvSource, logger: &Logger) -> CliResult<()> {
    let config = GatherConfig::from_env(env).map_err(|err| CliError::context("configuration", err))?;
    let collected = collect_metrics(&config.run, logger).map_err(|err| CliError::context("gather metrics", err))?;
    logger.with_fields(LogLevel::Info, "metrics gathered", [
        ("path", Value::String(config.run.resolved_metrics_path().display().to_string())),
        ("started", Value::from(collected.started)),
        ("ended", Value::from(collected.ended)),
    ]);
    Ok(())
}

// ============================================================================
// SECTION: Gather Platform Metrics
// ============================================================================

/// Queries the metrics backend and writes `platform_metrics.json`.
pub(crate) fn gather_platform_metrics(env: &EnvSource, logger: &Logger) -> CliResult<()> {
    let config = PlatformConfig::from_env(env).map_err(|err| CliError::context("configuration", err))?;
    let client = PrometheusClient::new(&config.prometheus)
        .map_err(|err| CliError::context("metrics backend", err))?;
    let window = match TimeWindow::load(&config.timestamps.started, &config.timestamps.ended) {
        Ok(window) => Some(window),
        Err(err) => {
            logger.with_fields(LogLevel::Warning, "run time window unreadable", [(
                "error",
                Value::String(err.to_string()),
            )]);
            None
        }
    };
    let metrics = collect_platform_metrics(&client, &config.target, window.as_ref(), logger);
    write_json_pretty(&config.output_path, &metrics.to_json_map())
        .map_err(|err| CliError::context("write platform metrics", err))?;
    logger.with_fields(LogLevel::Info, "platform metrics written", [(
        "path",
        Value::String(config.output_path.display().to_string()),
    )]);
    Ok(())
}

// ============================================================================
// SECTION: Post-Process Metrics
// ============================================================================

/// Merges this run's metrics into the stored document and writes
/// `processed_metrics.json`.
pub(crate) fn post_process_metrics(env: &EnvSource, logger: &Logger) -> CliResult<()> {
    let config = PostProcessConfig::from_env(env).map_err(|err| CliError::context("configuration", err))?;
    let pr = PrInfo::load(&config.target.pr_file_path).map_err(|err| CliError::context("pull request", err))?;
    let model_metrics = load_object(&config.metrics_file_path, "model metrics")?;
    let platform_metrics = load_platform_metrics(&config.platform_metrics_file_path, logger)?;
    let contribution = build_contribution(
        &pr,
        &config.target.deployment_namespace,
        &config.test_info,
        model_metrics,
        platform_metrics,
    );
    let key = config
        .target
        .document_key(&pr, config.key_by_pr)
        .map_err(|err| CliError::context("document key", err))?;

    let document = match MetricsStore::connect(&config.store) {
        Ok(store) => {
            let outcome = store
                .merge_contribution(&key, &contribution, config.merge_strategy)
                .map_err(|err| CliError::context("merge metrics", err))?;
            logger.with_fields(LogLevel::Info, "metrics document stored", [
                ("key", Value::String(outcome.object_key)),
                ("created", Value::Bool(outcome.created)),
                ("strategy", Value::String(config.merge_strategy.as_str().to_string())),
            ]);
            outcome.document
        }
        Err(err) => {
            logger.with_fields(LogLevel::Warning, "object store unavailable, metrics not persisted", [(
                "error",
                Value::String(err.to_string()),
            )]);
            let mut document = MetricsDocument::new();
            document.merge(&contribution, config.merge_strategy);
            document
        }
    };
    write_json_pretty(&config.processed_metrics_path, &document)
        .map_err(|err| CliError::context("write processed metrics", err))?;
    Ok(())
}

/// Builds one run's contribution from its collected inputs.
fn build_contribution(
    pr: &PrInfo,
    namespace: &str,
    test_info: &TestInfo,
    model_application_metrics: Map<String, Value>,
    platform_metrics: Map<String, Value>,
) -> MetricsContribution {
    let mut info = Map::new();
    info.insert(NAMESPACE_KEY.to_string(), Value::String(namespace.to_string()));
    info.insert(SOURCE_URL_KEY.to_string(), Value::String(pr.source_url()));
    info.insert(PR_NUMBER_KEY.to_string(), Value::from(pr.number));
    let optional = [
        (TEST_NAME_KEY, &test_info.name),
        (TEST_TYPE_KEY, &test_info.kind),
        (TEST_URL_KEY, &test_info.url),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            info.insert(key.to_string(), Value::String(value.clone()));
        }
    }
    MetricsContribution {
        model_version: pr.model_version(),
        info_metrics: info,
        model_application_metrics,
        platform_metrics,
    }
}

/// Loads the platform section, falling back to `N/A` values without a file.
fn load_platform_metrics(path: &Path, logger: &Logger) -> CliResult<Map<String, Value>> {
    if !path.exists() {
        logger.with_fields(LogLevel::Warning, "platform metrics file missing, using N/A", [(
            "path",
            Value::String(path.display().to_string()),
        )]);
        return Ok(PlatformMetrics::unavailable_map());
    }
    load_object(path, "platform metrics")
}

/// Reads a JSON object file.
fn load_object(path: &Path, label: &str) -> CliResult<Map<String, Value>> {
    let value: Value = read_json(path).map_err(|err| CliError::context(label, err))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(CliError::new(format!("{label}: {} must contain a JSON object", path.display()))),
    }
}

// ============================================================================
// SECTION: Aggregate Metrics
// ============================================================================

/// Aggregates the repository's processed documents and writes `pr-comment`.
pub(crate) fn aggregate_metrics(env: &EnvSource, logger: &Logger) -> CliResult<()> {
    let config = AggregateConfig::from_env(env).map_err(|err| CliError::context("configuration", err))?;
    let pr = PrInfo::load(&config.target.pr_file_path).map_err(|err| CliError::context("pull request", err))?;
    let key = config.target.repository_key(&pr).map_err(|err| CliError::context("document key", err))?;
    logger.with_fields(LogLevel::Info, "report row limit", [(
        "max_rows",
        Value::from(config.report.max_rows),
    )]);

    let report = match MetricsStore::connect(&config.store) {
        Ok(store) => {
            let outcome =
                store.aggregate_repository(&key).map_err(|err| CliError::context("aggregate metrics", err))?;
            logger.with_fields(LogLevel::Info, "aggregated metrics stored", [
                ("key", Value::String(outcome.object_key.clone())),
                ("sources", Value::from(outcome.sources.len())),
            ]);
            render_report(ReportSource::Document(&outcome.document), &config.report)
        }
        Err(err) => {
            logger.with_fields(LogLevel::Warning, "object store unavailable, report has no tables", [(
                "error",
                Value::String(err.to_string()),
            )]);
            render_report(ReportSource::StoreUnavailable, &config.report)
        }
    };
    write_file(&config.report_path, report.as_bytes()).map_err(|err| CliError::context("write report", err))?;
    logger.with_fields(LogLevel::Info, "report written", [(
        "path",
        Value::String(config.report_path.display().to_string()),
    )]);
    Ok(())
}

// ============================================================================
// SECTION: Customize Deployments
// ============================================================================

/// Writes the customized deployment, route, and service manifests.
pub(crate) fn customize_deployments(env: &EnvSource, logger: &Logger) -> CliResult<()> {
    let config = ManifestConfig::from_env(env).map_err(|err| CliError::context("configuration", err))?;
    let pr = PrInfo::load(&config.pr_file_path).map_err(|err| CliError::context("pull request", err))?;
    let label = pr.service_label(config.overlay.as_deref());
    for kind in ManifestKind::ALL {
        let template_path = config.template_dir.join(kind.template_file_name());
        let context = format!("{} manifest {}", kind.as_str(), template_path.display());
        let template = read_text(&template_path).map_err(|err| CliError::context(&context, err))?;
        let template = parse_manifest(&template).map_err(|err| CliError::context(&context, err))?;
        let customized = customize_manifest(kind, &template, &label, &config.image)
            .map_err(|err| CliError::context(&context, err))?;
        let rendered = render_manifest(&customized).map_err(|err| CliError::context(&context, err))?;
        let output_path = config.output_dir.join(kind.output_file_name());
        write_file(&output_path, rendered.as_bytes()).map_err(|err| CliError::context(&context, err))?;
        logger.with_fields(LogLevel::Info, "manifest customized", [
            ("kind", Value::String(kind.as_str().to_string())),
            ("label", Value::String(label.clone())),
            ("path", Value::String(output_path.display().to_string())),
        ]);
    }
    Ok(())
}

// ============================================================================
// SECTION: Bump Base Image
// ============================================================================

/// Bumps outdated base images in the repository's CI config.
pub(crate) fn bump_base_image(env: &EnvSource, logger: &Logger) -> CliResult<()> {
    let config = BumpConfig::from_env(env).map_err(|err| CliError::context("configuration", err))?;
    let registry = RegistryClient::new(&config.registry).map_err(|err| CliError::context("registry", err))?;
    let outcome = bump_base_images(&config.config_path, &config.field, &registry, logger)
        .map_err(|err| CliError::context("bump base image", err))?;
    logger.with_fields(LogLevel::Info, "base image check complete", [
        ("images", Value::from(outcome.images.len())),
        ("rewritten", Value::Bool(outcome.rewritten)),
    ]);
    Ok(())
}
