// crates/pipeline-helpers-config/src/config.rs
// ============================================================================
// Module: Task Configuration
// Description: Per-task configuration structs built from the environment.
// Purpose: Resolve defaults and validate inputs before any task runs.
// Dependencies: pipeline-helpers-{core,providers,store}, url
// ============================================================================

//! ## Overview
//! Every task builds exactly one configuration struct through `from_env`,
//! which applies defaults, parses typed values, and validates the result.
//! Structs hand the provider and store layers their native configuration
//! types so task code never touches raw environment values.
//!
//! ## Invariants
//! - Missing required variables fail with [`ConfigError::Missing`].
//! - Unparseable or unusable values fail with [`ConfigError::Invalid`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use pipeline_helpers_core::DocumentKey;
use pipeline_helpers_core::KeyError;
use pipeline_helpers_core::LogLevel;
use pipeline_helpers_core::MergeStrategy;
use pipeline_helpers_core::PrInfo;
use pipeline_helpers_core::ReportOptions;
use pipeline_helpers_core::report::DEFAULT_MAX_ROWS;
use pipeline_helpers_core::report::DEFAULT_REPORT_TITLE;
use pipeline_helpers_providers::PlatformTarget;
use pipeline_helpers_providers::PrometheusConfig;
use pipeline_helpers_providers::RegistryConfig;
use pipeline_helpers_providers::TestRunSpec;
use pipeline_helpers_providers::TimestampPaths;
use pipeline_helpers_store::S3StoreConfig;
use url::Url;

use crate::env::ConfigError;
use crate::env::EnvSource;
use crate::env::EnvVar;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default `pr.json` location.
pub const DEFAULT_PR_FILE_PATH: &str = "/workspace/pr/pr.json";
/// Default deployment namespace.
pub const DEFAULT_DEPLOYMENT_NAMESPACE: &str = "aicoe-ci";
/// Default leading object key segment.
pub const DEFAULT_BUCKET_PREFIX: &str = "data";
/// Default model metrics file.
pub const DEFAULT_METRICS_FILE_PATH: &str = "metrics.json";
/// Default platform metrics file.
pub const DEFAULT_PLATFORM_METRICS_FILE_PATH: &str = "platform_metrics.json";
/// Default processed metrics file.
pub const DEFAULT_PROCESSED_METRICS_PATH: &str = "processed_metrics.json";
/// Default report output file.
pub const DEFAULT_REPORT_PATH: &str = "pr-comment";
/// Default test script path relative to the execution directory.
pub const DEFAULT_MODEL_TEST_PATH: &str = "src/test.py";
/// Default install command.
pub const DEFAULT_INSTALL_COMMAND: &str = "pipenv install --deploy";
/// Default test timeout in seconds.
pub const DEFAULT_TEST_TIMEOUT_SECS: u64 = 3600;
/// Default start timestamp result file.
pub const DEFAULT_TIMESTAMP_STARTED_PATH: &str = "/tekton/results/gather_timestamp_started";
/// Default end timestamp result file.
pub const DEFAULT_TIMESTAMP_ENDED_PATH: &str = "/tekton/results/gather_timestamp_ended";
/// Default manifest template directory.
pub const DEFAULT_MANIFEST_TEMPLATE_DIR: &str = "/opt/app-root/src/manifests/template";
/// Default manifest output directory.
pub const DEFAULT_MANIFEST_OUTPUT_DIR: &str = "/workspace/repo";
/// Default CI config file bumped by the base image task.
pub const DEFAULT_CONFIG_FILE_PATH: &str = ".aicoe-ci.yaml";
/// Default YAML key holding base image references.
pub const DEFAULT_BASE_IMAGE_FIELD: &str = "base-image";
/// Default image registry API.
pub const DEFAULT_REGISTRY_API_URL: &str = "https://quay.io/api/v1";

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Logger settings shared by every task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Emit debug records.
    pub debug: bool,
    /// Optional JSON-lines log file; stderr when unset.
    pub log_path: Option<PathBuf>,
}

impl LoggingConfig {
    /// Reads logging settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `DEBUG_LEVEL` is not a boolean.
    pub fn from_env(env: &EnvSource) -> Result<Self, ConfigError> {
        Ok(Self {
            debug: env.bool_or(EnvVar::DebugLevel, false)?,
            log_path: env.optional(EnvVar::LogPath)?.map(PathBuf::from),
        })
    }

    /// Returns the minimum level to record.
    #[must_use]
    pub const fn min_level(&self) -> LogLevel {
        if self.debug { LogLevel::Debug } else { LogLevel::Info }
    }
}

// ============================================================================
// SECTION: Shared Pieces
// ============================================================================

/// Where a PR's documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    /// `pr.json` location.
    pub pr_file_path: PathBuf,
    /// Deployment namespace.
    pub deployment_namespace: String,
    /// Leading object key segments.
    pub bucket_prefix: String,
    /// Optional overlay name.
    pub overlay: Option<String>,
}

impl TargetConfig {
    /// Reads target settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is not valid UTF-8.
    pub fn from_env(env: &EnvSource) -> Result<Self, ConfigError> {
        Ok(Self {
            pr_file_path: env.path_or(EnvVar::PrFilePath, DEFAULT_PR_FILE_PATH)?,
            deployment_namespace: env.string_or(EnvVar::DeploymentNamespace, DEFAULT_DEPLOYMENT_NAMESPACE)?,
            bucket_prefix: env.string_or(EnvVar::BucketPrefix, DEFAULT_BUCKET_PREFIX)?,
            overlay: env.optional(EnvVar::OverlayName)?,
        })
    }

    /// Returns the repository-level key for a PR.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when a key segment is unsafe.
    pub fn repository_key(&self, pr: &PrInfo) -> Result<DocumentKey, KeyError> {
        DocumentKey::new(&self.bucket_prefix, &self.deployment_namespace, pr.repository())
    }

    /// Returns the processed document key, optionally scoped to the PR and
    /// always scoped to the overlay when one is set.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when a key segment is unsafe.
    pub fn document_key(&self, pr: &PrInfo, key_by_pr: bool) -> Result<DocumentKey, KeyError> {
        let mut key = self.repository_key(pr)?;
        if key_by_pr {
            key = key.with_pr(pr.number);
        }
        if let Some(overlay) = &self.overlay {
            key = key.with_overlay(overlay)?;
        }
        Ok(key)
    }
}

/// Reads object store settings. A missing bucket is not an error here; the
/// connect step reports it and the task degrades.
///
/// # Errors
///
/// Returns [`ConfigError`] when the endpoint URL is invalid or only half of the
/// credential pair is set.
pub fn store_config_from_env(env: &EnvSource) -> Result<S3StoreConfig, ConfigError> {
    let endpoint_url = env.optional(EnvVar::S3EndpointUrl)?;
    if let Some(endpoint) = &endpoint_url {
        validate_http_url(EnvVar::S3EndpointUrl, endpoint)?;
    }
    let access_key_id = env.optional(EnvVar::CephKeyId)?;
    let secret_access_key = env.optional(EnvVar::CephSecretKey)?;
    if access_key_id.is_some() != secret_access_key.is_some() {
        return Err(ConfigError::Invalid(format!(
            "{} and {} must be set together",
            EnvVar::CephKeyId.as_str(),
            EnvVar::CephSecretKey.as_str()
        )));
    }
    Ok(S3StoreConfig {
        bucket: env.optional(EnvVar::CephBucket)?,
        force_path_style: endpoint_url.is_some(),
        endpoint_url,
        region: env.optional(EnvVar::CephRegion)?,
        access_key_id,
        secret_access_key,
    })
}

/// Reads the timestamp result file locations.
fn timestamps_from_env(env: &EnvSource) -> Result<TimestampPaths, ConfigError> {
    Ok(TimestampPaths {
        started: env.path_or(EnvVar::TimestampStartedPath, DEFAULT_TIMESTAMP_STARTED_PATH)?,
        ended: env.path_or(EnvVar::TimestampEndedPath, DEFAULT_TIMESTAMP_ENDED_PATH)?,
    })
}

// ============================================================================
// SECTION: Gather Metrics
// ============================================================================

/// Settings for the `gather-metrics` task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherConfig {
    /// Install and test run description.
    pub run: TestRunSpec,
}

impl GatherConfig {
    /// Reads and validates gather settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid values or a zero timeout.
    pub fn from_env(env: &EnvSource) -> Result<Self, ConfigError> {
        let exec_dir = env.path_or(EnvVar::ExecDir, ".")?;
        let test_path = env.string_or(EnvVar::ModelTestPath, DEFAULT_MODEL_TEST_PATH)?;
        let exec_file = env
            .optional(EnvVar::ExecFile)?
            .map_or_else(|| exec_dir.join(&test_path), PathBuf::from);
        let test_command = match env.optional(EnvVar::TestCommand)? {
            Some(command) => command,
            None => default_test_command(&exec_file)?,
        };
        let install_command = match env.raw(EnvVar::InstallCommand)? {
            Some(command) if command.trim().is_empty() => None,
            Some(command) => Some(command.trim().to_string()),
            None => Some(DEFAULT_INSTALL_COMMAND.to_string()),
        };
        let timeout_secs = env.u64_or(EnvVar::TestTimeoutSecs, DEFAULT_TEST_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid(format!(
                "{} must be greater than zero",
                EnvVar::TestTimeoutSecs.as_str()
            )));
        }
        Ok(Self {
            run: TestRunSpec {
                exec_dir,
                install_command,
                test_command,
                timeout: Duration::from_secs(timeout_secs),
                stdout_path: env.path_or(EnvVar::StdoutPath, "script.stdout")?,
                stderr_path: env.path_or(EnvVar::StderrPath, "script.stderr")?,
                metrics_file_path: env.path_or(EnvVar::MetricsFilePath, DEFAULT_METRICS_FILE_PATH)?,
                metrics_from_stdout: env.bool_or(EnvVar::MetricsFromStdout, false)?,
                timestamps: timestamps_from_env(env)?,
            },
        })
    }
}

/// Builds `pipenv run python <exec file>` with the path shell-quoted.
fn default_test_command(exec_file: &Path) -> Result<String, ConfigError> {
    let path = exec_file.to_str().ok_or_else(|| {
        ConfigError::Invalid(format!("{} must be valid UTF-8", EnvVar::ExecFile.as_str()))
    })?;
    Ok(format!("pipenv run python {}", shell_quote(path)))
}

/// Quotes a word for `sh` unless it only holds safe characters.
#[must_use]
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '/' | '.' | '_' | '-' | '+' | ':' | ','));
    if safe { word.to_string() } else { format!("'{}'", word.replace('\'', r"'\''")) }
}

// ============================================================================
// SECTION: Gather Platform Metrics
// ============================================================================

/// Settings for the `gather-platform-metrics` task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Query API client settings.
    pub prometheus: PrometheusConfig,
    /// Pod being measured.
    pub target: PlatformTarget,
    /// Output file.
    pub output_path: PathBuf,
    /// Run window written by `gather-metrics`.
    pub timestamps: TimestampPaths,
}

impl PlatformConfig {
    /// Reads and validates platform settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] without endpoint, token, or pod, and
    /// [`ConfigError::Invalid`] for a non-HTTP endpoint.
    pub fn from_env(env: &EnvSource) -> Result<Self, ConfigError> {
        let endpoint = env.required(EnvVar::ThanosEndpoint)?;
        validate_http_url(EnvVar::ThanosEndpoint, &endpoint)?;
        let token = env.required(EnvVar::ThanosAccessToken)?;
        let verify_tls = env.bool_or(EnvVar::ThanosVerifyTls, false)?;
        Ok(Self {
            prometheus: PrometheusConfig::new(&endpoint, &token, verify_tls),
            target: PlatformTarget {
                namespace: env.string_or(EnvVar::DeploymentNamespace, DEFAULT_DEPLOYMENT_NAMESPACE)?,
                pod: env.required(EnvVar::PodName)?,
            },
            output_path: env.path_or(EnvVar::PlatformMetricsFilePath, DEFAULT_PLATFORM_METRICS_FILE_PATH)?,
            timestamps: timestamps_from_env(env)?,
        })
    }
}

// ============================================================================
// SECTION: Post-Process Metrics
// ============================================================================

/// Optional test provenance recorded in the info metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestInfo {
    /// Test name.
    pub name: Option<String>,
    /// Test type.
    pub kind: Option<String>,
    /// Test URL.
    pub url: Option<String>,
}

/// Settings for the `post-process-metrics` task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessConfig {
    /// Document location.
    pub target: TargetConfig,
    /// Include the PR number in the document key.
    pub key_by_pr: bool,
    /// Merge strategy for existing documents.
    pub merge_strategy: MergeStrategy,
    /// Object store settings.
    pub store: S3StoreConfig,
    /// Model metrics input.
    pub metrics_file_path: PathBuf,
    /// Platform metrics input; a missing file yields `N/A` values.
    pub platform_metrics_file_path: PathBuf,
    /// Output for the next step.
    pub processed_metrics_path: PathBuf,
    /// Optional test provenance.
    pub test_info: TestInfo,
}

impl PostProcessConfig {
    /// Reads and validates post-process settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unknown merge strategy or bad
    /// store settings.
    pub fn from_env(env: &EnvSource) -> Result<Self, ConfigError> {
        let merge_strategy = match env.optional(EnvVar::MergeStrategy)? {
            None => MergeStrategy::default(),
            Some(raw) => MergeStrategy::parse(&raw).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "{} must be append, overwrite-by-version, or overwrite-section: {raw}",
                    EnvVar::MergeStrategy.as_str()
                ))
            })?,
        };
        Ok(Self {
            target: TargetConfig::from_env(env)?,
            key_by_pr: env.bool_or(EnvVar::KeyByPr, false)?,
            merge_strategy,
            store: store_config_from_env(env)?,
            metrics_file_path: env.path_or(EnvVar::MetricsFilePath, DEFAULT_METRICS_FILE_PATH)?,
            platform_metrics_file_path: env
                .path_or(EnvVar::PlatformMetricsFilePath, DEFAULT_PLATFORM_METRICS_FILE_PATH)?,
            processed_metrics_path: env
                .path_or(EnvVar::ProcessedMetricsPath, DEFAULT_PROCESSED_METRICS_PATH)?,
            test_info: TestInfo {
                name: env.optional(EnvVar::TestName)?,
                kind: env.optional(EnvVar::TestType)?,
                url: env.optional(EnvVar::TestUrl)?,
            },
        })
    }
}

// ============================================================================
// SECTION: Aggregate Metrics
// ============================================================================

/// Settings for the `aggregate-metrics` task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateConfig {
    /// Document location.
    pub target: TargetConfig,
    /// Object store settings.
    pub store: S3StoreConfig,
    /// Report rendering options.
    pub report: ReportOptions,
    /// Report output file.
    pub report_path: PathBuf,
}

impl AggregateConfig {
    /// Reads and validates aggregate settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a bad row limit or store settings.
    pub fn from_env(env: &EnvSource) -> Result<Self, ConfigError> {
        let default_rows = u64::try_from(DEFAULT_MAX_ROWS).unwrap_or(u64::MAX);
        let max_rows = env.u64_or(EnvVar::MaxLimitResults, default_rows)?;
        let max_rows = usize::try_from(max_rows).map_err(|_| {
            ConfigError::Invalid(format!("{} is too large", EnvVar::MaxLimitResults.as_str()))
        })?;
        Ok(Self {
            target: TargetConfig::from_env(env)?,
            store: store_config_from_env(env)?,
            report: ReportOptions {
                title: env.string_or(EnvVar::ReportTitle, DEFAULT_REPORT_TITLE)?,
                max_rows,
            },
            report_path: env.path_or(EnvVar::ReportPath, DEFAULT_REPORT_PATH)?,
        })
    }
}

// ============================================================================
// SECTION: Customize Deployments
// ============================================================================

/// Settings for the `customize-deployments` task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestConfig {
    /// `pr.json` location.
    pub pr_file_path: PathBuf,
    /// Optional overlay name appended to the label.
    pub overlay: Option<String>,
    /// Image deployed by the customized manifest.
    pub image: String,
    /// Directory holding the templates.
    pub template_dir: PathBuf,
    /// Directory receiving the customized manifests.
    pub output_dir: PathBuf,
}

impl ManifestConfig {
    /// Reads and validates manifest settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] without an image URL.
    pub fn from_env(env: &EnvSource) -> Result<Self, ConfigError> {
        Ok(Self {
            pr_file_path: env.path_or(EnvVar::PrFilePath, DEFAULT_PR_FILE_PATH)?,
            overlay: env.optional(EnvVar::OverlayName)?,
            image: env.required(EnvVar::ImageUrlDeployment)?,
            template_dir: env.path_or(EnvVar::ManifestTemplateDir, DEFAULT_MANIFEST_TEMPLATE_DIR)?,
            output_dir: env.path_or(EnvVar::ManifestOutputDir, DEFAULT_MANIFEST_OUTPUT_DIR)?,
        })
    }
}

// ============================================================================
// SECTION: Bump Base Image
// ============================================================================

/// Settings for the `bump-base-image` task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpConfig {
    /// CI config file to rewrite.
    pub config_path: PathBuf,
    /// YAML key holding base image references.
    pub field: String,
    /// Registry API settings.
    pub registry: RegistryConfig,
}

impl BumpConfig {
    /// Reads and validates bump settings. `CONFIG_FILE_PATH` is resolved
    /// against `REPOSITORY_PATH` when that is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a non-HTTP registry URL.
    pub fn from_env(env: &EnvSource) -> Result<Self, ConfigError> {
        let config_file = env.path_or(EnvVar::ConfigFilePath, DEFAULT_CONFIG_FILE_PATH)?;
        let config_path = match env.optional(EnvVar::RepositoryPath)? {
            Some(repository) => Path::new(&repository).join(config_file),
            None => config_file,
        };
        let api_url = env.string_or(EnvVar::RegistryApiUrl, DEFAULT_REGISTRY_API_URL)?;
        validate_http_url(EnvVar::RegistryApiUrl, &api_url)?;
        Ok(Self {
            config_path,
            field: env.string_or(EnvVar::BaseImageField, DEFAULT_BASE_IMAGE_FIELD)?,
            registry: RegistryConfig::new(&api_url, env.optional(EnvVar::QuayToken)?),
        })
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Requires an absolute `http` or `https` URL.
fn validate_http_url(var: EnvVar, raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|err| ConfigError::Invalid(format!("{} is not a valid url: {err}", var.as_str())))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!("{} must use http or https", var.as_str())));
    }
    Ok(())
}
