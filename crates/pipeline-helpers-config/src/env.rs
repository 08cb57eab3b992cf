// crates/pipeline-helpers-config/src/env.rs
// ============================================================================
// Module: Environment Source
// Description: Environment variable names and strict, typed value readers.
// Purpose: Centralize env parsing so every task validates inputs the same way.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Tasks read their configuration once from an [`EnvSource`]: the process
//! environment in production, or an explicit override map in tests so that
//! parsing is deterministic and never races on global state. Values must be
//! valid UTF-8; booleans accept `1/0/true/false/yes/no`; integers that do not
//! parse fail with [`ConfigError::Invalid`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("missing required environment variable: {0}")]
    Missing(String),
    /// An environment variable holds an unusable value.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Environment Variables
// ============================================================================

/// Environment variables recognized by the pipeline helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvVar {
    /// Enables debug logging when `1`.
    DebugLevel,
    /// Optional JSON-lines log file.
    LogPath,
    /// Pull request description file.
    PrFilePath,
    /// Namespace the PR deployment runs in.
    DeploymentNamespace,
    /// Leading object key segments.
    BucketPrefix,
    /// Optional overlay name.
    OverlayName,
    /// Include the PR number in the processed document key.
    KeyByPr,
    /// Merge strategy for processed documents.
    MergeStrategy,
    /// Maximum rows per report table.
    MaxLimitResults,
    /// Report heading.
    ReportTitle,
    /// Markdown report output path.
    ReportPath,
    /// Model metrics file produced by the test run.
    MetricsFilePath,
    /// Platform metrics file.
    PlatformMetricsFilePath,
    /// Local copy of the processed document.
    ProcessedMetricsPath,
    /// Optional test name recorded in info metrics.
    TestName,
    /// Optional test type recorded in info metrics.
    TestType,
    /// Optional test URL recorded in info metrics.
    TestUrl,
    /// Directory the test runs in.
    ExecDir,
    /// Test script path relative to the exec dir.
    ModelTestPath,
    /// Full test script path.
    ExecFile,
    /// Shell command running the test.
    TestCommand,
    /// Shell command installing dependencies (empty disables).
    InstallCommand,
    /// Test timeout in seconds.
    TestTimeoutSecs,
    /// Captured test stdout.
    StdoutPath,
    /// Captured test stderr.
    StderrPath,
    /// Parse the metrics from captured stdout.
    MetricsFromStdout,
    /// Start timestamp result file.
    TimestampStartedPath,
    /// End timestamp result file.
    TimestampEndedPath,
    /// Metrics backend base URL.
    ThanosEndpoint,
    /// Metrics backend bearer token.
    ThanosAccessToken,
    /// Pod whose usage is queried.
    PodName,
    /// Verify the metrics backend TLS certificate.
    ThanosVerifyTls,
    /// Object store bucket.
    CephBucket,
    /// Object store endpoint URL.
    S3EndpointUrl,
    /// Object store region.
    CephRegion,
    /// Object store access key id.
    CephKeyId,
    /// Object store secret key.
    CephSecretKey,
    /// Image deployed for the PR.
    ImageUrlDeployment,
    /// Manifest template directory.
    ManifestTemplateDir,
    /// Customized manifest output directory.
    ManifestOutputDir,
    /// Repository checkout holding the CI config.
    RepositoryPath,
    /// CI config file path.
    ConfigFilePath,
    /// Key naming base images in the CI config.
    BaseImageField,
    /// Registry API bearer token.
    QuayToken,
    /// Registry API base URL.
    RegistryApiUrl,
}

impl EnvVar {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DebugLevel => "DEBUG_LEVEL",
            Self::LogPath => "PIPELINE_HELPERS_LOG_PATH",
            Self::PrFilePath => "PIPELINE_HELPERS_PR_FILE_PATH",
            Self::DeploymentNamespace => "PIPELINE_HELPERS_DEPLOYMENT_NAMESPACE",
            Self::BucketPrefix => "PIPELINE_HELPERS_BUCKET_PREFIX",
            Self::OverlayName => "PIPELINE_HELPERS_OVERLAY_NAME",
            Self::KeyByPr => "PIPELINE_HELPERS_KEY_BY_PR",
            Self::MergeStrategy => "PIPELINE_HELPERS_MERGE_STRATEGY",
            Self::MaxLimitResults => "PIPELINE_HELPERS_MAX_LIMIT_RESULTS",
            Self::ReportTitle => "PIPELINE_HELPERS_REPORT_TITLE",
            Self::ReportPath => "PIPELINE_HELPERS_REPORT_PATH",
            Self::MetricsFilePath => "PIPELINE_HELPERS_METRICS_FILE_PATH",
            Self::PlatformMetricsFilePath => "PIPELINE_HELPERS_PLATFORM_METRICS_FILE_PATH",
            Self::ProcessedMetricsPath => "PIPELINE_HELPERS_PROCESSED_METRICS_PATH",
            Self::TestName => "PIPELINE_HELPERS_TEST_NAME",
            Self::TestType => "PIPELINE_HELPERS_TEST_TYPE",
            Self::TestUrl => "PIPELINE_HELPERS_TEST_URL",
            Self::ExecDir => "PIPELINE_EXEC_DIR",
            Self::ModelTestPath => "MODEL_TEST_PATH",
            Self::ExecFile => "PIPELINE_EXEC_FILE",
            Self::TestCommand => "PIPELINE_HELPERS_TEST_COMMAND",
            Self::InstallCommand => "PIPELINE_HELPERS_INSTALL_COMMAND",
            Self::TestTimeoutSecs => "PIPELINE_HELPERS_TEST_TIMEOUT_SECS",
            Self::StdoutPath => "PIPELINE_STDOUT_PATH",
            Self::StderrPath => "PIPELINE_STDERR_PATH",
            Self::MetricsFromStdout => "PIPELINE_HELPERS_METRICS_FROM_STDOUT",
            Self::TimestampStartedPath => "PIPELINE_HELPERS_TIMESTAMP_STARTED_PATH",
            Self::TimestampEndedPath => "PIPELINE_HELPERS_TIMESTAMP_ENDED_PATH",
            Self::ThanosEndpoint => "THANOS_ENDPOINT",
            Self::ThanosAccessToken => "THANOS_ACCESS_TOKEN",
            Self::PodName => "PIPELINE_HELPERS_POD_NAME",
            Self::ThanosVerifyTls => "PIPELINE_HELPERS_THANOS_VERIFY_TLS",
            Self::CephBucket => "THOTH_CEPH_BUCKET",
            Self::S3EndpointUrl => "THOTH_S3_ENDPOINT_URL",
            Self::CephRegion => "THOTH_CEPH_REGION",
            Self::CephKeyId => "THOTH_CEPH_KEY_ID",
            Self::CephSecretKey => "THOTH_CEPH_SECRET_KEY",
            Self::ImageUrlDeployment => "PIPELINE_HELPERS_IMAGE_URL_DEPLOYMENT",
            Self::ManifestTemplateDir => "PIPELINE_HELPERS_MANIFEST_TEMPLATE_DIR",
            Self::ManifestOutputDir => "PIPELINE_HELPERS_MANIFEST_OUTPUT_DIR",
            Self::RepositoryPath => "REPOSITORY_PATH",
            Self::ConfigFilePath => "CONFIG_FILE_PATH",
            Self::BaseImageField => "BASE_IMAGE_FIELD_YAML",
            Self::QuayToken => "THOTH_QUAY_TOKEN",
            Self::RegistryApiUrl => "PIPELINE_HELPERS_REGISTRY_API_URL",
        }
    }
}

// ============================================================================
// SECTION: Environment Source
// ============================================================================

/// Where configuration values are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvSource {
    /// The process environment.
    Process,
    /// An explicit variable map; unlisted variables are unset.
    Overrides(BTreeMap<String, String>),
}

impl EnvSource {
    /// Builds an override source from `(name, value)` pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Overrides(pairs.into_iter().map(|(key, value)| (key.into(), value.into())).collect())
    }

    /// Returns the raw value, which may be empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is not valid UTF-8.
    pub fn raw(&self, var: EnvVar) -> Result<Option<String>, ConfigError> {
        let name = var.as_str();
        match self {
            Self::Process => std::env::var_os(name).map_or(Ok(None), |raw| {
                raw.into_string()
                    .map(Some)
                    .map_err(|_| ConfigError::Invalid(format!("{name} must be valid UTF-8")))
            }),
            Self::Overrides(values) => Ok(values.get(name).cloned()),
        }
    }

    /// Returns the trimmed value, treating empty as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is not valid UTF-8.
    pub fn optional(&self, var: EnvVar) -> Result<Option<String>, ConfigError> {
        Ok(self
            .raw(var)?
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()))
    }

    /// Returns the value or a default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is not valid UTF-8.
    pub fn string_or(&self, var: EnvVar, default: &str) -> Result<String, ConfigError> {
        Ok(self.optional(var)?.unwrap_or_else(|| default.to_string()))
    }

    /// Returns the value as a path or a default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value is not valid UTF-8.
    pub fn path_or(&self, var: EnvVar, default: &str) -> Result<PathBuf, ConfigError> {
        self.string_or(var, default).map(PathBuf::from)
    }

    /// Returns a required value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when the variable is unset or empty.
    pub fn required(&self, var: EnvVar) -> Result<String, ConfigError> {
        self.optional(var)?.ok_or_else(|| ConfigError::Missing(var.as_str().to_string()))
    }

    /// Returns a boolean value or a default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unrecognized literals.
    pub fn bool_or(&self, var: EnvVar, default: bool) -> Result<bool, ConfigError> {
        let Some(value) = self.optional(var)? else {
            return Ok(default);
        };
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid(format!(
                "{} must be 1, 0, true, false, yes, or no",
                var.as_str()
            ))),
        }
    }

    /// Returns an unsigned integer value or a default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the value does not parse.
    pub fn u64_or(&self, var: EnvVar, default: u64) -> Result<u64, ConfigError> {
        self.optional(var)?.map_or(Ok(default), |value| {
            value.parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("{} must be a non-negative integer", var.as_str()))
            })
        })
    }
}
