// crates/pipeline-helpers-providers/src/lib.rs
// ============================================================================
// Module: Pipeline Helpers Providers Library
// Description: External integrations used by the CI helper tasks.
// Purpose: Expose the metrics backend, image registry, and test runner.
// Dependencies: crate::{bumper, http, platform, prometheus, registry, runner}
// ============================================================================

//! ## Overview
//! Providers wrap everything outside the process: the Prometheus-compatible
//! query API for platform metrics, the image registry tag API for base image
//! bumps, and the shell commands that install and run the model test. Each
//! remote integration sits behind a small trait so task logic can be tested
//! without a network.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bumper;
pub mod http;
pub mod platform;
pub mod prometheus;
pub mod registry;
pub mod runner;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bumper::BumpError;
pub use bumper::BumpOutcome;
pub use bumper::ImageBump;
pub use bumper::ImageStatus;
pub use bumper::bump_base_images;
pub use http::ProviderError;
pub use platform::PlatformTarget;
pub use platform::collect_platform_metrics;
pub use prometheus::MetricsBackend;
pub use prometheus::PrometheusClient;
pub use prometheus::PrometheusConfig;
pub use registry::RegistryClient;
pub use registry::RegistryConfig;
pub use registry::TagSource;
pub use runner::CollectError;
pub use runner::CollectedMetrics;
pub use runner::TestRunSpec;
pub use runner::TimestampPaths;
pub use runner::collect_metrics;
