// crates/pipeline-helpers-config/src/lib.rs
// ============================================================================
// Module: Pipeline Helpers Config Library
// Description: Environment-driven configuration for every pipeline task.
// Purpose: Expose the env source and the per-task configuration structs.
// Dependencies: crate::{config, env}
// ============================================================================

//! ## Overview
//! Configuration is read once per process from an [`EnvSource`] and turned
//! into one validated struct per task. Tests pass an override map instead of
//! mutating the process environment.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AggregateConfig;
pub use config::BumpConfig;
pub use config::GatherConfig;
pub use config::LoggingConfig;
pub use config::ManifestConfig;
pub use config::PlatformConfig;
pub use config::PostProcessConfig;
pub use config::TargetConfig;
pub use config::TestInfo;
pub use config::store_config_from_env;
pub use env::ConfigError;
pub use env::EnvSource;
pub use env::EnvVar;
