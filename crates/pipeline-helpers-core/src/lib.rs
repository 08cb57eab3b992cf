// crates/pipeline-helpers-core/src/lib.rs
// ============================================================================
// Module: Pipeline Helpers Core Library
// Description: Public API surface for the pipeline helpers domain model.
// Purpose: Expose metrics documents, keys, reports, manifests, and image logic.
// Dependencies: crate::{document, files, image, key, logging, manifest, ...}
// ============================================================================

//! ## Overview
//! Pipeline helpers core holds the pure, backend-agnostic pieces of the CI
//! helper tasks: metrics documents and their merge strategies, object keys,
//! markdown report rendering, Kubernetes manifest customization, base-image
//! version resolution, platform metric reduction, and structured logging.
//! Everything that talks to the network, the object store, or a subprocess
//! lives in the store and providers crates.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod document;
pub mod files;
pub mod image;
pub mod key;
pub mod logging;
pub mod manifest;
pub mod platform;
pub mod pr;
pub mod report;
pub mod timestamp;
pub mod tree;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use document::DocumentError;
pub use document::MergeStrategy;
pub use document::MetricsContribution;
pub use document::MetricsDocument;
pub use document::Section;
pub use files::FileError;
pub use image::ImageError;
pub use image::ImageReference;
pub use image::ImageVersion;
pub use key::DocumentKey;
pub use key::DocumentName;
pub use key::KeyError;
pub use logging::LogLevel;
pub use logging::LogRecord;
pub use logging::LogSink;
pub use logging::Logger;
pub use manifest::ManifestError;
pub use manifest::ManifestKind;
pub use platform::PlatformMetrics;
pub use pr::PrInfo;
pub use report::ReportOptions;
pub use report::ReportSource;
pub use report::render_report;
pub use timestamp::TimeWindow;
