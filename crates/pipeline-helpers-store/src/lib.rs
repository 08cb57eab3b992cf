// crates/pipeline-helpers-store/src/lib.rs
// ============================================================================
// Module: Pipeline Helpers Store Library
// Description: Object-store persistence for metrics documents.
// Purpose: Merge, persist, and aggregate metrics history in a shared bucket.
// Dependencies: aws-config, aws-sdk-s3, pipeline-helpers-core, tokio
// ============================================================================

//! ## Overview
//! The store crate connects to an S3-compatible bucket and exposes
//! [`MetricsStore`], the merge-on-write document API used by the
//! post-processing and aggregation tasks. Connecting is fallible with
//! [`ConnectError`]; callers treat that as "no persistence" rather than a
//! task failure.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod s3;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::ConnectError;
pub use client::InMemoryObjectStore;
pub use client::ObjectStoreClient;
pub use client::ObjectStoreError;
pub use s3::S3ObjectStoreClient;
pub use s3::S3StoreConfig;
pub use store::AggregateOutcome;
pub use store::MergeOutcome;
pub use store::MetricsStore;
