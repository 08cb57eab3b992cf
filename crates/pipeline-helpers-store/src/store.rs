// crates/pipeline-helpers-store/src/store.rs
// ============================================================================
// Module: Metrics Document Store
// Description: Merge-on-write persistence and aggregation of metrics documents.
// Purpose: Keep one growing metrics history per repository, PR, and overlay.
// Dependencies: pipeline-helpers-core, crate::client, crate::s3
// ============================================================================

//! ## Overview
//! [`MetricsStore`] wraps an [`ObjectStoreClient`] with document semantics:
//! read the document at a key (empty when absent), merge a contribution with
//! a [`MergeStrategy`], and write the full document back. The
//! read-modify-write is not guarded against concurrent writers; the last
//! writer wins.
//!
//! Aggregation lists every `processed_metrics` document below a repository
//! prefix, concatenates their section entries in key order, and stores the
//! result as `aggregated_metrics` at the repository level. Key order compares
//! path segments, numerically when both segments are numbers, so PR `9`
//! precedes PR `10` and report truncation keeps the highest PR numbers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::sync::Arc;

use pipeline_helpers_core::DocumentKey;
use pipeline_helpers_core::DocumentName;
use pipeline_helpers_core::MergeStrategy;
use pipeline_helpers_core::MetricsContribution;
use pipeline_helpers_core::MetricsDocument;
use pipeline_helpers_core::document::aggregate_documents;

use crate::client::ConnectError;
use crate::client::ObjectStoreClient;
use crate::client::ObjectStoreError;
use crate::s3::S3ObjectStoreClient;
use crate::s3::S3StoreConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of a stored metrics document.
pub const MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;
/// Content type recorded for stored documents.
const DOCUMENT_CONTENT_TYPE: &str = "application/json";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of a merge-on-write.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Object key that was written.
    pub object_key: String,
    /// True when no document existed before the merge.
    pub created: bool,
    /// Document as written.
    pub document: MetricsDocument,
}

/// Result of an aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutcome {
    /// Object key of the stored aggregate.
    pub object_key: String,
    /// Processed document keys that contributed, in order.
    pub sources: Vec<String>,
    /// Aggregated document.
    pub document: MetricsDocument,
}

// ============================================================================
// SECTION: Metrics Store
// ============================================================================

/// Document-level view over an object store.
#[derive(Clone)]
pub struct MetricsStore {
    /// Backend client.
    client: Arc<dyn ObjectStoreClient>,
}

impl MetricsStore {
    /// Connects to an S3-compatible backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] when the store is not configured or unreachable.
    pub fn connect(config: &S3StoreConfig) -> Result<Self, ConnectError> {
        let client = S3ObjectStoreClient::connect(config)?;
        Ok(Self::from_client(Arc::new(client)))
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn from_client(client: Arc<dyn ObjectStoreClient>) -> Self {
        Self {
            client,
        }
    }

    /// Loads the document at `object_key`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the backend fails or the stored
    /// bytes are not a JSON object.
    pub fn load(&self, object_key: &str) -> Result<Option<MetricsDocument>, ObjectStoreError> {
        if !self.client.exists(object_key)? {
            return Ok(None);
        }
        let bytes = self.client.get(object_key, MAX_DOCUMENT_BYTES)?;
        Ok(Some(MetricsDocument::from_slice(&bytes)?))
    }

    /// Writes a document to `object_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when serialization or the write fails.
    pub fn save(&self, object_key: &str, document: &MetricsDocument) -> Result<(), ObjectStoreError> {
        let bytes = document.to_vec_pretty()?;
        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(ObjectStoreError::TooLarge {
                path: object_key.to_string(),
                max_bytes: MAX_DOCUMENT_BYTES,
                actual_bytes: bytes.len(),
            });
        }
        self.client.put(object_key, bytes, Some(DOCUMENT_CONTENT_TYPE))
    }

    /// Merges a contribution into the processed document at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the key is invalid, the stored
    /// document is malformed, or the backend fails.
    pub fn merge_contribution(
        &self,
        key: &DocumentKey,
        contribution: &MetricsContribution,
        strategy: MergeStrategy,
    ) -> Result<MergeOutcome, ObjectStoreError> {
        let object_key = key.object_key(DocumentName::ProcessedMetrics)?;
        let existing = self.load(&object_key)?;
        let created = existing.is_none();
        let mut document = existing.unwrap_or_default();
        document.merge(contribution, strategy);
        self.save(&object_key, &document)?;
        Ok(MergeOutcome {
            object_key,
            created,
            document,
        })
    }

    /// Aggregates every processed document below the key's repository prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when listing, loading, or storing fails.
    pub fn aggregate_repository(&self, key: &DocumentKey) -> Result<AggregateOutcome, ObjectStoreError> {
        let prefix = key.repository_prefix();
        let suffix = format!("/{}", DocumentName::ProcessedMetrics.as_str());
        let mut sources: Vec<String> = self
            .client
            .list(&prefix)?
            .into_iter()
            .filter(|object_key| object_key.ends_with(&suffix))
            .collect();
        sources.sort_by(|left, right| compare_object_keys(left, right));
        let mut documents = Vec::with_capacity(sources.len());
        for source in &sources {
            if let Some(document) = self.load(source)? {
                documents.push(document);
            }
        }
        let document = aggregate_documents(documents);
        let object_key = format!("{prefix}{}", DocumentName::AggregatedMetrics.as_str());
        self.save(&object_key, &document)?;
        Ok(AggregateOutcome {
            object_key,
            sources,
            document,
        })
    }
}

/// Orders object keys segment by segment, numeric segments by value.
fn compare_object_keys(left: &str, right: &str) -> Ordering {
    let mut left_segments = left.split('/');
    let mut right_segments = right.split('/');
    loop {
        match (left_segments.next(), right_segments.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(left), Some(right)) => {
                let ordering = match (left.parse::<u64>(), right.parse::<u64>()) {
                    (Ok(left_number), Ok(right_number)) => {
                        left_number.cmp(&right_number).then_with(|| left.cmp(right))
                    }
                    _ => left.cmp(right),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}
