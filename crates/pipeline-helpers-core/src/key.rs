// crates/pipeline-helpers-core/src/key.rs
// ============================================================================
// Module: Document Keys
// Description: Object-store key derivation for metrics documents.
// Purpose: Address one document per repository, PR, and overlay.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A [`DocumentKey`] renders to
//! `<bucket-prefix>/<deployment>/deployment-metrics/<repo>[/<pr>][/<overlay>]`
//! and a [`DocumentName`] selects the object below that prefix. Every segment
//! is validated so that a repository or overlay name cannot escape its prefix.
//!
//! Invariants:
//! - Keys never contain empty, `.` or `..` segments, or backslashes.
//! - The repository full name contributes at most two segments (`owner/name`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed segment separating deployment and repository.
pub const DEPLOYMENT_METRICS_SEGMENT: &str = "deployment-metrics";
/// Maximum length of a single key segment.
const MAX_SEGMENT_LENGTH: usize = 255;
/// Maximum total key length.
const MAX_KEY_LENGTH: usize = 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Key derivation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// A key component is invalid.
    #[error("invalid document key: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Document Names
// ============================================================================

/// Named documents stored below a key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentName {
    /// Merged metrics for one key, written by post-processing.
    ProcessedMetrics,
    /// Aggregate of every processed document below a repository.
    AggregatedMetrics,
}

impl DocumentName {
    /// Returns the object name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProcessedMetrics => "processed_metrics",
            Self::AggregatedMetrics => "aggregated_metrics",
        }
    }
}

// ============================================================================
// SECTION: Document Key
// ============================================================================

/// Hierarchical address of a metrics document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKey {
    /// Bucket prefix segments (for example `data`).
    bucket_prefix: Vec<String>,
    /// Deployment namespace.
    deployment: String,
    /// Repository full name segments.
    repository: Vec<String>,
    /// Optional pull request number.
    pr_number: Option<u64>,
    /// Optional overlay name.
    overlay: Option<String>,
}

impl DocumentKey {
    /// Creates a repository-level key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when any component is empty or unsafe.
    pub fn new(bucket_prefix: &str, deployment: &str, repository: &str) -> Result<Self, KeyError> {
        let bucket_prefix = split_segments("bucket prefix", bucket_prefix)?;
        validate_segment("deployment", deployment)?;
        let repository = split_segments("repository", repository)?;
        if repository.len() > 2 {
            return Err(KeyError::Invalid("repository must be <owner>/<name>".to_string()));
        }
        Ok(Self {
            bucket_prefix,
            deployment: deployment.to_string(),
            repository,
            pr_number: None,
            overlay: None,
        })
    }

    /// Scopes the key to a pull request.
    #[must_use]
    pub const fn with_pr(mut self, number: u64) -> Self {
        self.pr_number = Some(number);
        self
    }

    /// Scopes the key to an overlay.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when the overlay name is not a safe segment.
    pub fn with_overlay(mut self, overlay: &str) -> Result<Self, KeyError> {
        validate_segment("overlay", overlay)?;
        self.overlay = Some(overlay.to_string());
        Ok(self)
    }

    /// Returns the repository-level prefix, ending with `/`.
    #[must_use]
    pub fn repository_prefix(&self) -> String {
        let mut segments: Vec<&str> = self.bucket_prefix.iter().map(String::as_str).collect();
        segments.push(&self.deployment);
        segments.push(DEPLOYMENT_METRICS_SEGMENT);
        segments.extend(self.repository.iter().map(String::as_str));
        format!("{}/", segments.join("/"))
    }

    /// Returns the full prefix including PR and overlay scoping, ending with `/`.
    #[must_use]
    pub fn prefix(&self) -> String {
        let mut prefix = self.repository_prefix();
        if let Some(number) = self.pr_number {
            prefix.push_str(&format!("{number}/"));
        }
        if let Some(overlay) = &self.overlay {
            prefix.push_str(overlay);
            prefix.push('/');
        }
        prefix
    }

    /// Returns the object key for a named document.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] when the key exceeds the length limit.
    pub fn object_key(&self, name: DocumentName) -> Result<String, KeyError> {
        let key = format!("{}{}", self.prefix(), name.as_str());
        if key.len() > MAX_KEY_LENGTH {
            return Err(KeyError::Invalid("document key exceeds length limit".to_string()));
        }
        Ok(key)
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Splits a slash-separated component into validated segments.
fn split_segments(label: &str, raw: &str) -> Result<Vec<String>, KeyError> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(KeyError::Invalid(format!("{label} must be set")));
    }
    trimmed
        .split('/')
        .map(|segment| validate_segment(label, segment).map(|()| segment.to_string()))
        .collect()
}

/// Validates a single key segment.
fn validate_segment(label: &str, value: &str) -> Result<(), KeyError> {
    if value.is_empty() || value == "." || value == ".." {
        return Err(KeyError::Invalid(format!("{label} segment is invalid")));
    }
    if value.len() > MAX_SEGMENT_LENGTH {
        return Err(KeyError::Invalid(format!("{label} segment exceeds length limit")));
    }
    if value.contains(['/', '\\']) || value.chars().any(char::is_control) {
        return Err(KeyError::Invalid(format!("{label} segment contains invalid characters")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions favor direct unwrap.")]

    use super::*;

    #[test]
    fn repository_key_layout() {
        let key = DocumentKey::new("data", "aicoe-ci", "thoth-station/elyra-aidevsecops").unwrap();
        assert_eq!(
            key.object_key(DocumentName::ProcessedMetrics).unwrap(),
            "data/aicoe-ci/deployment-metrics/thoth-station/elyra-aidevsecops/processed_metrics"
        );
    }

    #[test]
    fn pr_and_overlay_scoping() {
        let key = DocumentKey::new("data/", "aicoe-ci", "org/repo")
            .unwrap()
            .with_pr(42)
            .with_overlay("test")
            .unwrap();
        assert_eq!(key.prefix(), "data/aicoe-ci/deployment-metrics/org/repo/42/test/");
        assert_eq!(key.repository_prefix(), "data/aicoe-ci/deployment-metrics/org/repo/");
    }

    #[test]
    fn rejects_traversal_and_empty_segments() {
        assert!(DocumentKey::new("data", "..", "org/repo").is_err());
        assert!(DocumentKey::new("data", "ns", "org//repo").is_err());
        assert!(DocumentKey::new("", "ns", "org/repo").is_err());
        assert!(DocumentKey::new("data", "ns", "a/b/c").is_err());
        let key = DocumentKey::new("data", "ns", "org/repo").unwrap();
        assert!(key.with_overlay("a/b").is_err());
    }
}
