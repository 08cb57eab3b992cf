// crates/pipeline-helpers-core/src/document.rs
// ============================================================================
// Module: Metrics Documents
// Description: Metrics document model, contributions, and merge strategies.
// Purpose: Merge one test run's metrics into a persisted document.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`MetricsDocument`] is an untyped JSON object partitioned into three
//! sections (`info_metrics`, `model_application_metrics`, `platform_metrics`).
//! A [`MetricsContribution`] carries the metrics of one test run and is folded
//! into a document with a [`MergeStrategy`]. No schema is enforced: unknown
//! top-level keys survive a merge untouched and section values of an
//! unexpected shape are normalized into entries before merging.
//!
//! Invariants:
//! - Every merged section entry carries a `model_version` string.
//! - Entry order is append order; `serde_json` runs with `preserve_order`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Field injected into every section entry to identify the contributing run.
pub const MODEL_VERSION_FIELD: &str = "model_version";
/// Key used when a non-object value has to be wrapped into an entry.
const WRAPPED_VALUE_FIELD: &str = "value";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while decoding or encoding metrics documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Payload is not valid JSON.
    #[error("metrics document parse error: {0}")]
    Parse(String),
    /// Payload is valid JSON but not an object.
    #[error("metrics document must be a json object")]
    NotAnObject,
    /// Document could not be serialized.
    #[error("metrics document serialize error: {0}")]
    Serialize(String),
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// Logical section of a metrics document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Provenance: source URL, namespace, PR number.
    InfoMetrics,
    /// Values produced by the test run.
    ModelApplicationMetrics,
    /// CPU and memory peaks over the run window.
    PlatformMetrics,
}

impl Section {
    /// All sections in document order.
    pub const ALL: [Self; 3] =
        [Self::InfoMetrics, Self::ModelApplicationMetrics, Self::PlatformMetrics];

    /// Returns the document key for the section.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::InfoMetrics => "info_metrics",
            Self::ModelApplicationMetrics => "model_application_metrics",
            Self::PlatformMetrics => "platform_metrics",
        }
    }
}

// ============================================================================
// SECTION: Merge Strategy
// ============================================================================

/// Policy applied when a contribution is merged into a document.
///
/// # Invariants
/// - `Append` never removes or replaces an existing entry.
/// - `OverwriteByVersion` replaces only the entry with the same `model_version`.
/// - `OverwriteSection` keeps only the latest contribution per section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Append the new entry to a list of historical entries.
    #[default]
    Append,
    /// Store entries in a map keyed by `model_version`.
    OverwriteByVersion,
    /// Replace the whole section with the new entry.
    OverwriteSection,
}

impl MergeStrategy {
    /// Parses a strategy label (`append`, `overwrite-by-version`, `overwrite-section`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "append" => Some(Self::Append),
            "overwrite-by-version" => Some(Self::OverwriteByVersion),
            "overwrite-section" => Some(Self::OverwriteSection),
            _ => None,
        }
    }

    /// Returns the stable label for the strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::OverwriteByVersion => "overwrite-by-version",
            Self::OverwriteSection => "overwrite-section",
        }
    }
}

// ============================================================================
// SECTION: Contribution
// ============================================================================

/// Metrics collected by a single pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsContribution {
    /// Identifier of the run (for example `pr-42`).
    pub model_version: String,
    /// Provenance values.
    pub info_metrics: Map<String, Value>,
    /// Values emitted by the test command.
    pub model_application_metrics: Map<String, Value>,
    /// Platform CPU/memory summaries.
    pub platform_metrics: Map<String, Value>,
}

impl MetricsContribution {
    /// Creates an empty contribution for a run identifier.
    #[must_use]
    pub fn new(model_version: impl Into<String>) -> Self {
        Self {
            model_version: model_version.into(),
            ..Self::default()
        }
    }

    /// Returns the raw metrics collected for a section.
    #[must_use]
    pub const fn section(&self, section: Section) -> &Map<String, Value> {
        match section {
            Section::InfoMetrics => &self.info_metrics,
            Section::ModelApplicationMetrics => &self.model_application_metrics,
            Section::PlatformMetrics => &self.platform_metrics,
        }
    }

    /// Returns the section entry with the generated `model_version` field.
    #[must_use]
    pub fn entry(&self, section: Section) -> Map<String, Value> {
        let mut entry = self.section(section).clone();
        entry.insert(MODEL_VERSION_FIELD.to_string(), Value::String(self.model_version.clone()));
        entry
    }
}

// ============================================================================
// SECTION: Document
// ============================================================================

/// Persisted metrics document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsDocument(Map<String, Value>);

impl MetricsDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Decodes a document from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] when the payload is not a JSON object.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DocumentError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|err| DocumentError::Parse(err.to_string()))?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(DocumentError::NotAnObject),
        }
    }

    /// Encodes the document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] when serialization fails.
    pub fn to_vec_pretty(&self) -> Result<Vec<u8>, DocumentError> {
        serde_json::to_vec_pretty(&self.0).map_err(|err| DocumentError::Serialize(err.to_string()))
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns a top-level value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the historical entries of a section in append order.
    #[must_use]
    pub fn section_entries(&self, section: Section) -> Vec<Map<String, Value>> {
        self.0.get(section.key()).map(entries_of).unwrap_or_default()
    }

    /// Appends a ready-made entry to a section, converting it to list form.
    pub fn append_entry(&mut self, section: Section, entry: Map<String, Value>) {
        let mut entries = self.section_entries(section);
        entries.push(entry);
        self.0.insert(
            section.key().to_string(),
            Value::Array(entries.into_iter().map(Value::Object).collect()),
        );
    }

    /// Merges a contribution into every section using the given strategy.
    pub fn merge(&mut self, contribution: &MetricsContribution, strategy: MergeStrategy) {
        for section in Section::ALL {
            let entry = contribution.entry(section);
            match strategy {
                MergeStrategy::Append => self.append_entry(section, entry),
                MergeStrategy::OverwriteByVersion => {
                    let mut by_version = Map::new();
                    for (index, existing) in self.section_entries(section).into_iter().enumerate() {
                        by_version.insert(version_of(&existing, index), Value::Object(existing));
                    }
                    by_version.insert(contribution.model_version.clone(), Value::Object(entry));
                    self.0.insert(section.key().to_string(), Value::Object(by_version));
                }
                MergeStrategy::OverwriteSection => {
                    self.0.insert(section.key().to_string(), Value::Object(entry));
                }
            }
        }
    }
}

impl From<Map<String, Value>> for MetricsDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Folds several documents into one, appending every section entry in order.
#[must_use]
pub fn aggregate_documents<I>(documents: I) -> MetricsDocument
where
    I: IntoIterator<Item = MetricsDocument>,
{
    let mut sections: Vec<(Section, Vec<Value>)> =
        Section::ALL.iter().map(|section| (*section, Vec::new())).collect();
    for document in documents {
        for (section, entries) in &mut sections {
            entries.extend(document.section_entries(*section).into_iter().map(Value::Object));
        }
    }
    let mut aggregated = MetricsDocument::new();
    for (section, entries) in sections {
        aggregated.0.insert(section.key().to_string(), Value::Array(entries));
    }
    aggregated
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Normalizes a stored section value into a list of entries.
///
/// Lists yield their elements; a version-keyed map of objects yields its
/// values; a single object carrying a scalar `model_version` (or any other
/// object) is one entry; `null` yields nothing.
fn entries_of(value: &Value) -> Vec<Map<String, Value>> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter(|item| !item.is_null()).map(wrap_entry).collect(),
        Value::Object(map) if is_version_map(map) => map
            .iter()
            .map(|(version, item)| {
                let mut entry = wrap_entry(item);
                if !entry.contains_key(MODEL_VERSION_FIELD) {
                    entry.insert(MODEL_VERSION_FIELD.to_string(), Value::String(version.clone()));
                }
                entry
            })
            .collect(),
        Value::Object(map) if map.is_empty() => Vec::new(),
        other => vec![wrap_entry(other)],
    }
}

/// Returns true when an object looks like a `model_version` keyed map.
fn is_version_map(map: &Map<String, Value>) -> bool {
    let single_entry = map.get(MODEL_VERSION_FIELD).is_some_and(|value| !value.is_object());
    !single_entry && !map.is_empty() && map.values().all(Value::is_object)
}

/// Converts a value into an entry object, wrapping scalars.
fn wrap_entry(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map.clone(),
        other => {
            let mut entry = Map::new();
            entry.insert(WRAPPED_VALUE_FIELD.to_string(), other.clone());
            entry
        }
    }
}

/// Returns the `model_version` of an entry or a positional fallback.
fn version_of(entry: &Map<String, Value>, index: usize) -> String {
    match entry.get(MODEL_VERSION_FIELD) {
        Some(Value::String(version)) => version.clone(),
        Some(other) => other.to_string(),
        None => format!("entry-{index}"),
    }
}

#[cfg(test)]
mod tests;
