// crates/pipeline-helpers-core/src/document/tests.rs
// ============================================================================
// Module: Metrics Document Tests
// Description: Unit tests for document merge strategies and normalization.
// Purpose: Validate first-merge shape, strategy semantics, and aggregation.
// Dependencies: pipeline-helpers-core, serde_json
// ============================================================================

//! ## Overview
//! Exercises every merge strategy against empty and populated documents and
//! checks that stored shapes from other strategies are normalized first.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::json;

use super::*;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn contribution(version: &str, accuracy: f64) -> MetricsContribution {
    let mut contribution = MetricsContribution::new(version);
    contribution.info_metrics.insert("namespace deployment".to_string(), json!("aicoe-ci"));
    contribution.model_application_metrics.insert("accuracy".to_string(), json!(accuracy));
    contribution.platform_metrics.insert("CPU max usage".to_string(), json!(0.25));
    contribution
}

fn document(value: Value) -> MetricsDocument {
    match value {
        Value::Object(map) => MetricsDocument::from(map),
        _ => panic!("fixture must be an object"),
    }
}

// ============================================================================
// SECTION: First Merge
// ============================================================================

#[test]
fn first_append_merge_yields_contribution_plus_version() {
    let mut doc = MetricsDocument::new();
    doc.merge(&contribution("pr-1", 0.9), MergeStrategy::Append);
    let expected = json!({
        "info_metrics": [{"namespace deployment": "aicoe-ci", "model_version": "pr-1"}],
        "model_application_metrics": [{"accuracy": 0.9, "model_version": "pr-1"}],
        "platform_metrics": [{"CPU max usage": 0.25, "model_version": "pr-1"}],
    });
    assert_eq!(serde_json::to_value(&doc).unwrap(), expected);
}

#[test]
fn first_merge_entries_match_for_every_strategy() {
    let contribution = contribution("pr-7", 0.5);
    for strategy in
        [MergeStrategy::Append, MergeStrategy::OverwriteByVersion, MergeStrategy::OverwriteSection]
    {
        let mut doc = MetricsDocument::new();
        doc.merge(&contribution, strategy);
        for section in Section::ALL {
            assert_eq!(
                doc.section_entries(section),
                vec![contribution.entry(section)],
                "strategy {}",
                strategy.as_str()
            );
        }
        assert_eq!(doc.as_map().len(), 3);
    }
}

// ============================================================================
// SECTION: Strategy Semantics
// ============================================================================

#[test]
fn append_keeps_history_even_for_same_version() {
    let mut doc = MetricsDocument::new();
    doc.merge(&contribution("pr-1", 0.1), MergeStrategy::Append);
    doc.merge(&contribution("pr-1", 0.2), MergeStrategy::Append);
    doc.merge(&contribution("pr-2", 0.3), MergeStrategy::Append);
    let rows = doc.section_entries(Section::ModelApplicationMetrics);
    let accuracies: Vec<_> = rows.iter().map(|row| row["accuracy"].clone()).collect();
    assert_eq!(accuracies, vec![json!(0.1), json!(0.2), json!(0.3)]);
}

#[test]
fn overwrite_by_version_replaces_in_place() {
    let mut doc = MetricsDocument::new();
    doc.merge(&contribution("pr-1", 0.1), MergeStrategy::OverwriteByVersion);
    doc.merge(&contribution("pr-2", 0.2), MergeStrategy::OverwriteByVersion);
    doc.merge(&contribution("pr-1", 0.9), MergeStrategy::OverwriteByVersion);
    let section = doc.get("model_application_metrics").unwrap();
    assert_eq!(
        section,
        &json!({
            "pr-1": {"accuracy": 0.9, "model_version": "pr-1"},
            "pr-2": {"accuracy": 0.2, "model_version": "pr-2"},
        })
    );
    let order: Vec<_> = section.as_object().unwrap().keys().cloned().collect();
    assert_eq!(order, vec!["pr-1".to_string(), "pr-2".to_string()]);
}

#[test]
fn overwrite_section_keeps_only_latest() {
    let mut doc = MetricsDocument::new();
    doc.merge(&contribution("pr-1", 0.1), MergeStrategy::OverwriteSection);
    doc.merge(&contribution("pr-2", 0.2), MergeStrategy::OverwriteSection);
    assert_eq!(
        doc.get("model_application_metrics").unwrap(),
        &json!({"accuracy": 0.2, "model_version": "pr-2"})
    );
}

#[test]
fn switching_to_append_converts_version_map_to_list() {
    let mut doc = MetricsDocument::new();
    doc.merge(&contribution("pr-1", 0.1), MergeStrategy::OverwriteByVersion);
    doc.merge(&contribution("pr-2", 0.2), MergeStrategy::Append);
    let rows = doc.section_entries(Section::ModelApplicationMetrics);
    assert_eq!(rows.len(), 2);
    assert!(doc.get("model_application_metrics").unwrap().is_array());
}

#[test]
fn unknown_top_level_keys_survive_merge() {
    let mut doc = document(json!({"owner": "thoth", "model_application_metrics": []}));
    doc.merge(&contribution("pr-3", 0.3), MergeStrategy::Append);
    assert_eq!(doc.get("owner"), Some(&json!("thoth")));
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

#[test]
fn version_map_entries_gain_missing_version_field() {
    let doc = document(json!({
        "platform_metrics": {"pr-5": {"CPU max usage": 1.0}}
    }));
    let rows = doc.section_entries(Section::PlatformMetrics);
    assert_eq!(rows[0]["model_version"], json!("pr-5"));
}

#[test]
fn scalar_section_is_wrapped() {
    let doc = document(json!({"info_metrics": "legacy"}));
    let rows = doc.section_entries(Section::InfoMetrics);
    assert_eq!(rows, vec![json!({"value": "legacy"}).as_object().unwrap().clone()]);
}

#[test]
fn missing_and_null_sections_have_no_entries() {
    let doc = document(json!({"info_metrics": null}));
    assert!(doc.section_entries(Section::InfoMetrics).is_empty());
    assert!(doc.section_entries(Section::PlatformMetrics).is_empty());
}

#[test]
fn from_slice_rejects_non_object() {
    assert!(matches!(MetricsDocument::from_slice(b"[1, 2]"), Err(DocumentError::NotAnObject)));
    assert!(matches!(MetricsDocument::from_slice(b"{"), Err(DocumentError::Parse(_))));
}

#[test]
fn strategy_labels_parse() {
    assert_eq!(MergeStrategy::parse("append"), Some(MergeStrategy::Append));
    assert_eq!(
        MergeStrategy::parse("Overwrite_By_Version"),
        Some(MergeStrategy::OverwriteByVersion)
    );
    assert_eq!(MergeStrategy::parse(" overwrite-section "), Some(MergeStrategy::OverwriteSection));
    assert_eq!(MergeStrategy::parse("replace"), None);
}

// ============================================================================
// SECTION: Aggregation
// ============================================================================

#[test]
fn aggregate_concatenates_entries_in_document_order() {
    let mut first = MetricsDocument::new();
    first.merge(&contribution("pr-1", 0.1), MergeStrategy::Append);
    first.merge(&contribution("pr-2", 0.2), MergeStrategy::Append);
    let mut second = MetricsDocument::new();
    second.merge(&contribution("pr-3", 0.3), MergeStrategy::OverwriteSection);

    let aggregated = aggregate_documents([first, second]);
    let versions: Vec<_> = aggregated
        .section_entries(Section::ModelApplicationMetrics)
        .iter()
        .map(|row| row["model_version"].clone())
        .collect();
    assert_eq!(versions, vec![json!("pr-1"), json!("pr-2"), json!("pr-3")]);
}

#[test]
fn aggregate_of_nothing_has_empty_sections() {
    let aggregated = aggregate_documents(Vec::new());
    for section in Section::ALL {
        assert_eq!(aggregated.get(section.key()), Some(&json!([])));
    }
}
