// crates/pipeline-helpers-core/src/report.rs
// ============================================================================
// Module: Markdown Report Rendering
// Description: Renders metrics documents as a markdown PR comment.
// Purpose: Turn merged metrics into tables for human review.
// Dependencies: serde_json, crate::document
// ============================================================================

//! ## Overview
//! [`render_report`] never fails: a connected document renders one table per
//! section, and an unavailable store renders a single explanatory sentence.
//! Rows are historical entries in append order, columns are the union of
//! metric names in first-seen order. Each table keeps at most
//! [`ReportOptions::max_rows`] rows, dropping the oldest entries first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write;

use serde_json::Map;
use serde_json::Value;

use crate::document::MetricsDocument;
use crate::document::Section;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default report heading.
pub const DEFAULT_REPORT_TITLE: &str = "AICoE CI results";
/// Default maximum number of rows per table.
pub const DEFAULT_MAX_ROWS: usize = 10;
/// Sentence emitted when the object store could not be reached.
pub const STORE_UNAVAILABLE_MESSAGE: &str = "Pipeline is not able to connect to the object store \
                                             to retrieve stored metrics, contact the pipeline \
                                             maintainers!";
/// Sentence emitted for a section without entries.
const EMPTY_SECTION_MESSAGE: &str = "_No entries recorded._";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Report heading (rendered as `# <title>`).
    pub title: String,
    /// Maximum rows per table.
    pub max_rows: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_REPORT_TITLE.to_string(),
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

/// What the report is rendered from.
#[derive(Debug, Clone, Copy)]
pub enum ReportSource<'a> {
    /// A merged or aggregated document.
    Document(&'a MetricsDocument),
    /// The object store was unreachable.
    StoreUnavailable,
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Sections in the order they appear in the report.
const REPORT_SECTIONS: [Section; 3] =
    [Section::ModelApplicationMetrics, Section::PlatformMetrics, Section::InfoMetrics];

/// Renders the markdown report.
#[must_use]
pub fn render_report(source: ReportSource<'_>, options: &ReportOptions) -> String {
    let mut report = format!("# {}", options.title);
    match source {
        ReportSource::StoreUnavailable => {
            report.push_str("\n\n");
            report.push_str(STORE_UNAVAILABLE_MESSAGE);
        }
        ReportSource::Document(document) => {
            for section in REPORT_SECTIONS {
                let (heading, description) = section_text(section);
                let rows = document.section_entries(section);
                let _ = write!(report, "\n\n## {heading}\n\n{description}");
                if rows.is_empty() {
                    report.push_str("\n\n");
                    report.push_str(EMPTY_SECTION_MESSAGE);
                    continue;
                }
                let kept = truncate_rows(&rows, options.max_rows);
                if kept.len() < rows.len() {
                    let _ = write!(
                        report,
                        "\n\nShowing the {} most recent of {} entries.",
                        kept.len(),
                        rows.len()
                    );
                }
                report.push_str("\n\n");
                report.push_str(&markdown_table(kept));
            }
        }
    }
    report
}

/// Returns the heading and description for a section.
const fn section_text(section: Section) -> (&'static str, &'static str) {
    match section {
        Section::ModelApplicationMetrics => (
            "Model and application metrics",
            "The following table shows gathered metrics for model and application on your \
             deployed models.",
        ),
        Section::PlatformMetrics => (
            "Platform metrics",
            "The following table shows gathered metrics from platform on your deployed models.",
        ),
        Section::InfoMetrics => (
            "Deployment information",
            "The following table shows where and how each recorded run was deployed.",
        ),
    }
}

/// Keeps the newest `max_rows` entries (oldest dropped first).
#[must_use]
pub fn truncate_rows<T>(rows: &[T], max_rows: usize) -> &[T] {
    let start = rows.len().saturating_sub(max_rows);
    &rows[start ..]
}

/// Renders rows as a GitHub-flavored markdown table.
#[must_use]
pub fn markdown_table(rows: &[Map<String, Value>]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }
    let mut table = String::new();
    let header: Vec<String> = columns.iter().map(|column| escape_cell(column)).collect();
    let _ = write!(table, "| {} |", header.join(" | "));
    let _ = write!(table, "\n|{}", "---|".repeat(columns.len()));
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| row.get(*column).map(format_cell).unwrap_or_default())
            .collect();
        let _ = write!(table, "\n| {} |", cells.join(" | "));
    }
    table
}

/// Formats a JSON value for a table cell.
fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => escape_cell(text),
        other => escape_cell(&other.to_string()),
    }
}

/// Escapes pipes and line breaks inside a cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
