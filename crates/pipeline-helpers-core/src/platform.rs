// crates/pipeline-helpers-core/src/platform.rs
// ============================================================================
// Module: Platform Metrics
// Description: Query construction and reduction for platform telemetry.
// Purpose: Turn CPU and memory series into the platform metrics section.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The platform collector issues two PromQL range queries and reduces each
//! returned series to its maximum strictly positive sample. This module owns
//! the query text and the reduction so both stay testable without a backend.
//! A metric that could not be gathered renders as [`NOT_AVAILABLE`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Number;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Sentinel for a metric that could not be gathered.
pub const NOT_AVAILABLE: &str = "N/A";
/// Output key for peak CPU usage.
pub const CPU_MAX_USAGE_KEY: &str = "CPU max usage";
/// Output key for peak memory usage.
pub const MEMORY_MAX_USAGE_KEY: &str = "Memory max usage";
/// Range query step in seconds (one hour).
pub const QUERY_STEP_SECONDS: u64 = 3600;
/// Container excluded from every query.
const EXCLUDED_CONTAINER: &str = "prometheus-proxy";
/// Bytes per reported memory unit.
const BYTES_PER_MEMORY_UNIT: f64 = 1_000_000.0;

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Returns the label selector shared by both queries.
fn label_selector(namespace: &str, pod: &str) -> String {
    format!(r#"{{namespace="{namespace}", container!="{EXCLUDED_CONTAINER}", pod="{pod}"}}"#)
}

/// Returns the PromQL memory working-set query for a pod.
#[must_use]
pub fn memory_query(namespace: &str, pod: &str) -> String {
    format!(
        "sum(container_memory_working_set_bytes{}) by (pod)",
        label_selector(namespace, pod)
    )
}

/// Returns the PromQL CPU usage query for a pod.
#[must_use]
pub fn cpu_query(namespace: &str, pod: &str) -> String {
    format!(
        "sum(node_namespace_pod_container:container_cpu_usage_seconds_total:sum_rate{}) by (pod)",
        label_selector(namespace, pod)
    )
}

// ============================================================================
// SECTION: Reduction
// ============================================================================

/// Returns the largest strictly positive finite sample, if any.
#[must_use]
pub fn max_positive<I>(samples: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    samples
        .into_iter()
        .filter(|sample| sample.is_finite() && *sample > 0.0)
        .fold(None, |best, sample| match best {
            Some(current) if current >= sample => Some(current),
            _ => Some(sample),
        })
}

/// Formats a byte count as whole `Mi` units (`bytes / 1_000_000`, rounded).
#[must_use]
pub fn format_memory(bytes: f64) -> String {
    format!("{:.0}Mi", (bytes / BYTES_PER_MEMORY_UNIT).round())
}

/// Rounds CPU usage to four decimal places.
#[must_use]
pub fn round_cpu(cores: f64) -> f64 {
    (cores * 10_000.0).round() / 10_000.0
}

// ============================================================================
// SECTION: Platform Metrics
// ============================================================================

/// Reduced platform metrics for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlatformMetrics {
    /// Peak CPU usage in cores, when gathered.
    pub cpu_max_usage: Option<f64>,
    /// Peak memory working set in bytes, when gathered.
    pub memory_max_bytes: Option<f64>,
}

impl PlatformMetrics {
    /// Metrics with every value unavailable.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            cpu_max_usage: None,
            memory_max_bytes: None,
        }
    }

    /// Renders the platform metrics section.
    #[must_use]
    pub fn to_json_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let cpu = self
            .cpu_max_usage
            .and_then(|cores| Number::from_f64(round_cpu(cores)))
            .map_or_else(|| Value::String(NOT_AVAILABLE.to_string()), Value::Number);
        map.insert(CPU_MAX_USAGE_KEY.to_string(), cpu);
        let memory = self.memory_max_bytes.map_or_else(
            || Value::String(NOT_AVAILABLE.to_string()),
            |bytes| Value::String(format_memory(bytes)),
        );
        map.insert(MEMORY_MAX_USAGE_KEY.to_string(), memory);
        map
    }

    /// Returns the sentinel section used when no platform file exists.
    #[must_use]
    pub fn unavailable_map() -> Map<String, Value> {
        Self::unavailable().to_json_map()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions favor direct unwrap.")]

    use serde_json::json;

    use super::*;

    #[test]
    fn memory_series_reduces_to_mi() {
        let peak = max_positive([0.0, 150_000_000.0, 300_000_000.0]);
        let metrics = PlatformMetrics {
            cpu_max_usage: max_positive([0.0, 0.123_456, 0.1]),
            memory_max_bytes: peak,
        };
        let map = metrics.to_json_map();
        assert_eq!(map.get(MEMORY_MAX_USAGE_KEY), Some(&json!("300Mi")));
        assert_eq!(map.get(CPU_MAX_USAGE_KEY), Some(&json!(0.1235)));
    }

    #[test]
    fn empty_or_non_positive_series_is_unavailable() {
        assert_eq!(max_positive(Vec::new()), None);
        assert_eq!(max_positive([0.0, -1.0, f64::NAN]), None);
        let map = PlatformMetrics::unavailable_map();
        assert_eq!(map.get(CPU_MAX_USAGE_KEY), Some(&json!("N/A")));
        assert_eq!(map.get(MEMORY_MAX_USAGE_KEY), Some(&json!("N/A")));
    }

    #[test]
    fn queries_scope_namespace_and_pod() {
        assert_eq!(
            memory_query("aicoe-ci", "myapp-pr-42"),
            r#"sum(container_memory_working_set_bytes{namespace="aicoe-ci", container!="prometheus-proxy", pod="myapp-pr-42"}) by (pod)"#
        );
        assert!(cpu_query("ns", "pod").starts_with(
            "sum(node_namespace_pod_container:container_cpu_usage_seconds_total:sum_rate{"
        ));
    }
}
