// crates/pipeline-helpers-providers/src/platform.rs
// ============================================================================
// Module: Platform Metrics Collector
// Description: Best-effort CPU and memory peaks for a PR deployment.
// Purpose: Produce the platform metrics section without ever failing the step.
// Dependencies: pipeline-helpers-core, crate::prometheus
// ============================================================================

//! ## Overview
//! [`collect_platform_metrics`] degrades per metric: without a time window,
//! with an unreachable backend, or when a query fails or returns no positive
//! sample, that metric is left unset and later rendered as `N/A`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use pipeline_helpers_core::Logger;
use pipeline_helpers_core::PlatformMetrics;
use pipeline_helpers_core::TimeWindow;
use pipeline_helpers_core::logging::LogLevel;
use pipeline_helpers_core::platform::QUERY_STEP_SECONDS;
use pipeline_helpers_core::platform::cpu_query;
use pipeline_helpers_core::platform::max_positive;
use pipeline_helpers_core::platform::memory_query;
use serde_json::Value;

use crate::prometheus::MetricsBackend;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Pod whose usage is measured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformTarget {
    /// Deployment namespace.
    pub namespace: String,
    /// Pod name.
    pub pod: String,
}

// ============================================================================
// SECTION: Collection
// ============================================================================

/// Collects peak CPU and memory usage, degrading to unavailable values.
pub fn collect_platform_metrics(
    backend: &dyn MetricsBackend,
    target: &PlatformTarget,
    window: Option<&TimeWindow>,
    logger: &Logger,
) -> PlatformMetrics {
    let Some(window) = window else {
        logger.warning("run time window unavailable, platform metrics set to N/A");
        return PlatformMetrics::unavailable();
    };
    if let Err(err) = backend.check_reachable() {
        logger.with_fields(
            LogLevel::Warning,
            "metrics backend unreachable, platform metrics set to N/A",
            [("error", Value::String(err.to_string()))],
        );
        return PlatformMetrics::unavailable();
    }
    let memory = peak(backend, "memory", &memory_query(&target.namespace, &target.pod), window, logger);
    let cpu = peak(backend, "cpu", &cpu_query(&target.namespace, &target.pod), window, logger);
    PlatformMetrics {
        cpu_max_usage: cpu,
        memory_max_bytes: memory,
    }
}

/// Runs one query and reduces it to its positive peak.
fn peak(
    backend: &dyn MetricsBackend,
    label: &str,
    query: &str,
    window: &TimeWindow,
    logger: &Logger,
) -> Option<f64> {
    logger.with_fields(LogLevel::Debug, "running range query", [
        ("metric", Value::String(label.to_string())),
        ("query", Value::String(query.to_string())),
    ]);
    match backend.query_range(query, window, QUERY_STEP_SECONDS) {
        Ok(samples) => {
            let peak = max_positive(samples);
            if peak.is_none() {
                logger.with_fields(LogLevel::Warning, "range query returned no data", [(
                    "metric",
                    Value::String(label.to_string()),
                )]);
            }
            peak
        }
        Err(err) => {
            logger.with_fields(LogLevel::Warning, "range query failed", [
                ("metric", Value::String(label.to_string())),
                ("error", Value::String(err.to_string())),
            ]);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions favor direct unwrap.")]

    use std::sync::Arc;

    use pipeline_helpers_core::logging::MemoryLogSink;

    use super::*;
    use crate::http::ProviderError;

    struct FakeBackend {
        reachable: bool,
        memory: Result<Vec<f64>, ProviderError>,
        cpu: Result<Vec<f64>, ProviderError>,
    }

    impl MetricsBackend for FakeBackend {
        fn check_reachable(&self) -> Result<(), ProviderError> {
            if self.reachable { Ok(()) } else { Err(ProviderError::Request("refused".to_string())) }
        }

        fn query_range(&self, query: &str, _window: &TimeWindow, step: u64) -> Result<Vec<f64>, ProviderError> {
            assert_eq!(step, 3600);
            if query.contains("memory") { self.memory.clone() } else { self.cpu.clone() }
        }
    }

    fn target() -> PlatformTarget {
        PlatformTarget {
            namespace: "aicoe-ci".to_string(),
            pod: "myapp-pr-42".to_string(),
        }
    }

    #[test]
    fn reduces_both_series() {
        let backend = FakeBackend {
            reachable: true,
            memory: Ok(vec![0.0, 150_000_000.0, 300_000_000.0]),
            cpu: Ok(vec![0.25, 0.5]),
        };
        let window = TimeWindow::new(10.0, 20.0).unwrap();
        let metrics =
            collect_platform_metrics(&backend, &target(), Some(&window), &Logger::stderr("test"));
        assert_eq!(metrics.memory_max_bytes, Some(300_000_000.0));
        assert_eq!(metrics.cpu_max_usage, Some(0.5));
    }

    #[test]
    fn degrades_per_metric() {
        let sink = Arc::new(MemoryLogSink::new());
        let logger = Logger::new(sink.clone(), "platform", LogLevel::Info);
        let backend = FakeBackend {
            reachable: true,
            memory: Err(ProviderError::Request("timeout".to_string())),
            cpu: Ok(vec![0.0]),
        };
        let window = TimeWindow::new(10.0, 20.0).unwrap();
        let metrics = collect_platform_metrics(&backend, &target(), Some(&window), &logger);
        assert_eq!(metrics, PlatformMetrics::unavailable());
        assert_eq!(sink.records().len(), 2);
    }

    #[test]
    fn unreachable_backend_or_missing_window_is_unavailable() {
        let backend = FakeBackend {
            reachable: false,
            memory: Ok(vec![1.0]),
            cpu: Ok(vec![1.0]),
        };
        let window = TimeWindow::new(10.0, 20.0).unwrap();
        let logger = Logger::stderr("platform");
        assert_eq!(
            collect_platform_metrics(&backend, &target(), Some(&window), &logger),
            PlatformMetrics::unavailable()
        );
        assert_eq!(
            collect_platform_metrics(&backend, &target(), None, &logger),
            PlatformMetrics::unavailable()
        );
    }
}
