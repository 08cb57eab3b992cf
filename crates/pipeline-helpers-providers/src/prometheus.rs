// crates/pipeline-helpers-providers/src/prometheus.rs
// ============================================================================
// Module: Prometheus Range Queries
// Description: Bearer-authenticated client for the Prometheus/Thanos HTTP API.
// Purpose: Fetch CPU and memory series for the platform metrics step.
// Dependencies: reqwest, serde, serde_json, url, pipeline-helpers-core
// ============================================================================

//! ## Overview
//! [`PrometheusClient`] speaks the subset of the Prometheus HTTP API the
//! platform step needs: a reachability probe against the base URL and
//! `api/v1/query_range`. Every sample of every returned series is flattened
//! into one list; unparsable sample values are skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use pipeline_helpers_core::TimeWindow;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::http::DEFAULT_HTTP_TIMEOUT;
use crate::http::MAX_RESPONSE_BYTES;
use crate::http::ProviderError;
use crate::http::build_client;
use crate::http::ensure_success;
use crate::http::join_url;
use crate::http::parse_base_url;
use crate::http::read_response_limited;

// ============================================================================
// SECTION: Backend Trait
// ============================================================================

/// Time-series backend used by the platform collector.
pub trait MetricsBackend {
    /// Checks that the backend answers.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the backend is unreachable.
    fn check_reachable(&self) -> Result<(), ProviderError>;

    /// Runs a range query and returns every sample value.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the query fails.
    fn query_range(&self, query: &str, window: &TimeWindow, step_seconds: u64) -> Result<Vec<f64>, ProviderError>;
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Prometheus client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrometheusConfig {
    /// Base URL of the query API.
    pub endpoint: String,
    /// Bearer token.
    pub access_token: String,
    /// Verify the server certificate.
    pub verify_tls: bool,
    /// Request timeout.
    pub timeout: Duration,
}

impl PrometheusConfig {
    /// Creates settings with the default timeout.
    #[must_use]
    pub fn new(endpoint: &str, access_token: &str, verify_tls: bool) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            access_token: access_token.to_string(),
            verify_tls,
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

// ============================================================================
// SECTION: Response Types
// ============================================================================

/// Query API envelope.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    /// `success` or `error`.
    status: String,
    /// Result payload on success.
    #[serde(default)]
    data: Option<QueryData>,
    /// Error message on failure.
    #[serde(default)]
    error: Option<String>,
}

/// Query result payload.
#[derive(Debug, Deserialize)]
struct QueryData {
    /// Matrix series.
    #[serde(default)]
    result: Vec<RangeSeries>,
}

/// One range series.
#[derive(Debug, Deserialize)]
struct RangeSeries {
    /// `[timestamp, "value"]` pairs.
    #[serde(default)]
    values: Vec<(Value, Value)>,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Prometheus HTTP API client.
pub struct PrometheusClient {
    /// Base URL ending with `/`.
    base: Url,
    /// Bearer token.
    access_token: String,
    /// HTTP client.
    client: Client,
}

impl PrometheusClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] for an invalid endpoint or client.
    pub fn new(config: &PrometheusConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            base: parse_base_url(&config.endpoint)?,
            access_token: config.access_token.clone(),
            client: build_client(config.timeout, config.verify_tls)?,
        })
    }
}

impl MetricsBackend for PrometheusClient {
    fn check_reachable(&self) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(self.base.clone())
            .bearer_auth(&self.access_token)
            .send()
            .map_err(|err| ProviderError::Request(err.to_string()))?;
        ensure_success(&response)
    }

    fn query_range(&self, query: &str, window: &TimeWindow, step_seconds: u64) -> Result<Vec<f64>, ProviderError> {
        let mut url = join_url(&self.base, "api/v1/query_range")?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("start", &window.started.to_string())
            .append_pair("end", &window.ended.to_string())
            .append_pair("step", &step_seconds.to_string());
        let mut response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .map_err(|err| ProviderError::Request(err.to_string()))?;
        ensure_success(&response)?;
        let body = read_response_limited(&mut response, MAX_RESPONSE_BYTES)?;
        parse_range_samples(&body)
    }
}

/// Extracts every sample value from a `query_range` response body.
///
/// # Errors
///
/// Returns [`ProviderError::Decode`] for malformed bodies and
/// [`ProviderError::Request`] when the API reports an error status.
pub fn parse_range_samples(body: &[u8]) -> Result<Vec<f64>, ProviderError> {
    let response: QueryResponse =
        serde_json::from_slice(body).map_err(|err| ProviderError::Decode(err.to_string()))?;
    if response.status != "success" {
        return Err(ProviderError::Request(
            response.error.unwrap_or_else(|| format!("query status {}", response.status)),
        ));
    }
    let series = response.data.map(|data| data.result).unwrap_or_default();
    Ok(series
        .iter()
        .flat_map(|series| series.values.iter())
        .filter_map(|(_, value)| sample_value(value))
        .collect())
}

/// Parses a sample value, which Prometheus encodes as a string.
fn sample_value(value: &Value) -> Option<f64> {
    match value {
        Value::String(text) => text.parse().ok(),
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions favor direct unwrap.")]

    use super::*;

    #[test]
    fn flattens_series_and_skips_bad_samples() {
        let body = br#"{"status":"success","data":{"resultType":"matrix","result":[
            {"metric":{"pod":"a"},"values":[[1,"0"],[2,"150000000"],[3,"NaN"]]},
            {"metric":{"pod":"a"},"values":[[4,"300000000"],[5,"oops"]]}]}}"#;
        let samples = parse_range_samples(body).unwrap();
        assert_eq!(samples.len(), 4);
        assert!(samples.contains(&300_000_000.0));
    }

    #[test]
    fn api_error_status_is_reported() {
        let body = br#"{"status":"error","errorType":"bad_data","error":"parse error"}"#;
        assert_eq!(
            parse_range_samples(body),
            Err(ProviderError::Request("parse error".to_string()))
        );
        assert!(matches!(parse_range_samples(b"<html>"), Err(ProviderError::Decode(_))));
    }
}
