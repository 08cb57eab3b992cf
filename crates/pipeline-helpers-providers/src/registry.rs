// crates/pipeline-helpers-providers/src/registry.rs
// ============================================================================
// Module: Image Registry Tags
// Description: Quay-style repository API client listing image tags.
// Purpose: Discover the newest published base image version.
// Dependencies: reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! [`RegistryClient`] issues `GET <api>/repository/<namespace>/<repo>` with an
//! optional bearer token and returns the keys of the `tags` object. A
//! response without `tags` yields an empty list.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::blocking::Client;
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
// SECTION: Tag Source
// ============================================================================

/// Source of published tags for an image repository.
pub trait TagSource {
    /// Lists tags for `repository` (`namespace/name`).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the tags cannot be fetched.
    fn list_tags(&self, repository: &str) -> Result<Vec<String>, ProviderError>;
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Registry API settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// API base URL (for example `https://quay.io/api/v1`).
    pub api_url: String,
    /// Optional bearer token.
    pub token: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl RegistryConfig {
    /// Creates settings with the default timeout.
    #[must_use]
    pub fn new(api_url: &str, token: Option<String>) -> Self {
        Self {
            api_url: api_url.to_string(),
            token,
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Registry repository API client.
pub struct RegistryClient {
    /// API base URL ending with `/`.
    base: Url,
    /// Optional bearer token.
    token: Option<String>,
    /// HTTP client.
    client: Client,
}

impl RegistryClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] for an invalid API URL or client.
    pub fn new(config: &RegistryConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            base: parse_base_url(&config.api_url)?,
            token: config.token.clone(),
            client: build_client(config.timeout, true)?,
        })
    }
}

impl TagSource for RegistryClient {
    fn list_tags(&self, repository: &str) -> Result<Vec<String>, ProviderError> {
        let url = join_url(&self.base, &format!("repository/{repository}"))?;
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let mut response = request.send().map_err(|err| ProviderError::Request(err.to_string()))?;
        ensure_success(&response)?;
        let body = read_response_limited(&mut response, MAX_RESPONSE_BYTES)?;
        parse_tags(&body)
    }
}

/// Extracts tag names from a repository API response.
///
/// # Errors
///
/// Returns [`ProviderError::Decode`] when the body is not a JSON object.
pub fn parse_tags(body: &[u8]) -> Result<Vec<String>, ProviderError> {
    let value: Value = serde_json::from_slice(body).map_err(|err| ProviderError::Decode(err.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ProviderError::Decode("repository response must be an object".to_string()))?;
    Ok(object
        .get("tags")
        .and_then(Value::as_object)
        .map(|tags| tags.keys().cloned().collect())
        .unwrap_or_default())
}
