// crates/pipeline-helpers-providers/src/http.rs
// ============================================================================
// Module: HTTP Helpers
// Description: Blocking HTTP client construction and bounded response reads.
// Purpose: Share timeouts, TLS policy, and size limits across HTTP providers.
// Dependencies: reqwest, thiserror, url
// ============================================================================

//! ## Overview
//! Both the metrics backend and the image registry are plain JSON-over-HTTP
//! APIs. Clients built here carry a request timeout and a bounded redirect
//! policy, and responses are read through [`read_response_limited`] so a
//! misbehaving server cannot exhaust memory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::redirect::Policy;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum response body size accepted from providers.
pub const MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;
/// Maximum redirects followed per request.
const MAX_REDIRECTS: usize = 5;
/// User agent sent with every request.
const USER_AGENT: &str = concat!("pipeline-helpers/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Provider HTTP errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Provider configuration is unusable.
    #[error("provider config invalid: {0}")]
    Config(String),
    /// The request could not be sent or timed out.
    #[error("provider request failed: {0}")]
    Request(String),
    /// The server answered with a non-success status.
    #[error("provider returned status {status} for {url}")]
    Status {
        /// Requested URL without query.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// Response body exceeds the size limit.
    #[error("provider response exceeds {max_bytes} bytes")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
    },
    /// Response body could not be decoded.
    #[error("provider response invalid: {0}")]
    Decode(String),
}

// ============================================================================
// SECTION: Client Construction
// ============================================================================

/// Builds a blocking client.
///
/// # Errors
///
/// Returns [`ProviderError::Config`] when the client cannot be created.
pub fn build_client(timeout: Duration, verify_tls: bool) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .danger_accept_invalid_certs(!verify_tls)
        .build()
        .map_err(|err| ProviderError::Config(format!("http client build failed: {err}")))
}

/// Parses an HTTP(S) base URL and ensures its path ends with `/`.
///
/// # Errors
///
/// Returns [`ProviderError::Config`] for unparsable or non-HTTP URLs.
pub fn parse_base_url(raw: &str) -> Result<Url, ProviderError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|err| ProviderError::Config(format!("invalid url {raw}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProviderError::Config(format!("url must use http or https: {raw}")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Joins a relative path onto a base URL from [`parse_base_url`].
///
/// # Errors
///
/// Returns [`ProviderError::Config`] when the joined URL is invalid.
pub fn join_url(base: &Url, path: &str) -> Result<Url, ProviderError> {
    base.join(path.trim_start_matches('/'))
        .map_err(|err| ProviderError::Config(format!("invalid url path {path}: {err}")))
}

// ============================================================================
// SECTION: Response Handling
// ============================================================================

/// Fails unless the response status is a success.
///
/// # Errors
///
/// Returns [`ProviderError::Status`] for non-2xx responses.
pub fn ensure_success(response: &Response) -> Result<(), ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let mut url = response.url().clone();
    url.set_query(None);
    Err(ProviderError::Status {
        url: url.to_string(),
        status: status.as_u16(),
    })
}

/// Reads the response body while enforcing a byte limit.
///
/// # Errors
///
/// Returns [`ProviderError`] when the body is too large, truncated, or
/// unreadable.
pub fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, ProviderError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| ProviderError::Config("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(ProviderError::TooLarge {
            max_bytes,
        });
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle
        .read_to_end(&mut buf)
        .map_err(|err| ProviderError::Request(format!("failed to read response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(ProviderError::TooLarge {
            max_bytes,
        });
    }
    if let Some(expected) = expected_len {
        let expected = usize::try_from(expected)
            .map_err(|_| ProviderError::Decode("invalid response length".to_string()))?;
        if buf.len() < expected {
            return Err(ProviderError::Decode("response truncated".to_string()));
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions favor direct unwrap.")]

    use super::*;

    #[test]
    fn base_urls_gain_trailing_slash_and_join_below_path() {
        let base = parse_base_url("https://quay.io/api/v1").unwrap();
        assert_eq!(base.as_str(), "https://quay.io/api/v1/");
        let joined = join_url(&base, "/repository/org/base").unwrap();
        assert_eq!(joined.as_str(), "https://quay.io/api/v1/repository/org/base");
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(matches!(parse_base_url("ftp://host"), Err(ProviderError::Config(_))));
        assert!(matches!(parse_base_url("not a url"), Err(ProviderError::Config(_))));
    }
}
