// crates/pipeline-helpers-providers/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Canned HTTP servers and logger helpers for provider tests.
// Purpose: Exercise the blocking HTTP providers against a local server.
// Dependencies: tiny_http, pipeline-helpers-core
// ============================================================================

//! ## Overview
//! [`serve`] answers a fixed sequence of requests and hands back what it saw
//! so tests can assert on paths, query strings, and authorization headers.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]
#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use pipeline_helpers_core::LogLevel;
use pipeline_helpers_core::Logger;
use pipeline_helpers_core::logging::MemoryLogSink;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: HTTP Server
// ============================================================================

/// Request observed by the canned server.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    /// Request path and query.
    pub url: String,
    /// Authorization header value, if any.
    pub authorization: Option<String>,
}

/// Serves `responses` in order, one per request, then stops.
pub fn serve(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<SeenRequest>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for (status, body) in responses {
            let Ok(request) = server.recv() else {
                break;
            };
            let authorization = request
                .headers()
                .iter()
                .find(|header| header.field.equiv("Authorization"))
                .map(|header| header.value.as_str().to_string());
            seen.push(SeenRequest {
                url: request.url().to_string(),
                authorization,
            });
            let content_type = Header::from_bytes("Content-Type", "application/json").unwrap();
            let response = Response::from_string(body).with_status_code(status).with_header(content_type);
            let _ = request.respond(response);
        }
        seen
    });
    (format!("http://{addr}"), handle)
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Returns a debug-level logger that records into memory.
pub fn memory_logger(task: &str) -> (Logger, Arc<MemoryLogSink>) {
    let sink = Arc::new(MemoryLogSink::new());
    (Logger::new(sink.clone(), task, LogLevel::Debug), sink)
}
