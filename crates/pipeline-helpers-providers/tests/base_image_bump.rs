// crates/pipeline-helpers-providers/tests/base_image_bump.rs
// ============================================================================
// Module: Base Image Bump Tests
// Description: Registry tag lookup and config rewriting end to end.
// Purpose: Verify only outdated references change and formatting survives.
// Dependencies: pipeline-helpers-providers, tempfile, tiny_http
// ============================================================================

//! ## Overview
//! Runs [`bump_base_images`] over a temporary CI config with a
//! [`RegistryClient`] pointed at a canned repository API.

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

mod common;

use std::fs;

use pipeline_helpers_providers::BumpError;
use pipeline_helpers_providers::ImageStatus;
use pipeline_helpers_providers::ProviderError;
use pipeline_helpers_providers::RegistryClient;
use pipeline_helpers_providers::RegistryConfig;
use pipeline_helpers_providers::bump_base_images;
use tempfile::TempDir;

use crate::common::memory_logger;
use crate::common::serve;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const CONFIG: &str = "# overlays built by the pipeline
overlays:
  - name: cpu
    build:
      base-image: quay.io/org/base:v1.2.0 # pinned
  - name: gpu
    build:
      base-image: quay.io/org/base:v1.3.0
  - name: local
    build:
      base-image: not an image
";

const TAGS: &str = r#"{"name":"base","tags":{"v1.1.0":{},"latest":{},"v1.3.0":{},"v1.2.0":{}}}"#;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(".aicoe-ci.yaml");
    fs::write(&path, contents).unwrap();
    path
}

fn registry(api_url: &str) -> RegistryClient {
    RegistryClient::new(&RegistryConfig::new(api_url, Some("quay-token".to_string()))).unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn outdated_reference_is_bumped_in_place() {
    let (api_url, handle) = serve(vec![(200, TAGS.to_string())]);
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, CONFIG);
    let (logger, _sink) = memory_logger("bump-base-image");

    let outcome = bump_base_images(&path, "base-image", &registry(&api_url), &logger).unwrap();

    assert!(outcome.rewritten);
    let statuses: Vec<&ImageStatus> = outcome.images.iter().map(|image| &image.status).collect();
    assert_eq!(statuses[0], &ImageStatus::Bumped {
        to: "quay.io/org/base:v1.3.0".to_string()
    });
    assert_eq!(statuses[1], &ImageStatus::UpToDate);
    assert!(matches!(statuses[2], ImageStatus::Skipped { .. }));

    let rewritten = fs::read_to_string(&path).unwrap();
    assert_eq!(rewritten, CONFIG.replace("base:v1.2.0", "base:v1.3.0"));
    assert!(rewritten.contains("# pinned"));

    let seen = handle.join().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].url, "/repository/org/base");
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer quay-token"));
}

#[test]
fn up_to_date_config_is_not_rewritten() {
    let contents = "base-image: quay.io/org/base:v1.3.0\n";
    let (api_url, handle) = serve(vec![(200, TAGS.to_string())]);
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, contents);
    let before = fs::metadata(&path).unwrap().modified().unwrap();
    let (logger, _sink) = memory_logger("bump-base-image");

    let outcome = bump_base_images(&path, "base-image", &registry(&api_url), &logger).unwrap();

    assert!(!outcome.rewritten);
    assert_eq!(outcome.images[0].status, ImageStatus::UpToDate);
    assert_eq!(fs::read_to_string(&path).unwrap(), contents);
    assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
    handle.join().unwrap();
}

#[test]
fn repository_without_version_tags_is_skipped() {
    let (api_url, handle) = serve(vec![(200, r#"{"tags":{"latest":{}}}"#.to_string())]);
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "base-image: quay.io/org/base:latest\n");
    let (logger, _sink) = memory_logger("bump-base-image");

    let outcome = bump_base_images(&path, "base-image", &registry(&api_url), &logger).unwrap();

    assert!(!outcome.rewritten);
    assert!(matches!(&outcome.images[0].status, ImageStatus::Skipped { reason } if reason.contains("no version tags")));
    handle.join().unwrap();
}

#[test]
fn registry_failure_is_fatal() {
    let (api_url, handle) = serve(vec![(404, "{}".to_string())]);
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, CONFIG);
    let (logger, _sink) = memory_logger("bump-base-image");

    let err = bump_base_images(&path, "base-image", &registry(&api_url), &logger).unwrap_err();

    match err {
        BumpError::Registry {
            repository,
            source,
        } => {
            assert_eq!(repository, "org/base");
            assert!(matches!(source, ProviderError::Status { status: 404, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read_to_string(&path).unwrap(), CONFIG);
    handle.join().unwrap();
}

#[test]
fn config_without_references_reports_nothing() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "overlays: []\n");
    let (logger, _sink) = memory_logger("bump-base-image");
    let unused = registry("http://127.0.0.1:9");

    let outcome = bump_base_images(&path, "base-image", &unused, &logger).unwrap();

    assert!(outcome.images.is_empty());
    assert!(!outcome.rewritten);
}

#[test]
fn invalid_yaml_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "overlays: [unclosed\n");
    let (logger, _sink) = memory_logger("bump-base-image");

    let err = bump_base_images(&path, "base-image", &registry("http://127.0.0.1:9"), &logger).unwrap_err();

    assert!(matches!(err, BumpError::Parse(_)));
}
