// crates/pipeline-helpers-core/src/image/tests.rs
// ============================================================================
// Module: Image Reference Tests
// Description: Unit and property tests for image references and versions.
// Purpose: Validate parsing, version ordering, and whole-reference rewrites.
// Dependencies: pipeline-helpers-core, proptest
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use proptest::prelude::*;

use super::*;

fn version(tag: &str) -> ImageVersion {
    ImageVersion::parse_tag(tag).unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn parses_registry_repository_and_tag() {
    let image = ImageReference::parse("quay.io/thoth-station/s2i-thoth-ubi8-py38:v0.29.0").unwrap();
    assert_eq!(image.registry, "quay.io");
    assert_eq!(image.repository, "thoth-station/s2i-thoth-ubi8-py38");
    assert_eq!(image.tag, "v0.29.0");
    assert_eq!(image.with_tag("v0.30.0").to_string(), "quay.io/thoth-station/s2i-thoth-ubi8-py38:v0.30.0");

    let with_port = ImageReference::parse("registry:5000/org/app:v1").unwrap();
    assert_eq!(with_port.registry, "registry:5000");
    assert_eq!(with_port.tag, "v1");
}

#[test]
fn rejects_malformed_references() {
    for raw in ["quay.io/base:v1", "quay.io/org/base", "org/base:v1", "quay.io/org/base@sha256:ab", ""] {
        assert!(ImageReference::parse(raw).is_err(), "{raw} should be rejected");
    }
}

#[test]
fn version_ordering_pads_and_ranks_prereleases() {
    assert!(version("v1.3.0") > version("v1.2.9"));
    assert!(version("v1.10") > version("v1.9.9"));
    assert_eq!(version("v1.2"), version("v1.2.0"));
    assert!(version("v2.0.0-rc1") < version("v2.0.0"));
    assert!(version("v2.0.0-rc1") > version("v1.9.0"));
    assert!(version("v2.0.0-rc.10") > version("v2.0.0-rc.2"));
    assert!(version("v2.0.0-rc10") > version("v2.0.0-rc2"));
    assert!(version("v2.0.0-rc.1") > version("v2.0.0-rc"));
    assert!(version("v2.0.0-beta") > version("v2.0.0-alpha.9"));
    assert!(version("v2.0.0-rc") > version("v2.0.0-1"));
    assert!(ImageVersion::parse_tag("v2.0.0-rc99999999999999999999999").is_err());
    assert!(ImageVersion::parse_tag("1.2.0").is_err());
    assert!(ImageVersion::parse_tag("latest").is_err());
    assert!(ImageVersion::parse_tag("v1..2").is_err());
    assert!(ImageVersion::parse_tag("v1.2-").is_err());
}

#[test]
fn picks_latest_version_tag() {
    let tags = ["v1.1.0", "latest", "v1.3.0", "v1.2.0"];
    let (tag, _) = latest_version_tag(tags).unwrap();
    assert_eq!(tag, "v1.3.0");
    assert!(latest_version_tag(["latest", "stable"]).is_none());

    let candidates = ["v2.0.0-rc2", "v2.0.0-rc10", "v2.0.0-rc.3", "v1.9.0"];
    let (tag, _) = latest_version_tag(candidates).unwrap();
    assert_eq!(tag, "v2.0.0-rc10");
}

#[test]
fn replaces_only_whole_references() {
    let text = "a: quay.io/org/base:v1.0\nb: quay.io/org/base:v1.0.1\nc: \"quay.io/org/base:v1.0\"\n";
    let (updated, count) = replace_reference(text, "quay.io/org/base:v1.0", "quay.io/org/base:v1.2");
    assert_eq!(count, 2);
    assert_eq!(
        updated,
        "a: quay.io/org/base:v1.2\nb: quay.io/org/base:v1.0.1\nc: \"quay.io/org/base:v1.2\"\n"
    );
}

proptest! {
    #[test]
    fn ordering_matches_numeric_components(
        left in proptest::collection::vec(0u64 .. 50, 1 .. 4),
        right in proptest::collection::vec(0u64 .. 50, 1 .. 4),
    ) {
        let render = |parts: &[u64]| {
            format!("v{}", parts.iter().map(ToString::to_string).collect::<Vec<_>>().join("."))
        };
        let width = left.len().max(right.len());
        let pad = |parts: &[u64]| {
            let mut padded = parts.to_vec();
            padded.resize(width, 0);
            padded
        };
        let expected = pad(&left).cmp(&pad(&right));
        prop_assert_eq!(version(&render(&left)).cmp(&version(&render(&right))), expected);
    }
}
