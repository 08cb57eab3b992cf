// crates/pipeline-helpers-providers/src/bumper.rs
// ============================================================================
// Module: Base Image Bumper
// Description: Rewrites outdated `v`-tagged base images in a CI config file.
// Purpose: Keep repository CI configs on the newest published base image.
// Dependencies: serde_yaml, thiserror, pipeline-helpers-core, crate::registry
// ============================================================================

//! ## Overview
//! The bumper walks the parsed YAML for every string stored under the
//! configured key, resolves the newest `v`-tag for each image repository,
//! and substitutes whole references in the file text so comments and
//! formatting survive. Each image is compared against its own tag. The file
//! is written only when at least one reference changed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use pipeline_helpers_core::FileError;
use pipeline_helpers_core::ImageReference;
use pipeline_helpers_core::ImageVersion;
use pipeline_helpers_core::Logger;
use pipeline_helpers_core::files::read_text;
use pipeline_helpers_core::files::write_file;
use pipeline_helpers_core::image::latest_version_tag;
use pipeline_helpers_core::image::replace_reference;
use pipeline_helpers_core::logging::LogLevel;
use pipeline_helpers_core::tree::find_string_values;
use serde_json::Value;
use thiserror::Error;

use crate::http::ProviderError;
use crate::registry::TagSource;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Base image bump errors.
#[derive(Debug, Error)]
pub enum BumpError {
    /// Config file could not be read or written.
    #[error(transparent)]
    File(#[from] FileError),
    /// Config file is not valid YAML.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Registry lookup failed.
    #[error("registry lookup failed for {repository}: {source}")]
    Registry {
        /// Repository queried.
        repository: String,
        /// Underlying provider error.
        source: ProviderError,
    },
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// What happened to one image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStatus {
    /// Rewritten to a newer tag.
    Bumped {
        /// New reference.
        to: String,
    },
    /// Already at the newest version.
    UpToDate,
    /// Skipped (not a reference, non-version tag, or no version tags).
    Skipped {
        /// Reason for skipping.
        reason: String,
    },
}

/// Result for one reference found in the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBump {
    /// Reference as found.
    pub reference: String,
    /// Outcome.
    pub status: ImageStatus,
}

/// Result of a bump run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpOutcome {
    /// Config file inspected.
    pub config_path: PathBuf,
    /// Per-reference results in document order.
    pub images: Vec<ImageBump>,
    /// True when the file was rewritten.
    pub rewritten: bool,
}

// ============================================================================
// SECTION: Bump
// ============================================================================

/// Bumps every outdated base image under `key` in the config file.
///
/// # Errors
///
/// Returns [`BumpError`] when the file cannot be read, parsed, or written, or
/// when a registry lookup fails.
pub fn bump_base_images(
    config_path: &Path,
    key: &str,
    tags: &dyn TagSource,
    logger: &Logger,
) -> Result<BumpOutcome, BumpError> {
    let original = read_text(config_path)?;
    let root: serde_yaml::Value =
        serde_yaml::from_str(&original).map_err(|err| BumpError::Parse(err.to_string()))?;
    let found = find_string_values(&root, key);
    logger.with_fields(LogLevel::Info, "base image references found", [
        ("config", Value::String(config_path.display().to_string())),
        ("count", Value::from(found.len())),
    ]);

    let mut latest_by_repository: BTreeMap<String, Option<(String, ImageVersion)>> = BTreeMap::new();
    let mut images = Vec::with_capacity(found.len());
    let mut text = original.clone();
    for entry in found {
        let status = match ImageReference::parse(&entry.value) {
            Err(err) => ImageStatus::Skipped {
                reason: err.to_string(),
            },
            Ok(image) => {
                let latest = match latest_by_repository.get(&image.repository) {
                    Some(latest) => latest.clone(),
                    None => {
                        let latest = resolve_latest(tags, &image.repository, logger)?;
                        latest_by_repository.insert(image.repository.clone(), latest.clone());
                        latest
                    }
                };
                evaluate(&image, latest.as_ref())
            }
        };
        if let ImageStatus::Bumped {
            to,
        } = &status
        {
            let (updated, _) = replace_reference(&text, &entry.value, to);
            text = updated;
        }
        logger.with_fields(LogLevel::Info, "base image evaluated", [
            ("path", Value::String(entry.path_text())),
            ("reference", Value::String(entry.value.clone())),
            ("status", Value::String(status_label(&status).to_string())),
        ]);
        images.push(ImageBump {
            reference: entry.value,
            status,
        });
    }

    let rewritten = text != original;
    if rewritten {
        write_file(config_path, text.as_bytes())?;
        logger.with_fields(LogLevel::Info, "config updated with latest base image versions", [(
            "config",
            Value::String(config_path.display().to_string()),
        )]);
    } else {
        logger.info("base images already up to date");
    }
    Ok(BumpOutcome {
        config_path: config_path.to_path_buf(),
        images,
        rewritten,
    })
}

/// Fetches tags and returns the newest `v`-tag, if any.
fn resolve_latest(
    tags: &dyn TagSource,
    repository: &str,
    logger: &Logger,
) -> Result<Option<(String, ImageVersion)>, BumpError> {
    logger.with_fields(LogLevel::Debug, "requesting image tags", [(
        "repository",
        Value::String(repository.to_string()),
    )]);
    let listed = tags.list_tags(repository).map_err(|source| BumpError::Registry {
        repository: repository.to_string(),
        source,
    })?;
    Ok(latest_version_tag(listed.iter().map(String::as_str))
        .map(|(tag, version)| (tag.to_string(), version)))
}

/// Compares an image's own tag against the newest published version.
fn evaluate(image: &ImageReference, latest: Option<&(String, ImageVersion)>) -> ImageStatus {
    let Some((latest_tag, latest_version)) = latest else {
        return ImageStatus::Skipped {
            reason: "no version tags published".to_string(),
        };
    };
    match ImageVersion::parse_tag(&image.tag) {
        Err(err) => ImageStatus::Skipped {
            reason: err.to_string(),
        },
        Ok(current) if *latest_version > current => ImageStatus::Bumped {
            to: image.with_tag(latest_tag).to_string(),
        },
        Ok(_) => ImageStatus::UpToDate,
    }
}

/// Returns a stable label for logging.
const fn status_label(status: &ImageStatus) -> &'static str {
    match status {
        ImageStatus::Bumped {
            ..
        } => "bumped",
        ImageStatus::UpToDate => "up_to_date",
        ImageStatus::Skipped {
            ..
        } => "skipped",
    }
}
