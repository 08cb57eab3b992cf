// crates/pipeline-helpers-core/src/pr.rs
// ============================================================================
// Module: Pull Request Info
// Description: Typed view of the `pr.json` file written by the CI trigger.
// Purpose: Derive model versions, labels, and provenance from the PR.
// Dependencies: serde, crate::files
// ============================================================================

//! ## Overview
//! The CI system drops a `pr.json` describing the pull request under test.
//! Only `Number`, `Base.Repo.FullName`, and `Base.Repo.Name` are required;
//! every other field is ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use serde::Deserialize;

use crate::files::FileError;
use crate::files::read_json;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Pull request metadata from `pr.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrInfo {
    /// Pull request number.
    #[serde(rename = "Number")]
    pub number: u64,
    /// Base branch information.
    #[serde(rename = "Base")]
    pub base: PrBase,
}

/// Base branch of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrBase {
    /// Repository the pull request targets.
    #[serde(rename = "Repo")]
    pub repo: PrRepository,
}

/// Repository identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrRepository {
    /// `<owner>/<name>`.
    #[serde(rename = "FullName")]
    pub full_name: String,
    /// Repository name without owner.
    #[serde(rename = "Name")]
    pub name: String,
}

impl PrInfo {
    /// Loads `pr.json` from disk.
    ///
    /// # Errors
    ///
    /// Returns [`FileError`] when the file is missing or malformed.
    pub fn load(path: &Path) -> Result<Self, FileError> {
        read_json(path)
    }

    /// Returns the model version recorded for this PR (`pr-<number>`).
    #[must_use]
    pub fn model_version(&self) -> String {
        format!("pr-{}", self.number)
    }

    /// Returns the repository full name.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.base.repo.full_name
    }

    /// Returns the pull request web URL used as provenance.
    #[must_use]
    pub fn source_url(&self) -> String {
        format!("https://github.com/{}/pull/{}", self.base.repo.full_name, self.number)
    }

    /// Returns the deployment label `<name>-pr-<number>[-<overlay>]`.
    #[must_use]
    pub fn service_label(&self, overlay: Option<&str>) -> String {
        let base = format!("{}-pr-{}", self.base.repo.name, self.number);
        match overlay {
            Some(overlay) if !overlay.is_empty() => format!("{base}-{overlay}"),
            _ => base,
        }
    }
}
