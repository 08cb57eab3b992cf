// crates/pipeline-helpers-core/src/image.rs
// ============================================================================
// Module: Container Image References
// Description: Image reference parsing, `v`-tag versions, and text rewriting.
// Purpose: Decide whether a base image is outdated and rewrite references.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! An [`ImageReference`] is `registry/namespace/repository:tag`. Tags of the
//! form `v<dotted-numbers>[-pre]` parse as an [`ImageVersion`]; release
//! components compare numerically left to right with missing components
//! treated as zero, and a pre-release sorts before the same release without
//! one. Pre-release labels split into identifiers on `.` and `-` and between
//! letter and digit runs, so `rc10` outranks `rc2`. Numeric identifiers
//! compare numerically and rank below letter runs; a shorter label that
//! prefixes a longer one sorts first. [`replace_reference`] only rewrites whole references so that
//! `quay.io/org/base:v1.0` never matches inside `quay.io/org/base:v1.0.1`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of release components in a version tag.
const MAX_RELEASE_COMPONENTS: usize = 8;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Image reference and version parsing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    /// The reference is not `registry/namespace/repository:tag`.
    #[error("invalid image reference: {0}")]
    InvalidReference(String),
    /// The tag is not a `v`-prefixed dotted version.
    #[error("invalid version tag: {0}")]
    InvalidVersion(String),
}

// ============================================================================
// SECTION: Image Reference
// ============================================================================

/// Tagged container image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry host (for example `quay.io`).
    pub registry: String,
    /// Repository path below the registry (for example `org/base`).
    pub repository: String,
    /// Image tag.
    pub tag: String,
}

impl ImageReference {
    /// Parses `registry/namespace/repository:tag`.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidReference`] when a component is missing.
    pub fn parse(raw: &str) -> Result<Self, ImageError> {
        let invalid = || ImageError::InvalidReference(raw.to_string());
        let trimmed = raw.trim();
        if trimmed.contains('@') || trimmed.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let (registry, rest) = trimmed.split_once('/').ok_or_else(invalid)?;
        let (repository, tag) = rest.rsplit_once(':').ok_or_else(invalid)?;
        let segments: Vec<&str> = repository.split('/').collect();
        if registry.is_empty()
            || tag.is_empty()
            || tag.contains('/')
            || segments.len() < 2
            || segments.iter().any(|segment| segment.is_empty())
        {
            return Err(invalid());
        }
        Ok(Self {
            registry: registry.to_string(),
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Returns a copy with another tag.
    #[must_use]
    pub fn with_tag(&self, tag: &str) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: tag.to_string(),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)
    }
}

// ============================================================================
// SECTION: Image Version
// ============================================================================

/// One identifier of a pre-release label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum PreIdentifier {
    /// All-digit run.
    Numeric(u64),
    /// Letter run.
    Alpha(String),
}

/// Version parsed from a `v`-prefixed tag.
#[derive(Debug, Clone)]
pub struct ImageVersion {
    /// Numeric release components.
    release: Vec<u64>,
    /// Pre-release identifiers after `-`, if any.
    pre: Option<Vec<PreIdentifier>>,
}

impl ImageVersion {
    /// Parses a tag such as `v1.2.0` or `v2.0-rc1`.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::InvalidVersion`] for any other tag shape.
    pub fn parse_tag(tag: &str) -> Result<Self, ImageError> {
        let invalid = || ImageError::InvalidVersion(tag.to_string());
        let body = tag.strip_prefix('v').ok_or_else(invalid)?;
        let (release_text, pre) = match body.split_once('-') {
            Some((release, pre)) => (release, Some(pre)),
            None => (body, None),
        };
        let release = release_text
            .split('.')
            .map(|component| {
                if component.is_empty() || !component.bytes().all(|byte| byte.is_ascii_digit()) {
                    return Err(invalid());
                }
                component.parse::<u64>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>, _>>()?;
        if release.len() > MAX_RELEASE_COMPONENTS {
            return Err(invalid());
        }
        if let Some(pre) = pre
            && (pre.is_empty()
                || !pre.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'-'))
        {
            return Err(invalid());
        }
        let pre = pre.map(|label| split_pre_release(label).ok_or_else(invalid)).transpose()?;
        Ok(Self {
            release,
            pre,
        })
    }

    /// Returns the release component at `index`, zero when absent.
    fn component(&self, index: usize) -> u64 {
        self.release.get(index).copied().unwrap_or(0)
    }
}

/// Splits a pre-release label into identifiers, `None` on numeric overflow.
fn split_pre_release(label: &str) -> Option<Vec<PreIdentifier>> {
    let mut identifiers = Vec::new();
    for part in label.split(['.', '-']).filter(|part| !part.is_empty()) {
        let mut rest = part;
        while let Some(first) = rest.chars().next() {
            let digits = first.is_ascii_digit();
            let end = rest.find(|ch: char| ch.is_ascii_digit() != digits).unwrap_or(rest.len());
            let (run, tail) = rest.split_at(end);
            identifiers.push(if digits {
                PreIdentifier::Numeric(run.parse().ok()?)
            } else {
                PreIdentifier::Alpha(run.to_ascii_lowercase())
            });
            rest = tail;
        }
    }
    Some(identifiers)
}

impl Ord for ImageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let width = self.release.len().max(other.release.len());
        for index in 0 .. width {
            match self.component(index).cmp(&other.component(index)) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        match (&self.pre, &other.pre) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(left), Some(right)) => left.cmp(right),
        }
    }
}

impl PartialOrd for ImageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ImageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ImageVersion {}

/// Returns the tag with the highest version, ignoring non-version tags.
///
/// Ties keep the first tag seen.
#[must_use]
pub fn latest_version_tag<'a, I>(tags: I) -> Option<(&'a str, ImageVersion)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, ImageVersion)> = None;
    for tag in tags {
        let Ok(version) = ImageVersion::parse_tag(tag) else {
            continue;
        };
        if best.as_ref().is_none_or(|(_, current)| version > *current) {
            best = Some((tag, version));
        }
    }
    best
}

// ============================================================================
// SECTION: Text Rewriting
// ============================================================================

/// Returns true for characters that may continue an image reference.
const fn is_reference_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_' | '/' | ':' | '@')
}

/// Replaces whole occurrences of `old` with `new`, returning the count.
#[must_use]
pub fn replace_reference(text: &str, old: &str, new: &str) -> (String, usize) {
    if old.is_empty() {
        return (text.to_string(), 0);
    }
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut replaced = 0;
    for (start, _) in text.match_indices(old) {
        if start < cursor {
            continue;
        }
        let end = start + old.len();
        let before = text[.. start].chars().next_back();
        let after = text[end ..].chars().next();
        if before.is_some_and(is_reference_char) || after.is_some_and(is_reference_char) {
            continue;
        }
        output.push_str(&text[cursor .. start]);
        output.push_str(new);
        cursor = end;
        replaced += 1;
    }
    output.push_str(&text[cursor ..]);
    (output, replaced)
}

#[cfg(test)]
mod tests;
