// crates/pipeline-helpers-core/src/timestamp.rs
// ============================================================================
// Module: Run Timestamps
// Description: Start/end timestamps persisted between pipeline steps.
// Purpose: Hand the test run's time window to the platform collector.
// Dependencies: serde_json, thiserror, time, crate::files
// ============================================================================

//! ## Overview
//! The gather step writes wall-clock Unix seconds as a bare JSON number to
//! two result files; the platform step reads them back as a [`TimeWindow`].
//! Fractional seconds are accepted on read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::files::FileError;
use crate::files::read_json;
use crate::files::write_json_pretty;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Timestamp file errors.
#[derive(Debug, Error)]
pub enum TimestampError {
    /// The timestamp file could not be read or written.
    #[error(transparent)]
    File(#[from] FileError),
    /// The timestamp content is not usable.
    #[error("invalid timestamp: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Returns the current wall-clock time in whole Unix seconds.
#[must_use]
pub fn unix_seconds_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_secs()).unwrap_or(0)
}

/// Returns the current wall-clock time in Unix milliseconds.
#[must_use]
pub fn unix_millis_now() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_millis()).unwrap_or(0)
}

/// Formats Unix seconds as RFC 3339, falling back to the raw number.
#[must_use]
pub fn format_rfc3339(seconds: u64) -> String {
    i64::try_from(seconds)
        .ok()
        .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
        .and_then(|moment| moment.format(&Rfc3339).ok())
        .unwrap_or_else(|| seconds.to_string())
}

// ============================================================================
// SECTION: Files
// ============================================================================

/// Writes a Unix-seconds timestamp as a JSON number.
///
/// # Errors
///
/// Returns [`TimestampError::File`] when the file cannot be written.
pub fn write_timestamp(path: &Path, seconds: u64) -> Result<(), TimestampError> {
    write_json_pretty(path, &seconds)?;
    Ok(())
}

/// Reads a Unix-seconds timestamp written by [`write_timestamp`].
///
/// # Errors
///
/// Returns [`TimestampError`] when the file is unreadable or not a
/// non-negative number.
pub fn read_timestamp(path: &Path) -> Result<f64, TimestampError> {
    let value: Value = read_json(path)?;
    let seconds = value.as_f64().ok_or_else(|| {
        TimestampError::Invalid(format!("{} does not hold a number", path.display()))
    })?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(TimestampError::Invalid(format!(
            "{} holds a negative or non-finite number",
            path.display()
        )));
    }
    Ok(seconds)
}

// ============================================================================
// SECTION: Time Window
// ============================================================================

/// Wall-clock window of one test run in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    /// Run start.
    pub started: f64,
    /// Run end.
    pub ended: f64,
}

impl TimeWindow {
    /// Builds a window, rejecting an end before the start.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Invalid`] when `ended < started`.
    pub fn new(started: f64, ended: f64) -> Result<Self, TimestampError> {
        if ended < started {
            return Err(TimestampError::Invalid(format!(
                "window ends ({ended}) before it starts ({started})"
            )));
        }
        Ok(Self {
            started,
            ended,
        })
    }

    /// Loads the window from the two timestamp files.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError`] when either file is unusable.
    pub fn load(started_path: &Path, ended_path: &Path) -> Result<Self, TimestampError> {
        Self::new(read_timestamp(started_path)?, read_timestamp(ended_path)?)
    }
}
