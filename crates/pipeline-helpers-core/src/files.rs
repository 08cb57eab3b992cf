// crates/pipeline-helpers-core/src/files.rs
// ============================================================================
// Module: Bounded File Access
// Description: Size-limited reads and JSON file helpers for task inputs.
// Purpose: Keep every task input read bounded and its failure descriptive.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Task inputs (`pr.json`, metric files, manifest templates, timestamp files)
//! arrive on a shared workspace volume written by other pipeline steps. Reads
//! go through [`read_file_limited`] so an oversized or truncated input fails
//! with a path-qualified [`FileError`] instead of exhausting memory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of any single task input file.
pub const MAX_INPUT_FILE_BYTES: usize = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// File access errors for task inputs and outputs.
#[derive(Debug, Error)]
pub enum FileError {
    /// The file does not exist.
    #[error("file not found: {path}")]
    NotFound {
        /// Path that was requested.
        path: String,
    },
    /// I/O failure while reading or writing.
    #[error("file io error: {path}: {message}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying error message.
        message: String,
    },
    /// File exceeds the configured size limit.
    #[error("file too large: {path} ({actual_bytes} > {max_bytes})")]
    TooLarge {
        /// Path that was requested.
        path: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Observed size in bytes.
        actual_bytes: usize,
    },
    /// File content is not valid JSON for the expected shape.
    #[error("invalid json in {path}: {message}")]
    Json {
        /// Path that was parsed.
        path: String,
        /// Parser message.
        message: String,
    },
}

// ============================================================================
// SECTION: Reads
// ============================================================================

/// Reads a file, failing when it exceeds `max_bytes`.
///
/// # Errors
///
/// Returns [`FileError`] when the file is missing, unreadable, or too large.
pub fn read_file_limited(path: &Path, max_bytes: usize) -> Result<Vec<u8>, FileError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            FileError::NotFound {
                path: display.clone(),
            }
        } else {
            FileError::Io {
                path: display.clone(),
                message: err.to_string(),
            }
        }
    })?;
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut buffer = Vec::new();
    file.take(limit).read_to_end(&mut buffer).map_err(|err| FileError::Io {
        path: display.clone(),
        message: err.to_string(),
    })?;
    if buffer.len() > max_bytes {
        return Err(FileError::TooLarge {
            path: display,
            max_bytes,
            actual_bytes: buffer.len(),
        });
    }
    Ok(buffer)
}

/// Reads a UTF-8 text file within [`MAX_INPUT_FILE_BYTES`].
///
/// # Errors
///
/// Returns [`FileError`] when the file cannot be read or is not UTF-8.
pub fn read_text(path: &Path) -> Result<String, FileError> {
    let bytes = read_file_limited(path, MAX_INPUT_FILE_BYTES)?;
    String::from_utf8(bytes).map_err(|_| FileError::Io {
        path: path.display().to_string(),
        message: "file must be utf-8".to_string(),
    })
}

/// Reads and deserializes a JSON file within [`MAX_INPUT_FILE_BYTES`].
///
/// # Errors
///
/// Returns [`FileError`] when the file cannot be read or parsed.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, FileError> {
    let bytes = read_file_limited(path, MAX_INPUT_FILE_BYTES)?;
    serde_json::from_slice(&bytes).map_err(|err| FileError::Json {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

// ============================================================================
// SECTION: Writes
// ============================================================================

/// Writes bytes to a file, replacing any existing content.
///
/// # Errors
///
/// Returns [`FileError`] when the file cannot be written.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<(), FileError> {
    std::fs::write(path, bytes).map_err(|err| FileError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Serializes a value as pretty JSON and writes it to a file.
///
/// # Errors
///
/// Returns [`FileError`] when serialization or writing fails.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), FileError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|err| FileError::Json {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    write_file(path, &bytes)
}
