// crates/pipeline-helpers-store/src/client.rs
// ============================================================================
// Module: Object Store Client
// Description: Minimal object-store abstraction and an in-memory backend.
// Purpose: Decouple document persistence from the S3 wire client.
// Dependencies: pipeline-helpers-core, thiserror
// ============================================================================

//! ## Overview
//! [`ObjectStoreClient`] is the seam between document persistence and the
//! storage backend. Reads always carry a byte limit so a corrupted or hostile
//! object cannot exhaust memory. [`InMemoryObjectStore`] backs tests and local
//! dry runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use pipeline_helpers_core::DocumentError;
use pipeline_helpers_core::KeyError;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Connection errors; callers degrade to running without persistence.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectError {
    /// Required connection settings are absent.
    #[error("object store not configured: {0}")]
    NotConfigured(String),
    /// The backend could not be reached or rejected the bucket.
    #[error("object store unreachable: {0}")]
    Unreachable(String),
}

/// Object-store operation errors.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// Invalid key or request input.
    #[error("object store invalid: {0}")]
    Invalid(String),
    /// Local I/O or runtime failure.
    #[error("object store io error: {0}")]
    Io(String),
    /// Backend returned an error.
    #[error("object store backend error: {0}")]
    Backend(String),
    /// Object exceeds size limits.
    #[error("object too large: {path} ({actual_bytes} > {max_bytes})")]
    TooLarge {
        /// Object key.
        path: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual size in bytes.
        actual_bytes: usize,
    },
    /// Stored document is malformed.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// Document key is invalid.
    #[error(transparent)]
    Key(#[from] KeyError),
}

// ============================================================================
// SECTION: Client Trait
// ============================================================================

/// Minimal object-store client abstraction.
pub trait ObjectStoreClient: Send + Sync {
    /// Returns true when an object exists at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the backend check fails.
    fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;

    /// Reads a single object with a size limit.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the object is missing, too large, or
    /// the read fails.
    fn get(&self, key: &str, max_bytes: usize) -> Result<Vec<u8>, ObjectStoreError>;

    /// Writes a single object, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the write fails.
    fn put(&self, key: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<(), ObjectStoreError>;

    /// Lists object keys below `prefix` in lexicographic order.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when listing fails.
    fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError>;
}

// ============================================================================
// SECTION: In-Memory Backend
// ============================================================================

/// Object store held in process memory.
#[derive(Default)]
pub struct InMemoryObjectStore {
    /// Objects by key.
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with the locked object map.
    fn with_objects<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, Vec<u8>>) -> T,
    ) -> Result<T, ObjectStoreError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| ObjectStoreError::Io("object store lock poisoned".to_string()))?;
        Ok(f(&mut objects))
    }
}

impl ObjectStoreClient for InMemoryObjectStore {
    fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        self.with_objects(|objects| objects.contains_key(key))
    }

    fn get(&self, key: &str, max_bytes: usize) -> Result<Vec<u8>, ObjectStoreError> {
        let bytes = self
            .with_objects(|objects| objects.get(key).cloned())?
            .ok_or_else(|| ObjectStoreError::Backend(format!("object not found: {key}")))?;
        if bytes.len() > max_bytes {
            return Err(ObjectStoreError::TooLarge {
                path: key.to_string(),
                max_bytes,
                actual_bytes: bytes.len(),
            });
        }
        Ok(bytes)
    }

    fn put(&self, key: &str, bytes: Vec<u8>, _content_type: Option<&str>) -> Result<(), ObjectStoreError> {
        self.with_objects(|objects| {
            objects.insert(key.to_string(), bytes);
        })
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        self.with_objects(|objects| {
            objects.keys().filter(|key| key.starts_with(prefix)).cloned().collect()
        })
    }
}
