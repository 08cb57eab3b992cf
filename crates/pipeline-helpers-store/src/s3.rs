// crates/pipeline-helpers-store/src/s3.rs
// ============================================================================
// Module: S3 Object Store
// Description: S3-compatible client (Ceph RGW, AWS S3) behind a blocking API.
// Purpose: Persist metrics documents in the shared CI bucket.
// Dependencies: aws-config, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! [`S3ObjectStoreClient`] owns a private Tokio runtime and blocks on every
//! SDK call so the pipeline tasks stay synchronous. [`S3ObjectStoreClient::connect`]
//! issues a `HeadBucket` before returning, so a reachable client is proven
//! usable and callers can degrade on [`ConnectError`] up front.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use tokio::io::AsyncReadExt;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::runtime::RuntimeFlavor;

use crate::client::ConnectError;
use crate::client::ObjectStoreClient;
use crate::client::ObjectStoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of keys returned by a single listing.
pub const MAX_LISTED_KEYS: usize = 10_000;
/// Region used when none is configured (required by the SDK, ignored by Ceph).
const DEFAULT_REGION: &str = "us-east-1";
/// Credential provider name reported to the SDK.
const CREDENTIALS_PROVIDER_NAME: &str = "pipeline-helpers-env";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Connection settings for an S3-compatible store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3StoreConfig {
    /// Bucket name; connecting without one fails with [`ConnectError::NotConfigured`].
    pub bucket: Option<String>,
    /// Custom endpoint URL (Ceph RGW).
    pub endpoint_url: Option<String>,
    /// Region name.
    pub region: Option<String>,
    /// Static access key id.
    pub access_key_id: Option<String>,
    /// Static secret access key.
    pub secret_access_key: Option<String>,
    /// Use path-style addressing.
    pub force_path_style: bool,
}

// ============================================================================
// SECTION: Runtime Helpers
// ============================================================================

/// Blocks on an object-store future using a compatible runtime.
fn block_on_with_runtime<F, T, E>(runtime: &Runtime, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<ObjectStoreError> + Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
            return tokio::task::block_in_place(|| handle.block_on(future));
        }
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        std::thread::spawn(move || {
            let result = Runtime::new()
                .map_err(|err| E::from(ObjectStoreError::Io(err.to_string())))
                .and_then(|runtime| runtime.block_on(future));
            let _ = tx.send(result);
        });
        return rx.recv().unwrap_or_else(|_| {
            Err(E::from(ObjectStoreError::Io("object store thread join failed".to_string())))
        });
    }

    runtime.block_on(future)
}

impl From<ObjectStoreError> for ConnectError {
    fn from(err: ObjectStoreError) -> Self {
        Self::Unreachable(err.to_string())
    }
}

// ============================================================================
// SECTION: S3 Client
// ============================================================================

/// S3-backed object-store client.
pub struct S3ObjectStoreClient {
    /// Underlying S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Tokio runtime for blocking S3 operations.
    runtime: Option<Arc<Runtime>>,
}

impl Drop for S3ObjectStoreClient {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = std::thread::spawn(move || drop(runtime));
        }
    }
}

impl S3ObjectStoreClient {
    /// Builds a client and verifies the bucket is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::NotConfigured`] without a bucket or with only
    /// half of a static credential pair, and [`ConnectError::Unreachable`]
    /// when the runtime cannot start or `HeadBucket` fails.
    pub fn connect(config: &S3StoreConfig) -> Result<Self, ConnectError> {
        let bucket = config
            .bucket
            .clone()
            .filter(|bucket| !bucket.trim().is_empty())
            .ok_or_else(|| ConnectError::NotConfigured("bucket is not set".to_string()))?;
        let credentials = match (&config.access_key_id, &config.secret_access_key) {
            (Some(key_id), Some(secret)) => Some(Credentials::new(
                key_id,
                secret,
                None,
                None,
                CREDENTIALS_PROVIDER_NAME,
            )),
            (None, None) => None,
            _ => {
                return Err(ConnectError::NotConfigured(
                    "access key id and secret key must be set together".to_string(),
                ));
            }
        };
        let runtime = Runtime::new().map_err(|err| ConnectError::Unreachable(err.to_string()))?;
        let region = config.region.clone().unwrap_or_else(|| DEFAULT_REGION.to_string());
        let endpoint = config.endpoint_url.clone();
        let shared_config = block_on_with_runtime(&runtime, async move {
            let mut loader =
                aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));
            if let Some(endpoint) = endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            if let Some(credentials) = credentials {
                loader = loader.credentials_provider(credentials);
            }
            Ok::<_, ConnectError>(loader.load().await)
        })?;
        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }
        let store = Self {
            client: Client::from_conf(s3_builder.build()),
            bucket,
            runtime: Some(Arc::new(runtime)),
        };
        store.head_bucket()?;
        Ok(store)
    }

    /// Checks the bucket exists and is accessible.
    fn head_bucket(&self) -> Result<(), ConnectError> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let runtime = self.runtime().map_err(ConnectError::from)?;
        block_on_with_runtime(runtime, async move {
            client
                .head_bucket()
                .bucket(bucket.clone())
                .send()
                .await
                .map_err(|err| ConnectError::Unreachable(format!("bucket {bucket}: {err}")))?;
            Ok(())
        })
    }

    /// Returns the runtime or an error if shutdown.
    fn runtime(&self) -> Result<&Runtime, ObjectStoreError> {
        self.runtime
            .as_ref()
            .map(AsRef::as_ref)
            .ok_or_else(|| ObjectStoreError::Io("object store runtime closed".to_string()))
    }
}

impl ObjectStoreClient for S3ObjectStoreClient {
    fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        let bucket = self.bucket.clone();
        let key = key.to_string();
        let client = self.client.clone();
        block_on_with_runtime(self.runtime()?, async move {
            match client.head_object().bucket(bucket).key(key).send().await {
                Ok(_) => Ok(true),
                Err(err) => {
                    if err.as_service_error().is_some_and(|service| service.is_not_found()) {
                        Ok(false)
                    } else {
                        Err(ObjectStoreError::Backend(err.to_string()))
                    }
                }
            }
        })
    }

    fn get(&self, key: &str, max_bytes: usize) -> Result<Vec<u8>, ObjectStoreError> {
        let bucket = self.bucket.clone();
        let key = key.to_string();
        let client = self.client.clone();
        block_on_with_runtime(self.runtime()?, async move {
            let output = client
                .get_object()
                .bucket(bucket)
                .key(key.clone())
                .send()
                .await
                .map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
            if let Some(length) = output.content_length() {
                let actual_bytes = usize::try_from(length).unwrap_or(usize::MAX);
                if actual_bytes > max_bytes {
                    return Err(ObjectStoreError::TooLarge {
                        path: key.clone(),
                        max_bytes,
                        actual_bytes,
                    });
                }
            }
            let mut reader = output.body.into_async_read();
            let mut buffer = Vec::new();
            let mut total_bytes = 0usize;
            let mut chunk = [0u8; 8192];
            loop {
                let read = reader
                    .read(&mut chunk)
                    .await
                    .map_err(|err| ObjectStoreError::Io(err.to_string()))?;
                if read == 0 {
                    break;
                }
                total_bytes = total_bytes
                    .checked_add(read)
                    .ok_or_else(|| ObjectStoreError::Io("object size overflow".to_string()))?;
                if total_bytes > max_bytes {
                    return Err(ObjectStoreError::TooLarge {
                        path: key.clone(),
                        max_bytes,
                        actual_bytes: total_bytes,
                    });
                }
                buffer.extend_from_slice(&chunk[.. read]);
            }
            Ok(buffer)
        })
    }

    fn put(&self, key: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<(), ObjectStoreError> {
        let bucket = self.bucket.clone();
        let key = key.to_string();
        let client = self.client.clone();
        let content_type = content_type.map(str::to_string);
        block_on_with_runtime(self.runtime()?, async move {
            let body = ByteStream::from(bytes);
            let mut request = client.put_object().bucket(bucket).key(key).body(body);
            if let Some(content_type) = content_type {
                request = request.content_type(content_type);
            }
            request.send().await.map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
            Ok(())
        })
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        let bucket = self.bucket.clone();
        let prefix = prefix.to_string();
        let client = self.client.clone();
        block_on_with_runtime(self.runtime()?, async move {
            let mut keys = Vec::new();
            let mut continuation: Option<String> = None;
            loop {
                let output = client
                    .list_objects_v2()
                    .bucket(bucket.clone())
                    .prefix(prefix.clone())
                    .set_continuation_token(continuation.take())
                    .send()
                    .await
                    .map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
                for object in output.contents() {
                    if let Some(key) = object.key() {
                        keys.push(key.to_string());
                    }
                }
                if keys.len() > MAX_LISTED_KEYS {
                    return Err(ObjectStoreError::Invalid(format!(
                        "listing {prefix} exceeds {MAX_LISTED_KEYS} keys"
                    )));
                }
                match output.next_continuation_token() {
                    Some(token) if output.is_truncated().unwrap_or(false) => {
                        continuation = Some(token.to_string());
                    }
                    _ => break,
                }
            }
            keys.sort();
            Ok(keys)
        })
    }
}
